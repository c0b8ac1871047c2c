mod format;
mod path;

pub use format::{format_mtime, format_size, format_thousands, parse_mtime, to_pretty_json};
pub use path::{
    iso9660_component, iso9660_dir, iso9660_file_name, iso9660_path, join_target, parent_dir,
    relative_key, ISO_VERSION_SUFFIX,
};
