//! Target-namespace path derivation
//!
//! Every blob is placed under a target root twice: once with its original
//! long name and once with an ISO9660-safe short name. Both namespaces use
//! `/` separators regardless of the host platform.

use std::path::{Component, Path};

/// Version suffix appended to ISO9660 file identifiers
pub const ISO_VERSION_SUFFIX: &str = ";1";

/// Map one name component into the short namespace.
///
/// ASCII letters are upper-cased, digits and `_` are kept, everything else
/// (including non-ASCII characters) becomes `_`.
pub fn iso9660_component(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Map a file name into the short namespace, keeping the final extension dot.
pub fn iso9660_file_name(name: &str) -> String {
    let mapped = match name.rsplit_once('.') {
        Some((stem, ext)) => format!("{}.{}", iso9660_component(stem), iso9660_component(ext)),
        None => iso9660_component(name),
    };
    mapped + ISO_VERSION_SUFFIX
}

/// Map an absolute directory path into the short namespace.
pub fn iso9660_dir(dir: &str) -> String {
    let parts: Vec<String> = dir
        .split('/')
        .filter(|p| !p.is_empty())
        .map(iso9660_component)
        .collect();
    format!("/{}", parts.join("/"))
}

/// Map an absolute long file path into the short namespace.
pub fn iso9660_path(long_path: &str) -> String {
    match long_path.rsplit_once('/') {
        Some(("", name)) => format!("/{}", iso9660_file_name(name)),
        Some((dir, name)) => format!("{}/{}", iso9660_dir(dir), iso9660_file_name(name)),
        None => format!("/{}", iso9660_file_name(long_path)),
    }
}

/// Join a `/`-separated relative path onto an absolute target root.
pub fn join_target(root: &str, relative: &str) -> String {
    let root = root.trim_end_matches('/');
    let relative = relative.trim_start_matches('/');
    if relative.is_empty() {
        return if root.is_empty() { "/".to_string() } else { root.to_string() };
    }
    format!("{}/{}", root, relative)
}

/// Parent directory of an absolute `/`-separated path ("/" for top-level files).
pub fn parent_dir(path: &str) -> &str {
    match path.rsplit_once('/') {
        Some(("", _)) | None => "/",
        Some((dir, _)) => dir,
    }
}

/// Build the `/`-separated key for a path relative to a scan root.
///
/// Returns `None` if the path is empty or contains components that would
/// leave the root.
pub fn relative_key(relative: &Path) -> Option<String> {
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(s) => parts.push(s.to_string_lossy().into_owned()),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_iso_dir() {
        assert_eq!(iso9660_dir("/"), "/");
        assert_eq!(iso9660_dir("/test_1_files"), "/TEST_1_FILES");
        assert_eq!(iso9660_dir("/test_1_files/usb/testDir"), "/TEST_1_FILES/USB/TESTDIR");
    }

    #[test]
    fn test_iso_file_names() {
        assert_eq!(iso9660_file_name("first.html"), "FIRST.HTML;1");
        assert_eq!(iso9660_file_name("second copy.txt"), "SECOND_COPY.TXT;1");
        assert_eq!(iso9660_file_name("Makefile"), "MAKEFILE;1");
        assert_eq!(iso9660_file_name("archive.tar.gz"), "ARCHIVE_TAR.GZ;1");
    }

    #[test]
    fn test_unicode_becomes_single_underscore() {
        assert_eq!(iso9660_path("/DATA/testDir/fourthé.txt"), "/DATA/TESTDIR/FOURTH_.TXT;1");
    }

    #[test]
    fn test_iso_path() {
        assert_eq!(iso9660_path("/DATA/first.html"), "/DATA/FIRST.HTML;1");
        assert_eq!(iso9660_path("/top.txt"), "/TOP.TXT;1");
    }

    #[test]
    fn test_join_target() {
        assert_eq!(join_target("/DATA", "first.html"), "/DATA/first.html");
        assert_eq!(join_target("/DATA/", "a/b.txt"), "/DATA/a/b.txt");
        assert_eq!(join_target("/", "a.txt"), "/a.txt");
        assert_eq!(join_target("/DATA", ""), "/DATA");
    }

    #[test]
    fn test_parent_dir() {
        assert_eq!(parent_dir("/DATA/first.html"), "/DATA");
        assert_eq!(parent_dir("/DATA/a/b.txt"), "/DATA/a");
        assert_eq!(parent_dir("/top.txt"), "/");
    }

    #[test]
    fn test_relative_key() {
        assert_eq!(relative_key(&PathBuf::from("a/b/c.txt")).as_deref(), Some("a/b/c.txt"));
        assert_eq!(relative_key(&PathBuf::from("./a.txt")).as_deref(), Some("a.txt"));
        assert_eq!(relative_key(&PathBuf::from("../a.txt")), None);
        assert_eq!(relative_key(&PathBuf::from("")), None);
    }
}
