mod capacity;
mod file_entry;
mod hashed_entry;

pub use capacity::{Capacity, BD_CAPACITY, CD_CAPACITY, DVD_CAPACITY};
pub use file_entry::{hash_bytes, hash_file, FileEntry};
pub use hashed_entry::{HashedEntry, TargetPath};
