// Shared benchmark helpers
// Functions here are used across different benchmark files
#![allow(dead_code)]

use discarchive::repository::scanner::NoopProgress;
use discarchive::repository::{FileDatabase, HashDatabase};
use tempfile::TempDir;

/// Create a source tree of `num_files` files spread over nested directories.
/// Every `dup_every`-th file repeats the content of the previous one.
pub fn create_bench_tree(num_files: usize, file_size: usize, dup_every: usize) -> TempDir {
    let dir = TempDir::new().unwrap();
    let dirs = ["src", "lib", "docs", "assets", "data"];

    for i in 0..num_files {
        let depth = (i % 3) + 1;
        let mut path = dir.path().to_path_buf();
        for d in 0..depth {
            path.push(format!("{}_{}", dirs[(i + d) % dirs.len()], i / 100));
        }
        std::fs::create_dir_all(&path).unwrap();

        let seed = if dup_every > 0 && i % dup_every == 0 && i > 0 { i - 1 } else { i };
        let mut content = format!("file {}\n", seed).into_bytes();
        content.resize(file_size, b'#');
        std::fs::write(path.join(format!("file_{}.dat", i)), content).unwrap();
    }
    dir
}

/// Scan and hash a tree into a hash database
pub fn build_hash_db(dir: &TempDir) -> HashDatabase {
    let mut file_db = FileDatabase::from_scan(dir.path()).unwrap();
    file_db.calculate_file_hash(&NoopProgress).unwrap();
    HashDatabase::from_file_database(&file_db, "/DATA").unwrap()
}
