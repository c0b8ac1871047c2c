use clap::Parser;
use discarchive::Capacity;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "discarchive",
    version,
    about = "Archive a directory tree onto deduplicated optical volumes"
)]
pub struct Cli {
    /// Directory to archive
    pub root: PathBuf,

    /// Volume capacity: cd, dvd, bd or a byte count [default: from config]
    #[arg(short, long)]
    pub capacity: Option<Capacity>,

    /// Directory to stage volumes in
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Only write this volume
    #[arg(short, long)]
    pub disc: Option<u32>,

    /// Plan volumes without writing anything
    #[arg(long)]
    pub pretend: bool,

    /// Print the archive report
    #[arg(long)]
    pub info: bool,

    /// Config file [default: <config_dir>/discarchive/config.toml]
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Root directory inside every volume
    #[arg(long)]
    pub target_root: Option<String>,

    /// Where the catalogue and snapshot are saved
    #[arg(long)]
    pub work_dir: Option<PathBuf>,

    /// Debug logging and progress bars
    #[arg(short, long)]
    pub verbose: bool,
}
