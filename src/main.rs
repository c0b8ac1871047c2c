mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::Cli;
use discarchive::util::format_size;
use discarchive::{ArchiveConfig, Archiver, StagingWriter};

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ArchiveConfig::load(path)
            .with_context(|| format!("Could not load config: {}", path.display()))?,
        None => ArchiveConfig::load_or_default().context("Could not load default config")?,
    };
    if let Some(target_root) = &cli.target_root {
        config.target_root = target_root.clone();
    }
    if let Some(work_dir) = &cli.work_dir {
        config.work_dir = work_dir.clone();
    }
    config.verbose |= cli.verbose;
    init_tracing(config.verbose);

    let capacity = cli.capacity.unwrap_or(config.default_capacity);
    let mut archiver = Archiver::new(config);

    archiver
        .create_file_database(&cli.root)
        .with_context(|| format!("Could not scan {}", cli.root.display()))?;
    archiver
        .convert_to_hash_database()
        .context("Could not deduplicate files")?;
    archiver
        .segment(capacity)
        .with_context(|| format!("Could not split archive into {} volumes", capacity))?;

    if let Some(hash_db) = archiver.hash_database() {
        info!(
            "{} unique blobs, {} on {} volume(s)",
            hash_db.len(),
            format_size(hash_db.total_size()),
            hash_db.num_volumes()
        );
    }

    if !cli.pretend {
        let path = archiver.save().context("Could not save archive")?;
        eprintln!("Catalogue written to {}", path.display());
    }

    if cli.info {
        print!("{}", archiver.get_info());
    }

    if cli.pretend || cli.out.is_some() {
        let out = cli
            .out
            .clone()
            .unwrap_or_else(|| archiver.config().work_dir.join("volumes"));
        let writer = StagingWriter::new(out);
        let volumes = archiver
            .write_iso(&writer, cli.pretend, cli.disc)
            .context("Could not write volumes")?;
        for volume in volumes {
            match &volume.output {
                Some(path) => eprintln!(
                    "{}: {} files, {} -> {}",
                    volume.name,
                    volume.files,
                    format_size(volume.data_size),
                    path.display()
                ),
                None => eprintln!(
                    "{}: {} files, {} (pretend)",
                    volume.name,
                    volume.files,
                    format_size(volume.data_size)
                ),
            }
        }
    }

    Ok(())
}
