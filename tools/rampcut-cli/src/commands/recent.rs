//! List the recent-clips archive.

use rampcut_common::AppConfig;
use rampcut_export::{ClipArchive, DirectoryArchive};

pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let archive = DirectoryArchive::from_config(&config.archive);
    let entries = archive.list().await?;

    println!(
        "Recent clips ({}/{}) in {}",
        entries.len(),
        config.archive.capacity,
        archive.root().display()
    );
    if entries.is_empty() {
        println!("  (none)");
        return Ok(());
    }

    for entry in &entries {
        println!(
            "  {}  {}  {:.1} MiB  {}",
            entry.id,
            entry.source_name,
            entry.size_bytes as f64 / (1024.0 * 1024.0),
            entry.archived_at
        );
        println!("      copy: {}", entry.full_copy.display());
        if let Some(thumb) = &entry.thumbnail {
            println!("      thumbnail: {}", thumb.display());
        }
    }
    Ok(())
}
