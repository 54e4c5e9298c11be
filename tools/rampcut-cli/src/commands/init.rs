//! Write a starter edit session.

use std::path::PathBuf;

use anyhow::bail;
use rampcut_project_model::EditSession;

pub fn run(source: PathBuf, output: PathBuf) -> anyhow::Result<()> {
    if output.exists() {
        bail!("{} already exists", output.display());
    }

    let session = EditSession::template(source);
    session
        .save(&output)
        .map_err(|e| anyhow::anyhow!("Failed to write session: {e}"))?;

    println!("Edit session written to {}", output.display());
    println!("  Source: {}", session.source.display());
    if let Some(trim) = session.trim {
        println!("  Trim: {:.1}s - {:.1}s", trim.start, trim.end);
    }
    for effect in &session.effects {
        println!(
            "  Ramp '{}': {:.1}s - {:.1}s at x{}",
            effect.id, effect.start, effect.end, effect.factor
        );
    }
    println!();
    println!("Edit the file, then run: rampcut export --session {}", output.display());

    Ok(())
}
