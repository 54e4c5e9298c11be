//! Delivery of finished artifacts to the exports directory.

use std::path::{Path, PathBuf};

use rampcut_common::{RampcutError, RampcutResult};
use rampcut_processing_core::ExportArtifact;

/// Copies artifacts out of the per-export workspace.
#[derive(Debug, Clone)]
pub struct DeliverySink {
    exports_dir: PathBuf,
}

impl DeliverySink {
    pub fn new(exports_dir: impl Into<PathBuf>) -> Self {
        Self {
            exports_dir: exports_dir.into(),
        }
    }

    pub fn exports_dir(&self) -> &Path {
        &self.exports_dir
    }

    /// Deliver `artifact` as `<source-stem>-<timestamp>.<ext>`.
    pub async fn deliver(&self, artifact: &ExportArtifact, source: &Path) -> RampcutResult<PathBuf> {
        tokio::fs::create_dir_all(&self.exports_dir)
            .await
            .map_err(|e| {
                RampcutError::delivery(format!(
                    "Cannot create {}: {e}",
                    self.exports_dir.display()
                ))
            })?;

        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "export".to_string());
        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        let dest = unique_path(
            &self.exports_dir,
            &format!("{stem}-{stamp}"),
            artifact.kind.extension(),
        );

        tokio::fs::copy(&artifact.path, &dest).await.map_err(|e| {
            RampcutError::delivery(format!(
                "Cannot copy {} to {}: {e}",
                artifact.path.display(),
                dest.display()
            ))
        })?;

        tracing::info!(
            path = %dest.display(),
            kind = artifact.kind.label(),
            truncated = artifact.truncated,
            "Export delivered"
        );
        Ok(dest)
    }
}

fn unique_path(dir: &Path, base: &str, ext: &str) -> PathBuf {
    let first = dir.join(format!("{base}.{ext}"));
    if !first.exists() {
        return first;
    }
    (1u32..)
        .map(|n| dir.join(format!("{base}-{n}.{ext}")))
        .find(|p| !p.exists())
        .unwrap_or(first)
}
