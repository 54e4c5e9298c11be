//! Lazily loaded transcoding engine.
//!
//! The engine is an explicitly owned handle: it resolves the `ffmpeg` and
//! `ffprobe` binaries on first use, exactly once, and refuses new work
//! after [`EngineHandle::shutdown`].

use std::path::PathBuf;
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};

use rampcut_common::{RampcutError, RampcutResult};
use tokio::sync::OnceCell;

/// Resolved engine binaries.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineBinaries {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
    /// First line of `ffmpeg -version`.
    pub version: String,
}

#[derive(Debug)]
pub struct EngineHandle {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    loaded: OnceCell<EngineBinaries>,
    closed: AtomicBool,
}

impl Default for EngineHandle {
    fn default() -> Self {
        Self::new("ffmpeg", "ffprobe")
    }
}

impl EngineHandle {
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
            loaded: OnceCell::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Resolve the binaries, loading them on first call.
    pub async fn load(&self) -> RampcutResult<&EngineBinaries> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(RampcutError::unsupported("Transcoding engine has been shut down"));
        }

        self.loaded
            .get_or_try_init(|| async {
                let ffmpeg = self.ffmpeg.clone();
                let ffprobe = self.ffprobe.clone();
                let binaries = tokio::task::spawn_blocking(move || resolve(ffmpeg, ffprobe))
                    .await
                    .map_err(|e| RampcutError::unsupported(format!("Engine load panicked: {e}")))??;
                tracing::info!(
                    ffmpeg = %binaries.ffmpeg.display(),
                    version = %binaries.version,
                    "Transcoding engine loaded"
                );
                Ok(binaries)
            })
            .await
    }

    /// Whether the engine is usable, loading it if needed.
    pub async fn is_available(&self) -> bool {
        self.load().await.is_ok()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.initialized()
    }

    /// Refuse further work. Jobs already running finish normally.
    pub fn shutdown(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            tracing::debug!("Transcoding engine shut down");
        }
    }
}

fn resolve(ffmpeg: PathBuf, ffprobe: PathBuf) -> RampcutResult<EngineBinaries> {
    let output = Command::new(&ffmpeg)
        .arg("-version")
        .output()
        .map_err(|e| {
            RampcutError::unsupported(format!("ffmpeg not found ({}): {e}", ffmpeg.display()))
        })?;
    if !output.status.success() {
        return Err(RampcutError::unsupported(format!(
            "ffmpeg -version failed with status {}",
            output.status
        )));
    }
    let version = String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .unwrap_or_default()
        .trim()
        .to_string();

    if !command_exists(&ffprobe) {
        return Err(RampcutError::unsupported(format!(
            "ffprobe not found ({})",
            ffprobe.display()
        )));
    }

    Ok(EngineBinaries {
        ffmpeg,
        ffprobe,
        version,
    })
}

fn command_exists(binary: &std::path::Path) -> bool {
    Command::new(binary)
        .arg("-version")
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_binary_is_unsupported() {
        let engine = EngineHandle::new("/nonexistent/rampcut-ffmpeg", "/nonexistent/ffprobe");
        let err = engine.load().await.unwrap_err();
        assert!(matches!(err, RampcutError::Unsupported { .. }));
        assert!(!engine.is_loaded());
    }

    #[tokio::test]
    async fn shutdown_refuses_new_work() {
        let engine = EngineHandle::default();
        engine.shutdown();
        let err = engine.load().await.unwrap_err();
        assert!(err.to_string().contains("shut down"));
        assert!(!engine.is_available().await);
    }
}
