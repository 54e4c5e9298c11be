//! Execution path contract.
//!
//! The capture path and the transcoding path both implement
//! [`ExportBackend`]; the orchestrator only talks to this trait.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use rampcut_common::RampcutResult;
use serde::{Deserialize, Serialize};

use crate::job::ExportJob;

/// Which execution path produced (or will produce) an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportPathKind {
    /// Real-time playback capture.
    Capture,
    /// Offline batch transcode.
    Transcode,
}

impl ExportPathKind {
    /// Container extension for this path's output.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Capture => "mkv",
            Self::Transcode => "mp4",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Capture => "capture",
            Self::Transcode => "transcode",
        }
    }
}

/// Progress update emitted while a path runs.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportProgress {
    /// Completion in `[0.0, 1.0]`.
    pub ratio: f64,
    /// Short human-readable stage description.
    pub stage_label: String,
}

impl ExportProgress {
    pub fn new(ratio: f64, stage_label: impl Into<String>) -> Self {
        Self {
            ratio: ratio.clamp(0.0, 1.0),
            stage_label: stage_label.into(),
        }
    }
}

/// Progress callback type.
pub type ProgressCallback = Arc<dyn Fn(ExportProgress) + Send + Sync>;

/// Diagnostic log line callback type.
pub type LogCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// A finished output file.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportArtifact {
    pub path: PathBuf,
    pub kind: ExportPathKind,
    /// Set when the capture was stopped by the safety timer rather than
    /// by reaching the trim end.
    pub truncated: bool,
}

/// An execution path for export jobs.
#[async_trait]
pub trait ExportBackend: Send + Sync {
    /// Backend name.
    fn name(&self) -> &str;

    /// Which path this backend implements.
    fn kind(&self) -> ExportPathKind;

    /// Whether this backend can run on the current system.
    async fn is_supported(&self) -> bool;

    /// Execute the job, writing the output inside `work_dir`.
    ///
    /// On error no partial output is left behind.
    async fn render(
        &self,
        job: &ExportJob,
        work_dir: &Path,
        progress: ProgressCallback,
        log: LogCallback,
    ) -> RampcutResult<ExportArtifact>;
}
