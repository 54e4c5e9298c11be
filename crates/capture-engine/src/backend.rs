//! Capture path as an [`ExportBackend`].

use std::path::Path;

use async_trait::async_trait;
use rampcut_common::{RampcutError, RampcutResult};
use rampcut_processing_core::{
    ExportArtifact, ExportBackend, ExportJob, ExportPathKind, LogCallback, ProgressCallback,
};

use crate::driver::{run_capture, CaptureSettings};
use crate::graph::GraphSpec;
use crate::gst_graph::{missing_elements, GstPlaybackGraph};
use crate::launch::capture_dimensions;

/// Real-time capture backend built on GStreamer.
pub struct CaptureBackend {
    settings: CaptureSettings,
}

impl CaptureBackend {
    pub fn new(settings: CaptureSettings) -> Self {
        Self { settings }
    }

    /// Graph description for `job`, recording into `output`.
    pub fn graph_spec(&self, job: &ExportJob, output: &Path) -> GraphSpec {
        let (width, height) = capture_dimensions(
            job.source.width,
            job.source.height,
            self.settings.max_height,
        );
        GraphSpec {
            source: job.source.path.clone(),
            source_has_audio: job.source.has_audio,
            overlay: job
                .overlay_placement
                .as_ref()
                .and(job.overlay.as_ref())
                .map(|o| o.path.clone()),
            output: output.to_path_buf(),
            width,
            height,
            fps: self.settings.fps,
            video_bitrate_kbps: self.settings.video_bitrate_kbps,
            audio_bitrate_kbps: self.settings.audio_bitrate_kbps,
            video_volume: job.video_volume,
            overlay_volume: job
                .overlay_placement
                .as_ref()
                .map(|p| p.volume)
                .unwrap_or(0.0),
        }
    }
}

impl Default for CaptureBackend {
    fn default() -> Self {
        Self::new(CaptureSettings::default())
    }
}

/// Missing capture elements, or an error if GStreamer itself is unusable.
pub async fn capability_report() -> RampcutResult<Vec<&'static str>> {
    tokio::task::spawn_blocking(missing_elements)
        .await
        .map_err(|e| RampcutError::unsupported(format!("Capability probe panicked: {e}")))?
}

#[async_trait]
impl ExportBackend for CaptureBackend {
    fn name(&self) -> &str {
        "gstreamer-capture"
    }

    fn kind(&self) -> ExportPathKind {
        ExportPathKind::Capture
    }

    async fn is_supported(&self) -> bool {
        match capability_report().await {
            Ok(missing) if missing.is_empty() => true,
            Ok(missing) => {
                tracing::info!(?missing, "Capture path unavailable: missing GStreamer elements");
                false
            }
            Err(e) => {
                tracing::info!(error = %e, "Capture path unavailable");
                false
            }
        }
    }

    async fn render(
        &self,
        job: &ExportJob,
        work_dir: &Path,
        progress: ProgressCallback,
        log: LogCallback,
    ) -> RampcutResult<ExportArtifact> {
        let output = work_dir.join(format!("capture.{}", ExportPathKind::Capture.extension()));
        let spec = self.graph_spec(job, &output);
        tracing::info!(
            source = %spec.source.display(),
            width = spec.width,
            height = spec.height,
            fps = spec.fps,
            "Starting real-time capture"
        );

        let mut graph = GstPlaybackGraph::new(spec)?;
        let outcome = run_capture(&mut graph, job, &output, &self.settings, progress, log).await?;

        if !output.exists() {
            return Err(RampcutError::capture("Recorder produced no output file"));
        }

        Ok(ExportArtifact {
            path: output,
            kind: ExportPathKind::Capture,
            truncated: outcome.truncated,
        })
    }
}
