//! Export planning.
//!
//! Validates user input and derives everything an execution path needs:
//! the segment list, the overlay placement, and the estimated real-time
//! runtime used for progress.

use rampcut_common::{RampcutError, RampcutResult};
use rampcut_project_model::{
    clamp_gain, AudioOverlay, Segment, SourceMedia, SpeedEffect, TrimRange,
};

use crate::backend::ExportPathKind;
use crate::overlay::OverlayPlacement;
use crate::segments::{build_segments, estimated_duration};
use crate::tempo::decompose;

/// What the user asked to export.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub source: SourceMedia,
    pub trim: TrimRange,
    pub effects: Vec<SpeedEffect>,
    pub overlay: Option<AudioOverlay>,
    /// Gain on the source's own audio.
    pub video_volume: f64,
}

/// A validated, fully derived export.
#[derive(Debug, Clone)]
pub struct ExportJob {
    pub source: SourceMedia,
    pub trim: TrimRange,
    pub segments: Vec<Segment>,
    pub overlay: Option<AudioOverlay>,
    /// Where the overlay lands; `None` if there is no overlay or it is
    /// never audible within the trim.
    pub overlay_placement: Option<OverlayPlacement>,
    pub video_volume: f64,
    /// `Σ (end - start) / factor`. Only used for progress.
    pub estimated_duration_secs: f64,
    pub chosen_path: ExportPathKind,
}

impl ExportJob {
    /// Tempo chain for each segment, in order.
    pub fn tempo_chains(&self) -> Vec<Vec<f64>> {
        self.segments.iter().map(|seg| decompose(seg.factor)).collect()
    }

    /// Same job routed to another path.
    pub fn with_path(&self, path: ExportPathKind) -> Self {
        Self {
            chosen_path: path,
            ..self.clone()
        }
    }
}

/// Validate `request` and derive the export job.
///
/// Input errors are returned before any path starts.
pub fn plan_export(request: ExportRequest, path: ExportPathKind) -> RampcutResult<ExportJob> {
    let ExportRequest {
        source,
        trim,
        effects,
        overlay,
        video_volume,
    } = request;

    trim.validate(source.duration_secs)
        .map_err(|e| RampcutError::invalid_input(e.to_string()))?;
    for effect in &effects {
        effect
            .validate()
            .map_err(|e| RampcutError::invalid_input(e.to_string()))?;
    }
    let overlay = overlay
        .map(AudioOverlay::normalized)
        .transpose()
        .map_err(|e| RampcutError::invalid_input(e.to_string()))?;

    let segments = build_segments(trim, &effects);
    if segments.is_empty() {
        return Err(RampcutError::invalid_input("Export has no segments"));
    }

    let estimated_duration_secs = estimated_duration(&segments);
    let overlay_placement = overlay
        .as_ref()
        .and_then(|o| OverlayPlacement::compute(o, &segments, trim.start));

    tracing::info!(
        segments = segments.len(),
        estimated_secs = estimated_duration_secs,
        overlay = overlay.is_some(),
        overlay_audible = overlay_placement.is_some(),
        path = path.label(),
        "Export plan built"
    );

    Ok(ExportJob {
        source,
        trim,
        segments,
        overlay,
        overlay_placement,
        video_volume: clamp_gain(video_volume),
        estimated_duration_secs,
        chosen_path: path,
    })
}
