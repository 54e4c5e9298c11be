//! Audio overlay alignment.
//!
//! When the master timeline is at `t`, the overlay is read at
//! `t - offset`. These helpers decide where to start reading, whether the
//! overlay is audible, and how long to wait before it starts.

use rampcut_project_model::{AudioOverlay, Segment};

use crate::segments::output_time_at;

/// Read position in the overlay buffer for timeline position `timeline_t`.
pub fn offset_in_overlay(timeline_t: f64, offset: f64) -> f64 {
    timeline_t - offset
}

/// True iff `0 <= offset_in_overlay(timeline_t, offset) < buffer_duration`.
pub fn is_audible(timeline_t: f64, offset: f64, buffer_duration: f64) -> bool {
    let pos = offset_in_overlay(timeline_t, offset);
    pos >= 0.0 && pos < buffer_duration
}

/// How overlay playback begins when the timeline starts at some `t0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OverlayStart {
    /// Start reading at `position` right away.
    Immediate { position: f64 },
    /// Stay silent for `delay` timeline seconds, then read from the start.
    Delayed { delay: f64 },
    /// The overlay has already ended for this position.
    Finished,
}

/// Decide how to start the overlay when playback starts at `t0`.
pub fn schedule_start(t0: f64, offset: f64, buffer_duration: f64) -> OverlayStart {
    let pos = offset_in_overlay(t0, offset);
    if pos < 0.0 {
        OverlayStart::Delayed { delay: -pos }
    } else if pos < buffer_duration {
        OverlayStart::Immediate { position: pos }
    } else {
        OverlayStart::Finished
    }
}

/// Where an overlay lands in the exported output.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayPlacement {
    /// Seconds into the overlay buffer at which reading starts.
    pub read_from_secs: f64,
    /// Silence before the overlay starts, measured on the output
    /// (audio) clock rather than the source timeline.
    pub output_delay_secs: f64,
    /// Gain in `[0, 1]`.
    pub volume: f64,
}

impl OverlayPlacement {
    /// Place `overlay` for an export whose timeline starts at `t0` and
    /// runs over `segments`. `None` when the overlay is never heard.
    pub fn compute(overlay: &AudioOverlay, segments: &[Segment], t0: f64) -> Option<Self> {
        let end = segments.last().map(|seg| seg.end)?;

        match schedule_start(t0, overlay.offset_secs, overlay.duration_secs) {
            OverlayStart::Immediate { position } => Some(Self {
                read_from_secs: position,
                output_delay_secs: 0.0,
                volume: overlay.volume,
            }),
            OverlayStart::Delayed { delay } => {
                let starts_at = t0 + delay;
                if starts_at >= end {
                    return None;
                }
                Some(Self {
                    read_from_secs: 0.0,
                    output_delay_secs: output_time_at(segments, starts_at),
                    volume: overlay.volume,
                })
            }
            OverlayStart::Finished => None,
        }
    }
}
