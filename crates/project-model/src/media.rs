//! Source media and overlaid audio.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::timeline::ModelError;

/// Probed description of the clip being exported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceMedia {
    pub path: PathBuf,
    pub duration_secs: f64,
    pub width: u32,
    pub height: u32,
    /// Whether the source carries an audio stream.
    pub has_audio: bool,
}

/// An audio track mixed over the export.
///
/// When the master timeline is at `t`, the overlay is read at `t - offset_secs`.
/// A negative offset delays the overlay's start relative to the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioOverlay {
    /// Decodable audio file.
    pub path: PathBuf,
    /// Duration of the decoded buffer.
    pub duration_secs: f64,
    pub offset_secs: f64,
    /// Gain in `[0, 1]`.
    pub volume: f64,
}

impl AudioOverlay {
    pub fn new(path: impl Into<PathBuf>, duration_secs: f64, offset_secs: f64, volume: f64) -> Self {
        Self {
            path: path.into(),
            duration_secs,
            offset_secs,
            volume,
        }
    }

    /// Reject unusable overlays and clamp the gain into `[0, 1]`.
    pub fn normalized(mut self) -> Result<Self, ModelError> {
        if !self.duration_secs.is_finite() || self.duration_secs <= 0.0 {
            return Err(ModelError::InvalidOverlay {
                reason: format!("buffer duration {} is not positive", self.duration_secs),
            });
        }
        if !self.offset_secs.is_finite() {
            return Err(ModelError::InvalidOverlay {
                reason: "offset must be finite".to_string(),
            });
        }
        self.volume = clamp_gain(self.volume);
        Ok(self)
    }
}

/// Clamp a gain into `[0, 1]`; NaN becomes silence.
pub fn clamp_gain(volume: f64) -> f64 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_normalization_clamps_volume() {
        let overlay = AudioOverlay::new("music.mp3", 30.0, -1.5, 1.7)
            .normalized()
            .unwrap();
        assert_eq!(overlay.volume, 1.0);
        assert_eq!(overlay.offset_secs, -1.5);
    }

    #[test]
    fn overlay_without_duration_is_rejected() {
        assert!(AudioOverlay::new("music.mp3", 0.0, 0.0, 0.5)
            .normalized()
            .is_err());
        assert!(AudioOverlay::new("music.mp3", 3.0, f64::NAN, 0.5)
            .normalized()
            .is_err());
    }

    #[test]
    fn gain_clamp_handles_nan() {
        assert_eq!(clamp_gain(f64::NAN), 0.0);
        assert_eq!(clamp_gain(-0.2), 0.0);
        assert_eq!(clamp_gain(0.4), 0.4);
    }
}
