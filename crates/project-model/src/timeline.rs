//! Trim range, speed effects, and the segments derived from them.

use serde::{Deserialize, Serialize};

/// Slack allowed when comparing a trim end against a probed duration.
pub const DURATION_TOLERANCE_SECS: f64 = 1e-3;

/// The user's trim selection on the source timeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrimRange {
    pub start: f64,
    pub end: f64,
}

/// A piecewise-constant speed change over `[start, end]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedEffect {
    pub id: String,
    pub start: f64,
    pub end: f64,
    /// `1.0` is unmodified speed, `< 1.0` slow motion, `> 1.0` fast motion.
    pub factor: f64,
}

/// A contiguous piece of the trimmed timeline played at one factor.
///
/// Segments are derived per export and never persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub factor: f64,
}

/// Errors raised when model values violate their invariants.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("trim range [{start}, {end}] is invalid: {reason}")]
    InvalidTrim { start: f64, end: f64, reason: String },

    #[error("speed effect '{id}' has invalid factor {factor}")]
    InvalidFactor { id: String, factor: f64 },

    #[error("speed effect '{id}' has non-finite bounds")]
    InvalidEffectBounds { id: String },

    #[error("audio overlay is invalid: {reason}")]
    InvalidOverlay { reason: String },
}

impl TrimRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Check `0 <= start < end <= source_duration`.
    pub fn validate(&self, source_duration: f64) -> Result<(), ModelError> {
        let invalid = |reason: &str| ModelError::InvalidTrim {
            start: self.start,
            end: self.end,
            reason: reason.to_string(),
        };

        if !self.start.is_finite() || !self.end.is_finite() {
            return Err(invalid("bounds must be finite"));
        }
        if self.start < 0.0 {
            return Err(invalid("start is negative"));
        }
        if self.start >= self.end {
            return Err(invalid("start must be before end"));
        }
        if source_duration.is_finite() && self.end > source_duration + DURATION_TOLERANCE_SECS {
            return Err(invalid(&format!(
                "end exceeds source duration {source_duration:.3}s"
            )));
        }
        Ok(())
    }

    /// Clamp an interval into the trim range; `None` if nothing remains.
    pub fn clamp_interval(&self, start: f64, end: f64) -> Option<(f64, f64)> {
        let s = start.max(self.start);
        let e = end.min(self.end);
        (e > s).then_some((s, e))
    }
}

impl SpeedEffect {
    pub fn new(id: impl Into<String>, start: f64, end: f64, factor: f64) -> Self {
        Self {
            id: id.into(),
            start,
            end,
            factor,
        }
    }

    /// Factors must be finite and strictly positive; bounds must be finite.
    pub fn validate(&self) -> Result<(), ModelError> {
        if !self.factor.is_finite() || self.factor <= 0.0 {
            return Err(ModelError::InvalidFactor {
                id: self.id.clone(),
                factor: self.factor,
            });
        }
        if !self.start.is_finite() || !self.end.is_finite() {
            return Err(ModelError::InvalidEffectBounds {
                id: self.id.clone(),
            });
        }
        Ok(())
    }
}

impl Segment {
    pub fn new(start: f64, end: f64, factor: f64) -> Self {
        Self { start, end, factor }
    }

    /// Length on the source timeline.
    pub fn source_duration(&self) -> f64 {
        self.end - self.start
    }

    /// Length after the speed change.
    pub fn output_duration(&self) -> f64 {
        self.source_duration() / self.factor
    }

    pub fn is_unity(&self) -> bool {
        self.factor == 1.0
    }

    /// Whether `t` falls in `[start, end)`.
    pub fn contains(&self, t: f64) -> bool {
        t >= self.start && t < self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_validation() {
        assert!(TrimRange::new(2.0, 7.0).validate(10.0).is_ok());
        assert!(TrimRange::new(0.0, 10.0005).validate(10.0).is_ok());
        assert!(TrimRange::new(5.0, 5.0).validate(10.0).is_err());
        assert!(TrimRange::new(-1.0, 5.0).validate(10.0).is_err());
        assert!(TrimRange::new(0.0, 11.0).validate(10.0).is_err());
        assert!(TrimRange::new(0.0, f64::NAN).validate(10.0).is_err());
    }

    #[test]
    fn test_clamp_interval() {
        let trim = TrimRange::new(2.0, 8.0);
        assert_eq!(trim.clamp_interval(0.0, 4.0), Some((2.0, 4.0)));
        assert_eq!(trim.clamp_interval(7.0, 12.0), Some((7.0, 8.0)));
        assert_eq!(trim.clamp_interval(8.0, 12.0), None);
        assert_eq!(trim.clamp_interval(0.0, 1.0), None);
    }

    #[test]
    fn test_effect_validation() {
        assert!(SpeedEffect::new("a", 1.0, 2.0, 0.5).validate().is_ok());
        assert!(SpeedEffect::new("b", 1.0, 2.0, 0.0).validate().is_err());
        assert!(SpeedEffect::new("c", 1.0, 2.0, -2.0).validate().is_err());
        assert!(SpeedEffect::new("d", 1.0, 2.0, f64::INFINITY)
            .validate()
            .is_err());
    }

    #[test]
    fn test_segment_durations() {
        let seg = Segment::new(4.0, 6.0, 0.5);
        assert!((seg.source_duration() - 2.0).abs() < 1e-12);
        assert!((seg.output_duration() - 4.0).abs() < 1e-12);
        assert!(seg.contains(4.0));
        assert!(!seg.contains(6.0));
        assert!(!seg.is_unity());
    }
}
