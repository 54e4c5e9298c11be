//! Saved edit sessions.
//!
//! An edit session is the persisted form of what the user edited: the
//! source clip, the trim selection, speed ramps, and the overlaid music
//! track. The CLI exports from one (`edit.json`).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::timeline::{SpeedEffect, TrimRange};

/// Current edit session schema version.
pub const SESSION_VERSION: &str = "1.0";

/// Top-level edit file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditSession {
    /// Schema version.
    pub version: String,

    /// Source clip, absolute or relative to the session file.
    pub source: PathBuf,

    /// Trim selection. `None` exports the whole clip.
    #[serde(default)]
    pub trim: Option<TrimRange>,

    /// Speed ramps, in any order.
    #[serde(default)]
    pub effects: Vec<SpeedEffect>,

    /// Overlaid music track.
    #[serde(default)]
    pub overlay: Option<OverlayRef>,

    /// Gain applied to the source's own audio.
    #[serde(default = "default_volume")]
    pub video_volume: f64,

    /// Last modified timestamp (RFC 3339).
    #[serde(default)]
    pub modified_at: String,
}

/// Reference to an overlay audio file; its duration is probed at export time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayRef {
    pub path: PathBuf,
    #[serde(default)]
    pub offset_secs: f64,
    #[serde(default = "default_volume")]
    pub volume: f64,
}

fn default_volume() -> f64 {
    1.0
}

impl EditSession {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            version: SESSION_VERSION.to_string(),
            source: source.into(),
            trim: None,
            effects: Vec::new(),
            overlay: None,
            video_volume: 1.0,
            modified_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Starter session written by `rampcut init`.
    pub fn template(source: impl Into<PathBuf>) -> Self {
        let mut session = Self::new(source);
        session.trim = Some(TrimRange::new(0.0, 10.0));
        session.effects = vec![SpeedEffect::new("slowmo-1", 4.0, 6.0, 0.5)];
        session
    }

    /// Load a session from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| SessionError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let session: Self = serde_json::from_str(&json).map_err(|e| SessionError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        if session.version != SESSION_VERSION {
            return Err(SessionError::Invalid {
                message: format!("unsupported session version '{}'", session.version),
            });
        }
        Ok(session)
    }

    /// Save the session as pretty JSON, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SessionError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| SessionError::IoError {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| SessionError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        std::fs::write(path, json).map_err(|e| SessionError::IoError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Rewrite relative media paths against `base` (the session's directory).
    pub fn resolve_paths(mut self, base: &Path) -> Self {
        if self.source.is_relative() {
            self.source = base.join(&self.source);
        }
        if let Some(overlay) = self.overlay.as_mut() {
            if overlay.path.is_relative() {
                overlay.path = base.join(&overlay.path);
            }
        }
        self
    }

    /// Report referenced media files that do not exist.
    pub fn validate_sources(&self) -> Vec<String> {
        let mut errors = vec![];
        if !self.source.exists() {
            errors.push(format!("Source missing: {}", self.source.display()));
        }
        if let Some(overlay) = &self.overlay {
            if !overlay.path.exists() {
                errors.push(format!("Overlay missing: {}", overlay.path.display()));
            }
        }
        errors
    }
}

/// Errors from loading or saving a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid session: {message}")]
    Invalid { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_create_and_load() {
        let dir = std::env::temp_dir().join("rampcut_test_session");
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("edit.json");

        let session = EditSession::template("clip.mp4");
        session.save(&path).unwrap();

        let loaded = EditSession::load(&path).unwrap();
        assert_eq!(loaded, session);
        assert_eq!(loaded.effects.len(), 1);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_session_defaults_for_minimal_file() {
        let json = r#"{"version": "1.0", "source": "clip.mp4"}"#;
        let session: EditSession = serde_json::from_str(json).unwrap();
        assert!(session.trim.is_none());
        assert!(session.effects.is_empty());
        assert_eq!(session.video_volume, 1.0);
    }

    #[test]
    fn test_overlay_volume_defaults_to_full() {
        let json = r#"{"version": "1.0", "source": "a.mp4", "overlay": {"path": "m.mp3"}}"#;
        let session: EditSession = serde_json::from_str(json).unwrap();
        let overlay = session.overlay.unwrap();
        assert_eq!(overlay.volume, 1.0);
        assert_eq!(overlay.offset_secs, 0.0);
    }

    #[test]
    fn test_unknown_version_is_rejected() {
        let dir = std::env::temp_dir().join("rampcut_test_session_version");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("edit.json");
        std::fs::write(&path, r#"{"version": "9.9", "source": "a.mp4"}"#).unwrap();

        assert!(matches!(
            EditSession::load(&path),
            Err(SessionError::Invalid { .. })
        ));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_resolve_relative_paths() {
        let mut session = EditSession::new("clip.mp4");
        session.overlay = Some(OverlayRef {
            path: PathBuf::from("/abs/music.mp3"),
            offset_secs: 0.0,
            volume: 1.0,
        });
        let resolved = session.resolve_paths(Path::new("/work"));
        assert_eq!(resolved.source, PathBuf::from("/work/clip.mp4"));
        assert_eq!(
            resolved.overlay.unwrap().path,
            PathBuf::from("/abs/music.mp3")
        );
    }

    #[test]
    fn test_validate_sources_reports_missing() {
        let session = EditSession::new("/nonexistent/rampcut/clip.mp4");
        let errors = session.validate_sources();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("Source missing"));
    }
}
