//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory where delivered exports are written.
    pub exports_dir: PathBuf,

    /// Export engine parameters.
    pub export: ExportDefaults,

    /// Recent-clips archive settings.
    pub archive: ArchiveConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Which execution path the orchestrator may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PathPolicy {
    /// Real-time capture when supported, transcoding as fallback.
    #[default]
    Auto,
    /// Real-time capture only; no fallback.
    Capture,
    /// Deterministic transcoding only.
    Transcode,
}

/// Export engine parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportDefaults {
    /// Frame rate of the captured video stream.
    pub capture_fps: u32,

    /// Capture surface height cap; larger sources are downscaled.
    pub max_capture_height: u32,

    /// Capture stops once playback reaches `trim_end - stop_tolerance_secs`.
    pub stop_tolerance_secs: f64,

    /// Extra time past the estimated duration before the capture is forced to stop.
    pub safety_margin_secs: f64,

    /// How long to wait for the recorder to finalize its container.
    pub recorder_finalize_timeout_secs: f64,

    /// Interval between progress reports.
    pub progress_interval_ms: u64,

    /// Video bitrate in kbps.
    pub video_bitrate_kbps: u32,

    /// Audio bitrate in kbps.
    pub audio_bitrate_kbps: u32,

    /// Gain applied to the source's own audio track.
    pub video_volume: f64,

    /// Execution path selection.
    pub path_policy: PathPolicy,
}

/// Recent-clips archive settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Whether successful exports archive their source clip.
    pub enabled: bool,

    /// Archive root directory.
    pub dir: PathBuf,

    /// Number of most-recent clips kept.
    pub capacity: usize,

    /// Sources larger than this are not archived.
    pub max_entry_bytes: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "rampcut=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            exports_dir: data_dir().join("exports"),
            export: ExportDefaults::default(),
            archive: ArchiveConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ExportDefaults {
    fn default() -> Self {
        Self {
            capture_fps: 30,
            max_capture_height: 1080,
            stop_tolerance_secs: 0.01,
            safety_margin_secs: 2.0,
            recorder_finalize_timeout_secs: 10.0,
            progress_interval_ms: 250,
            video_bitrate_kbps: 8000,
            audio_bitrate_kbps: 192,
            video_volume: 1.0,
            path_policy: PathPolicy::Auto,
        }
    }
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: data_dir().join("recent"),
            capacity: 5,
            max_entry_bytes: 50 * 1024 * 1024,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("rampcut").join("config.json")
}

/// Base data directory for exports and the archive.
fn data_dir() -> PathBuf {
    let base = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local").join("share")
        });
    base.join("rampcut")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_capture_contract() {
        let config = ExportDefaults::default();
        assert_eq!(config.capture_fps, 30);
        assert_eq!(config.max_capture_height, 1080);
        assert!((config.stop_tolerance_secs - 0.01).abs() < 1e-12);
        assert!((config.safety_margin_secs - 2.0).abs() < 1e-12);
        assert_eq!(config.path_policy, PathPolicy::Auto);
    }

    #[test]
    fn partial_config_fills_missing_fields() {
        let json = r#"{
            "exports_dir": "/tmp/out",
            "export": { "capture_fps": 24, "path_policy": "transcode" },
            "archive": { "capacity": 3 },
            "logging": { "level": "debug", "json": false, "file": null }
        }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.export.capture_fps, 24);
        assert_eq!(config.export.path_policy, PathPolicy::Transcode);
        assert_eq!(config.export.max_capture_height, 1080);
        assert_eq!(config.archive.capacity, 3);
        assert!(config.archive.enabled);
    }
}
