//! Source probing via `ffprobe`.

use std::path::{Path, PathBuf};

use rampcut_common::{RampcutError, RampcutResult};
use rampcut_project_model::SourceMedia;
use serde::Deserialize;

use crate::engine::EngineHandle;

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Probe a video source: duration, size, and whether it has audio.
pub async fn probe_source(engine: &EngineHandle, path: &Path) -> RampcutResult<SourceMedia> {
    let json = run_ffprobe(engine, path).await?;
    parse_source(path, &json)
}

/// Probe the duration of an audio file.
pub async fn probe_audio_duration(engine: &EngineHandle, path: &Path) -> RampcutResult<f64> {
    let json = run_ffprobe(engine, path).await?;
    parse_audio_duration(&json)
}

async fn run_ffprobe(engine: &EngineHandle, path: &Path) -> RampcutResult<String> {
    if !path.exists() {
        return Err(RampcutError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let ffprobe = engine.load().await?.ffprobe.clone();

    let output = tokio::process::Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-show_entries",
            "stream=codec_type,width,height,duration:format=duration",
            "-of",
            "json",
        ])
        .arg(path)
        .output()
        .await?;

    if !output.status.success() {
        return Err(RampcutError::invalid_input(format!(
            "Cannot read media {}: {}",
            path.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn parse_duration(raw: Option<&String>) -> Option<f64> {
    raw.and_then(|s| s.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
}

/// Parse `ffprobe -of json` output for a video source.
pub fn parse_source(path: &Path, json: &str) -> RampcutResult<SourceMedia> {
    let probe: ProbeOutput = serde_json::from_str(json)?;

    let video = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| {
            RampcutError::invalid_input(format!("{} has no video stream", path.display()))
        })?;
    let (width, height) = match (video.width, video.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => {
            return Err(RampcutError::invalid_input(format!(
                "{} has no usable video dimensions",
                path.display()
            )))
        }
    };

    let duration_secs = probe
        .format
        .as_ref()
        .and_then(|f| parse_duration(f.duration.as_ref()))
        .or_else(|| parse_duration(video.duration.as_ref()))
        .ok_or_else(|| {
            RampcutError::invalid_input(format!("{} has unknown duration", path.display()))
        })?;

    let has_audio = probe
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    Ok(SourceMedia {
        path: PathBuf::from(path),
        duration_secs,
        width,
        height,
        has_audio,
    })
}

/// Parse `ffprobe -of json` output for an audio file.
pub fn parse_audio_duration(json: &str) -> RampcutResult<f64> {
    let probe: ProbeOutput = serde_json::from_str(json)?;
    let audio = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("audio"))
        .ok_or_else(|| RampcutError::invalid_input("Overlay has no audio stream"))?;

    probe
        .format
        .as_ref()
        .and_then(|f| parse_duration(f.duration.as_ref()))
        .or_else(|| parse_duration(audio.duration.as_ref()))
        .ok_or_else(|| RampcutError::invalid_input("Overlay has unknown duration"))
}
