//! Deterministic transcoding path.
//!
//! The whole export runs as one ffmpeg batch job over the static filter
//! graph. Progress comes from `-progress pipe:1`; stderr lines are
//! forwarded to the diagnostic log as they arrive.

use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

use async_trait::async_trait;
use rampcut_common::config::ExportDefaults;
use rampcut_common::{RampcutError, RampcutResult};
use rampcut_processing_core::{
    ExportArtifact, ExportBackend, ExportJob, ExportPathKind, ExportProgress, LogCallback,
    ProgressCallback,
};

use crate::engine::EngineHandle;
use crate::filter_graph::{build_filter_graph, FilterGraph};

/// Encoder settings for the transcoding path.
#[derive(Debug, Clone)]
pub struct TranscodeSettings {
    pub video_bitrate_kbps: u32,
    pub audio_bitrate_kbps: u32,
}

impl Default for TranscodeSettings {
    fn default() -> Self {
        Self::from(&ExportDefaults::default())
    }
}

impl From<&ExportDefaults> for TranscodeSettings {
    fn from(defaults: &ExportDefaults) -> Self {
        Self {
            video_bitrate_kbps: defaults.video_bitrate_kbps,
            audio_bitrate_kbps: defaults.audio_bitrate_kbps,
        }
    }
}

/// Fully resolved ffmpeg invocation.
#[derive(Debug, Clone)]
pub struct TranscodePlan {
    pub graph: FilterGraph,
    pub args: Vec<String>,
    pub output: PathBuf,
    pub expected_duration_secs: f64,
}

/// Build the ffmpeg argument list for `job`, writing to `output`.
pub fn build_plan(job: &ExportJob, output: &Path, settings: &TranscodeSettings) -> TranscodePlan {
    let graph = build_filter_graph(job);

    let mut args: Vec<String> = vec![
        "-hide_banner".into(),
        "-nostdin".into(),
        "-y".into(),
        "-i".into(),
        job.source.path.to_string_lossy().into_owned(),
    ];
    if graph.uses_overlay {
        if let Some(overlay) = &job.overlay {
            args.push("-i".into());
            args.push(overlay.path.to_string_lossy().into_owned());
        }
    }

    args.push("-filter_complex".into());
    args.push(graph.filter.clone());
    args.push("-map".into());
    args.push(format!("[{}]", graph.video_label));
    if let Some(audio) = &graph.audio_label {
        args.push("-map".into());
        args.push(format!("[{audio}]"));
    }

    args.extend(codec_args(settings, graph.audio_label.is_some()));
    args.extend(
        [
            "-map_metadata",
            "-1",
            "-fflags",
            "+bitexact",
            "-flags:v",
            "+bitexact",
            "-progress",
            "pipe:1",
            "-nostats",
        ]
        .iter()
        .map(|s| s.to_string()),
    );
    args.push(output.to_string_lossy().into_owned());

    TranscodePlan {
        graph,
        args,
        output: output.to_path_buf(),
        expected_duration_secs: job.estimated_duration_secs,
    }
}

fn codec_args(settings: &TranscodeSettings, with_audio: bool) -> Vec<String> {
    let video_bitrate = format!("{}k", settings.video_bitrate_kbps.max(500));
    let mut args: Vec<String> = [
        "-c:v",
        "libx264",
        "-preset",
        "medium",
        "-profile:v",
        "high",
        "-pix_fmt",
        "yuv420p",
        "-b:v",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    args.push(video_bitrate);

    if with_audio {
        args.extend(["-c:a".to_string(), "aac".to_string(), "-b:a".to_string()]);
        args.push(format!("{}k", settings.audio_bitrate_kbps.max(64)));
        args.extend(["-flags:a".to_string(), "+bitexact".to_string()]);
    } else {
        args.push("-an".to_string());
    }

    args.extend(["-movflags".to_string(), "+faststart".to_string()]);
    args
}

/// Run a plan to completion. Blocking; call from a blocking task.
pub fn run_ffmpeg(
    ffmpeg: &Path,
    plan: &TranscodePlan,
    progress: &ProgressCallback,
    log: &LogCallback,
) -> RampcutResult<()> {
    tracing::debug!(args = ?plan.args, "Running ffmpeg");
    let mut child = Command::new(ffmpeg)
        .args(&plan.args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| RampcutError::transcode(format!("Failed to start ffmpeg: {e}")))?;

    tracing::info!(
        pid = child.id(),
        args_len = plan.args.len(),
        expected_secs = plan.expected_duration_secs,
        "ffmpeg process started"
    );

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| RampcutError::transcode("Failed to capture ffmpeg stdout"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| RampcutError::transcode("Failed to capture ffmpeg stderr"))?;

    // Drained on its own thread so ffmpeg never blocks on a full pipe.
    let stderr_log = Arc::clone(log);
    let stderr_task = std::thread::spawn(move || -> Vec<String> {
        let mut tail = Vec::new();
        for line in BufReader::new(stderr).lines().map_while(Result::ok) {
            let line = line.trim_end().to_string();
            if line.is_empty() {
                continue;
            }
            stderr_log(line.as_str());
            tail.push(line);
            if tail.len() > 20 {
                tail.remove(0);
            }
        }
        tail
    });

    let mut state = ProgressState::default();
    let mut reader = BufReader::new(stdout);
    let mut line = String::new();
    loop {
        line.clear();
        let bytes = reader
            .read_line(&mut line)
            .map_err(|e| RampcutError::transcode(format!("Failed reading ffmpeg progress: {e}")))?;
        if bytes == 0 {
            break;
        }
        if let Some((key, value)) = line.trim().split_once('=') {
            state.update(key, value);
            if key == "progress" {
                progress(progress_report(&state, plan.expected_duration_secs));
            }
        }
    }

    let status = child
        .wait()
        .map_err(|e| RampcutError::transcode(format!("Failed to wait on ffmpeg: {e}")))?;
    let stderr_tail = stderr_task
        .join()
        .unwrap_or_else(|_| vec!["<failed to join stderr reader>".to_string()]);

    if !status.success() {
        return Err(RampcutError::transcode(format!(
            "ffmpeg export failed (status {status}): {}",
            stderr_tail.join("\n")
        )));
    }

    progress(ExportProgress::new(1.0, "Transcode complete"));
    Ok(())
}

#[derive(Debug, Default)]
struct ProgressState {
    out_time_secs: f64,
    complete: bool,
}

impl ProgressState {
    fn update(&mut self, key: &str, value: &str) {
        match key {
            // ffmpeg reports microseconds under both names.
            "out_time_us" | "out_time_ms" => {
                if let Ok(us) = value.parse::<f64>() {
                    self.out_time_secs = us / 1_000_000.0;
                }
            }
            "progress" => {
                self.complete = value == "end";
            }
            _ => {}
        }
    }
}

fn progress_report(state: &ProgressState, expected_duration_secs: f64) -> ExportProgress {
    if state.complete {
        return ExportProgress::new(1.0, "Finalizing");
    }
    let ratio = if expected_duration_secs <= 0.0 {
        0.0
    } else {
        (state.out_time_secs / expected_duration_secs).clamp(0.0, 0.99)
    };
    ExportProgress::new(ratio, "Transcoding")
}

/// Transcoding path backend.
pub struct FfmpegBackend {
    engine: Arc<EngineHandle>,
    settings: TranscodeSettings,
}

impl FfmpegBackend {
    pub fn new(engine: Arc<EngineHandle>, settings: TranscodeSettings) -> Self {
        Self { engine, settings }
    }

    pub fn engine(&self) -> &Arc<EngineHandle> {
        &self.engine
    }

    pub fn settings(&self) -> &TranscodeSettings {
        &self.settings
    }
}

#[async_trait]
impl ExportBackend for FfmpegBackend {
    fn name(&self) -> &str {
        "ffmpeg-transcode"
    }

    fn kind(&self) -> ExportPathKind {
        ExportPathKind::Transcode
    }

    async fn is_supported(&self) -> bool {
        self.engine.is_available().await
    }

    async fn render(
        &self,
        job: &ExportJob,
        work_dir: &Path,
        progress: ProgressCallback,
        log: LogCallback,
    ) -> RampcutResult<ExportArtifact> {
        progress(ExportProgress::new(0.0, "Loading transcoder"));
        let ffmpeg = self.engine.load().await?.ffmpeg.clone();

        let output = work_dir.join(format!("transcode.{}", ExportPathKind::Transcode.extension()));
        let plan = build_plan(job, &output, &self.settings);
        tracing::info!(
            segments = job.segments.len(),
            overlay = plan.graph.uses_overlay,
            output = %output.display(),
            "Starting transcode"
        );

        let blocking_plan = plan.clone();
        let result = tokio::task::spawn_blocking(move || {
            run_ffmpeg(&ffmpeg, &blocking_plan, &progress, &log)
        })
        .await
        .map_err(|e| RampcutError::transcode(format!("Transcode task panicked: {e}")))?;

        if let Err(e) = result {
            if plan.output.exists() {
                let _ = std::fs::remove_file(&plan.output);
            }
            return Err(e);
        }

        if !plan.output.exists() {
            return Err(RampcutError::transcode("ffmpeg produced no output file"));
        }

        Ok(ExportArtifact {
            path: plan.output,
            kind: ExportPathKind::Transcode,
            truncated: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rampcut_processing_core::{plan_export, ExportRequest};
    use rampcut_project_model::{AudioOverlay, SourceMedia, SpeedEffect, TrimRange};

    fn job(has_audio: bool, overlay: Option<AudioOverlay>) -> ExportJob {
        plan_export(
            ExportRequest {
                source: SourceMedia {
                    path: "/clips/run.mp4".into(),
                    duration_secs: 20.0,
                    width: 1920,
                    height: 1080,
                    has_audio,
                },
                trim: TrimRange::new(0.0, 10.0),
                effects: vec![SpeedEffect::new("s", 4.0, 6.0, 0.5)],
                overlay,
                video_volume: 1.0,
            },
            ExportPathKind::Transcode,
        )
        .unwrap()
    }

    fn arg_after<'a>(args: &'a [String], flag: &str) -> Vec<&'a str> {
        args.windows(2)
            .filter(|w| w[0] == flag)
            .map(|w| w[1].as_str())
            .collect()
    }

    #[test]
    fn plan_maps_graph_outputs_and_streams_progress() {
        let plan = build_plan(
            &job(true, None),
            Path::new("/work/transcode.mp4"),
            &TranscodeSettings::default(),
        );
        assert_eq!(arg_after(&plan.args, "-i"), vec!["/clips/run.mp4"]);
        assert_eq!(arg_after(&plan.args, "-map"), vec!["[vconcat]", "[aconcat]"]);
        assert_eq!(arg_after(&plan.args, "-progress"), vec!["pipe:1"]);
        assert_eq!(arg_after(&plan.args, "-movflags"), vec!["+faststart"]);
        assert_eq!(arg_after(&plan.args, "-b:v"), vec!["8000k"]);
        assert_eq!(plan.args.last().map(String::as_str), Some("/work/transcode.mp4"));
        assert!((plan.expected_duration_secs - 12.0).abs() < 1e-12);
    }

    #[test]
    fn overlay_adds_second_input() {
        let plan = build_plan(
            &job(true, Some(AudioOverlay::new("/m/song.mp3", 60.0, 0.0, 1.0))),
            Path::new("/work/t.mp4"),
            &TranscodeSettings::default(),
        );
        assert_eq!(arg_after(&plan.args, "-i"), vec!["/clips/run.mp4", "/m/song.mp3"]);
        assert_eq!(arg_after(&plan.args, "-map"), vec!["[vconcat]", "[aout]"]);
    }

    #[test]
    fn video_only_output_drops_audio_codec() {
        let plan = build_plan(
            &job(false, None),
            Path::new("/work/t.mp4"),
            &TranscodeSettings::default(),
        );
        assert!(plan.args.iter().any(|a| a == "-an"));
        assert!(!plan.args.iter().any(|a| a == "-c:a"));
        assert_eq!(arg_after(&plan.args, "-map"), vec!["[vconcat]"]);
    }

    #[test]
    fn progress_state_parses_out_time() {
        let mut state = ProgressState::default();
        state.update("out_time_us", "6000000");
        state.update("progress", "continue");
        let report = progress_report(&state, 12.0);
        assert!((report.ratio - 0.5).abs() < 1e-12);
        assert_eq!(report.stage_label, "Transcoding");

        state.update("out_time_ms", "20000000");
        assert!((progress_report(&state, 12.0).ratio - 0.99).abs() < 1e-12);

        state.update("progress", "end");
        assert_eq!(progress_report(&state, 12.0).ratio, 1.0);
    }

    #[tokio::test]
    async fn render_fails_cleanly_without_engine() {
        let backend = FfmpegBackend::new(
            Arc::new(EngineHandle::new("/nonexistent/ffmpeg", "/nonexistent/ffprobe")),
            TranscodeSettings::default(),
        );
        assert!(!backend.is_supported().await);

        let dir = tempfile::tempdir().unwrap();
        let progress: ProgressCallback = Arc::new(|_: ExportProgress| {});
        let log: LogCallback = Arc::new(|_: &str| {});
        let err = backend
            .render(&job(true, None), dir.path(), progress, log)
            .await
            .unwrap_err();
        assert!(matches!(err, RampcutError::Unsupported { .. }));
    }
}
