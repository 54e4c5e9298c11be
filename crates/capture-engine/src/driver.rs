//! Event-driven capture loop.
//!
//! Drives a [`PlaybackGraph`] through load → seek → record → play, switches
//! the playback rate at segment boundaries, and stops at the trim end. The
//! only suspension points are the graph events, the progress ticker and the
//! safety deadline.

use std::path::Path;
use std::time::Duration;

use rampcut_common::clock::{secs_to_duration, ExportClock};
use rampcut_common::config::ExportDefaults;
use rampcut_common::{RampcutError, RampcutResult};
use rampcut_processing_core::{
    active_segment, ExportJob, ExportProgress, LogCallback, ProgressCallback,
};
use tokio::sync::mpsc::{self, UnboundedReceiver};

use crate::graph::{CaptureEvent, PlaybackGraph};

/// Tunables for the capture loop.
#[derive(Debug, Clone)]
pub struct CaptureSettings {
    pub fps: u32,
    pub max_height: u32,
    /// Stop once the position reaches `trim_end - stop_tolerance_secs`.
    pub stop_tolerance_secs: f64,
    /// Added to the estimated duration to get the forced-stop deadline.
    pub safety_margin_secs: f64,
    /// Bound on load and seek completion.
    pub setup_timeout: Duration,
    /// Bound on the recorder's finalize callback.
    pub finalize_timeout: Duration,
    pub progress_interval: Duration,
    pub video_bitrate_kbps: u32,
    pub audio_bitrate_kbps: u32,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self::from(&ExportDefaults::default())
    }
}

impl From<&ExportDefaults> for CaptureSettings {
    fn from(defaults: &ExportDefaults) -> Self {
        Self {
            fps: defaults.capture_fps,
            max_height: defaults.max_capture_height,
            stop_tolerance_secs: defaults.stop_tolerance_secs,
            safety_margin_secs: defaults.safety_margin_secs,
            setup_timeout: Duration::from_secs(10),
            finalize_timeout: secs_to_duration(defaults.recorder_finalize_timeout_secs),
            progress_interval: Duration::from_millis(defaults.progress_interval_ms.max(10)),
            video_bitrate_kbps: defaults.video_bitrate_kbps,
            audio_bitrate_kbps: defaults.audio_bitrate_kbps,
        }
    }
}

/// How a successful capture ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureOutcome {
    /// The safety deadline fired before playback reached the trim end.
    pub truncated: bool,
}

/// Run one capture to completion.
///
/// The graph is torn down on every exit path. On failure the partially
/// written `output` is removed.
pub async fn run_capture<G: PlaybackGraph + ?Sized>(
    graph: &mut G,
    job: &ExportJob,
    output: &Path,
    settings: &CaptureSettings,
    progress: ProgressCallback,
    log: LogCallback,
) -> RampcutResult<CaptureOutcome> {
    let result = drive(graph, job, settings, &progress, &log).await;
    graph.teardown();

    match &result {
        Ok(outcome) => {
            tracing::info!(
                output = %output.display(),
                truncated = outcome.truncated,
                "Capture finished"
            );
        }
        Err(e) => {
            log(&format!("capture failed: {e}"));
            if output.exists() {
                if let Err(rm) = std::fs::remove_file(output) {
                    tracing::warn!(error = %rm, "Failed to remove partial capture output");
                }
            }
        }
    }
    result
}

async fn drive<G: PlaybackGraph + ?Sized>(
    graph: &mut G,
    job: &ExportJob,
    settings: &CaptureSettings,
    progress: &ProgressCallback,
    log: &LogCallback,
) -> RampcutResult<CaptureOutcome> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    graph.attach(tx)?;

    progress(ExportProgress::new(0.0, "Loading source"));
    graph.load()?;
    wait_for(&mut rx, CaptureEvent::Loaded, settings.setup_timeout).await?;

    graph.seek(job.trim.start)?;
    wait_for(&mut rx, CaptureEvent::SeekDone, settings.setup_timeout).await?;
    log(&format!("capture: seeked to {:.3}s", job.trim.start));

    if let Some(placement) = &job.overlay_placement {
        graph.schedule_overlay(placement)?;
        log(&format!(
            "capture: overlay from {:.3}s after {:.3}s",
            placement.read_from_secs, placement.output_delay_secs
        ));
    }

    let mut rate = job.segments.first().map(|seg| seg.factor).unwrap_or(1.0);
    graph.set_rate(rate)?;

    graph.start_recorder()?;
    graph.play()?;
    let clock = ExportClock::start();
    tracing::debug!(started_at = clock.epoch_wall(), rate, "Playback started");

    let stop_at = job.trim.end - settings.stop_tolerance_secs;
    let deadline = tokio::time::sleep(secs_to_duration(
        job.estimated_duration_secs + settings.safety_margin_secs,
    ));
    tokio::pin!(deadline);
    let mut ticker = tokio::time::interval(settings.progress_interval);

    let truncated = loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(CaptureEvent::Position(t)) => {
                    if t >= stop_at {
                        break false;
                    }
                    if let Some(seg) = active_segment(&job.segments, t) {
                        if seg.factor != rate {
                            graph.set_rate(seg.factor)?;
                            rate = seg.factor;
                            log(&format!("capture: rate {rate} at {t:.3}s"));
                        }
                    }
                }
                Some(CaptureEvent::StopRequested) => {
                    tracing::debug!("Playback ended before the stop position");
                    break false;
                }
                Some(CaptureEvent::Failed(message)) => {
                    return Err(RampcutError::capture(message));
                }
                Some(CaptureEvent::RecorderDone) => {
                    return Err(RampcutError::capture("Recorder stopped unexpectedly"));
                }
                Some(_) => {}
                None => return Err(RampcutError::capture("Playback graph closed its event channel")),
            },
            _ = ticker.tick() => {
                progress(ExportProgress::new(
                    clock.estimated_progress(job.estimated_duration_secs),
                    "Capturing",
                ));
            }
            _ = &mut deadline => {
                tracing::warn!(
                    elapsed_secs = clock.elapsed_secs(),
                    estimated_secs = job.estimated_duration_secs,
                    "Capture did not reach the trim end; forcing stop"
                );
                log("capture: safety timer fired, output may be truncated");
                break true;
            }
        }
    };

    progress(ExportProgress::new(
        clock.estimated_progress(job.estimated_duration_secs),
        "Finalizing recording",
    ));
    graph.stop_recorder()?;
    wait_for(&mut rx, CaptureEvent::RecorderDone, settings.finalize_timeout).await?;
    graph.pause()?;

    progress(ExportProgress::new(1.0, "Capture complete"));
    Ok(CaptureOutcome { truncated })
}

/// Wait for `expected`, ignoring position updates and other noise.
async fn wait_for(
    rx: &mut UnboundedReceiver<CaptureEvent>,
    expected: CaptureEvent,
    limit: Duration,
) -> RampcutResult<()> {
    let wait = async {
        loop {
            match rx.recv().await {
                Some(event) if event == expected => return Ok(()),
                Some(CaptureEvent::Failed(message)) => return Err(RampcutError::capture(message)),
                Some(_) => {}
                None => {
                    return Err(RampcutError::capture(
                        "Playback graph closed its event channel",
                    ))
                }
            }
        }
    };

    tokio::time::timeout(limit, wait).await.map_err(|_| {
        RampcutError::capture(format!("Timed out after {limit:?} waiting for {expected:?}"))
    })?
}
