//! Playback graph contract.
//!
//! A playback graph owns the hidden playback surface, the capture surface
//! and the audio routing for exactly one export. Commands are synchronous;
//! anything that completes later is reported as a [`CaptureEvent`].

use std::path::PathBuf;

use rampcut_common::RampcutResult;
use rampcut_processing_core::OverlayPlacement;
use tokio::sync::mpsc::UnboundedSender;

/// Asynchronous notifications from a playback graph.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureEvent {
    /// The source is loaded and prerolled.
    Loaded,
    /// A seek issued with [`PlaybackGraph::seek`] completed.
    SeekDone,
    /// Current playback position on the source timeline, in seconds.
    Position(f64),
    /// Playback cannot continue (end of stream reached early).
    StopRequested,
    /// The recorder has finalized its container.
    RecorderDone,
    /// Unrecoverable graph error.
    Failed(String),
}

/// Everything needed to build a playback graph for one export.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphSpec {
    pub source: PathBuf,
    pub source_has_audio: bool,
    pub overlay: Option<PathBuf>,
    pub output: PathBuf,
    /// Capture surface size, already capped and even.
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub video_bitrate_kbps: u32,
    pub audio_bitrate_kbps: u32,
    pub video_volume: f64,
    pub overlay_volume: f64,
}

/// The media graph driven by [`crate::driver::run_capture`].
pub trait PlaybackGraph: Send {
    /// Register the channel events are delivered on. Called once, first.
    fn attach(&mut self, events: UnboundedSender<CaptureEvent>) -> RampcutResult<()>;

    /// Load and preroll the source. Completes with [`CaptureEvent::Loaded`].
    fn load(&mut self) -> RampcutResult<()>;

    /// Seek the source. Completes with [`CaptureEvent::SeekDone`].
    fn seek(&mut self, position_secs: f64) -> RampcutResult<()>;

    /// Position the overlay and its start delay before playback begins.
    fn schedule_overlay(&mut self, placement: &OverlayPlacement) -> RampcutResult<()>;

    /// Open the recorder. Must be called before [`PlaybackGraph::play`].
    fn start_recorder(&mut self) -> RampcutResult<()>;

    fn play(&mut self) -> RampcutResult<()>;

    /// Change the playback rate of the source and of any running overlay
    /// together, keeping both in lock-step.
    fn set_rate(&mut self, rate: f64) -> RampcutResult<()>;

    /// Finalize the recording. Completes with [`CaptureEvent::RecorderDone`].
    fn stop_recorder(&mut self) -> RampcutResult<()>;

    fn pause(&mut self) -> RampcutResult<()>;

    /// Release every resource. Safe to call in any state, more than once.
    fn teardown(&mut self);
}
