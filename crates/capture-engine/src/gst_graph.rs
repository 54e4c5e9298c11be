//! GStreamer implementation of [`PlaybackGraph`].
//!
//! One pipeline holds the source decoder, the capture surface (scale +
//! fixed frame rate + real-time pacing), the audio mix bus and the
//! recorder. A watcher thread turns bus messages and position samples
//! into [`CaptureEvent`]s.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use gst::prelude::*;
use gstreamer as gst;
use rampcut_common::clock::{ns_to_secs, secs_to_ns, RateController};
use rampcut_common::{RampcutError, RampcutResult};
use rampcut_processing_core::OverlayPlacement;
use tokio::sync::mpsc::UnboundedSender;

use crate::graph::{CaptureEvent, GraphSpec, PlaybackGraph};
use crate::launch::{
    build_launch, AUDIO_GATE_ELEMENT, OVERLAY_GAIN_ELEMENT, REQUIRED_ELEMENTS, VIDEO_GATE_ELEMENT,
};

/// Position sampling rate while playing.
const POSITION_HZ: u32 = 30;

const BUS_POLL: Duration = Duration::from_millis(10);

/// Upper bound on waiting for a state change or flushing seek to settle.
const SETTLE_TIMEOUT: gst::ClockTime = gst::ClockTime::from_seconds(5);

/// Which pending command the next settle completes.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle = 0,
    Loading = 1,
    Seeking = 2,
    Playing = 3,
    Draining = 4,
}

impl Phase {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Loading,
            2 => Self::Seeking,
            3 => Self::Playing,
            4 => Self::Draining,
            _ => Self::Idle,
        }
    }
}

/// Shared between the graph and its watcher thread.
struct WatchState {
    phase: AtomicU8,
    eos_seen: AtomicBool,
    shutdown: AtomicBool,
}

impl WatchState {
    fn phase(&self) -> Phase {
        Phase::from_u8(self.phase.load(Ordering::SeqCst))
    }

    fn set_phase(&self, phase: Phase) {
        self.phase.store(phase as u8, Ordering::SeqCst);
    }

    /// Finish `phase` if it is still pending. Whichever of the bus watcher
    /// and the command path gets here first reports the event.
    fn complete(&self, phase: Phase) -> Option<CaptureEvent> {
        let event = completion_event(phase)?;
        self.phase
            .compare_exchange(
                phase as u8,
                Phase::Idle as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .ok()?;
        Some(event)
    }
}

impl Default for WatchState {
    fn default() -> Self {
        Self {
            phase: AtomicU8::new(Phase::Idle as u8),
            eos_seen: AtomicBool::new(false),
            shutdown: AtomicBool::new(false),
        }
    }
}

fn completion_event(phase: Phase) -> Option<CaptureEvent> {
    match phase {
        Phase::Loading => Some(CaptureEvent::Loaded),
        Phase::Seeking => Some(CaptureEvent::SeekDone),
        _ => None,
    }
}

/// Whether a state result means the pending change already finished.
///
/// Only `Async` leaves it in flight; that one finishes with `AsyncDone` on
/// the bus. Sinks with `async=false` never post `AsyncDone`, so every other
/// success counts as done.
fn settled(
    change: Result<gst::StateChangeSuccess, gst::StateChangeError>,
) -> Result<bool, gst::StateChangeError> {
    change.map(|success| success != gst::StateChangeSuccess::Async)
}

pub struct GstPlaybackGraph {
    spec: GraphSpec,
    pipeline: gst::Pipeline,
    state: Arc<WatchState>,
    events: Option<UnboundedSender<CaptureEvent>>,
    watcher: Option<JoinHandle<()>>,
}

impl GstPlaybackGraph {
    pub fn new(spec: GraphSpec) -> RampcutResult<Self> {
        init_gstreamer()?;

        let launch = build_launch(&spec);
        tracing::debug!(%launch, "Building capture graph");

        let element = gst::parse::launch(&launch)
            .map_err(|e| RampcutError::capture(format!("Failed to build capture graph: {e}")))?;
        let pipeline = element
            .dynamic_cast::<gst::Pipeline>()
            .map_err(|_| RampcutError::capture("Launch string did not produce a pipeline"))?;

        Ok(Self {
            spec,
            pipeline,
            state: Arc::new(WatchState::default()),
            events: None,
            watcher: None,
        })
    }

    fn element(&self, name: &str) -> RampcutResult<gst::Element> {
        self.pipeline
            .by_name(name)
            .ok_or_else(|| RampcutError::capture(format!("Capture graph has no element '{name}'")))
    }

    fn set_gates_open(&self, open: bool) -> RampcutResult<()> {
        for gate in [VIDEO_GATE_ELEMENT, AUDIO_GATE_ELEMENT] {
            self.element(gate)?.set_property("drop", !open);
        }
        Ok(())
    }

    fn set_state(&self, state: gst::State) -> RampcutResult<gst::StateChangeSuccess> {
        self.pipeline.set_state(state).map_err(|e| {
            RampcutError::capture(format!("Capture graph refused state {state:?}: {e:?}"))
        })
    }

    fn emit(&self, event: CaptureEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }

    /// Report `phase` as done once `change` shows the pipeline has settled.
    fn settle(
        &self,
        phase: Phase,
        change: Result<gst::StateChangeSuccess, gst::StateChangeError>,
    ) -> RampcutResult<()> {
        let done = settled(change).map_err(|e| {
            RampcutError::capture(format!("Capture graph did not settle while {phase:?}: {e:?}"))
        })?;
        if done {
            if let Some(event) = self.state.complete(phase) {
                self.emit(event);
            }
        }
        Ok(())
    }

    /// Block until the pipeline has no pending state change, up to [`SETTLE_TIMEOUT`].
    fn wait_settled(&self) -> Result<gst::StateChangeSuccess, gst::StateChangeError> {
        let (change, _current, _pending) = self.pipeline.state(SETTLE_TIMEOUT);
        change
    }

    fn spawn_watcher(&mut self, tx: UnboundedSender<CaptureEvent>) -> RampcutResult<()> {
        let bus = self
            .pipeline
            .bus()
            .ok_or_else(|| RampcutError::capture("Capture graph has no bus"))?;
        let pipeline = self.pipeline.clone();
        let state = self.state.clone();

        let handle = std::thread::Builder::new()
            .name("rampcut-capture-watch".into())
            .spawn(move || watch(bus, pipeline, state, tx))
            .map_err(RampcutError::Io)?;
        self.watcher = Some(handle);
        Ok(())
    }
}

fn watch(
    bus: gst::Bus,
    pipeline: gst::Pipeline,
    state: Arc<WatchState>,
    tx: UnboundedSender<CaptureEvent>,
) {
    let epoch = Instant::now();
    let mut sampler = RateController::new(POSITION_HZ);

    while !state.shutdown.load(Ordering::SeqCst) {
        if let Some(msg) = bus.timed_pop(gst::ClockTime::from_nseconds(BUS_POLL.as_nanos() as u64)) {
            let event = match msg.view() {
                gst::MessageView::AsyncDone(_) => state.complete(state.phase()),
                gst::MessageView::Eos(_) => {
                    state.eos_seen.store(true, Ordering::SeqCst);
                    if state.phase() == Phase::Draining {
                        tracing::debug!("EOS received; recorder drained");
                        Some(CaptureEvent::RecorderDone)
                    } else {
                        Some(CaptureEvent::StopRequested)
                    }
                }
                gst::MessageView::Error(e) => {
                    let src = e
                        .src()
                        .map(|s| s.path_string().to_string())
                        .unwrap_or_default();
                    Some(CaptureEvent::Failed(format!("{src}: {}", e.error())))
                }
                gst::MessageView::Warning(w) => {
                    tracing::warn!(warning = %w.error(), "Capture graph warning");
                    None
                }
                _ => None,
            };
            if let Some(event) = event {
                if tx.send(event).is_err() {
                    break;
                }
            }
        }

        if state.phase() == Phase::Playing
            && sampler.should_tick(epoch.elapsed().as_nanos() as u64)
        {
            if let Some(pos) = pipeline.query_position::<gst::ClockTime>() {
                if tx
                    .send(CaptureEvent::Position(ns_to_secs(pos.nseconds())))
                    .is_err()
                {
                    break;
                }
            }
        }
    }
}

impl PlaybackGraph for GstPlaybackGraph {
    fn attach(&mut self, events: UnboundedSender<CaptureEvent>) -> RampcutResult<()> {
        self.spawn_watcher(events.clone())?;
        self.events = Some(events);
        Ok(())
    }

    fn load(&mut self) -> RampcutResult<()> {
        self.state.set_phase(Phase::Loading);
        let change = self.set_state(gst::State::Paused)?;
        tracing::debug!(source = %self.spec.source.display(), "Loading source");
        self.settle(Phase::Loading, Ok(change))
    }

    fn seek(&mut self, position_secs: f64) -> RampcutResult<()> {
        self.state.set_phase(Phase::Seeking);
        // Bins only forward seeks to their sinks, so this goes to the pipeline.
        self.pipeline
            .seek_simple(
                gst::SeekFlags::FLUSH | gst::SeekFlags::ACCURATE,
                gst::ClockTime::from_nseconds(secs_to_ns(position_secs)),
            )
            .map_err(|e| {
                RampcutError::capture(format!("Seek to {position_secs:.3}s failed: {e}"))
            })?;
        self.settle(Phase::Seeking, self.wait_settled())
    }

    fn schedule_overlay(&mut self, placement: &OverlayPlacement) -> RampcutResult<()> {
        let gain = self.element(OVERLAY_GAIN_ELEMENT)?;

        // The pipeline seek also moved the overlay to the trim start, so its
        // branch is always repositioned from the mixer side.
        let gain_sink = gain
            .static_pad("sink")
            .ok_or_else(|| RampcutError::capture("Overlay gain has no sink pad"))?;
        let seek = gst::event::Seek::new(
            1.0,
            gst::SeekFlags::FLUSH | gst::SeekFlags::ACCURATE,
            gst::SeekType::Set,
            Some(gst::ClockTime::from_nseconds(secs_to_ns(
                placement.read_from_secs,
            ))),
            gst::SeekType::None,
            gst::ClockTime::NONE,
        );
        if !gain_sink.send_event(seek) {
            return Err(RampcutError::capture(format!(
                "Overlay seek to {:.3}s was refused",
                placement.read_from_secs
            )));
        }
        self.wait_settled().map_err(|e| {
            RampcutError::capture(format!("Overlay seek did not settle: {e:?}"))
        })?;

        // Pad offsets are in running time, i.e. on the output audio clock.
        let gain_src = gain
            .static_pad("src")
            .ok_or_else(|| RampcutError::capture("Overlay gain has no src pad"))?;
        let offset_ns = i64::try_from(secs_to_ns(placement.output_delay_secs)).unwrap_or(i64::MAX);
        gain_src.set_offset(offset_ns);
        Ok(())
    }

    fn start_recorder(&mut self) -> RampcutResult<()> {
        self.set_gates_open(true)?;
        tracing::debug!(output = %self.spec.output.display(), "Recorder started");
        Ok(())
    }

    fn play(&mut self) -> RampcutResult<()> {
        self.set_state(gst::State::Playing)?;
        self.state.set_phase(Phase::Playing);
        Ok(())
    }

    fn set_rate(&mut self, rate: f64) -> RampcutResult<()> {
        // Sent to the whole pipeline, so every source (including the
        // overlay) switches rate at the same running time.
        self.pipeline
            .seek(
                rate,
                gst::SeekFlags::INSTANT_RATE_CHANGE,
                gst::SeekType::None,
                gst::ClockTime::NONE,
                gst::SeekType::None,
                gst::ClockTime::NONE,
            )
            .map_err(|e| RampcutError::capture(format!("Rate change to {rate} failed: {e}")))
    }

    fn stop_recorder(&mut self) -> RampcutResult<()> {
        self.state.set_phase(Phase::Draining);
        if self.state.eos_seen.load(Ordering::SeqCst) {
            self.emit(CaptureEvent::RecorderDone);
            return Ok(());
        }
        if !self.pipeline.send_event(gst::event::Eos::new()) {
            return Err(RampcutError::capture(
                "Failed to send EOS; recording cannot be finalized",
            ));
        }
        Ok(())
    }

    fn pause(&mut self) -> RampcutResult<()> {
        self.set_state(gst::State::Paused)?;
        Ok(())
    }

    fn teardown(&mut self) {
        self.state.shutdown.store(true, Ordering::SeqCst);
        if let Err(e) = self.pipeline.set_state(gst::State::Null) {
            tracing::warn!(error = ?e, "Failed to release capture graph");
        }
        if let Some(handle) = self.watcher.take() {
            if handle.join().is_err() {
                tracing::warn!("Capture watcher thread panicked");
            }
        }
        self.events = None;
    }
}

impl Drop for GstPlaybackGraph {
    fn drop(&mut self) {
        self.teardown();
    }
}

pub(crate) fn init_gstreamer() -> RampcutResult<()> {
    static GST_INIT: OnceLock<Result<(), String>> = OnceLock::new();
    let init_res = GST_INIT.get_or_init(|| gst::init().map_err(|e| e.to_string()));
    match init_res {
        Ok(()) => Ok(()),
        Err(e) => Err(RampcutError::unsupported(format!(
            "Failed to initialize GStreamer: {e}"
        ))),
    }
}

/// Element factories the capture graph needs but this system lacks.
pub fn missing_elements() -> RampcutResult<Vec<&'static str>> {
    init_gstreamer()?;
    Ok(REQUIRED_ELEMENTS
        .iter()
        .copied()
        .filter(|name| gst::ElementFactory::find(name).is_none())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_loading_and_seeking_complete() {
        assert_eq!(completion_event(Phase::Loading), Some(CaptureEvent::Loaded));
        assert_eq!(completion_event(Phase::Seeking), Some(CaptureEvent::SeekDone));
        assert_eq!(completion_event(Phase::Playing), None);
        assert_eq!(completion_event(Phase::Draining), None);
        assert_eq!(completion_event(Phase::Idle), None);
    }

    #[test]
    fn async_result_waits_for_the_bus() {
        assert_eq!(settled(Ok(gst::StateChangeSuccess::Success)), Ok(true));
        assert_eq!(settled(Ok(gst::StateChangeSuccess::NoPreroll)), Ok(true));
        assert_eq!(settled(Ok(gst::StateChangeSuccess::Async)), Ok(false));
        assert!(settled(Err(gst::StateChangeError)).is_err());
    }

    #[test]
    fn seek_completes_without_async_done_from_the_sink() {
        let state = WatchState::default();
        state.set_phase(Phase::Seeking);

        // A non-async sink settles the flushing seek synchronously.
        assert_eq!(settled(Ok(gst::StateChangeSuccess::Success)), Ok(true));
        assert_eq!(state.complete(Phase::Seeking), Some(CaptureEvent::SeekDone));
        assert_eq!(state.phase(), Phase::Idle);

        // A late AsyncDone on the bus does not report it twice.
        assert_eq!(state.complete(state.phase()), None);
    }

    #[test]
    fn async_done_while_playing_is_ignored() {
        let state = WatchState::default();
        state.set_phase(Phase::Playing);
        assert_eq!(state.complete(state.phase()), None);
        assert_eq!(state.phase(), Phase::Playing);
    }

    #[test]
    fn bus_completion_wins_over_a_timed_out_wait() {
        let state = WatchState::default();
        state.set_phase(Phase::Loading);
        assert_eq!(state.complete(state.phase()), Some(CaptureEvent::Loaded));
        assert_eq!(state.complete(Phase::Loading), None);
    }
}
