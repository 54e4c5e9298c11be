//! Rampcut Capture Engine
//!
//! The real-time export path: the source is literally played at the
//! per-segment rate while the rendered frames and the mixed audio are
//! recorded into a streaming container.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                    run_capture                       │
//! │   select! { graph events | progress tick | deadline }│
//! └───────────────┬──────────────────────▲───────────────┘
//!        commands │                      │ CaptureEvent
//!                 ▼                      │
//! ┌──────────────────────────────────────┴───────────────┐
//! │                  PlaybackGraph                       │
//! │  source ─► scale/rate ─► video gate ─► x264 ─┐       │
//! │  source audio ─► scaletempo ─► gain ─┐       ├► mkv  │
//! │  overlay ─► scaletempo ─► gain ──► mixer ─► gate ┘   │
//! └──────────────────────────────────────────────────────┘
//! ```

pub mod backend;
pub mod driver;
pub mod graph;
pub mod gst_graph;
pub mod launch;

pub use backend::{capability_report, CaptureBackend};
pub use driver::{run_capture, CaptureOutcome, CaptureSettings};
pub use graph::{CaptureEvent, GraphSpec, PlaybackGraph};
