//! Rampcut Render Engine
//!
//! The deterministic export path: a static ffmpeg filter graph executed as
//! one batch job.
//!
//! # Pipeline Architecture
//!
//! ```text
//! source ──┬── trim/setpts (seg 0) ──┐
//!          ├── trim/setpts (seg n) ──┴── concat ─────────────► video
//!          ├── atrim/atempo… (seg 0) ─┐
//!          └── atrim/atempo… (seg n) ─┴── concat ── volume ──┐
//!                                                            ├── amix ──► audio
//! overlay ── atrim/adelay ── volume ─────────────────────────┘
//! ```
//!
//! Also hosts the engine handle, `ffprobe` source probing, and the
//! thumbnailer used by the recent-clips archive.

pub mod engine;
pub mod filter_graph;
pub mod probe;
pub mod thumbnail;
pub mod transcode;

pub use engine::{EngineBinaries, EngineHandle};
pub use filter_graph::{build_filter_graph, FilterGraph};
pub use probe::{probe_audio_duration, probe_source};
pub use thumbnail::{FfmpegThumbnailer, Thumbnailer};
pub use transcode::{build_plan, FfmpegBackend, TranscodePlan, TranscodeSettings};
