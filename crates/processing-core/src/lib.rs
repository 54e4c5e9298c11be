//! Rampcut Processing Core
//!
//! Pure timing logic shared by both export paths:
//! - **Segments:** trim range + speed ramps → ordered, gapless segment list
//! - **Tempo:** any positive factor → chain of bounded time-stretch steps
//! - **Overlay:** read offsets, audibility, and start scheduling for music
//! - **Job:** validated export plan with its estimated real-time duration
//! - **Backend:** the contract each execution path implements
//!
//! Apart from the backend trait this crate is pure computation.

pub mod backend;
pub mod job;
pub mod overlay;
pub mod segments;
pub mod tempo;

pub use backend::{
    ExportArtifact, ExportBackend, ExportPathKind, ExportProgress, LogCallback, ProgressCallback,
};
pub use job::{plan_export, ExportJob, ExportRequest};
pub use overlay::{is_audible, offset_in_overlay, schedule_start, OverlayPlacement, OverlayStart};
pub use segments::{active_segment, build_segments, estimated_duration, output_time_at};
pub use tempo::decompose;
