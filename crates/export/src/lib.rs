//! Rampcut Export Orchestrator
//!
//! Drives one export at a time:
//!
//! ```text
//!   ExportRequest ─→ plan_export ─→ path selection
//!                                      │
//!                  capture supported? ─┼─ yes ─→ Capturing ──(error)──┐
//!                                      │             │                │
//!                                      └─ no ──→ Transcoding ←────────┘
//!                                                    │
//!                                   Finalizing: deliver + archive ─→ Done
//! ```
//!
//! Backends are trait objects, so the orchestrator knows nothing about
//! GStreamer or ffmpeg. Archival never fails an export.

pub mod archive;
pub mod delivery;
pub mod orchestrator;
pub mod state;

pub use archive::{ArchivedClip, ClipArchive, DirectoryArchive};
pub use delivery::DeliverySink;
pub use orchestrator::{ExportReport, Exporter, PreviewControl};
pub use state::{ExportState, ExportStateMachine};
