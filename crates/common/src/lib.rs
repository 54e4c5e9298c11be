//! Rampcut Common Utilities
//!
//! Shared infrastructure for all Rampcut crates:
//! - Error types and result aliases
//! - Wall-clock timing and rate limiting for export progress
//! - Tracing/logging initialization and the bounded debug log tail
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod log_tail;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
pub use log_tail::*;
