//! Rampcut Project Model
//!
//! Defines the data contracts shared by the export engine:
//! - **Timeline:** trim range, speed-ramp effects, and derived segments
//! - **Media:** probed source description and the overlaid audio track
//! - **Session:** the saved edit (`edit.json`) the CLI exports from
//! - **Archive:** entries of the recent-clips index
//!
//! All times are in seconds on the source's own timeline unless a field
//! name says otherwise.

pub mod archive;
pub mod media;
pub mod session;
pub mod timeline;

pub use archive::*;
pub use media::*;
pub use session::*;
pub use timeline::*;
