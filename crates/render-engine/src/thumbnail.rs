//! Poster-frame extraction for archived clips.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use rampcut_common::{RampcutError, RampcutResult};

use crate::engine::EngineHandle;

/// Thumbnail width in pixels; height follows the aspect ratio.
pub const THUMBNAIL_WIDTH: u32 = 320;

/// Produces a still image for a media file.
#[async_trait]
pub trait Thumbnailer: Send + Sync {
    async fn thumbnail(&self, source: &Path, dest: &Path) -> RampcutResult<()>;
}

/// Grabs the first frame with ffmpeg.
pub struct FfmpegThumbnailer {
    engine: Arc<EngineHandle>,
}

impl FfmpegThumbnailer {
    pub fn new(engine: Arc<EngineHandle>) -> Self {
        Self { engine }
    }
}

pub fn thumbnail_args(source: &Path, dest: &Path) -> Vec<String> {
    vec![
        "-hide_banner".into(),
        "-nostdin".into(),
        "-y".into(),
        "-v".into(),
        "error".into(),
        "-i".into(),
        source.to_string_lossy().into_owned(),
        "-frames:v".into(),
        "1".into(),
        "-vf".into(),
        format!("scale={THUMBNAIL_WIDTH}:-2"),
        dest.to_string_lossy().into_owned(),
    ]
}

#[async_trait]
impl Thumbnailer for FfmpegThumbnailer {
    async fn thumbnail(&self, source: &Path, dest: &Path) -> RampcutResult<()> {
        let ffmpeg = self.engine.load().await?.ffmpeg.clone();
        let output = tokio::process::Command::new(ffmpeg)
            .args(thumbnail_args(source, dest))
            .output()
            .await?;

        if !output.status.success() || !dest.exists() {
            return Err(RampcutError::archive(format!(
                "Thumbnail extraction failed for {}: {}",
                source.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}
