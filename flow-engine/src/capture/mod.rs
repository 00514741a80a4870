//! Capture module - records a live page into a video file
//!
//! * `lifecycle`: the uninitialized → recording → stopped state machine that
//!   owns a backend handle for one replay.
//! * `screencast`: chromiumoxide backend, CDP screencast frames piped into ffmpeg.
//! * `encoder`: ffmpeg argument builder and the constant-frame-rate frame sink.

pub mod encoder;
pub mod lifecycle;
pub mod screencast;

use crate::error::FlowResult;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// A video capture backend bound to pages of type `P`
#[async_trait]
pub trait Capture<P>: Send + Sync
where
    P: Send + Sync,
{
    /// Live recording session
    type Handle: Send;

    /// Begin recording `page` into `output`
    async fn start(&self, page: &P, output: &Path) -> FlowResult<Self::Handle>;

    /// Finish recording and finalise the file at the path given to `start`
    async fn stop(&self, handle: Self::Handle) -> FlowResult<()>;
}

/// Capture settings
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureConfig {
    /// ffmpeg binary
    pub ffmpeg_path: PathBuf,
    /// Output frame rate
    pub fps: u32,
    /// JPEG quality of screencast frames (0-100)
    pub quality: u8,
    /// ffmpeg video codec
    pub video_codec: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            fps: 25,
            quality: 90,
            video_codec: "libx264".to_string(),
        }
    }
}
