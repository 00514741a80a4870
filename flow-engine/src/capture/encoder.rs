//! ffmpeg encoder plumbing
//!
//! Frames arrive from the browser at an irregular rate (only when the page
//! repaints). [`FrameSink`] turns them into a constant-rate stream by repeating
//! the previous frame for as many ticks as it stayed on screen.

use crate::capture::CaptureConfig;
use crate::error::{FlowEngineError, FlowResult};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, Command};
use tokio::task::JoinHandle;
use tracing::debug;

/// Lines of ffmpeg diagnostics kept for error reports
const STDERR_TAIL: usize = 20;

/// Builder for the ffmpeg invocation that encodes a piped MJPEG stream
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    program: PathBuf,
    fps: u32,
    codec: String,
    output: PathBuf,
}

impl FfmpegCommand {
    pub fn new(config: &CaptureConfig, output: &Path) -> Self {
        Self {
            program: config.ffmpeg_path.clone(),
            fps: config.fps.max(1),
            codec: config.video_codec.clone(),
            output: output.to_path_buf(),
        }
    }

    pub fn args(&self) -> Vec<String> {
        let fps = self.fps.to_string();
        let mut args: Vec<String> = [
            "-y",
            "-loglevel",
            "error",
            "-nostats",
            "-f",
            "image2pipe",
            "-c:v",
            "mjpeg",
            "-framerate",
            fps.as_str(),
            "-i",
            "-",
            "-an",
            "-c:v",
            self.codec.as_str(),
            "-pix_fmt",
            "yuv420p",
            // yuv420p needs even dimensions
            "-vf",
            "pad=ceil(iw/2)*2:ceil(ih/2)*2",
            "-r",
            fps.as_str(),
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        args.push(self.output.to_string_lossy().into_owned());
        args
    }

    /// Spawn ffmpeg with stdin piped for frames
    pub fn spawn(&self) -> FlowResult<Child> {
        debug!("Spawning {:?} {:?}", self.program, self.args());
        Command::new(&self.program)
            .args(self.args())
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                FlowEngineError::Encoder(format!("failed to spawn {:?}: {}", self.program, e))
            })
    }
}

/// Drain ffmpeg's stderr so it never blocks, keeping the last lines
pub fn drain_stderr(stderr: ChildStderr) -> JoinHandle<Vec<String>> {
    tokio::spawn(async move {
        let mut tail = VecDeque::with_capacity(STDERR_TAIL);
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!(target: "ffmpeg", "{}", line);
            if tail.len() == STDERR_TAIL {
                tail.pop_front();
            }
            tail.push_back(line);
        }
        tail.into_iter().collect()
    })
}

/// Whole output ticks contained in `elapsed`
pub fn ticks_elapsed(elapsed: Duration, frame_interval: Duration) -> u64 {
    (elapsed.as_nanos() / frame_interval.as_nanos().max(1)) as u64
}

/// Constant-frame-rate writer of encoded images.
///
/// The output clock is anchored at the first frame: when a new frame arrives
/// at `at`, the previous one is written until the output has caught up with
/// `at`, so sub-tick repaints never shorten the video.
pub struct FrameSink<W> {
    writer: W,
    frame_interval: Duration,
    origin: Option<Instant>,
    last: Option<Vec<u8>>,
    frames_written: u64,
}

impl<W: AsyncWrite + Unpin> FrameSink<W> {
    pub fn new(writer: W, fps: u32) -> Self {
        Self {
            writer,
            frame_interval: Duration::from_secs(1) / fps.max(1),
            origin: None,
            last: None,
            frames_written: 0,
        }
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Output ticks between the first frame and `at`
    fn ticks_at(&self, at: Instant) -> u64 {
        self.origin
            .map(|origin| ticks_elapsed(at.saturating_duration_since(origin), self.frame_interval))
            .unwrap_or(0)
    }

    /// Queue `frame`, writing the previous one up to the tick of `at`
    pub async fn push(&mut self, frame: Vec<u8>, at: Instant) -> std::io::Result<()> {
        if self.origin.is_none() {
            self.origin = Some(at);
        }
        if let Some(previous) = self.last.take() {
            let due = self.ticks_at(at).saturating_sub(self.frames_written);
            self.write_repeated(&previous, due).await?;
        }
        self.last = Some(frame);
        Ok(())
    }

    /// Pad the pending frame up to `at` (writing it at least once) and close
    /// the writer
    pub async fn finish(&mut self, at: Instant) -> std::io::Result<u64> {
        if let Some(previous) = self.last.take() {
            let target = self.ticks_at(at).max(self.frames_written + 1);
            let due = target - self.frames_written;
            self.write_repeated(&previous, due).await?;
        }
        self.writer.flush().await?;
        self.writer.shutdown().await?;
        Ok(self.frames_written)
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    async fn write_repeated(&mut self, frame: &[u8], times: u64) -> std::io::Result<()> {
        for _ in 0..times {
            self.writer.write_all(frame).await?;
            self.frames_written += 1;
        }
        Ok(())
    }
}
