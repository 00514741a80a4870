//! Screencast capture backend
//!
//! Uses the DevTools `Page.startScreencast` stream: every repaint arrives as a
//! base64 JPEG which is acknowledged, decoded and piped into ffmpeg.

use crate::capture::encoder::{drain_stderr, FfmpegCommand, FrameSink};
use crate::capture::{Capture, CaptureConfig};
use crate::error::{FlowEngineError, FlowResult};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chromiumoxide::cdp::browser_protocol::page::{
    EventScreencastFrame, ScreencastFrameAckParams, StartScreencastFormat, StartScreencastParams,
    StopScreencastParams,
};
use chromiumoxide::Page;
use futures::{Stream, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::io::AsyncWrite;
use tokio::process::Child;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// chromiumoxide + ffmpeg capture backend
#[derive(Debug, Clone, Default)]
pub struct ScreencastCapture {
    config: CaptureConfig,
}

impl ScreencastCapture {
    pub fn new(config: CaptureConfig) -> Self {
        Self { config }
    }
}

/// A running screencast
pub struct ScreencastHandle {
    page: Page,
    stop_tx: oneshot::Sender<()>,
    pump: JoinHandle<FlowResult<u64>>,
    encoder: Child,
    stderr: Option<JoinHandle<Vec<String>>>,
    output: PathBuf,
}

#[async_trait]
impl Capture<Page> for ScreencastCapture {
    type Handle = ScreencastHandle;

    async fn start(&self, page: &Page, output: &Path) -> FlowResult<ScreencastHandle> {
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut encoder = FfmpegCommand::new(&self.config, output).spawn()?;
        let stdin = encoder
            .stdin
            .take()
            .ok_or_else(|| FlowEngineError::Encoder("ffmpeg stdin unavailable".to_string()))?;
        let stderr = encoder.stderr.take().map(drain_stderr);

        let frames = page
            .event_listener::<EventScreencastFrame>()
            .await
            .map_err(|e| FlowEngineError::Capture(format!("cannot subscribe to frames: {}", e)))?;

        let mut params = StartScreencastParams::default();
        params.format = Some(StartScreencastFormat::Jpeg);
        params.quality = Some(i64::from(self.config.quality.min(100)));
        params.every_nth_frame = Some(1);
        page.execute(params)
            .await
            .map_err(|e| FlowEngineError::Capture(format!("cannot start screencast: {}", e)))?;

        let (stop_tx, stop_rx) = oneshot::channel();
        let sink = FrameSink::new(stdin, self.config.fps);
        let pump = tokio::spawn(pump_frames(page.clone(), Box::pin(frames), sink, stop_rx));

        debug!("Screencast started at {} fps", self.config.fps);
        Ok(ScreencastHandle {
            page: page.clone(),
            stop_tx,
            pump,
            encoder,
            stderr,
            output: output.to_path_buf(),
        })
    }

    async fn stop(&self, handle: ScreencastHandle) -> FlowResult<()> {
        let ScreencastHandle {
            page,
            stop_tx,
            pump,
            mut encoder,
            stderr,
            output,
        } = handle;

        if let Err(e) = page.execute(StopScreencastParams::default()).await {
            warn!("Failed to stop screencast cleanly: {}", e);
        }
        // The pump may already have exited if the page went away
        let _ = stop_tx.send(());

        let pumped = pump
            .await
            .map_err(|e| FlowEngineError::Capture(format!("frame pump panicked: {}", e)))?;
        let status = encoder.wait().await?;
        let tail = match stderr {
            Some(task) => task.await.unwrap_or_default(),
            None => Vec::new(),
        };

        let frames = pumped?;
        if !status.success() {
            return Err(FlowEngineError::Encoder(format!(
                "ffmpeg exited with {} while writing {:?}: {}",
                status,
                output,
                tail.join("\n")
            )));
        }

        info!("Video written to {:?} ({} frames)", output, frames);
        Ok(())
    }
}

async fn pump_frames<S, W>(
    page: Page,
    mut frames: S,
    mut sink: FrameSink<W>,
    mut stop: oneshot::Receiver<()>,
) -> FlowResult<u64>
where
    S: Stream<Item = Arc<EventScreencastFrame>> + Unpin,
    W: AsyncWrite + Unpin,
{
    loop {
        tokio::select! {
            _ = &mut stop => break,
            next = frames.next() => {
                let Some(frame) = next else { break };
                // Chrome stops sending frames until each one is acknowledged
                if let Err(e) = page.execute(ScreencastFrameAckParams::new(frame.session_id)).await {
                    debug!("Frame ack failed: {}", e);
                }
                let encoded: &str = frame.data.as_ref();
                match STANDARD.decode(encoded) {
                    Ok(bytes) => sink
                        .push(bytes, Instant::now())
                        .await
                        .map_err(|e| FlowEngineError::Encoder(format!("write to ffmpeg failed: {}", e)))?,
                    Err(e) => warn!("Dropping undecodable frame: {}", e),
                }
            }
        }
    }

    sink.finish(Instant::now())
        .await
        .map_err(|e| FlowEngineError::Encoder(format!("closing ffmpeg input failed: {}", e)))
}
