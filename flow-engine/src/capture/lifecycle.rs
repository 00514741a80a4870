//! Capture lifecycle controller

use crate::capture::Capture;
use crate::error::{FlowEngineError, FlowResult};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing::info;

/// Recording session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Uninitialized,
    Recording,
    Stopped,
}

/// Owns the capture handle of one replay.
///
/// `start` may succeed once; `stop` is idempotent so it can sit on every exit
/// path of the replay.
pub struct CaptureLifecycle<'c, P, C>
where
    P: Send + Sync,
    C: Capture<P>,
{
    backend: &'c C,
    handle: Option<C::Handle>,
    state: CaptureState,
    output: Option<PathBuf>,
    _page: PhantomData<fn(&P)>,
}

impl<'c, P, C> CaptureLifecycle<'c, P, C>
where
    P: Send + Sync,
    C: Capture<P>,
{
    pub fn new(backend: &'c C) -> Self {
        Self {
            backend,
            handle: None,
            state: CaptureState::Uninitialized,
            output: None,
            _page: PhantomData,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub async fn start(&mut self, page: &P, output: &Path) -> FlowResult<()> {
        if self.state != CaptureState::Uninitialized {
            return Err(FlowEngineError::Capture(format!(
                "capture already {:?}, refusing to start again",
                self.state
            )));
        }
        let handle = self.backend.start(page, output).await?;
        self.handle = Some(handle);
        self.output = Some(output.to_path_buf());
        self.state = CaptureState::Recording;
        info!("Capture started: {:?}", output);
        Ok(())
    }

    /// Stop the recording if one is running. Returns whether a stop happened.
    pub async fn stop(&mut self) -> FlowResult<bool> {
        if self.state != CaptureState::Recording {
            return Ok(false);
        }
        self.state = CaptureState::Stopped;
        let Some(handle) = self.handle.take() else {
            return Ok(false);
        };
        self.backend.stop(handle).await?;
        info!("Capture stopped: {:?}", self.output.as_deref().unwrap_or(Path::new("")));
        Ok(true)
    }
}
