//! Flow Engine - Recorder flow replay with video capture
//!
//! This crate replays flows exported by the Chrome DevTools Recorder in a real
//! Chromium instance and records the page into a video while doing so.
//!
//! ## Core Concepts
//!
//! - **Flow**: an ordered list of recorder steps loaded from JSON
//! - **Driver**: launches a browser, opens a page and executes single steps
//! - **Capture**: records a page into a file between `start` and `stop`
//! - **ReplayOrchestrator**: one browser session, optional pre-flow, paced
//!   steps, capture bracketed around the main flow
//! - **BatchDriver**: one video per flow file in a directory
//!
//! ## Example
//!
//! ```rust,ignore
//! use flow_engine::{BatchConfig, BatchDriver, ChromeDriver, ReplayConfig, ScreencastCapture};
//!
//! let driver = ChromeDriver::new(Default::default());
//! let capture = ScreencastCapture::new(Default::default());
//! let replay = ReplayConfig::default();
//! let batch = BatchConfig::new("flows/", "videos/");
//!
//! let report = BatchDriver::new(&driver, &capture, &replay, &batch).run().await?;
//! ```

pub mod batch;
pub mod capture;
pub mod error;
pub mod flow;
pub mod replay;

// Re-exports
pub use batch::{output_path_for, resolve_sources, BatchDriver, BatchReport};
pub use capture::lifecycle::{CaptureLifecycle, CaptureState};
pub use capture::screencast::ScreencastCapture;
pub use capture::{Capture, CaptureConfig};
pub use error::{ErrorClass, FlowEngineError, FlowResult};
pub use flow::browser::{BrowserOptions, ChromeDriver, ManagedBrowser};
pub use flow::driver::Driver;
pub use flow::filter::StepFilter;
pub use flow::loader::load_flow;
pub use flow::model::{CountOperator, Flow, MouseButton, Selector, Step, StepKind};
pub use flow::page::PageController;
pub use replay::config::{BatchConfig, ReplayConfig};
pub use replay::orchestrator::{ReplayOrchestrator, ReplayReport};
pub use replay::pacing::{Pacing, PacingSite};
pub use replay::runner::{FlowRunner, RunnerExtension};
