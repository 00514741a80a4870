//! Flow Engine Error Types

use crate::flow::model::StepKind;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the flow engine
#[derive(Debug, Error)]
pub enum FlowEngineError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Malformed flow {path:?}: {source}")]
    FlowParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid flow {path:?}: {reason}")]
    InvalidFlow { path: PathBuf, reason: String },

    #[error("Browser launch failed: {0}")]
    BrowserLaunch(String),

    #[error("Page navigation failed: {0}")]
    Navigation(String),

    #[error("Element not found: {selector}")]
    ElementNotFound { selector: String },

    #[error("Timeout waiting for {condition}: {details}")]
    Timeout { condition: String, details: String },

    #[error("Step execution failed: {0}")]
    StepExecution(String),

    #[error("Step {index} ({kind}) failed: {source}")]
    StepFailed {
        index: usize,
        kind: StepKind,
        #[source]
        source: Box<FlowEngineError>,
    },

    #[error("Pre-flow step {index} ({kind}) failed: {source}")]
    PreFlowStepFailed {
        index: usize,
        kind: StepKind,
        #[source]
        source: Box<FlowEngineError>,
    },

    #[error("Capture error: {0}")]
    Capture(String),

    #[error("Video encoder error: {0}")]
    Encoder(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse failure taxonomy used for reporting at the process boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Bad input detected before any browser session exists
    Configuration,
    /// A step could not be performed against the live page
    Driver,
    /// The capture subsystem failed to start or finalise
    Capture,
}

impl FlowEngineError {
    pub fn class(&self) -> ErrorClass {
        match self {
            FlowEngineError::Configuration(_)
            | FlowEngineError::FlowParse { .. }
            | FlowEngineError::InvalidFlow { .. } => ErrorClass::Configuration,
            FlowEngineError::Capture(_) | FlowEngineError::Encoder(_) => ErrorClass::Capture,
            FlowEngineError::StepFailed { source, .. }
            | FlowEngineError::PreFlowStepFailed { source, .. } => source.class(),
            FlowEngineError::Io(_)
            | FlowEngineError::BrowserLaunch(_)
            | FlowEngineError::Navigation(_)
            | FlowEngineError::ElementNotFound { .. }
            | FlowEngineError::Timeout { .. }
            | FlowEngineError::StepExecution(_) => ErrorClass::Driver,
        }
    }
}

/// Result type alias for flow engine operations
pub type FlowResult<T> = Result<T, FlowEngineError>;
