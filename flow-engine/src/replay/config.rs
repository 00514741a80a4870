//! Replay configuration

use std::path::PathBuf;
use std::time::Duration;

/// Per-process replay settings, built once from the command line
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayConfig {
    /// Drop `navigate` steps before replay
    pub ignore_navigation: bool,
    /// Pause around capture start and after each main-flow step
    pub step_delay: Duration,
    /// Pause after each pre-flow step
    pub pre_flow_step_delay: Duration,
    /// Show the browser window
    pub headful: bool,
    /// Warm-up flow replayed before capture starts
    pub pre_flow_path: Option<PathBuf>,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            ignore_navigation: false,
            step_delay: Duration::from_millis(3000),
            pre_flow_step_delay: Duration::ZERO,
            headful: false,
            pre_flow_path: None,
        }
    }
}

/// Input/output locations for a batch
#[derive(Debug, Clone, PartialEq)]
pub struct BatchConfig {
    /// A flow file or a directory of flow files
    pub input_path: PathBuf,
    /// Where videos are written
    pub output_dir: PathBuf,
}

impl BatchConfig {
    pub fn new(input_path: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_path: input_path.into(),
            output_dir: output_dir.into(),
        }
    }
}
