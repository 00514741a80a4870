//! flow-video - render Chrome DevTools Recorder flows into videos
//!
//! Command-line surface over `flow-engine`: parses arguments once into the
//! engine's configuration structs and runs a batch with the Chromium driver
//! and the screencast capture backend.

pub mod logging;

use anyhow::Context;
use clap::{ArgAction, Parser};
use flow_engine::{
    BatchConfig, BatchDriver, BatchReport, BrowserOptions, CaptureConfig, ChromeDriver,
    ErrorClass, FlowEngineError, ReplayConfig, ScreencastCapture,
};
use logging::{levels, LoggingConfig};
use std::path::PathBuf;
use std::time::Duration;

/// Replay Chrome DevTools Recorder flows and record each one as an mp4
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "flow-video", author, version, about, long_about = None)]
#[command(disable_version_flag = true)]
pub struct Args {
    /// Recorder flow (.json) or a directory of recorder flows
    pub input_path: PathBuf,

    /// Flow replayed before recording starts, e.g. a login
    #[arg(long = "pre_flow_path", visible_alias = "pre-flow-path")]
    pub pre_flow_path: Option<PathBuf>,

    /// Drop navigate steps from the recorded flows
    #[arg(long = "ignore_navigation", visible_alias = "ignore-navigation")]
    pub ignore_navigation: bool,

    /// Directory the videos are written to
    #[arg(
        long = "output_dir_path",
        visible_alias = "output-dir-path",
        default_value = "./videos"
    )]
    pub output_dir_path: PathBuf,

    /// Pause in milliseconds around capture start and after each step
    #[arg(long = "sleep_time", visible_alias = "sleep-time", default_value_t = 3000)]
    pub sleep_time: u64,

    /// Pause in milliseconds after each pre-flow step
    #[arg(
        long = "pre_flow_sleep_time",
        visible_alias = "pre-flow-sleep-time",
        default_value_t = 0
    )]
    pub pre_flow_sleep_time: u64,

    /// Show the browser window
    #[arg(long)]
    pub headful: bool,

    /// Output video frame rate
    #[arg(long, default_value_t = 25, value_parser = clap::value_parser!(u32).range(1..=60))]
    pub fps: u32,

    /// ffmpeg binary used to encode the video
    #[arg(
        long = "ffmpeg_path",
        visible_alias = "ffmpeg-path",
        env = "FLOW_VIDEO_FFMPEG",
        default_value = "ffmpeg"
    )]
    pub ffmpeg_path: PathBuf,

    /// Chrome/Chromium binary; auto-detected when unset
    #[arg(long = "chrome_path", visible_alias = "chrome-path", env = "FLOW_VIDEO_CHROME")]
    pub chrome_path: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(
        long = "log_level",
        visible_alias = "log-level",
        default_value = "info",
        value_parser = parse_log_level
    )]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long = "json_logs", visible_alias = "json-logs")]
    pub json_logs: bool,

    /// Also write logs to this file
    #[arg(long = "log_file", visible_alias = "log-file")]
    pub log_file: Option<PathBuf>,

    /// Print version
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    version: Option<bool>,
}

fn parse_log_level(raw: &str) -> Result<String, String> {
    if levels::is_valid_level(raw) {
        Ok(raw.to_lowercase())
    } else {
        Err(format!(
            "expected one of: {}",
            levels::valid_levels().join(", ")
        ))
    }
}

impl Args {
    pub fn replay_config(&self) -> ReplayConfig {
        ReplayConfig {
            ignore_navigation: self.ignore_navigation,
            step_delay: Duration::from_millis(self.sleep_time),
            pre_flow_step_delay: Duration::from_millis(self.pre_flow_sleep_time),
            headful: self.headful,
            pre_flow_path: self.pre_flow_path.clone(),
        }
    }

    pub fn batch_config(&self) -> BatchConfig {
        BatchConfig::new(&self.input_path, &self.output_dir_path)
    }

    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            ffmpeg_path: self.ffmpeg_path.clone(),
            fps: self.fps,
            ..Default::default()
        }
    }

    pub fn browser_options(&self) -> BrowserOptions {
        BrowserOptions {
            executable: self.chrome_path.clone(),
            ..BrowserOptions::default().headless(!self.headful)
        }
    }

    pub fn logging_config(&self) -> LoggingConfig {
        LoggingConfig {
            level: self.log_level.clone(),
            json_format: self.json_logs,
            log_file: self.log_file.clone(),
            ..Default::default()
        }
    }
}

/// Render every flow designated by `args`
pub async fn run(args: &Args) -> anyhow::Result<BatchReport> {
    let replay = args.replay_config();
    let batch = args.batch_config();
    let driver = ChromeDriver::new(args.browser_options());
    let capture = ScreencastCapture::new(args.capture_config());

    BatchDriver::new(&driver, &capture, &replay, &batch)
        .run()
        .await
        .with_context(|| format!("Failed to render {:?}", batch.input_path))
}

/// Process exit status for a failed run
pub fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<FlowEngineError>().map(FlowEngineError::class) {
        Some(ErrorClass::Configuration) => 2,
        Some(ErrorClass::Driver) => 3,
        Some(ErrorClass::Capture) => 4,
        None => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_follows_error_class() {
        let err = anyhow::Error::new(FlowEngineError::Configuration("x".into())).context("outer");
        assert_eq!(exit_code(&err), 2);
        let err = anyhow::Error::new(FlowEngineError::ElementNotFound {
            selector: "#a".into(),
        });
        assert_eq!(exit_code(&err), 3);
        let err = anyhow::Error::new(FlowEngineError::Encoder("ffmpeg".into()));
        assert_eq!(exit_code(&err), 4);
        assert_eq!(exit_code(&anyhow::anyhow!("other")), 1);
    }

    #[test]
    fn test_parse_log_level_normalizes_case() {
        assert_eq!(parse_log_level("DEBUG").unwrap(), "debug");
        assert!(parse_log_level("loud").is_err());
    }
}
