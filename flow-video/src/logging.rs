use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logging configuration for the flow-video binary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Whether to emit JSON formatted logs on stderr
    pub json_format: bool,

    /// Whether to include thread names in logs
    pub include_thread_names: bool,

    /// Whether to include file and line number information
    pub include_file_info: bool,

    /// Whether to enable colored output (only for non-JSON format)
    pub enable_colors: bool,

    /// Also append logs to this file
    pub log_file: Option<PathBuf>,

    /// Module-specific log levels
    pub module_levels: HashMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        let mut module_levels = HashMap::new();

        // chromiumoxide reports every CDP message it cannot deserialize
        module_levels.insert("chromiumoxide".to_string(), "error".to_string());
        module_levels.insert("tungstenite".to_string(), "warn".to_string());

        Self {
            level: "info".to_string(),
            json_format: false,
            include_thread_names: false,
            include_file_info: false,
            enable_colors: true,
            log_file: None,
            module_levels,
        }
    }
}

impl LoggingConfig {
    /// Filter built from the level and module directives
    pub fn env_filter(&self) -> anyhow::Result<EnvFilter> {
        let mut filter = EnvFilter::try_new(&self.level)
            .with_context(|| format!("Invalid log level: {}", self.level))?;

        for (module, level) in &self.module_levels {
            let directive = format!("{}={}", module, level);
            filter = filter.add_directive(
                directive
                    .parse()
                    .map_err(|e| anyhow!("Invalid log directive {}: {}", directive, e))?,
            );
        }
        Ok(filter)
    }
}

/// Initialize logging based on the provided configuration.
///
/// `RUST_LOG` wins over the configured level when set. The returned guard must
/// be held until exit when a log file is configured, or buffered lines are lost.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => config.env_filter()?,
    };

    let json = config.json_format.then(|| {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_thread_names(config.include_thread_names)
            .with_file(config.include_file_info)
            .with_line_number(config.include_file_info)
    });
    let plain = (!config.json_format).then(|| {
        fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr)
            .with_thread_names(config.include_thread_names)
            .with_file(config.include_file_info)
            .with_line_number(config.include_file_info)
            .with_ansi(config.enable_colors)
    });

    let (file, guard) = match &config.log_file {
        Some(path) => {
            let (writer, guard) = tracing_appender::non_blocking(create_file_appender(path)?);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let result = tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(plain)
        .with(file)
        .try_init();

    match result {
        Ok(_) => {
            tracing::debug!("Logging initialized with config level: {}", config.level);
        }
        Err(_) => {
            // Logging already initialized, that's fine
            tracing::debug!("Logging already initialized, skipping");
        }
    }

    Ok(guard)
}

/// Non-rotating appender writing to `log_file`
fn create_file_appender(
    log_file: &Path,
) -> anyhow::Result<tracing_appender::rolling::RollingFileAppender> {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};

    let directory = match log_file.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let filename = log_file
        .file_name()
        .ok_or_else(|| anyhow!("Invalid log file name: {:?}", log_file))?;

    std::fs::create_dir_all(directory)
        .with_context(|| format!("Failed to create log directory {:?}", directory))?;

    Ok(RollingFileAppender::new(Rotation::NEVER, directory, filename))
}

/// Log level utilities
pub mod levels {
    /// Check if a log level string is valid
    pub fn is_valid_level(level: &str) -> bool {
        valid_levels().contains(&level.to_lowercase().as_str())
    }

    /// Get all valid log levels
    pub fn valid_levels() -> Vec<&'static str> {
        vec!["trace", "debug", "info", "warn", "error"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_logging_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert!(!config.json_format);
        assert!(config.enable_colors);
        assert!(config.log_file.is_none());
        assert_eq!(
            config.module_levels.get("chromiumoxide").map(String::as_str),
            Some("error")
        );
    }

    #[test]
    fn test_log_level_validation() {
        assert!(levels::is_valid_level("info"));
        assert!(levels::is_valid_level("DEBUG"));
        assert!(levels::is_valid_level("Error"));
        assert!(!levels::is_valid_level("verbose"));
        assert!(!levels::is_valid_level(""));
    }

    #[test]
    fn test_env_filter_accepts_module_levels() {
        let mut config = LoggingConfig::default();
        config.module_levels.insert("flow_engine".into(), "trace".into());
        assert!(config.env_filter().is_ok());
    }

    #[test]
    fn test_env_filter_rejects_bad_directive() {
        let mut config = LoggingConfig::default();
        config.module_levels.insert("flow_engine".into(), "verbose".into());
        assert!(config.env_filter().is_err());
    }

    #[test]
    fn test_file_appender_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("flow-video.log");
        create_file_appender(&path).unwrap();
        assert!(dir.path().join("logs").is_dir());
    }
}
