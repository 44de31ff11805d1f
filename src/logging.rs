//! Tracing setup: console output on stderr plus an optional timestamped log file.
//!
//! Stdout is left to command results so a caller can parse it.

use crate::config::LoggingConfig;
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Keeps the file writer alive; drop it only when the process is done logging
pub struct Logging {
    _guard: Option<WorkerGuard>,
    file: Option<PathBuf>,
}

impl Logging {
    /// Install the global subscriber.
    ///
    /// `RUST_LOG` overrides `config.level` when set.
    pub fn init(config: &LoggingConfig, target: &str) -> Result<Self> {
        let filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => build_filter(target, &config.level)?,
        };

        let console = match config.format.as_str() {
            "json" => fmt::layer()
                .json()
                .with_target(true)
                .with_writer(std::io::stderr)
                .boxed(),
            _ => fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .boxed(),
        };

        let (file_layer, guard, file) = match &config.dir {
            Some(dir) => {
                fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
                let name = log_file_name(Local::now());
                let appender = tracing_appender::rolling::never(dir, &name);
                let (writer, guard) = tracing_appender::non_blocking(appender);
                let layer = fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_line_number(true);
                (Some(layer), Some(guard), Some(dir.join(name)))
            }
            None => (None, None, None),
        };

        tracing_subscriber::registry()
            .with(filter)
            .with(console)
            .with(file_layer)
            .try_init()
            .context("Failed to install tracing subscriber")?;

        Ok(Self {
            _guard: guard,
            file,
        })
    }

    /// Path of the log file for this run, if file logging is enabled
    pub fn log_file(&self) -> Option<&Path> {
        self.file.as_deref()
    }
}

fn build_filter(target: &str, level: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(format!("warn,{}={}", target, level))
        .with_context(|| format!("Invalid log level '{}'", level))
}

fn log_file_name(now: DateTime<Local>) -> String {
    now.format("%Y_%m_%d_%H_%M_%S.log").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_log_file_name() {
        let now = Local.with_ymd_and_hms(2024, 3, 7, 9, 5, 1).unwrap();
        assert_eq!(log_file_name(now), "2024_03_07_09_05_01.log");
    }

    #[test]
    fn test_build_filter() {
        assert!(build_filter("predictive_maintenance", "debug").is_ok());
        assert!(build_filter("predictive_maintenance", "loud").is_err());
    }
}
