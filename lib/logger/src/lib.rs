use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
  Registry, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Logging setup of the agent process.
#[derive(
  Debug, Clone, Default, PartialEq, Serialize, Deserialize,
)]
pub struct LogConfig {
  /// Minimum level that gets logged. default: info
  #[serde(default)]
  pub level: LogLevel,

  /// How log lines are written to stdio. default: standard
  #[serde(default)]
  pub format: LogFormat,

  /// Attach the source location (file and line) to every log line.
  #[serde(default)]
  pub include_location: bool,
}

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
  Trace,
  Debug,
  #[default]
  Info,
  Warn,
  Error,
}

impl From<LogLevel> for tracing::Level {
  fn from(level: LogLevel) -> tracing::Level {
    match level {
      LogLevel::Trace => tracing::Level::TRACE,
      LogLevel::Debug => tracing::Level::DEBUG,
      LogLevel::Info => tracing::Level::INFO,
      LogLevel::Warn => tracing::Level::WARN,
      LogLevel::Error => tracing::Level::ERROR,
    }
  }
}

/// Lets clap parse `--log-level debug` directly into a [LogLevel].
impl std::str::FromStr for LogLevel {
  type Err = anyhow::Error;

  fn from_str(value: &str) -> Result<LogLevel, Self::Err> {
    match value.to_lowercase().as_str() {
      "trace" => Ok(LogLevel::Trace),
      "debug" => Ok(LogLevel::Debug),
      "info" => Ok(LogLevel::Info),
      "warn" | "warning" => Ok(LogLevel::Warn),
      "error" => Ok(LogLevel::Error),
      other => Err(anyhow!("'{other}' is not a log level")),
    }
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
  /// Compact single-line output.
  #[default]
  Standard,
  /// Multi-line human-oriented output.
  Pretty,
  Json,
  /// Disable stdio logging entirely.
  None,
}

pub fn init(config: &LogConfig) -> anyhow::Result<()> {
  let registry = Registry::default()
    .with(LevelFilter::from(tracing::Level::from(config.level)));

  match config.format {
    LogFormat::Standard => registry
      .with(
        tracing_subscriber::fmt::layer()
          .with_file(config.include_location)
          .with_line_number(config.include_location),
      )
      .try_init(),
    LogFormat::Pretty => registry
      .with(
        tracing_subscriber::fmt::layer()
          .pretty()
          .with_file(config.include_location)
          .with_line_number(config.include_location),
      )
      .try_init(),
    LogFormat::Json => registry
      .with(tracing_subscriber::fmt::layer().json())
      .try_init(),
    LogFormat::None => Ok(()),
  }
  .context("failed to init logger")
}
