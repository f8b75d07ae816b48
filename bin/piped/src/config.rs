use std::{path::PathBuf, sync::OnceLock};

use clap::Parser;
use logger::{LogConfig, LogLevel};
use serde::{Deserialize, Serialize};
use trigger::RepoEntry;

/// Piped agent command line arguments.
#[derive(Parser)]
#[command(name = "piped", version)]
pub struct CliArgs {
  /// Path of the piped config file.
  #[arg(long, short)]
  pub config_path: Option<PathBuf>,

  /// Override the logging level. One of `trace`, `debug`, `info`,
  /// `warn`, `error`.
  #[arg(long)]
  pub log_level: Option<LogLevel>,
}

/// Environment variable overrides. Every field maps from its
/// SCREAMING_SNAKE_CASE name, eg `PIPED_CONTROL_PLANE_ADDRESS`.
#[derive(Deserialize)]
struct Env {
  piped_config_path: Option<PathBuf>,
  piped_control_plane_address: Option<String>,
  piped_api_token: Option<String>,
  piped_sync_interval_secs: Option<u64>,
  piped_grace_period_secs: Option<u64>,
  piped_repo_root: Option<PathBuf>,
  piped_notification_webhook: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipedConfig {
  /// Address of the control plane API,
  /// eg `https://piped.example.com`.
  #[serde(default)]
  pub control_plane_address: String,

  /// Bearer token used to authenticate against the control plane.
  #[serde(default)]
  pub api_token: String,

  /// Seconds between commit / drift evaluation passes.
  #[serde(default = "default_sync_interval_secs")]
  pub sync_interval_secs: u64,

  /// How long shutdown waits for the trigger loop to finish
  /// the candidate in flight.
  #[serde(default = "default_grace_period_secs")]
  pub grace_period_secs: u64,

  /// Capacity of the last-triggered-commit cache.
  #[serde(default = "default_commit_cache_capacity")]
  pub commit_cache_capacity: usize,

  /// Seconds between application / command snapshot refreshes.
  #[serde(default = "default_lister_refresh_secs")]
  pub lister_refresh_secs: u64,

  /// Directory the working copies are cloned under.
  #[serde(default = "default_repo_root")]
  pub repo_root: PathBuf,

  /// Repositories to watch.
  #[serde(default)]
  pub repositories: Vec<RepoEntry>,

  /// Optional webhook receiving trigger notification events.
  #[serde(default)]
  pub notification_webhook: Option<String>,

  #[serde(default)]
  pub logging: LogConfig,
}

fn default_sync_interval_secs() -> u64 {
  60
}

fn default_grace_period_secs() -> u64 {
  30
}

fn default_commit_cache_capacity() -> usize {
  trigger::DEFAULT_CACHE_CAPACITY
}

fn default_lister_refresh_secs() -> u64 {
  10
}

fn default_repo_root() -> PathBuf {
  PathBuf::from("/var/lib/piped/repos")
}

impl Default for PipedConfig {
  fn default() -> Self {
    Self {
      control_plane_address: String::new(),
      api_token: String::new(),
      sync_interval_secs: default_sync_interval_secs(),
      grace_period_secs: default_grace_period_secs(),
      commit_cache_capacity: default_commit_cache_capacity(),
      lister_refresh_secs: default_lister_refresh_secs(),
      repo_root: default_repo_root(),
      repositories: Vec::new(),
      notification_webhook: None,
      logging: LogConfig::default(),
    }
  }
}

impl PipedConfig {
  pub fn sanitized(&self) -> PipedConfig {
    let mut config = self.clone();
    if !config.api_token.is_empty() {
      config.api_token = String::from("#############");
    }
    config
  }
}

pub fn piped_config() -> &'static PipedConfig {
  static PIPED_CONFIG: OnceLock<PipedConfig> = OnceLock::new();
  PIPED_CONFIG.get_or_init(|| {
    let env: Env =
      envy::from_env().expect("failed to parse piped environment");
    let args = CliArgs::parse();

    let config_path = args.config_path.or(env.piped_config_path);
    let mut config = match &config_path {
      Some(path) => {
        let contents =
          std::fs::read_to_string(path).unwrap_or_else(|e| {
            panic!("failed to read config file at {path:?} | {e}")
          });
        serde_yaml_ng::from_str(&contents)
          .expect("failed to parse piped config file")
      }
      None => {
        println!(
          "INFO: no config path given, using default config"
        );
        PipedConfig::default()
      }
    };

    if let Some(address) = env.piped_control_plane_address {
      config.control_plane_address = address;
    }
    if let Some(token) = env.piped_api_token {
      config.api_token = token;
    }
    if let Some(secs) = env.piped_sync_interval_secs {
      config.sync_interval_secs = secs;
    }
    if let Some(secs) = env.piped_grace_period_secs {
      config.grace_period_secs = secs;
    }
    if let Some(root) = env.piped_repo_root {
      config.repo_root = root;
    }
    if let Some(webhook) = env.piped_notification_webhook {
      config.notification_webhook = Some(webhook);
    }
    if let Some(level) = args.log_level {
      config.logging.level = level;
    }

    config
  })
}
