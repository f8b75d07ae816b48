use serde::{Deserialize, Serialize};

/// Subtypes of [Application][application::Application].
pub mod application;
/// Subtypes of [Command][command::Command].
pub mod command;
/// Subtypes of [DeploymentConfig][deploy_config::DeploymentConfig].
pub mod deploy_config;
/// Subtypes of [Deployment][deployment::Deployment].
pub mod deployment;
/// [Environment][environment::Environment].
pub mod environment;
/// Subtypes of [NotificationEvent][event::NotificationEvent].
pub mod event;

pub type I64 = i64;

/// Current unix timestamp in milliseconds.
pub fn piped_timestamp() -> I64 {
  std::time::SystemTime::now()
    .duration_since(std::time::UNIX_EPOCH)
    .map(|d| d.as_millis() as I64)
    .unwrap_or_default()
}

/// A git commit on an application's tracked branch,
/// as reported by the git client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Commit {
  pub hash: String,
  #[serde(default)]
  pub message: String,
  #[serde(default)]
  pub author: String,
  /// Author time, unix seconds.
  #[serde(default)]
  pub timestamp: I64,
}
