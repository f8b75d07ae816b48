use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

use super::{
  Commit, I64,
  application::{ApplicationKind, GitPath},
};

/// A deployment record submitted to the control plane.
///
/// The control plane assigns the id. The agent sends `id` empty and
/// reads the assigned value back from the create response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Deployment {
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub id: String,

  pub application_id: String,
  pub application_name: String,

  #[serde(default)]
  pub kind: ApplicationKind,

  #[serde(default)]
  pub environment_id: String,

  pub git_path: GitPath,

  /// The branch tracked by the working copy the deployment was built from.
  pub branch: String,

  pub trigger: DeploymentTrigger,
}

/// Why and when the deployment was created.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeploymentTrigger {
  /// Head commit of the tracked branch at trigger time.
  pub commit: Commit,

  /// The user who requested the deployment.
  /// Empty unless the deployment was triggered by a sync command.
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub commander: String,

  #[serde(default)]
  pub sync_strategy: SyncStrategy,

  /// Trigger time, unix milliseconds.
  #[serde(default)]
  pub timestamp: I64,
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
  Display,
  AsRefStr,
)]
pub enum SyncStrategy {
  /// Let the planner choose between quick sync and pipeline.
  #[default]
  Auto,
  QuickSync,
  Pipeline,
}
