use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

/// An application definition registered on the control plane.
///
/// The agent treats these as immutable snapshots. The application
/// lister replaces whole snapshots, it never mutates them in place.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Application {
  #[serde(default)]
  pub id: String,

  /// The application name. Unique within a project.
  pub name: String,

  #[serde(default)]
  pub kind: ApplicationKind,

  /// The environment this application deploys into.
  #[serde(default)]
  pub environment_id: String,

  /// Where the application's deployment configuration lives.
  pub git_path: GitPath,

  #[serde(default)]
  pub sync_state: SyncState,

  /// The deployment most recently triggered for this application,
  /// if any has ever been triggered.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub most_recently_triggered_deployment_id: Option<String>,
}

/// Location of an application's deployment configuration
/// inside its source repository.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GitPath {
  /// Id of a repository registered in the agent config.
  pub repo_id: String,
  /// Path of the deployment configuration file, relative to repo root.
  pub config_relative_path: String,
}

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  AsRefStr,
)]
pub enum ApplicationKind {
  #[default]
  Kubernetes,
  Terraform,
  CloudRun,
  Lambda,
  Ecs,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncState {
  #[serde(default)]
  pub status: SyncStatus,
}

/// Whether the observed cluster state matches the intended state.
/// Reported by the drift detector, read-only for the trigger.
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
pub enum SyncStatus {
  #[default]
  Unknown,
  Synced,
  OutOfSync,
  InvalidConfig,
}
