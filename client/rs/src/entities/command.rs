use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

use super::deployment::SyncStrategy;

/// Metadata key carrying the id of the deployment created
/// in response to a sync command.
pub const TRIGGERED_DEPLOYMENT_ID: &str = "TriggeredDeploymentID";

/// A user-issued command pending on the control plane.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Command {
  #[serde(default)]
  pub id: String,

  /// The application the command targets.
  pub application_id: String,

  /// The user who issued the command.
  #[serde(default)]
  pub commander: String,

  pub kind: CommandKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CommandKind {
  /// Deploy the application now, regardless of commit state.
  SyncApplication {
    /// Explicit strategy override. Defaults to Auto when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sync_strategy: Option<SyncStrategy>,
  },
  /// Handled by the deployment executor, not the trigger.
  CancelDeployment { deployment_id: String },
}

impl Command {
  /// The explicit strategy carried by a sync command, if any.
  pub fn sync_strategy(&self) -> Option<SyncStrategy> {
    match &self.kind {
      CommandKind::SyncApplication { sync_strategy } => *sync_strategy,
      _ => None,
    }
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  Display,
  AsRefStr,
)]
pub enum CommandStatus {
  Succeeded,
  Failed,
  Cancelled,
}
