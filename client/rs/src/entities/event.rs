use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

use super::{application::Application, deployment::Deployment};

/// Events emitted by the deployment trigger towards the notifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationEvent {
  DeploymentTriggered {
    deployment: Deployment,
    /// Resolved environment name. Empty when the lookup failed.
    #[serde(default)]
    env_name: String,
    #[serde(default)]
    mentioned_accounts: Vec<String>,
  },
  DeploymentTriggerFailed {
    application: Application,
    commit_hash: String,
    commit_message: String,
    reason: String,
    #[serde(default)]
    env_name: String,
    #[serde(default)]
    mentioned_accounts: Vec<String>,
  },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
pub enum NotificationEventKind {
  #[strum(serialize = "DEPLOYMENT_TRIGGERED")]
  DeploymentTriggered,
  #[strum(serialize = "DEPLOYMENT_TRIGGER_FAILED")]
  DeploymentTriggerFailed,
}

impl NotificationEvent {
  pub fn kind(&self) -> NotificationEventKind {
    match self {
      NotificationEvent::DeploymentTriggered { .. } => {
        NotificationEventKind::DeploymentTriggered
      }
      NotificationEvent::DeploymentTriggerFailed { .. } => {
        NotificationEventKind::DeploymentTriggerFailed
      }
    }
  }
}
