use serde::{Deserialize, Serialize};

use super::{application::ApplicationKind, event::NotificationEventKind};

/// An application's deployment configuration, parsed from the YAML file
/// at `git_path.config_relative_path` inside its source repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentConfig {
  /// Must match the kind of the application it configures.
  pub kind: ApplicationKind,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub deployment_notification: Option<DeploymentNotification>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeploymentNotification {
  #[serde(default)]
  pub mentions: Vec<NotificationMention>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationMention {
  /// Event name the mention applies to, or `*` for every event.
  pub event: String,
  /// Slack accounts to mention.
  #[serde(default)]
  pub slack: Vec<String>,
}

impl DeploymentNotification {
  /// Slack accounts to mention for the given event, deduplicated.
  pub fn find_slack_accounts(
    &self,
    event: NotificationEventKind,
  ) -> Vec<String> {
    let mut accounts = Vec::new();
    for mention in &self.mentions {
      if mention.event == "*" || mention.event == event.as_ref() {
        accounts.extend(mention.slack.iter().cloned());
      }
    }
    accounts.sort();
    accounts.dedup();
    accounts
  }
}
