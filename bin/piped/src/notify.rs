use anyhow::{Context, anyhow};
use async_trait::async_trait;
use piped_client::entities::event::NotificationEvent;
use trigger::Notifier;

/// Delivers trigger events to the configured webhook, or only logs
/// them when none is configured. Delivery failures are logged and
/// swallowed here, they never reach the trigger loop.
pub struct EventNotifier {
  webhook: Option<String>,
  http: reqwest::Client,
}

impl EventNotifier {
  pub fn new(webhook: Option<String>) -> EventNotifier {
    EventNotifier { webhook, http: Default::default() }
  }

  async fn post_event(
    &self,
    url: &str,
    event: &NotificationEvent,
  ) -> anyhow::Result<()> {
    let response = self
      .http
      .post(url)
      .json(event)
      .send()
      .await
      .context("failed to send notification")?;
    let status = response.status();
    if status.is_success() {
      return Ok(());
    }
    let text = response.text().await.unwrap_or_default();
    Err(anyhow!("notification webhook returned {status} | {text}"))
  }
}

#[async_trait]
impl Notifier for EventNotifier {
  async fn notify(&self, event: NotificationEvent) {
    match &self.webhook {
      Some(url) => {
        if let Err(e) = self.post_event(url, &event).await {
          error!(
            "failed to deliver {} notification | {e:#}",
            event.kind(),
          );
        }
      }
      None => info!(
        "{} | {}",
        event.kind(),
        serde_json::to_string(&event).unwrap_or_default(),
      ),
    }
  }
}
