use std::{sync::Arc, time::Duration};

use arc_swap::ArcSwap;
use piped_client::{
  PipedClient,
  entities::{application::Application, command::Command},
};
use trigger::{ApplicationLister, CommandLister};

/// In-memory snapshots of control plane state the trigger reads.
/// Kept fresh by a background refresh loop. A failed refresh keeps
/// the previous snapshot.
pub struct SnapshotStore {
  client: Arc<PipedClient>,
  applications: ArcSwap<Vec<Application>>,
  commands: ArcSwap<Vec<Command>>,
}

impl SnapshotStore {
  pub fn new(client: Arc<PipedClient>) -> Arc<SnapshotStore> {
    Arc::new(SnapshotStore {
      client,
      applications: ArcSwap::from_pointee(Vec::new()),
      commands: ArcSwap::from_pointee(Vec::new()),
    })
  }

  pub fn spawn_refresh_loop(
    store: Arc<SnapshotStore>,
    refresh_interval: Duration,
  ) {
    tokio::spawn(async move {
      let mut interval = tokio::time::interval(refresh_interval);
      loop {
        interval.tick().await;
        store.refresh_applications().await;
        store.refresh_commands().await;
      }
    });
  }

  async fn refresh_applications(&self) {
    match self.client.list_applications().await {
      Ok(applications) => {
        self.applications.store(Arc::new(applications))
      }
      Err(e) => {
        warn!("failed to refresh application snapshot | {e:#}")
      }
    }
  }

  async fn refresh_commands(&self) {
    match self.client.list_pending_commands().await {
      Ok(commands) => self.commands.store(Arc::new(commands)),
      Err(e) => {
        warn!("failed to refresh pending command snapshot | {e:#}")
      }
    }
  }
}

impl ApplicationLister for SnapshotStore {
  fn get(&self, application_id: &str) -> Option<Application> {
    self
      .applications
      .load()
      .iter()
      .find(|app| app.id == application_id)
      .cloned()
  }

  fn list(&self) -> Vec<Application> {
    self.applications.load().as_ref().clone()
  }
}

impl CommandLister for SnapshotStore {
  fn list_application_commands(&self) -> Vec<Command> {
    self.commands.load().as_ref().clone()
  }
}
