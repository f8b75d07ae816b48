#[macro_use]
extern crate tracing;

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use git::GitCommandClient;
use piped_client::PipedClient;
use tokio_util::sync::CancellationToken;
use trigger::{Trigger, TriggerConfig};

use crate::config::piped_config;

mod config;
mod env_store;
mod listers;
mod notify;

async fn app(shutdown: CancellationToken) -> anyhow::Result<()> {
  dotenvy::dotenv().ok();
  let config = piped_config();
  logger::init(&config.logging)?;

  info!("piped version: v{}", env!("CARGO_PKG_VERSION"));
  info!("{:?}", config.sanitized());

  let client = Arc::new(PipedClient::new(
    &config.control_plane_address,
    &config.api_token,
  ));

  let snapshots = listers::SnapshotStore::new(client.clone());
  listers::SnapshotStore::spawn_refresh_loop(
    snapshots.clone(),
    Duration::from_secs(config.lister_refresh_secs),
  );

  let trigger = Trigger::new(
    client.clone(),
    Arc::new(GitCommandClient),
    snapshots.clone(),
    snapshots,
    Arc::new(env_store::EnvironmentStore::new(client)),
    Arc::new(notify::EventNotifier::new(
      config.notification_webhook.clone(),
    )),
    TriggerConfig {
      repositories: config.repositories.clone(),
      repo_root: config.repo_root.clone(),
      sync_interval: Duration::from_secs(config.sync_interval_secs),
      commit_cache_capacity: config.commit_cache_capacity,
    },
  );

  trigger.run(shutdown).await
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let shutdown = CancellationToken::new();
  let mut app = tokio::spawn(app(shutdown.clone()));

  let mut term_signal = tokio::signal::unix::signal(
    tokio::signal::unix::SignalKind::terminate(),
  )?;

  tokio::select! {
    res = &mut app => {
      return res.context("trigger task panicked")?;
    }
    _ = term_signal.recv() => {}
    _ = tokio::signal::ctrl_c() => {}
  }

  // Let the loop finish the candidate in flight, bounded by the
  // grace period.
  shutdown.cancel();
  let grace =
    Duration::from_secs(piped_config().grace_period_secs);
  match tokio::time::timeout(grace, &mut app).await {
    Ok(res) => res.context("trigger task panicked")?,
    Err(_) => {
      warn!(
        "deployment trigger did not stop within {grace:?}, exiting"
      );
      app.abort();
      Ok(())
    }
  }
}
