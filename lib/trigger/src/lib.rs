//! The deployment trigger decides, for every registered application,
//! whether a new deployment should be created on the control plane.
//! Three signals can cause a trigger: a new commit on the tracked
//! branch, a user-issued sync command, and a reported out-of-sync
//! state. The trigger loads the application's deployment configuration
//! from its working copy, consults a per-signal determiner, and on a
//! positive decision submits the deployment and emits notifications.

#[macro_use]
extern crate tracing;

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context;
use async_trait::async_trait;
use git::GitClient;
use piped_client::{
  api::ControlPlaneApi,
  entities::{
    application::Application, command::Command,
    environment::Environment, event::NotificationEvent,
  },
};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

mod candidates;
mod commit_store;
mod determiner;
mod executor;
mod repos;

#[cfg(test)]
mod test_utils;

pub use candidates::{Candidate, CandidateKind};
pub use commit_store::{
  DEFAULT_CACHE_CAPACITY, LastTriggeredCommitStore,
};
pub use determiner::{CommitFilter, TriggerAll};
pub use repos::{RepoEntry, RepoSet};

/// How often user-issued sync commands are checked for.
const ONDEMAND_CHECK_INTERVAL: Duration = Duration::from_secs(10);

/// Read access to the application snapshot kept fresh
/// by the application watcher.
pub trait ApplicationLister: Send + Sync {
  fn get(&self, application_id: &str) -> Option<Application>;
  fn list(&self) -> Vec<Application>;
}

/// Read access to the pending command snapshot kept fresh
/// by the command watcher.
pub trait CommandLister: Send + Sync {
  fn list_application_commands(&self) -> Vec<Command>;
}

/// Environment lookup. Failures are non-fatal for the trigger,
/// notifications simply go out without an environment name.
#[async_trait]
pub trait EnvironmentLister: Send + Sync {
  async fn get(
    &self,
    environment_id: &str,
  ) -> anyhow::Result<Environment>;
}

/// Receives trigger events. Implementations own their delivery
/// failures, the trigger never sees them.
#[async_trait]
pub trait Notifier: Send + Sync {
  async fn notify(&self, event: NotificationEvent);
}

pub struct TriggerConfig {
  /// Repositories to watch, cloned once at startup.
  pub repositories: Vec<RepoEntry>,
  /// Directory the working copies are cloned under.
  pub repo_root: PathBuf,
  /// Cadence of commit / out-of-sync evaluation.
  pub sync_interval: Duration,
  /// Capacity of the last-triggered-commit cache.
  pub commit_cache_capacity: usize,
}

impl Default for TriggerConfig {
  fn default() -> Self {
    Self {
      repositories: Vec::new(),
      repo_root: PathBuf::from("repos"),
      sync_interval: Duration::from_secs(60),
      commit_cache_capacity: DEFAULT_CACHE_CAPACITY,
    }
  }
}

pub struct Trigger {
  api: Arc<dyn ControlPlaneApi>,
  git: Arc<dyn GitClient>,
  applications: Arc<dyn ApplicationLister>,
  commands: Arc<dyn CommandLister>,
  environments: Arc<dyn EnvironmentLister>,
  notifier: Arc<dyn Notifier>,
  commit_filter: Arc<dyn CommitFilter>,
  commit_store: LastTriggeredCommitStore,
  repositories: Vec<RepoEntry>,
  repo_root: PathBuf,
  sync_interval: Duration,
}

impl Trigger {
  pub fn new(
    api: Arc<dyn ControlPlaneApi>,
    git: Arc<dyn GitClient>,
    applications: Arc<dyn ApplicationLister>,
    commands: Arc<dyn CommandLister>,
    environments: Arc<dyn EnvironmentLister>,
    notifier: Arc<dyn Notifier>,
    config: TriggerConfig,
  ) -> Trigger {
    let commit_store = LastTriggeredCommitStore::new(
      api.clone(),
      config.commit_cache_capacity,
    );
    Trigger {
      api,
      git,
      applications,
      commands,
      environments,
      notifier,
      commit_filter: Arc::new(TriggerAll),
      commit_store,
      repositories: config.repositories,
      repo_root: config.repo_root,
      sync_interval: config.sync_interval,
    }
  }

  /// Replace the policy deciding whether a commit range is relevant
  /// to an application. Defaults to [TriggerAll].
  pub fn with_commit_filter(
    mut self,
    filter: Arc<dyn CommitFilter>,
  ) -> Trigger {
    self.commit_filter = filter;
    self
  }

  /// Runs the trigger until `shutdown` is cancelled.
  ///
  /// Clones every configured repository first. A clone failure is
  /// fatal and the loop never starts. After that, batch errors are
  /// logged and the loop keeps going.
  pub async fn run(
    self,
    shutdown: CancellationToken,
  ) -> anyhow::Result<()> {
    let repos = RepoSet::clone_all(
      self.git.as_ref(),
      &self.repositories,
      &self.repo_root,
    )
    .await
    .context(
      "failed to prepare repositories, deployment trigger not started",
    )?;

    info!(
      "deployment trigger started | {} repositories | sync interval {:?}",
      self.repositories.len(),
      self.sync_interval,
    );

    let mut sync_tick = tokio::time::interval_at(
      Instant::now() + self.sync_interval,
      self.sync_interval,
    );
    let mut ondemand_tick = tokio::time::interval_at(
      Instant::now() + ONDEMAND_CHECK_INTERVAL,
      ONDEMAND_CHECK_INTERVAL,
    );

    loop {
      tokio::select! {
        _ = shutdown.cancelled() => {
          info!("deployment trigger stopped");
          return Ok(());
        }
        _ = sync_tick.tick() => {
          // Commit candidates first, then drift candidates.
          let mut batch =
            candidates::commit_candidates(self.applications.as_ref());
          batch.extend(candidates::out_of_sync_candidates(
            self.applications.as_ref(),
          ));
          if let Err(e) =
            self.execute_batch(&repos, batch, &shutdown).await
          {
            error!("error while processing sync candidates | {e:#}");
          }
        }
        _ = ondemand_tick.tick() => {
          let batch = candidates::command_candidates(
            self.commands.as_ref(),
            self.applications.as_ref(),
          );
          if let Err(e) =
            self.execute_batch(&repos, batch, &shutdown).await
          {
            error!(
              "error while processing command candidates | {e:#}"
            );
          }
        }
      }
    }
  }
}
