//! Shared fixtures for the in-crate unit test modules.
//! The end-to-end scenarios live in `tests/trigger_scenarios.rs`
//! and carry their own richer doubles.

use std::{
  collections::HashMap,
  sync::{
    Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
  },
};

use anyhow::anyhow;
use async_trait::async_trait;
use piped_client::{
  api::{ApiError, ControlPlaneApi, MostRecentDeployment},
  entities::{
    application::{
      Application, ApplicationKind, GitPath, SyncState, SyncStatus,
    },
    command::{Command, CommandKind, CommandStatus},
    deploy_config::DeploymentConfig,
    deployment::{Deployment, SyncStrategy},
  },
};

use crate::{ApplicationLister, CommandLister, CommitFilter};

pub(crate) fn application(
  id: &str,
  repo_id: &str,
  config_relative_path: &str,
) -> Application {
  Application {
    id: id.to_string(),
    name: id.to_string(),
    kind: ApplicationKind::Kubernetes,
    environment_id: "env-1".to_string(),
    git_path: GitPath {
      repo_id: repo_id.to_string(),
      config_relative_path: config_relative_path.to_string(),
    },
    sync_state: SyncState::default(),
    most_recently_triggered_deployment_id: None,
  }
}

pub(crate) fn out_of_sync(mut app: Application) -> Application {
  app.sync_state.status = SyncStatus::OutOfSync;
  app
}

pub(crate) fn deployment_config(
  kind: ApplicationKind,
) -> DeploymentConfig {
  DeploymentConfig { kind, deployment_notification: None }
}

pub(crate) fn sync_command(
  id: &str,
  application_id: &str,
  sync_strategy: Option<SyncStrategy>,
) -> Command {
  Command {
    id: id.to_string(),
    application_id: application_id.to_string(),
    commander: "alice".to_string(),
    kind: CommandKind::SyncApplication { sync_strategy },
  }
}

/// Commit filter rejecting every change. Used to exercise the
/// watermark-advance-on-skip path.
pub(crate) struct RejectAll;

impl CommitFilter for RejectAll {
  fn is_relevant(
    &self,
    _application: &Application,
    _config: &DeploymentConfig,
    _last_triggered: &str,
    _head: &str,
  ) -> bool {
    false
  }
}

pub(crate) struct StaticApps(pub Vec<Application>);

impl ApplicationLister for StaticApps {
  fn get(&self, application_id: &str) -> Option<Application> {
    self.0.iter().find(|app| app.id == application_id).cloned()
  }
  fn list(&self) -> Vec<Application> {
    self.0.clone()
  }
}

pub(crate) struct StaticCommands(pub Vec<Command>);

impl CommandLister for StaticCommands {
  fn list_application_commands(&self) -> Vec<Command> {
    self.0.clone()
  }
}

/// Minimal control plane double. Only the most-recent-deployment
/// lookup is configurable, create / report are inert stubs the unit
/// tests never reach.
#[derive(Default)]
pub(crate) struct FakeApi {
  most_recent: Mutex<HashMap<String, String>>,
  fail_most_recent: AtomicBool,
  most_recent_calls: AtomicUsize,
}

impl FakeApi {
  pub fn set_most_recent(&self, application_id: &str, hash: &str) {
    self
      .most_recent
      .lock()
      .unwrap()
      .insert(application_id.to_string(), hash.to_string());
  }

  pub fn fail_most_recent(&self, fail: bool) {
    self.fail_most_recent.store(fail, Ordering::SeqCst);
  }

  pub fn most_recent_calls(&self) -> usize {
    self.most_recent_calls.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl ControlPlaneApi for FakeApi {
  async fn get_application_most_recent_deployment(
    &self,
    application_id: &str,
  ) -> Result<MostRecentDeployment, ApiError> {
    self.most_recent_calls.fetch_add(1, Ordering::SeqCst);
    if self.fail_most_recent.load(Ordering::SeqCst) {
      return Err(ApiError::Other(anyhow!(
        "control plane unavailable"
      )));
    }
    match self.most_recent.lock().unwrap().get(application_id) {
      Some(hash) => Ok(MostRecentDeployment {
        deployment_id: format!("d-{application_id}"),
        commit_hash: hash.clone(),
      }),
      None => Err(ApiError::NotFound),
    }
  }

  async fn create_deployment(
    &self,
    _deployment: &Deployment,
  ) -> Result<String, ApiError> {
    Ok("d-0".to_string())
  }

  async fn report_command_handled(
    &self,
    _command_id: &str,
    _status: CommandStatus,
    _metadata: HashMap<String, String>,
    _output: String,
  ) -> Result<(), ApiError> {
    Ok(())
  }
}
