use std::{collections::HashMap, path::Path, time::Duration};

use anyhow::{Context, anyhow};
use git::GitRepo;
use indexmap::IndexMap;
use piped_client::entities::{
  Commit, piped_timestamp,
  application::Application,
  command::{Command, CommandStatus, TRIGGERED_DEPLOYMENT_ID},
  deploy_config::DeploymentConfig,
  deployment::{Deployment, DeploymentTrigger, SyncStrategy},
  event::{NotificationEvent, NotificationEventKind},
};
use tokio_util::sync::CancellationToken;

use crate::{
  Candidate, Trigger, determiner::DeterminerBundle, repos::RepoSet,
};

/// Notifications must not stall the loop.
const NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

impl Trigger {
  /// Processes one batch of candidates.
  ///
  /// Candidates are grouped by repository so each working copy is
  /// updated once per batch. Groups are serial, candidates within a
  /// group are serial, and an error on one candidate never skips the
  /// remaining ones. The last per-group error is returned for
  /// diagnostics, the caller keeps looping either way.
  pub(crate) async fn execute_batch(
    &self,
    repos: &RepoSet,
    candidates: Vec<Candidate>,
    shutdown: &CancellationToken,
  ) -> anyhow::Result<()> {
    if candidates.is_empty() {
      return Ok(());
    }

    let mut groups: IndexMap<String, Vec<Candidate>> =
      IndexMap::new();
    for candidate in candidates {
      groups
        .entry(candidate.application.git_path.repo_id.clone())
        .or_default()
        .push(candidate);
    }

    let mut last_err = None;

    'groups: for (repo_id, group) in groups {
      if shutdown.is_cancelled() {
        break;
      }

      let (repo, head) = match repos.update_to_latest(&repo_id).await
      {
        Ok(updated) => updated,
        Err(e) => {
          if !shutdown.is_cancelled() {
            error!(
              "failed to update repository {repo_id} to latest | {e:#}"
            );
          }
          last_err = Some(e);
          continue;
        }
      };

      let determiners = DeterminerBundle::new(
        &head,
        &self.commit_store,
        self.commit_filter.as_ref(),
      );

      for candidate in group {
        // Shutdown preempts at candidate granularity, never
        // in the middle of one check.
        if shutdown.is_cancelled() {
          break 'groups;
        }
        self
          .check_candidate(repo, &head, &determiners, candidate)
          .await;
      }
    }

    match last_err {
      Some(e) => Err(e),
      None => Ok(()),
    }
  }

  async fn check_candidate(
    &self,
    repo: &dyn GitRepo,
    head: &Commit,
    determiners: &DeterminerBundle<'_>,
    candidate: Candidate,
  ) {
    let Candidate { application, kind, command } = candidate;

    // Config problems are noisy and already surface through the
    // application's InvalidConfig status channel, so they are
    // logged without an external notification.
    let config =
      match load_deployment_config(repo.path(), &application).await
      {
        Ok(Some(config)) => config,
        Ok(None) => {
          warn!(
            "no deployment configuration for application {} at {} in repository {}",
            application.name,
            application.git_path.config_relative_path,
            application.git_path.repo_id,
          );
          return;
        }
        Err(e) => {
          warn!(
            "failed to load deployment configuration of application {} | {e:#}",
            application.name,
          );
          return;
        }
      };

    match determiners
      .for_kind(kind)
      .should_trigger(&application, &config)
      .await
    {
      Ok(true) => {}
      Ok(false) => {
        // Record that this head commit has been accounted for so
        // it is not re-evaluated on every following tick.
        self.commit_store.put(&application.id, &head.hash);
        return;
      }
      Err(e) => {
        error!(
          "failed to determine whether application {} should be deployed | {e:#}",
          application.name,
        );
        self
          .notify_trigger_failed(
            &application,
            &config,
            head,
            format!("Failed to determine deployment: {e:#}"),
          )
          .await;
        return;
      }
    }

    let mut deployment = build_deployment(
      &application,
      repo.cloned_branch(),
      head,
      command.as_ref(),
    );

    let deployment_id =
      match self.api.create_deployment(&deployment).await {
        Ok(id) => id,
        Err(e) => {
          error!(
            "failed to create deployment for application {} at commit {} | {e:#}",
            application.name, head.hash,
          );
          self
            .notify_trigger_failed(
              &application,
              &config,
              head,
              format!("Failed to create deployment: {e:#}"),
            )
            .await;
          return;
        }
      };

    info!(
      "triggered deployment {deployment_id} | application: {} | commit: {}",
      application.name, head.hash,
    );
    self.commit_store.put(&application.id, &head.hash);

    let env_name =
      match self.environments.get(&application.environment_id).await
      {
        Ok(environment) => environment.name,
        Err(e) => {
          warn!(
            "failed to resolve environment {} of application {} | {e:#}",
            application.environment_id, application.name,
          );
          String::new()
        }
      };
    let mentioned_accounts = config
      .deployment_notification
      .as_ref()
      .map(|notification| {
        notification.find_slack_accounts(
          NotificationEventKind::DeploymentTriggered,
        )
      })
      .unwrap_or_default();
    deployment.id = deployment_id.clone();
    self
      .dispatch(NotificationEvent::DeploymentTriggered {
        deployment,
        env_name,
        mentioned_accounts,
      })
      .await;

    if let Some(command) = command {
      // The deployment exists either way. A failed report only
      // delays the command being marked done, so log and move on.
      let metadata = HashMap::from([(
        TRIGGERED_DEPLOYMENT_ID.to_string(),
        deployment_id,
      )]);
      if let Err(e) = self
        .api
        .report_command_handled(
          &command.id,
          CommandStatus::Succeeded,
          metadata,
          String::new(),
        )
        .await
      {
        error!(
          "failed to report sync command {} as handled | {e:#}",
          command.id,
        );
      }
    }
  }

  async fn notify_trigger_failed(
    &self,
    application: &Application,
    config: &DeploymentConfig,
    head: &Commit,
    reason: String,
  ) {
    let mentioned_accounts = config
      .deployment_notification
      .as_ref()
      .map(|notification| {
        notification.find_slack_accounts(
          NotificationEventKind::DeploymentTriggerFailed,
        )
      })
      .unwrap_or_default();
    self
      .dispatch(NotificationEvent::DeploymentTriggerFailed {
        application: application.clone(),
        commit_hash: head.hash.clone(),
        commit_message: head.message.clone(),
        reason,
        env_name: String::new(),
        mentioned_accounts,
      })
      .await;
  }

  async fn dispatch(&self, event: NotificationEvent) {
    let kind = event.kind();
    if tokio::time::timeout(
      NOTIFY_TIMEOUT,
      self.notifier.notify(event),
    )
    .await
    .is_err()
    {
      warn!(
        "notifier did not accept {kind} event within {NOTIFY_TIMEOUT:?}"
      );
    }
  }
}

/// Reads and validates the application's deployment configuration
/// from the working copy. `Ok(None)` means the file does not exist,
/// which callers treat differently from a broken file only in their
/// log line.
async fn load_deployment_config(
  working_copy: &Path,
  application: &Application,
) -> anyhow::Result<Option<DeploymentConfig>> {
  let path =
    working_copy.join(&application.git_path.config_relative_path);

  let contents = match tokio::fs::read_to_string(&path).await {
    Ok(contents) => contents,
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
      return Ok(None);
    }
    Err(e) => {
      return Err(e).with_context(|| {
        format!("failed to read deployment configuration at {path:?}")
      });
    }
  };

  let config: DeploymentConfig = serde_yaml_ng::from_str(&contents)
    .with_context(|| {
      format!("invalid deployment configuration at {path:?}")
    })?;

  if config.kind != application.kind {
    return Err(anyhow!(
      "deployment configuration kind {} does not match application kind {}",
      config.kind,
      application.kind,
    ));
  }

  Ok(Some(config))
}

fn build_deployment(
  application: &Application,
  branch: &str,
  head: &Commit,
  command: Option<&Command>,
) -> Deployment {
  let (commander, sync_strategy) = match command {
    Some(command) => (
      command.commander.clone(),
      command.sync_strategy().unwrap_or_default(),
    ),
    None => (String::new(), SyncStrategy::Auto),
  };
  Deployment {
    id: String::new(),
    application_id: application.id.clone(),
    application_name: application.name.clone(),
    kind: application.kind,
    environment_id: application.environment_id.clone(),
    git_path: application.git_path.clone(),
    branch: branch.to_string(),
    trigger: DeploymentTrigger {
      commit: head.clone(),
      commander,
      sync_strategy,
      timestamp: piped_timestamp(),
    },
  }
}
