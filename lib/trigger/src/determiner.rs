use anyhow::Context;
use async_trait::async_trait;
use piped_client::entities::{
  Commit, application::Application,
  deploy_config::DeploymentConfig,
};

use crate::{
  CandidateKind, commit_store::LastTriggeredCommitStore,
};

/// Decides whether an application should be deployed now.
/// One strategy per candidate kind.
#[async_trait]
pub(crate) trait Determiner: Send + Sync {
  async fn should_trigger(
    &self,
    application: &Application,
    config: &DeploymentConfig,
  ) -> anyhow::Result<bool>;
}

/// Policy deciding whether the change between the last triggered
/// commit and the head commit is relevant to an application.
/// Injected into the on-commit determiner.
pub trait CommitFilter: Send + Sync {
  fn is_relevant(
    &self,
    application: &Application,
    config: &DeploymentConfig,
    last_triggered: &str,
    head: &str,
  ) -> bool;
}

/// Default policy: every new commit is relevant to every application.
pub struct TriggerAll;

impl CommitFilter for TriggerAll {
  fn is_relevant(
    &self,
    _application: &Application,
    _config: &DeploymentConfig,
    _last_triggered: &str,
    _head: &str,
  ) -> bool {
    true
  }
}

/// The user explicitly asked for a deployment.
struct OnCommandDeterminer;

#[async_trait]
impl Determiner for OnCommandDeterminer {
  async fn should_trigger(
    &self,
    _application: &Application,
    _config: &DeploymentConfig,
  ) -> anyhow::Result<bool> {
    Ok(true)
  }
}

/// Drift has already been confirmed upstream by the time the
/// candidate reaches the determiner.
struct OnOutOfSyncDeterminer;

#[async_trait]
impl Determiner for OnOutOfSyncDeterminer {
  async fn should_trigger(
    &self,
    _application: &Application,
    _config: &DeploymentConfig,
  ) -> anyhow::Result<bool> {
    Ok(true)
  }
}

/// Triggers when the head commit differs from the application's
/// watermark and the commit filter considers the change relevant.
struct OnCommitDeterminer<'a> {
  head: &'a Commit,
  store: &'a LastTriggeredCommitStore,
  filter: &'a dyn CommitFilter,
}

#[async_trait]
impl Determiner for OnCommitDeterminer<'_> {
  async fn should_trigger(
    &self,
    application: &Application,
    config: &DeploymentConfig,
  ) -> anyhow::Result<bool> {
    let last_triggered =
      self.store.get(&application.id).await.with_context(|| {
        format!(
          "failed to read last triggered commit of application {}",
          application.id
        )
      })?;

    if last_triggered == self.head.hash {
      return Ok(false);
    }

    Ok(self.filter.is_relevant(
      application,
      config,
      &last_triggered,
      &self.head.hash,
    ))
  }
}

/// The determiners for one repo group, bound to the group's shared
/// head commit. Built once per group, not per candidate.
pub(crate) struct DeterminerBundle<'a> {
  on_commit: OnCommitDeterminer<'a>,
  on_command: OnCommandDeterminer,
  on_out_of_sync: OnOutOfSyncDeterminer,
}

impl<'a> DeterminerBundle<'a> {
  pub fn new(
    head: &'a Commit,
    store: &'a LastTriggeredCommitStore,
    filter: &'a dyn CommitFilter,
  ) -> DeterminerBundle<'a> {
    DeterminerBundle {
      on_commit: OnCommitDeterminer { head, store, filter },
      on_command: OnCommandDeterminer,
      on_out_of_sync: OnOutOfSyncDeterminer,
    }
  }

  pub fn for_kind(
    &self,
    kind: CandidateKind,
  ) -> &(dyn Determiner + '_) {
    match kind {
      CandidateKind::Commit => &self.on_commit,
      CandidateKind::Command => &self.on_command,
      CandidateKind::OutOfSync => &self.on_out_of_sync,
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use piped_client::entities::application::ApplicationKind;

  use super::*;
  use crate::test_utils::{
    FakeApi, RejectAll, application, deployment_config,
  };

  fn head(hash: &str) -> Commit {
    Commit {
      hash: hash.to_string(),
      message: "update manifests".to_string(),
      author: "dev".to_string(),
      timestamp: 1,
    }
  }

  #[tokio::test]
  async fn on_commit_skips_when_head_equals_watermark() {
    let api = Arc::new(FakeApi::default());
    api.set_most_recent("app-1", "h1");
    let store = LastTriggeredCommitStore::new(api, 10);
    let head = head("h1");
    let bundle = DeterminerBundle::new(&head, &store, &TriggerAll);

    let app = application("app-1", "r1", "app/app.piped.yaml");
    let config = deployment_config(ApplicationKind::Kubernetes);
    let triggered = bundle
      .for_kind(CandidateKind::Commit)
      .should_trigger(&app, &config)
      .await
      .unwrap();
    assert!(!triggered);
  }

  #[tokio::test]
  async fn on_commit_triggers_on_new_head() {
    let api = Arc::new(FakeApi::default());
    api.set_most_recent("app-1", "h0");
    let store = LastTriggeredCommitStore::new(api, 10);
    let head = head("h1");
    let bundle = DeterminerBundle::new(&head, &store, &TriggerAll);

    let app = application("app-1", "r1", "app/app.piped.yaml");
    let config = deployment_config(ApplicationKind::Kubernetes);
    let triggered = bundle
      .for_kind(CandidateKind::Commit)
      .should_trigger(&app, &config)
      .await
      .unwrap();
    assert!(triggered);
  }

  #[tokio::test]
  async fn on_commit_defers_to_the_filter() {
    let api = Arc::new(FakeApi::default());
    api.set_most_recent("app-1", "h0");
    let store = LastTriggeredCommitStore::new(api, 10);
    let head = head("h1");
    let bundle = DeterminerBundle::new(&head, &store, &RejectAll);

    let app = application("app-1", "r1", "app/app.piped.yaml");
    let config = deployment_config(ApplicationKind::Kubernetes);
    let triggered = bundle
      .for_kind(CandidateKind::Commit)
      .should_trigger(&app, &config)
      .await
      .unwrap();
    assert!(!triggered);
  }

  #[tokio::test]
  async fn on_commit_surfaces_store_errors() {
    let api = Arc::new(FakeApi::default());
    api.fail_most_recent(true);
    let store = LastTriggeredCommitStore::new(api, 10);
    let head = head("h1");
    let bundle = DeterminerBundle::new(&head, &store, &TriggerAll);

    let app = application("app-1", "r1", "app/app.piped.yaml");
    let config = deployment_config(ApplicationKind::Kubernetes);
    let result = bundle
      .for_kind(CandidateKind::Commit)
      .should_trigger(&app, &config)
      .await;
    assert!(result.is_err());
  }

  #[tokio::test]
  async fn command_and_out_of_sync_always_trigger() {
    let api = Arc::new(FakeApi::default());
    let store = LastTriggeredCommitStore::new(api, 10);
    let head = head("h1");
    let bundle = DeterminerBundle::new(&head, &store, &RejectAll);

    let app = application("app-1", "r1", "app/app.piped.yaml");
    let config = deployment_config(ApplicationKind::Kubernetes);
    for kind in [CandidateKind::Command, CandidateKind::OutOfSync] {
      let triggered = bundle
        .for_kind(kind)
        .should_trigger(&app, &config)
        .await
        .unwrap();
      assert!(triggered);
    }
  }
}
