use std::{collections::HashMap, path::Path};

use anyhow::{Context, anyhow};
use git::{GitClient, GitRepo};
use piped_client::entities::Commit;
use serde::{Deserialize, Serialize};

/// A repository watched by the trigger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoEntry {
  /// Id applications reference in their `git_path`.
  pub repo_id: String,
  /// Clone url.
  pub remote: String,
  /// The branch to track. Immutable for the life of the process.
  pub branch: String,
}

/// The cloned working copies, keyed by repository id.
/// Working copies are mutable and never shared across concurrent
/// users, which holds because the trigger loop is serial.
pub struct RepoSet {
  repos: HashMap<String, Box<dyn GitRepo>>,
}

impl RepoSet {
  /// Clones every configured repository under `root`.
  /// Any clone failure is fatal.
  pub async fn clone_all(
    git: &dyn GitClient,
    entries: &[RepoEntry],
    root: &Path,
  ) -> anyhow::Result<RepoSet> {
    let mut repos = HashMap::with_capacity(entries.len());
    for entry in entries {
      let destination = root.join(&entry.repo_id);
      let repo = git
        .clone_repo(
          &entry.repo_id,
          &entry.remote,
          &entry.branch,
          &destination,
        )
        .await
        .with_context(|| {
          format!("failed to clone repository {}", entry.repo_id)
        })?;
      info!(
        "repository {} prepared at {:?} | branch: {}",
        entry.repo_id,
        repo.path(),
        repo.cloned_branch(),
      );
      repos.insert(entry.repo_id.clone(), repo);
    }
    Ok(RepoSet { repos })
  }

  /// Brings the working copy up to the branch tip and reads the
  /// head commit back.
  pub async fn update_to_latest(
    &self,
    repo_id: &str,
  ) -> anyhow::Result<(&dyn GitRepo, Commit)> {
    let repo = self
      .repos
      .get(repo_id)
      .ok_or_else(|| anyhow!("repository {repo_id} is not registered"))?;
    repo.pull().await.with_context(|| {
      format!("failed to update repository {repo_id}")
    })?;
    let head = repo.latest_commit().await.with_context(|| {
      format!("failed to read head commit of repository {repo_id}")
    })?;
    Ok((repo.as_ref(), head))
  }
}
