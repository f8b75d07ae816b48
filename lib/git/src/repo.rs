use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use piped_client::entities::Commit;
use run_command::async_run_command;

use crate::{GitRepo, redact};

/// A working copy managed through the git binary.
pub struct CommandRepo {
  repo_id: String,
  remote: String,
  branch: String,
  path: PathBuf,
}

impl CommandRepo {
  pub(crate) fn new(
    repo_id: &str,
    remote: &str,
    branch: &str,
    path: &Path,
  ) -> CommandRepo {
    CommandRepo {
      repo_id: repo_id.to_string(),
      remote: remote.to_string(),
      branch: branch.to_string(),
      path: path.to_path_buf(),
    }
  }

  async fn run(&self, command: &str) -> anyhow::Result<String> {
    let full_command =
      format!("cd {} && {}", self.path.display(), command);
    let output = async_run_command(&full_command).await;
    if output.success() {
      Ok(output.stdout)
    } else {
      Err(anyhow!(
        "'{command}' failed in repository {} | {}",
        self.repo_id,
        redact(output.stderr.trim(), &self.remote)
      ))
    }
  }
}

#[async_trait]
impl GitRepo for CommandRepo {
  fn path(&self) -> &Path {
    &self.path
  }

  fn cloned_branch(&self) -> &str {
    &self.branch
  }

  /// The agent never writes through the working copy, but the remote
  /// can rewrite history. Force the copy back onto the branch tip.
  #[tracing::instrument(level = "debug", skip(self), fields(repo_id = %self.repo_id))]
  async fn pull(&self) -> anyhow::Result<()> {
    self
      .run(&format!("git checkout -f {}", self.branch))
      .await?;
    self
      .run(&format!(
        "git pull --rebase --force origin {}",
        self.branch
      ))
      .await?;
    Ok(())
  }

  async fn latest_commit(&self) -> anyhow::Result<Commit> {
    let stdout = self
      .run("git log -1 --pretty=format:%H%n%an%n%at%n%s")
      .await?;
    parse_commit(&stdout).with_context(|| {
      format!(
        "failed to parse head commit of repository {}",
        self.repo_id
      )
    })
  }
}

fn parse_commit(raw: &str) -> anyhow::Result<Commit> {
  let mut lines = raw.trim().splitn(4, '\n');
  let hash = lines
    .next()
    .filter(|hash| !hash.is_empty())
    .ok_or(anyhow!("git log returned no commit"))?;
  let author = lines.next().unwrap_or_default();
  let timestamp =
    lines.next().unwrap_or_default().trim().parse().unwrap_or_default();
  let message = lines.next().unwrap_or_default();
  Ok(Commit {
    hash: hash.to_string(),
    author: author.to_string(),
    timestamp,
    message: message.trim().to_string(),
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parse_commit_reads_log_format() {
    let raw = "9f2c1d4e8a\npiped-dev\n1721912345\nfix: handle empty branch";
    let commit = parse_commit(raw).unwrap();
    assert_eq!(commit.hash, "9f2c1d4e8a");
    assert_eq!(commit.author, "piped-dev");
    assert_eq!(commit.timestamp, 1721912345);
    assert_eq!(commit.message, "fix: handle empty branch");
  }

  #[test]
  fn parse_commit_rejects_empty_output() {
    assert!(parse_commit("").is_err());
    assert!(parse_commit("\n\n").is_err());
  }
}
