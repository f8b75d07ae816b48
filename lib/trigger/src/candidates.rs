use piped_client::entities::{
  application::{Application, SyncStatus},
  command::{Command, CommandKind},
};

use crate::{ApplicationLister, CommandLister};

/// An application considered for triggering in the current tick,
/// tagged by its originating signal. Constructed by a collector,
/// consumed exactly once by the batch executor.
#[derive(Debug, Clone)]
pub struct Candidate {
  pub application: Application,
  pub kind: CandidateKind,
  /// Present iff `kind` is [CandidateKind::Command].
  pub command: Option<Command>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
  Commit,
  Command,
  OutOfSync,
}

impl Candidate {
  fn commit(application: Application) -> Candidate {
    Candidate {
      application,
      kind: CandidateKind::Commit,
      command: None,
    }
  }

  fn out_of_sync(application: Application) -> Candidate {
    Candidate {
      application,
      kind: CandidateKind::OutOfSync,
      command: None,
    }
  }

  fn command(
    application: Application,
    command: Command,
  ) -> Candidate {
    Candidate {
      application,
      kind: CandidateKind::Command,
      command: Some(command),
    }
  }
}

/// Every registered application is a commit candidate.
/// Per-application filtering happens in the on-commit determiner.
pub fn commit_candidates(
  applications: &dyn ApplicationLister,
) -> Vec<Candidate> {
  applications
    .list()
    .into_iter()
    .map(Candidate::commit)
    .collect()
}

/// Applications the drift detector reports as out of sync.
pub fn out_of_sync_candidates(
  applications: &dyn ApplicationLister,
) -> Vec<Candidate> {
  applications
    .list()
    .into_iter()
    .filter(|app| app.sync_state.status == SyncStatus::OutOfSync)
    .map(Candidate::out_of_sync)
    .collect()
}

/// Pending sync commands whose target application resolves.
/// Commands targeting unknown applications are logged and dropped.
pub fn command_candidates(
  commands: &dyn CommandLister,
  applications: &dyn ApplicationLister,
) -> Vec<Candidate> {
  let mut out = Vec::new();
  for command in commands.list_application_commands() {
    let CommandKind::SyncApplication { .. } = command.kind else {
      continue;
    };
    match applications.get(&command.application_id) {
      Some(application) => {
        out.push(Candidate::command(application, command))
      }
      None => warn!(
        "dropping sync command {} targeting unknown application {}",
        command.id, command.application_id,
      ),
    }
  }
  out
}
