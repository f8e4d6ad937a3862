use std::fmt;

use serde::{Deserialize, Serialize};

/// The outcome class of a task or flow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StateTag {
  /// Not yet attempted.
  Pending,
  /// Execution in progress.
  Running,
  /// Finished normally; carries a result.
  Success,
  /// The task's own logic failed.
  Failed,
  /// Deliberately not run.
  Skipped,
  /// The task's trigger condition over its upstream states was not met.
  TriggerFailed,
  /// An upstream dependency did not succeed, so the task never ran.
  UpstreamFailed,
}

impl StateTag {
  /// All tags, in declaration order.
  pub const ALL: [StateTag; 7] = [
    StateTag::Pending,
    StateTag::Running,
    StateTag::Success,
    StateTag::Failed,
    StateTag::Skipped,
    StateTag::TriggerFailed,
    StateTag::UpstreamFailed,
  ];

  /// No transition leaves a terminal tag.
  pub fn is_terminal(self) -> bool {
    !matches!(self, StateTag::Pending | StateTag::Running)
  }

  pub fn is_pending(self) -> bool {
    self == StateTag::Pending
  }

  pub fn is_running(self) -> bool {
    self == StateTag::Running
  }

  pub fn is_successful(self) -> bool {
    self == StateTag::Success
  }

  pub fn is_skipped(self) -> bool {
    self == StateTag::Skipped
  }

  /// `Failed`, `TriggerFailed` or `UpstreamFailed`.
  pub fn is_failed(self) -> bool {
    matches!(
      self,
      StateTag::Failed | StateTag::TriggerFailed | StateTag::UpstreamFailed
    )
  }

  /// Whether the lifecycle permits moving from `self` to `next`.
  ///
  /// `Pending -> Pending` is allowed so a runner can report that a task is
  /// still waiting on its upstream tasks.
  pub fn can_transition_to(self, next: StateTag) -> bool {
    match self {
      StateTag::Pending => matches!(
        next,
        StateTag::Pending
          | StateTag::Running
          | StateTag::Skipped
          | StateTag::TriggerFailed
          | StateTag::UpstreamFailed
      ),
      StateTag::Running => next.is_terminal(),
      _ => false,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      StateTag::Pending => "Pending",
      StateTag::Running => "Running",
      StateTag::Success => "Success",
      StateTag::Failed => "Failed",
      StateTag::Skipped => "Skipped",
      StateTag::TriggerFailed => "TriggerFailed",
      StateTag::UpstreamFailed => "UpstreamFailed",
    }
  }
}

impl fmt::Display for StateTag {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}
