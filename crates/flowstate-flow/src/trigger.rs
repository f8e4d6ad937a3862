use serde::{Deserialize, Serialize};

use flowstate_state::StateTag;

/// Condition over a task's upstream states deciding whether its body runs.
///
/// Triggers see only terminal upstream tags. `Skipped` counts as a success.
/// With no upstream states every trigger is satisfied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
  /// Every upstream succeeded.
  #[default]
  AllSuccessful,
  /// Every upstream finished, whatever the outcome.
  AllFinished,
  /// At least one upstream succeeded.
  AnySuccessful,
  /// At least one upstream failed.
  AnyFailed,
  /// Every upstream failed.
  AllFailed,
}

impl Trigger {
  pub fn is_satisfied(self, upstream: &[StateTag]) -> bool {
    if upstream.is_empty() {
      return true;
    }

    let succeeded = |tag: &StateTag| tag.is_successful() || tag.is_skipped();
    match self {
      Trigger::AllSuccessful => upstream.iter().all(succeeded),
      Trigger::AllFinished => upstream.iter().all(|tag| tag.is_terminal()),
      Trigger::AnySuccessful => upstream.iter().any(succeeded),
      Trigger::AnyFailed => upstream.iter().any(|tag| tag.is_failed()),
      Trigger::AllFailed => upstream.iter().all(|tag| tag.is_failed()),
    }
  }
}
