use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::StateError;
use crate::tag::StateTag;

/// The outcome of one task run or one flow run.
///
/// Equality compares tags only. Two `Success` states with different results
/// are equal; use [`State::result_eq`] when the payload matters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct State {
  tag: StateTag,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  result: Option<serde_json::Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  message: Option<String>,
}

impl State {
  /// A bare state with the given tag.
  pub fn new(tag: StateTag) -> Self {
    Self {
      tag,
      result: None,
      message: None,
    }
  }

  pub fn pending() -> Self {
    Self::new(StateTag::Pending)
  }

  pub fn running() -> Self {
    Self::new(StateTag::Running)
  }

  pub fn success(result: impl Into<serde_json::Value>) -> Self {
    Self::new(StateTag::Success).with_result(result)
  }

  pub fn failed(message: impl Into<String>) -> Self {
    Self::new(StateTag::Failed).with_message(message)
  }

  pub fn skipped() -> Self {
    Self::new(StateTag::Skipped)
  }

  pub fn trigger_failed(message: impl Into<String>) -> Self {
    Self::new(StateTag::TriggerFailed).with_message(message)
  }

  pub fn upstream_failed(message: impl Into<String>) -> Self {
    Self::new(StateTag::UpstreamFailed).with_message(message)
  }

  /// Attach a result payload.
  pub fn with_result(mut self, result: impl Into<serde_json::Value>) -> Self {
    self.result = Some(result.into());
    self
  }

  /// Attach a diagnostic message.
  pub fn with_message(mut self, message: impl Into<String>) -> Self {
    self.message = Some(message.into());
    self
  }

  pub fn tag(&self) -> StateTag {
    self.tag
  }

  pub fn result(&self) -> Option<&serde_json::Value> {
    self.result.as_ref()
  }

  pub fn message(&self) -> Option<&str> {
    self.message.as_deref()
  }

  pub fn into_result(self) -> Option<serde_json::Value> {
    self.result
  }

  pub fn is_terminal(&self) -> bool {
    self.tag.is_terminal()
  }

  pub fn is_pending(&self) -> bool {
    self.tag.is_pending()
  }

  pub fn is_running(&self) -> bool {
    self.tag.is_running()
  }

  pub fn is_successful(&self) -> bool {
    self.tag.is_successful()
  }

  pub fn is_skipped(&self) -> bool {
    self.tag.is_skipped()
  }

  pub fn is_failed(&self) -> bool {
    self.tag.is_failed()
  }

  /// Compare result payloads, ignoring tags and messages.
  pub fn result_eq(&self, other: &State) -> bool {
    self.result == other.result
  }

  /// Move to `next`, enforcing the lifecycle.
  pub fn transition(&self, next: State) -> Result<State, StateError> {
    if self.tag.can_transition_to(next.tag) {
      Ok(next)
    } else {
      Err(StateError::InvalidTransition {
        from: self.tag,
        to: next.tag,
      })
    }
  }
}

impl Default for State {
  fn default() -> Self {
    Self::pending()
  }
}

impl From<StateTag> for State {
  fn from(tag: StateTag) -> Self {
    Self::new(tag)
  }
}

impl PartialEq for State {
  fn eq(&self, other: &Self) -> bool {
    self.tag == other.tag
  }
}

impl Eq for State {}

impl PartialEq<StateTag> for State {
  fn eq(&self, other: &StateTag) -> bool {
    self.tag == *other
  }
}

impl fmt::Display for State {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.message {
      Some(message) => write!(f, "{}({:?})", self.tag, message),
      None => write!(f, "{}", self.tag),
    }
  }
}
