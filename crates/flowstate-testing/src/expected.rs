use std::fmt;

use flowstate_state::{State, StateTag};

/// What a run is expected to produce.
///
/// A bare tag checks the tag only. A full state also checks the result when
/// it carries one; messages are never compared.
#[derive(Debug, Clone)]
pub enum ExpectedState {
  Tag(StateTag),
  State(State),
}

impl ExpectedState {
  pub fn tag(&self) -> StateTag {
    match self {
      ExpectedState::Tag(tag) => *tag,
      ExpectedState::State(state) => state.tag(),
    }
  }

  /// The expected result, if one is checked.
  pub fn result(&self) -> Option<&serde_json::Value> {
    match self {
      ExpectedState::Tag(_) => None,
      ExpectedState::State(state) => state.result(),
    }
  }

  pub fn matches(&self, actual: &State) -> bool {
    if actual.tag() != self.tag() {
      return false;
    }
    match self.result() {
      Some(expected) => actual.result() == Some(expected),
      None => true,
    }
  }
}

impl From<StateTag> for ExpectedState {
  fn from(tag: StateTag) -> Self {
    ExpectedState::Tag(tag)
  }
}

impl From<State> for ExpectedState {
  fn from(state: State) -> Self {
    ExpectedState::State(state)
  }
}

impl fmt::Display for ExpectedState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.result() {
      Some(result) => write!(f, "{} with result {}", self.tag(), result),
      None => write!(f, "{}", self.tag()),
    }
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn test_tag_ignores_result() {
    let expected = ExpectedState::from(StateTag::Success);
    assert!(expected.matches(&State::success(1)));
    assert!(expected.matches(&State::success(2)));
    assert!(!expected.matches(&State::failed("x")));
  }

  #[test]
  fn test_state_checks_result() {
    let expected = ExpectedState::from(State::success(2));
    assert!(expected.matches(&State::success(2)));
    assert!(!expected.matches(&State::success(3)));
  }

  #[test]
  fn test_state_without_result_checks_tag_only() {
    let expected = ExpectedState::from(State::failed("expected message"));
    assert!(expected.matches(&State::failed("other message")));
  }

  #[test]
  fn test_display() {
    assert_eq!(ExpectedState::from(StateTag::Failed).to_string(), "Failed");
    assert_eq!(
      ExpectedState::from(State::success(json!({"a": 1}))).to_string(),
      "Success with result {\"a\":1}"
    );
  }
}
