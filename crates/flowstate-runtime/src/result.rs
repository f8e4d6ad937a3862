//! Flow run results.

use std::collections::HashMap;
use std::collections::hash_map;
use std::fmt;

use flowstate_flow::TaskId;
use flowstate_state::{State, StateTag};
use serde::{Deserialize, Serialize};

use crate::error::RuntimeError;

/// Per-task states of a flow run, keyed by task id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskStates(HashMap<TaskId, State>);

impl TaskStates {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, task_id: &TaskId) -> Option<&State> {
    self.0.get(task_id)
  }

  /// Like [`TaskStates::get`], but a missing id is an error.
  pub fn task_state(&self, task_id: &TaskId) -> Result<&State, RuntimeError> {
    self
      .0
      .get(task_id)
      .ok_or(RuntimeError::TaskNotFound { task_id: *task_id })
  }

  pub fn insert(&mut self, task_id: TaskId, state: State) -> Option<State> {
    self.0.insert(task_id, state)
  }

  pub fn contains(&self, task_id: &TaskId) -> bool {
    self.0.contains_key(task_id)
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn iter(&self) -> hash_map::Iter<'_, TaskId, State> {
    self.0.iter()
  }

  pub fn into_inner(self) -> HashMap<TaskId, State> {
    self.0
  }
}

impl From<HashMap<TaskId, State>> for TaskStates {
  fn from(states: HashMap<TaskId, State>) -> Self {
    Self(states)
  }
}

impl FromIterator<(TaskId, State)> for TaskStates {
  fn from_iter<I: IntoIterator<Item = (TaskId, State)>>(iter: I) -> Self {
    Self(iter.into_iter().collect())
  }
}

impl<'a> IntoIterator for &'a TaskStates {
  type Item = (&'a TaskId, &'a State);
  type IntoIter = hash_map::Iter<'a, TaskId, State>;

  fn into_iter(self) -> Self::IntoIter {
    self.0.iter()
  }
}

/// The outcome of a flow run: a flow-level state plus every task's state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowState {
  state: State,
  result: TaskStates,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  run_id: Option<String>,
}

impl FlowState {
  pub fn new(state: State, result: TaskStates, run_id: Option<String>) -> Self {
    Self {
      state,
      result,
      run_id,
    }
  }

  /// The aggregate flow-level state.
  pub fn state(&self) -> &State {
    &self.state
  }

  pub fn tag(&self) -> StateTag {
    self.state.tag()
  }

  pub fn message(&self) -> Option<&str> {
    self.state.message()
  }

  /// Task states, keyed by task id.
  pub fn result(&self) -> &TaskStates {
    &self.result
  }

  /// State of one task. A task absent from the result is an error, never a
  /// default state.
  pub fn task_state(&self, task_id: &TaskId) -> Result<&State, RuntimeError> {
    self.result.task_state(task_id)
  }

  pub fn run_id(&self) -> Option<&str> {
    self.run_id.as_deref()
  }

  pub fn into_parts(self) -> (State, TaskStates) {
    (self.state, self.result)
  }
}

impl PartialEq<StateTag> for FlowState {
  fn eq(&self, other: &StateTag) -> bool {
    self.state.tag() == *other
  }
}

impl fmt::Display for FlowState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} ({} tasks)", self.state, self.result.len())
  }
}
