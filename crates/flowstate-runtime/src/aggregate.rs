//! Flow-level state from task states.
//!
//! Rules, applied to the reference tasks in order:
//! 1. Any task not finished → `Pending`
//! 2. Any task failed (`Failed`, `TriggerFailed`, `UpstreamFailed`) → `Failed`
//! 3. Any task `Skipped`, unless skips count as success → `Skipped`
//! 4. Otherwise → `Success`
//!
//! A task missing from the state map counts as `Pending`.

use flowstate_config::RunnerConfig;
use flowstate_flow::{Flow, TaskId};
use flowstate_state::{State, StateTag};

use crate::result::TaskStates;

/// Aggregate the states of `reference` tasks into one flow state.
pub fn aggregate(flow: &Flow, reference: &[TaskId], states: &TaskStates, config: &RunnerConfig) -> State {
  let tags: Vec<(TaskId, StateTag)> = reference
    .iter()
    .map(|id| (*id, states.get(id).map_or(StateTag::Pending, State::tag)))
    .collect();

  let names = |predicate: fn(StateTag) -> bool| -> Vec<String> {
    tags
      .iter()
      .filter(|(_, tag)| predicate(*tag))
      .map(|(id, _)| flow.task(id).map_or_else(|| id.to_string(), |t| t.name().to_string()))
      .collect()
  };

  let unfinished = names(|tag| !tag.is_terminal());
  if !unfinished.is_empty() {
    return State::pending().with_message(format!("tasks not finished: {}", unfinished.join(", ")));
  }

  let failed = names(StateTag::is_failed);
  if !failed.is_empty() {
    return State::failed(format!("some reference tasks failed: {}", failed.join(", ")));
  }

  if !config.skipped_is_success {
    let skipped = names(StateTag::is_skipped);
    if !skipped.is_empty() {
      return State::skipped().with_message(format!("reference tasks skipped: {}", skipped.join(", ")));
    }
  }

  State::new(StateTag::Success).with_message("all reference tasks succeeded")
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use flowstate_flow::{FlowBuilder, Outcome, Task};

  fn flow_of(names: &[&str]) -> (Flow, Vec<TaskId>) {
    let tasks: Vec<Task> = names
      .iter()
      .map(|name| Task::new(*name, |_, _| Ok(Outcome::value(json!(null)))))
      .collect();
    let ids = tasks.iter().map(Task::id).collect();
    let flow = FlowBuilder::new("agg").tasks(tasks).build().unwrap();
    (flow, ids)
  }

  fn states(entries: &[(TaskId, State)]) -> TaskStates {
    entries.iter().cloned().collect()
  }

  #[test]
  fn test_all_success() {
    let (flow, ids) = flow_of(&["a", "b"]);
    let states = states(&[(ids[0], State::success(1)), (ids[1], State::success(2))]);
    let state = aggregate(&flow, &ids, &states, &RunnerConfig::default());
    assert_eq!(state, StateTag::Success);
  }

  #[test]
  fn test_any_failure_fails() {
    let (flow, ids) = flow_of(&["a", "b"]);
    let states = states(&[(ids[0], State::success(1)), (ids[1], State::upstream_failed("x"))]);
    let state = aggregate(&flow, &ids, &states, &RunnerConfig::default());
    assert_eq!(state, StateTag::Failed);
    assert_eq!(state.message(), Some("some reference tasks failed: b"));
  }

  #[test]
  fn test_unfinished_wins_over_failure() {
    let (flow, ids) = flow_of(&["a", "b"]);
    let states = states(&[(ids[0], State::failed("x"))]);
    let state = aggregate(&flow, &ids, &states, &RunnerConfig::default());
    assert_eq!(state, StateTag::Pending);
  }

  #[test]
  fn test_skip_policy() {
    let (flow, ids) = flow_of(&["a", "b"]);
    let states = states(&[(ids[0], State::success(1)), (ids[1], State::skipped())]);

    let strict = aggregate(&flow, &ids, &states, &RunnerConfig::default());
    assert_eq!(strict, StateTag::Skipped);

    let lenient = aggregate(
      &flow,
      &ids,
      &states,
      &RunnerConfig::default().skipped_is_success(true),
    );
    assert_eq!(lenient, StateTag::Success);
  }

  #[test]
  fn test_empty_reference_set_succeeds() {
    let (flow, _) = flow_of(&["a"]);
    let state = aggregate(&flow, &[], &TaskStates::new(), &RunnerConfig::default());
    assert_eq!(state, StateTag::Success);
  }
}
