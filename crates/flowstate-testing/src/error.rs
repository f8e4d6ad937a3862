use flowstate_flow::TaskId;
use flowstate_runtime::RuntimeError;
use flowstate_state::{State, StateTag};

use crate::expected::ExpectedState;

/// A run that did not produce what the test expected.
#[derive(Debug, thiserror::Error)]
pub enum Mismatch {
  #[error(
    "task state ({actual_tag}) or result ({actual_result}) did not match expected state ({expected_tag}) or result ({expected_result}) for task {task_name} with id {task_id}",
    actual_tag = .actual.tag(),
    actual_result = render_result(.actual.result()),
    expected_tag = .expected.tag(),
    expected_result = render_result(.expected.result())
  )]
  TaskState {
    task_name: String,
    task_id: TaskId,
    expected: ExpectedState,
    actual: State,
  },

  #[error("flow state ({actual}) did not match expected state ({expected})")]
  FlowState { expected: ExpectedState, actual: State },

  #[error("task {task_name} with id {task_id} not found in flow result")]
  TaskNotFound { task_name: String, task_id: TaskId },

  #[error(
    "actual task state ({actual_tag}) or result ({actual}) did not match expected task state ({expected_tag}) or result ({expected}) for task {task_name} with id {task_id}",
    actual = render_result(.actual_result.as_ref()),
    expected = render_result(.expected_result.as_ref())
  )]
  FlowTaskState {
    task_name: String,
    task_id: TaskId,
    actual_tag: StateTag,
    actual_result: Option<serde_json::Value>,
    expected_tag: StateTag,
    expected_result: Option<serde_json::Value>,
  },

  /// The runner itself returned an error.
  #[error(transparent)]
  Runtime(#[from] RuntimeError),
}

fn render_result(result: Option<&serde_json::Value>) -> String {
  match result {
    Some(value) => value.to_string(),
    None => "none".to_string(),
  }
}
