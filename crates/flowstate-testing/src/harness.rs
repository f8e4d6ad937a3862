use flowstate_config::RunnerConfig;
use flowstate_flow::{Flow, Task, TaskId};
use flowstate_runtime::{FlowRunArgs, FlowRunner, FlowState, TaskRunArgs, TaskRunner};
use flowstate_state::State;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::Mismatch;
use crate::expected::ExpectedState;

/// Configuration that surfaces task failures as errors instead of states.
pub fn raise_run_errors() -> RunnerConfig {
  RunnerConfig::default().raise_on_error(true)
}

/// Pair a task with its expected state, for [`check_flow_run`].
pub fn expect_task(task: &Task, expected: impl Into<ExpectedState>) -> (TaskId, ExpectedState) {
  (task.id(), expected.into())
}

/// Run `task` and compare the produced state with `expected`.
pub async fn check_task_run(
  task: &Task,
  expected: impl Into<ExpectedState>,
  args: TaskRunArgs,
  config: RunnerConfig,
) -> Result<State, Mismatch> {
  let expected = expected.into();
  let actual = TaskRunner::new(config).run(task, args).await?;

  if !expected.matches(&actual) {
    debug!(task_name = %task.name(), expected = %expected, actual = %actual, "task_state_mismatch");
    return Err(Mismatch::TaskState {
      task_name: task.to_string(),
      task_id: task.id(),
      expected,
      actual,
    });
  }
  Ok(actual)
}

/// Run `flow` and compare the flow state and any listed task states.
///
/// Expected task states are looked up by id. An id missing from the result is
/// reported as [`Mismatch::TaskNotFound`], separately from a state mismatch.
pub async fn check_flow_run(
  flow: &Flow,
  expected: Option<ExpectedState>,
  expected_task_states: Vec<(TaskId, ExpectedState)>,
  args: FlowRunArgs,
  config: RunnerConfig,
) -> Result<FlowState, Mismatch> {
  let flow_state = FlowRunner::new(config)
    .run(flow, args, CancellationToken::new())
    .await?;

  if let Some(expected) = expected {
    if !expected.matches(flow_state.state()) {
      return Err(Mismatch::FlowState {
        expected,
        actual: flow_state.state().clone(),
      });
    }
  }

  for (task_id, expected) in expected_task_states {
    let task_name = flow
      .task(&task_id)
      .map_or_else(|| "<unknown>".to_string(), |task| task.to_string());

    let Ok(actual) = flow_state.task_state(&task_id) else {
      return Err(Mismatch::TaskNotFound { task_name, task_id });
    };

    if !expected.matches(actual) {
      return Err(Mismatch::FlowTaskState {
        task_name,
        task_id,
        actual_tag: actual.tag(),
        actual_result: actual.result().cloned(),
        expected_tag: expected.tag(),
        expected_result: expected.result().cloned(),
      });
    }
  }

  Ok(flow_state)
}

/// [`check_task_run`], panicking with the mismatch report.
pub async fn run_task_runner_test(
  task: &Task,
  expected: impl Into<ExpectedState>,
  args: TaskRunArgs,
  config: RunnerConfig,
) -> State {
  match check_task_run(task, expected, args, config).await {
    Ok(state) => state,
    Err(mismatch) => panic!("{}", mismatch),
  }
}

/// [`check_flow_run`], panicking with the mismatch report.
pub async fn run_flow_runner_test(
  flow: &Flow,
  expected: Option<ExpectedState>,
  expected_task_states: Vec<(TaskId, ExpectedState)>,
  args: FlowRunArgs,
  config: RunnerConfig,
) -> FlowState {
  match check_flow_run(flow, expected, expected_task_states, args, config).await {
    Ok(flow_state) => flow_state,
    Err(mismatch) => panic!("{}", mismatch),
  }
}
