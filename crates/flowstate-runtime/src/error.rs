//! Runtime error types.

use flowstate_config::ConfigError;
use flowstate_flow::TaskId;
use flowstate_state::StateError;

/// Errors returned by the runners.
///
/// Task failures are not errors: they are captured into `Failed` states.
/// The exception is `raise_on_error`, which surfaces them as
/// [`RuntimeError::TaskFailed`].
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
  /// A task body failed and the runner was configured to raise.
  #[error("task '{name}' ({task_id}) failed: {source:#}")]
  TaskFailed {
    task_id: TaskId,
    name: String,
    #[source]
    source: anyhow::Error,
  },

  /// Failed to resolve a task's arguments.
  #[error("input resolution failed for task '{name}': {message}")]
  InputResolution { name: String, message: String },

  /// A task id was looked up in a flow result that does not contain it.
  #[error("task {task_id} not found in flow result")]
  TaskNotFound { task_id: TaskId },

  /// A run argument referenced a task outside the flow.
  #[error("task {task_id} is not part of flow '{flow}'")]
  UnknownTask { flow: String, task_id: TaskId },

  /// A required flow parameter was not supplied and has no default.
  #[error("missing required parameter '{name}'")]
  MissingParameter { name: String },

  /// A supplied parameter is not declared by the flow.
  #[error("unknown parameter '{name}'")]
  UnknownParameter { name: String },

  /// The runner configuration cannot be honored.
  #[error("invalid runner configuration: {0}")]
  Config(#[from] ConfigError),

  #[error(transparent)]
  State(#[from] StateError),

  /// A spawned task runner could not be joined.
  #[error("task join error: {message}")]
  Join { message: String },
}
