use thiserror::Error;

use crate::identity::TaskId;

/// Errors raised while building a flow. None of these can occur at run time.
#[derive(Debug, Error)]
pub enum FlowError {
  #[error("duplicate task id {task_id} (task '{name}')")]
  DuplicateTaskId { task_id: TaskId, name: String },

  #[error("duplicate parameter: {name}")]
  DuplicateParameter { name: String },

  #[error("task '{task}' depends on {upstream}, which is not part of the flow")]
  UnknownUpstream { task: String, upstream: TaskId },

  #[error("task '{task}' references undeclared parameter '{parameter}'")]
  UnknownParameter { task: String, parameter: String },

  #[error("reference task {task_id} is not part of the flow")]
  UnknownReferenceTask { task_id: TaskId },

  #[error("cycle detected in flow graph at task '{task}'")]
  CycleDetected { task: String },
}
