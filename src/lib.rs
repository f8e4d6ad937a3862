//! Flowstate
//!
//! Run dependency graphs of tasks and observe their outcomes as states.
//!
//! - [`state`] - the state model (`State`, `StateTag`)
//! - [`flow`] - task definitions, identities and validated flows
//! - [`runtime`] - the task and flow runners
//! - [`config`] - runner configuration
//! - [`testing`] - assertion helpers for runner tests
//!
//! The most used types are re-exported at the crate root.

pub use flowstate_config as config;
pub use flowstate_flow as flow;
pub use flowstate_runtime as runtime;
pub use flowstate_state as state;
pub use flowstate_testing as testing;

pub use flowstate_config::RunnerConfig;
pub use flowstate_flow::{
  Binding, Context, Flow, FlowBuilder, FlowError, Inputs, Outcome, Parameter, Task, TaskId, Trigger,
};
pub use flowstate_runtime::{
  FlowRunArgs, FlowRunner, FlowState, RuntimeError, TaskRunArgs, TaskRunner, TaskStates,
};
pub use flowstate_state::{State, StateTag};
pub use tokio_util::sync::CancellationToken;
