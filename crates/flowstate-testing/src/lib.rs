//! Flowstate Testing
//!
//! Assertion helpers for the task and flow runners. Each check runs a runner
//! and compares what it produced against an [`ExpectedState`]:
//!
//! - [`check_task_run`] / [`check_flow_run`] return a [`Mismatch`] describing
//!   the divergence
//! - [`run_task_runner_test`] / [`run_flow_runner_test`] panic with that
//!   report, for use directly inside `#[tokio::test]` functions
//!
//! Flow checks look up expected task states by [`TaskId`](flowstate_flow::TaskId);
//! names are not unique.

mod error;
mod expected;
mod harness;

pub use error::Mismatch;
pub use expected::ExpectedState;
pub use harness::{
  check_flow_run, check_task_run, expect_task, raise_run_errors, run_flow_runner_test,
  run_task_runner_test,
};
