//! Flowstate Flow
//!
//! This crate provides the definition side of flowstate: tasks, the identities
//! that address them, and validated flows.
//!
//! Key properties of a built [`Flow`]:
//! - Every task has a [`TaskId`] that is unique within the flow; names may repeat
//! - Every dependency edge references a task in the same flow
//! - The dependency graph is acyclic
//! - Parameter references resolve to declared [`Parameter`]s
//!
//! All of the above are checked once by [`FlowBuilder::build`], never at run time.

mod builder;
mod context;
mod error;
mod flow;
mod graph;
mod identity;
mod inputs;
mod task;
mod trigger;

pub use builder::FlowBuilder;
pub use context::Context;
pub use error::FlowError;
pub use flow::{Flow, Parameter};
pub use graph::Graph;
pub use identity::{TaskId, TaskRegistry};
pub use inputs::Inputs;
pub use task::{Binding, Outcome, Task, TaskFn};
pub use trigger::Trigger;
