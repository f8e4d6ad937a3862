//! Argument resolution.
//!
//! Builds the [`Inputs`] a task body receives from its bindings.
//!
//! # Precedence
//! 1. `Binding::Parameter` → the parameter value from the run context. Flow
//!    defaults are not consulted here; [`FlowRunner`](crate::FlowRunner) merges
//!    them into the context before any task runs
//! 2. `Binding::Value` → the constant
//! 3. `Binding::Upstream` → the upstream task's result (`null` if its state has none)
//! 4. Explicit overrides replace any of the above by argument name, and may
//!    add arguments the task does not bind at all

use std::collections::HashMap;

use flowstate_flow::{Binding, Context, Inputs, Task, TaskId};
use flowstate_state::State;

use crate::error::RuntimeError;

/// Resolve a task's arguments.
///
/// # Arguments
/// * `task` - The task being resolved
/// * `upstream_states` - States of upstream tasks, keyed by id
/// * `overrides` - Explicit argument values, highest precedence
/// * `context` - Run context carrying parameter values
pub fn resolve_inputs(
  task: &Task,
  upstream_states: &HashMap<TaskId, State>,
  overrides: &HashMap<String, serde_json::Value>,
  context: &Context,
) -> Result<Inputs, RuntimeError> {
  let mut inputs = Inputs::new();

  for (name, binding) in task.args() {
    if overrides.contains_key(name) {
      continue;
    }

    let value = match binding {
      Binding::Parameter(parameter) => context
        .parameter(parameter)
        .cloned()
        .ok_or_else(|| RuntimeError::InputResolution {
          name: task.name().to_string(),
          message: format!("no value for parameter '{}' (argument '{}')", parameter, name),
        })?,
      Binding::Value(value) => value.clone(),
      Binding::Upstream(upstream) => upstream_states
        .get(upstream)
        .map(|state| state.result().cloned().unwrap_or(serde_json::Value::Null))
        .ok_or_else(|| RuntimeError::InputResolution {
          name: task.name().to_string(),
          message: format!("no value for argument '{}': upstream task {} has no state", name, upstream),
        })?,
    };

    inputs.insert(name.clone(), value);
  }

  for (name, value) in overrides {
    inputs.insert(name.clone(), value.clone());
  }

  Ok(inputs)
}

/// Whether every argument fed by `upstream` is supplied in `overrides`.
///
/// State-only (`after`) dependencies can never be overridden.
pub fn is_overridden(
  task: &Task,
  upstream: TaskId,
  overrides: &HashMap<String, serde_json::Value>,
) -> bool {
  if task.has_state_dependency(upstream) {
    return false;
  }
  let args = task.args_bound_to(upstream);
  !args.is_empty() && args.iter().all(|arg| overrides.contains_key(*arg))
}
