//! Ambient run context.
//!
//! A [`Context`] is threaded explicitly through every runner call and handed
//! to task bodies read-only. Runners derive per-task contexts by value, so
//! concurrent runs never share a mutable context.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::identity::TaskId;
use crate::task::Task;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Context {
  /// Caller-supplied key/value metadata.
  #[serde(default)]
  entries: HashMap<String, serde_json::Value>,
  /// Flow parameters in effect for this run.
  #[serde(default)]
  parameters: HashMap<String, serde_json::Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  run_id: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  flow_name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  task_id: Option<TaskId>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  task_name: Option<String>,
}

impl Context {
  pub fn new() -> Self {
    Self::default()
  }

  /// Add a metadata entry.
  pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
    self.entries.insert(key.into(), value.into());
    self
  }

  /// Add a parameter value.
  pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
    self.parameters.insert(name.into(), value.into());
    self
  }

  /// Replace the parameter map.
  pub fn with_parameters(mut self, parameters: HashMap<String, serde_json::Value>) -> Self {
    self.parameters = parameters;
    self
  }

  /// Stamp run-level metadata.
  pub fn for_run(mut self, run_id: impl Into<String>, flow_name: Option<&str>) -> Self {
    self.run_id = Some(run_id.into());
    self.flow_name = flow_name.map(str::to_string);
    self
  }

  /// Derive the context seen by `task`'s body.
  pub fn for_task(&self, task: &Task) -> Self {
    let mut ctx = self.clone();
    ctx.task_id = Some(task.id());
    ctx.task_name = Some(task.name().to_string());
    ctx
  }

  pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
    self.entries.get(key)
  }

  pub fn entries(&self) -> &HashMap<String, serde_json::Value> {
    &self.entries
  }

  pub fn parameter(&self, name: &str) -> Option<&serde_json::Value> {
    self.parameters.get(name)
  }

  pub fn parameters(&self) -> &HashMap<String, serde_json::Value> {
    &self.parameters
  }

  pub fn run_id(&self) -> Option<&str> {
    self.run_id.as_deref()
  }

  pub fn flow_name(&self) -> Option<&str> {
    self.flow_name.as_deref()
  }

  pub fn task_id(&self) -> Option<TaskId> {
    self.task_id
  }

  pub fn task_name(&self) -> Option<&str> {
    self.task_name.as_deref()
  }
}
