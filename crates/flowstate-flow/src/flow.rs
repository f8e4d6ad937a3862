use serde::{Deserialize, Serialize};

use crate::graph::Graph;
use crate::identity::{TaskId, TaskRegistry};
use crate::task::Task;

/// A named flow input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
  pub name: String,
  /// Value used when the run supplies none. `None` makes the parameter required.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub default: Option<serde_json::Value>,
}

impl Parameter {
  pub fn required(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      default: None,
    }
  }

  pub fn with_default(name: impl Into<String>, default: impl Into<serde_json::Value>) -> Self {
    Self {
      name: name.into(),
      default: Some(default.into()),
    }
  }

  pub fn is_required(&self) -> bool {
    self.default.is_none()
  }
}

/// A validated flow ready to run. Built with [`crate::FlowBuilder`].
#[derive(Debug, Clone)]
pub struct Flow {
  pub(crate) name: String,
  pub(crate) registry: TaskRegistry,
  pub(crate) parameters: Vec<Parameter>,
  pub(crate) reference_tasks: Option<Vec<TaskId>>,
  pub(crate) graph: Graph,
}

impl Flow {
  pub fn name(&self) -> &str {
    &self.name
  }

  /// Look up a task by id.
  pub fn task(&self, task_id: &TaskId) -> Option<&Task> {
    self.registry.get(task_id)
  }

  pub fn contains(&self, task_id: &TaskId) -> bool {
    self.registry.contains(task_id)
  }

  /// Tasks carrying `name`. Names are not unique.
  pub fn tasks_named(&self, name: &str) -> Vec<&Task> {
    self.registry.get_by_name(name)
  }

  /// Tasks in topological order.
  pub fn tasks(&self) -> impl Iterator<Item = &Task> {
    self
      .graph
      .topological_order()
      .iter()
      .filter_map(|id| self.registry.get(id))
  }

  pub fn registry(&self) -> &TaskRegistry {
    &self.registry
  }

  pub fn graph(&self) -> &Graph {
    &self.graph
  }

  pub fn parameters(&self) -> &[Parameter] {
    &self.parameters
  }

  pub fn parameter(&self, name: &str) -> Option<&Parameter> {
    self.parameters.iter().find(|p| p.name == name)
  }

  /// Tasks whose states decide the flow's state, if declared.
  pub fn reference_tasks(&self) -> Option<&[TaskId]> {
    self.reference_tasks.as_deref()
  }

  pub fn len(&self) -> usize {
    self.registry.len()
  }

  pub fn is_empty(&self) -> bool {
    self.registry.is_empty()
  }
}
