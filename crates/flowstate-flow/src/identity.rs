//! Task identity.
//!
//! A [`TaskId`] is assigned when a task is defined and never changes. Run
//! results are keyed by it, never by the task's display name.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::FlowError;
use crate::task::Task;

/// Stable, process-unique identity of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
  /// Generate a fresh random id.
  pub fn new() -> Self {
    Self(Uuid::new_v4())
  }

  /// Wrap a caller-supplied id.
  pub fn from_uuid(uuid: Uuid) -> Self {
    Self(uuid)
  }

  pub fn as_uuid(&self) -> &Uuid {
    &self.0
  }
}

impl fmt::Display for TaskId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    self.0.fmt(f)
  }
}

impl FromStr for TaskId {
  type Err = uuid::Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Uuid::parse_str(s).map(Self)
  }
}

impl From<Uuid> for TaskId {
  fn from(uuid: Uuid) -> Self {
    Self(uuid)
  }
}

/// Tasks of one flow, indexed by id (unique) and by name (not unique).
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
  tasks: HashMap<TaskId, Task>,
  /// Insertion order, used for deterministic iteration.
  order: Vec<TaskId>,
  by_name: HashMap<String, Vec<TaskId>>,
}

impl TaskRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a task. Fails if its id is already registered.
  pub fn insert(&mut self, task: Task) -> Result<(), FlowError> {
    let task_id = task.id();
    if self.tasks.contains_key(&task_id) {
      return Err(FlowError::DuplicateTaskId {
        task_id,
        name: task.name().to_string(),
      });
    }

    self
      .by_name
      .entry(task.name().to_string())
      .or_default()
      .push(task_id);
    self.order.push(task_id);
    self.tasks.insert(task_id, task);
    Ok(())
  }

  pub fn get(&self, task_id: &TaskId) -> Option<&Task> {
    self.tasks.get(task_id)
  }

  pub fn contains(&self, task_id: &TaskId) -> bool {
    self.tasks.contains_key(task_id)
  }

  /// All tasks carrying `name`, in registration order.
  pub fn get_by_name(&self, name: &str) -> Vec<&Task> {
    self
      .by_name
      .get(name)
      .map(|ids| ids.iter().filter_map(|id| self.tasks.get(id)).collect())
      .unwrap_or_default()
  }

  /// Task ids in registration order.
  pub fn ids(&self) -> &[TaskId] {
    &self.order
  }

  /// Tasks in registration order.
  pub fn iter(&self) -> impl Iterator<Item = &Task> {
    self.order.iter().filter_map(|id| self.tasks.get(id))
  }

  pub fn len(&self) -> usize {
    self.order.len()
  }

  pub fn is_empty(&self) -> bool {
    self.order.is_empty()
  }
}
