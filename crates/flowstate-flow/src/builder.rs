use std::collections::{HashMap, HashSet};

use crate::error::FlowError;
use crate::flow::{Flow, Parameter};
use crate::graph::Graph;
use crate::identity::{TaskId, TaskRegistry};
use crate::task::Task;

/// Assembles and validates a [`Flow`].
///
/// `build` checks, in order:
/// 1. Task ids are unique and parameter names are unique
/// 2. Every dependency references a task in the flow
/// 3. Every parameter binding references a declared parameter
/// 4. Reference tasks are part of the flow
/// 5. The graph has no cycles
#[derive(Debug)]
pub struct FlowBuilder {
  name: String,
  tasks: Vec<Task>,
  parameters: Vec<Parameter>,
  reference_tasks: Option<Vec<TaskId>>,
}

impl FlowBuilder {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      tasks: Vec::new(),
      parameters: Vec::new(),
      reference_tasks: None,
    }
  }

  pub fn task(mut self, task: Task) -> Self {
    self.tasks.push(task);
    self
  }

  pub fn tasks(mut self, tasks: impl IntoIterator<Item = Task>) -> Self {
    self.tasks.extend(tasks);
    self
  }

  pub fn parameter(mut self, parameter: Parameter) -> Self {
    self.parameters.push(parameter);
    self
  }

  /// Restrict flow state aggregation to these tasks.
  pub fn reference_tasks<'a>(mut self, tasks: impl IntoIterator<Item = &'a Task>) -> Self {
    self.reference_tasks = Some(tasks.into_iter().map(Task::id).collect());
    self
  }

  pub fn build(self) -> Result<Flow, FlowError> {
    let mut registry = TaskRegistry::new();
    for task in self.tasks {
      registry.insert(task)?;
    }

    let mut parameter_names = HashSet::new();
    for parameter in &self.parameters {
      if !parameter_names.insert(parameter.name.as_str()) {
        return Err(FlowError::DuplicateParameter {
          name: parameter.name.clone(),
        });
      }
    }

    let mut edges = Vec::new();
    for task in registry.iter() {
      for upstream in task.upstream_ids() {
        if !registry.contains(&upstream) {
          return Err(FlowError::UnknownUpstream {
            task: task.name().to_string(),
            upstream,
          });
        }
        edges.push((upstream, task.id()));
      }

      for parameter in task.parameter_refs() {
        if !parameter_names.contains(parameter) {
          return Err(FlowError::UnknownParameter {
            task: task.name().to_string(),
            parameter: parameter.to_string(),
          });
        }
      }
    }

    if let Some(reference_tasks) = &self.reference_tasks {
      if let Some(task_id) = reference_tasks.iter().find(|id| !registry.contains(id)) {
        return Err(FlowError::UnknownReferenceTask { task_id: *task_id });
      }
    }

    detect_cycle(&registry, &edges)?;

    let graph = Graph::new(registry.ids(), &edges);

    Ok(Flow {
      name: self.name,
      registry,
      parameters: self.parameters,
      reference_tasks: self.reference_tasks,
      graph,
    })
  }
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
  Unvisited,
  InProgress,
  Done,
}

/// Depth-first search with three-color marking; a back edge is a cycle.
fn detect_cycle(registry: &TaskRegistry, edges: &[(TaskId, TaskId)]) -> Result<(), FlowError> {
  let mut adjacency: HashMap<TaskId, Vec<TaskId>> = HashMap::new();
  for (from, to) in edges {
    adjacency.entry(*from).or_default().push(*to);
  }

  let mut marks: HashMap<TaskId, Mark> = registry
    .ids()
    .iter()
    .map(|id| (*id, Mark::Unvisited))
    .collect();

  fn visit(
    task_id: TaskId,
    adjacency: &HashMap<TaskId, Vec<TaskId>>,
    marks: &mut HashMap<TaskId, Mark>,
  ) -> Option<TaskId> {
    marks.insert(task_id, Mark::InProgress);

    for &next in adjacency.get(&task_id).into_iter().flatten() {
      match marks.get(&next) {
        Some(Mark::InProgress) => return Some(next),
        Some(Mark::Unvisited) => {
          if let Some(found) = visit(next, adjacency, marks) {
            return Some(found);
          }
        }
        _ => {}
      }
    }

    marks.insert(task_id, Mark::Done);
    None
  }

  for task_id in registry.ids() {
    if marks.get(task_id) == Some(&Mark::Unvisited) {
      if let Some(found) = visit(*task_id, &adjacency, &mut marks) {
        let task = registry
          .get(&found)
          .map(|t| t.name().to_string())
          .unwrap_or_else(|| found.to_string());
        return Err(FlowError::CycleDetected { task });
      }
    }
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::task::{Binding, Outcome};

  fn noop(name: &str) -> Task {
    Task::new(name, |_, _| Ok(Outcome::value(json!(null))))
  }

  #[test]
  fn test_build_linear_flow() {
    let a = noop("a");
    let b = noop("b").arg("x", Binding::upstream(&a));
    let flow = FlowBuilder::new("linear")
      .task(b.clone())
      .task(a.clone())
      .build()
      .unwrap();

    assert_eq!(flow.name(), "linear");
    assert_eq!(flow.len(), 2);
    let order: Vec<TaskId> = flow.tasks().map(Task::id).collect();
    assert_eq!(order, vec![a.id(), b.id()]);
    assert_eq!(flow.graph().upstream(&b.id()), &[a.id()]);
  }

  #[test]
  fn test_duplicate_task_rejected() {
    let a = noop("a");
    let err = FlowBuilder::new("dup").task(a.clone()).task(a).build().unwrap_err();
    assert!(matches!(err, FlowError::DuplicateTaskId { .. }));
  }

  #[test]
  fn test_unknown_upstream_rejected() {
    let outside = noop("outside");
    let b = noop("b").arg("x", Binding::upstream(&outside));
    let err = FlowBuilder::new("f").task(b).build().unwrap_err();
    assert!(matches!(err, FlowError::UnknownUpstream { upstream, .. } if upstream == outside.id()));
  }

  #[test]
  fn test_unknown_parameter_rejected() {
    let a = noop("a").arg("x", Binding::parameter("missing"));
    let err = FlowBuilder::new("f").task(a).build().unwrap_err();
    assert!(matches!(err, FlowError::UnknownParameter { parameter, .. } if parameter == "missing"));
  }

  #[test]
  fn test_duplicate_parameter_rejected() {
    let err = FlowBuilder::new("f")
      .parameter(Parameter::required("x"))
      .parameter(Parameter::with_default("x", 1))
      .build()
      .unwrap_err();
    assert!(matches!(err, FlowError::DuplicateParameter { name } if name == "x"));
  }

  #[test]
  fn test_unknown_reference_task_rejected() {
    let a = noop("a");
    let outside = noop("outside");
    let err = FlowBuilder::new("f")
      .task(a)
      .reference_tasks([&outside])
      .build()
      .unwrap_err();
    assert!(matches!(err, FlowError::UnknownReferenceTask { .. }));
  }

  #[test]
  fn test_cycle_rejected() {
    let a_id = TaskId::new();
    let b = noop("b").arg("x", Binding::Upstream(a_id));
    let a = noop("a").with_id(a_id).after(&b);

    let err = FlowBuilder::new("cyclic").task(a).task(b).build().unwrap_err();
    assert!(matches!(err, FlowError::CycleDetected { .. }));
  }

  #[test]
  fn test_self_dependency_rejected() {
    let id = TaskId::new();
    let a = noop("a").with_id(id).arg("x", Binding::Upstream(id));
    let err = FlowBuilder::new("self").task(a).build().unwrap_err();
    assert!(matches!(err, FlowError::CycleDetected { task } if task == "a"));
  }
}
