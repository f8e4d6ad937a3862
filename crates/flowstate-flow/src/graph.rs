use std::collections::{HashMap, HashSet, VecDeque};

use crate::identity::TaskId;

/// Dependency graph of a flow, for traversal and ordering.
///
/// Edges point from an upstream task to its dependent. The graph is only
/// built from validated, acyclic flows.
#[derive(Debug, Clone)]
pub struct Graph {
  /// Adjacency list: task_id -> downstream task_ids.
  adjacency: HashMap<TaskId, Vec<TaskId>>,
  /// Reverse adjacency: task_id -> upstream task_ids.
  reverse_adjacency: HashMap<TaskId, Vec<TaskId>>,
  /// Topological order; ties broken by registration order.
  order: Vec<TaskId>,
  /// Position of each task in `order`.
  position: HashMap<TaskId, usize>,
}

impl Graph {
  /// Build a graph from task ids (in registration order) and `(upstream, downstream)` edges.
  pub fn new(task_ids: &[TaskId], edges: &[(TaskId, TaskId)]) -> Self {
    let mut adjacency: HashMap<TaskId, Vec<TaskId>> = HashMap::new();
    let mut reverse_adjacency: HashMap<TaskId, Vec<TaskId>> = HashMap::new();

    for task_id in task_ids {
      adjacency.entry(*task_id).or_default();
      reverse_adjacency.entry(*task_id).or_default();
    }

    for (from, to) in edges {
      adjacency.entry(*from).or_default().push(*to);
      reverse_adjacency.entry(*to).or_default().push(*from);
    }

    let order = topological_order(task_ids, &adjacency, &reverse_adjacency);
    let position = order.iter().enumerate().map(|(i, id)| (*id, i)).collect();

    Self {
      adjacency,
      reverse_adjacency,
      order,
      position,
    }
  }

  /// Direct dependents of a task.
  pub fn downstream(&self, task_id: &TaskId) -> &[TaskId] {
    self
      .adjacency
      .get(task_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Direct dependencies of a task.
  pub fn upstream(&self, task_id: &TaskId) -> &[TaskId] {
    self
      .reverse_adjacency
      .get(task_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Every task, upstream tasks before their dependents.
  pub fn topological_order(&self) -> &[TaskId] {
    &self.order
  }

  /// Index of a task in [`Graph::topological_order`].
  pub fn position(&self, task_id: &TaskId) -> Option<usize> {
    self.position.get(task_id).copied()
  }

  /// `starts` plus everything reachable downstream from them.
  pub fn downstream_closure(&self, starts: &[TaskId]) -> HashSet<TaskId> {
    let mut seen: HashSet<TaskId> = HashSet::new();
    let mut queue: VecDeque<TaskId> = starts.iter().copied().collect();

    while let Some(task_id) = queue.pop_front() {
      if seen.insert(task_id) {
        queue.extend(self.downstream(&task_id).iter().copied());
      }
    }

    seen
  }
}

/// Kahn's algorithm. Ready tasks are released in registration order so the
/// result is stable across runs.
fn topological_order(
  task_ids: &[TaskId],
  adjacency: &HashMap<TaskId, Vec<TaskId>>,
  reverse_adjacency: &HashMap<TaskId, Vec<TaskId>>,
) -> Vec<TaskId> {
  let rank: HashMap<TaskId, usize> = task_ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
  let mut remaining: HashMap<TaskId, usize> = task_ids
    .iter()
    .map(|id| (*id, reverse_adjacency.get(id).map_or(0, Vec::len)))
    .collect();

  let mut ready: Vec<TaskId> = task_ids
    .iter()
    .filter(|id| remaining.get(*id) == Some(&0))
    .copied()
    .collect();
  let mut order = Vec::with_capacity(task_ids.len());

  while !ready.is_empty() {
    ready.sort_by_key(|id| std::cmp::Reverse(rank.get(id).copied().unwrap_or(usize::MAX)));
    let Some(task_id) = ready.pop() else {
      break;
    };
    order.push(task_id);

    for next in adjacency.get(&task_id).into_iter().flatten() {
      if let Some(count) = remaining.get_mut(next) {
        *count -= 1;
        if *count == 0 {
          ready.push(*next);
        }
      }
    }
  }

  order
}
