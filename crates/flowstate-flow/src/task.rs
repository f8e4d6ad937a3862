use std::fmt;
use std::sync::Arc;

use flowstate_state::State;

use crate::context::Context;
use crate::identity::TaskId;
use crate::inputs::Inputs;
use crate::trigger::Trigger;

/// Signature of a task body.
///
/// Returning `Err` is a task failure; the runner captures it into a `Failed`
/// state.
pub type TaskFn = dyn Fn(&Inputs, &Context) -> anyhow::Result<Outcome> + Send + Sync;

/// What a task body produced.
#[derive(Debug, Clone)]
pub enum Outcome {
  /// A plain value, wrapped into `Success`.
  Value(serde_json::Value),
  /// An explicit terminal state, recorded as-is.
  State(State),
}

impl Outcome {
  pub fn value(value: impl Into<serde_json::Value>) -> Self {
    Outcome::Value(value.into())
  }

  /// Finish as `Skipped` with a reason.
  pub fn skip(message: impl Into<String>) -> Self {
    Outcome::State(State::skipped().with_message(message))
  }

  /// Finish as `Failed` without raising an error.
  pub fn fail(message: impl Into<String>) -> Self {
    Outcome::State(State::failed(message))
  }
}

impl From<serde_json::Value> for Outcome {
  fn from(value: serde_json::Value) -> Self {
    Outcome::Value(value)
  }
}

impl From<State> for Outcome {
  fn from(state: State) -> Self {
    Outcome::State(state)
  }
}

/// Where an argument's value comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
  /// A constant.
  Value(serde_json::Value),
  /// The result of another task.
  Upstream(TaskId),
  /// A flow parameter, by name.
  Parameter(String),
}

impl Binding {
  pub fn value(value: impl Into<serde_json::Value>) -> Self {
    Binding::Value(value.into())
  }

  pub fn upstream(task: &Task) -> Self {
    Binding::Upstream(task.id())
  }

  pub fn parameter(name: impl Into<String>) -> Self {
    Binding::Parameter(name.into())
  }
}

/// One unit of work in a flow.
///
/// Cloning a task keeps its id; clones address the same task.
#[derive(Clone)]
pub struct Task {
  id: TaskId,
  name: String,
  body: Arc<TaskFn>,
  args: Vec<(String, Binding)>,
  after: Vec<TaskId>,
  trigger: Trigger,
  skip_on_upstream_skip: bool,
}

impl Task {
  /// Define a task. A fresh [`TaskId`] is assigned here.
  pub fn new<F>(name: impl Into<String>, body: F) -> Self
  where
    F: Fn(&Inputs, &Context) -> anyhow::Result<Outcome> + Send + Sync + 'static,
  {
    Self {
      id: TaskId::new(),
      name: name.into(),
      body: Arc::new(body),
      args: Vec::new(),
      after: Vec::new(),
      trigger: Trigger::default(),
      skip_on_upstream_skip: true,
    }
  }

  /// Replace the generated id with a caller-supplied one.
  pub fn with_id(mut self, id: TaskId) -> Self {
    self.id = id;
    self
  }

  /// Bind argument `name`. Binding the same name again replaces it.
  pub fn arg(mut self, name: impl Into<String>, binding: Binding) -> Self {
    let name = name.into();
    match self.args.iter_mut().find(|(arg, _)| *arg == name) {
      Some(slot) => slot.1 = binding,
      None => self.args.push((name, binding)),
    }
    self
  }

  /// Run only after `upstream` has finished. No data flows along this edge.
  pub fn after(mut self, upstream: &Task) -> Self {
    if !self.after.contains(&upstream.id) {
      self.after.push(upstream.id);
    }
    self
  }

  pub fn with_trigger(mut self, trigger: Trigger) -> Self {
    self.trigger = trigger;
    self
  }

  /// Whether a skipped upstream skips this task (default `true`).
  pub fn skip_on_upstream_skip(mut self, skip: bool) -> Self {
    self.skip_on_upstream_skip = skip;
    self
  }

  pub fn id(&self) -> TaskId {
    self.id
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn args(&self) -> &[(String, Binding)] {
    &self.args
  }

  pub fn trigger(&self) -> Trigger {
    self.trigger
  }

  pub fn skips_on_upstream_skip(&self) -> bool {
    self.skip_on_upstream_skip
  }

  /// Direct dependencies (data and state-only), deduplicated, in declaration order.
  pub fn upstream_ids(&self) -> Vec<TaskId> {
    let mut ids = Vec::new();
    let data = self.args.iter().filter_map(|(_, binding)| match binding {
      Binding::Upstream(id) => Some(*id),
      _ => None,
    });
    for id in data.chain(self.after.iter().copied()) {
      if !ids.contains(&id) {
        ids.push(id);
      }
    }
    ids
  }

  /// Argument names fed by `upstream`. Empty for state-only dependencies.
  pub fn args_bound_to(&self, upstream: TaskId) -> Vec<&str> {
    self
      .args
      .iter()
      .filter(|(_, binding)| *binding == Binding::Upstream(upstream))
      .map(|(name, _)| name.as_str())
      .collect()
  }

  /// Whether this task waits on `upstream` through an `after` edge.
  pub fn has_state_dependency(&self, upstream: TaskId) -> bool {
    self.after.contains(&upstream)
  }

  /// Parameter names this task reads.
  pub fn parameter_refs(&self) -> impl Iterator<Item = &str> {
    self.args.iter().filter_map(|(_, binding)| match binding {
      Binding::Parameter(name) => Some(name.as_str()),
      _ => None,
    })
  }

  /// Shared handle to the body, for running it off the calling task.
  pub fn body(&self) -> Arc<TaskFn> {
    Arc::clone(&self.body)
  }

  /// Invoke the body directly on the current thread.
  pub fn invoke(&self, inputs: &Inputs, context: &Context) -> anyhow::Result<Outcome> {
    (self.body)(inputs, context)
  }
}

impl fmt::Debug for Task {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Task")
      .field("id", &self.id)
      .field("name", &self.name)
      .field("args", &self.args)
      .field("after", &self.after)
      .field("trigger", &self.trigger)
      .field("skip_on_upstream_skip", &self.skip_on_upstream_skip)
      .finish_non_exhaustive()
  }
}

impl fmt::Display for Task {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "<Task: {}>", self.name)
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn add_one() -> Task {
    Task::new("add_one", |inputs, _| {
      let x: i64 = inputs.require("x")?;
      Ok(Outcome::value(x + 1))
    })
  }

  #[test]
  fn test_upstream_ids_dedup() {
    let a = add_one();
    let b = add_one();
    let c = add_one()
      .arg("x", Binding::upstream(&a))
      .arg("y", Binding::upstream(&a))
      .after(&b)
      .after(&a);

    assert_eq!(c.upstream_ids(), vec![a.id(), b.id()]);
    assert_eq!(c.args_bound_to(a.id()), vec!["x", "y"]);
    assert!(c.args_bound_to(b.id()).is_empty());
    assert!(c.has_state_dependency(b.id()));
    assert!(c.has_state_dependency(a.id()));
    assert!(!b.has_state_dependency(a.id()));
  }

  #[test]
  fn test_rebinding_replaces() {
    let task = add_one()
      .arg("x", Binding::value(1))
      .arg("x", Binding::parameter("start"));
    assert_eq!(task.args(), &[("x".to_string(), Binding::parameter("start"))]);
    assert_eq!(task.parameter_refs().collect::<Vec<_>>(), vec!["start"]);
  }

  #[test]
  fn test_invoke() {
    let task = add_one();
    let inputs = Inputs::from_iter([("x".to_string(), json!(41))]);
    let outcome = task.invoke(&inputs, &Context::new()).unwrap();
    assert!(matches!(outcome, Outcome::Value(v) if v == json!(42)));
  }

  #[test]
  fn test_clone_keeps_identity() {
    let task = add_one();
    assert_eq!(task.clone().id(), task.id());
    assert_eq!(task.to_string(), "<Task: add_one>");
  }
}
