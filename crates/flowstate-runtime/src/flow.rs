//! Flow execution.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use flowstate_config::RunnerConfig;
use flowstate_flow::{Context, Flow, Task, TaskId};
use flowstate_state::State;
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Span, info, instrument, warn};

use crate::aggregate::aggregate;
use crate::error::RuntimeError;
use crate::events::{ExecutionEvent, ExecutionNotifier, NoopNotifier};
use crate::result::{FlowState, TaskStates};
use crate::task::{TaskRunArgs, TaskRunner};

/// Arguments for one [`FlowRunner::run`] call. Every field is optional.
#[derive(Debug, Clone, Default)]
pub struct FlowRunArgs {
  /// Starting flow state. A terminal state short-circuits the run.
  pub state: Option<State>,
  /// Starting task states, keyed by task id.
  pub task_states: HashMap<TaskId, State>,
  /// Run only these tasks and everything downstream of them.
  pub start_tasks: Option<Vec<TaskId>>,
  pub context: Context,
  /// Parameter values. Merged over the flow's declared defaults.
  pub parameters: HashMap<String, serde_json::Value>,
  /// Explicit argument values per task name.
  pub override_task_inputs: HashMap<String, HashMap<String, serde_json::Value>>,
}

impl FlowRunArgs {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_state(mut self, state: State) -> Self {
    self.state = Some(state);
    self
  }

  pub fn with_task_state(mut self, task: &Task, state: State) -> Self {
    self.task_states.insert(task.id(), state);
    self
  }

  pub fn with_task_states(mut self, task_states: HashMap<TaskId, State>) -> Self {
    self.task_states = task_states;
    self
  }

  pub fn with_start_tasks<'a>(mut self, tasks: impl IntoIterator<Item = &'a Task>) -> Self {
    self.start_tasks = Some(tasks.into_iter().map(Task::id).collect());
    self
  }

  pub fn with_context(mut self, context: Context) -> Self {
    self.context = context;
    self
  }

  pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
    self.parameters.insert(name.into(), value.into());
    self
  }

  /// Supply `value` for argument `arg` of every task named `task_name`.
  pub fn with_task_input(
    mut self,
    task_name: impl Into<String>,
    arg: impl Into<String>,
    value: impl Into<serde_json::Value>,
  ) -> Self {
    self
      .override_task_inputs
      .entry(task_name.into())
      .or_default()
      .insert(arg.into(), value.into());
    self
  }
}

/// Runs a whole flow in dependency order.
///
/// Tasks whose upstreams are all resolved run together as a batch, bounded
/// by [`RunnerConfig::max_concurrency`]. A sequential run
/// (`max_concurrency = Some(1)`) produces the same states.
#[derive(Clone)]
pub struct FlowRunner {
  config: RunnerConfig,
  notifier: Arc<dyn ExecutionNotifier>,
}

impl FlowRunner {
  pub fn new(config: RunnerConfig) -> Self {
    Self {
      config,
      notifier: Arc::new(NoopNotifier),
    }
  }

  /// Send flow and task events to `notifier`.
  pub fn with_notifier(mut self, notifier: Arc<dyn ExecutionNotifier>) -> Self {
    self.notifier = notifier;
    self
  }

  pub fn config(&self) -> &RunnerConfig {
    &self.config
  }

  /// Run `flow`.
  ///
  /// Caller mistakes (unknown task ids, bad parameters, an invalid config) are
  /// errors returned before any task runs. Task failures are recorded as
  /// states unless `raise_on_error` is set.
  #[instrument(
    name = "flow_run",
    skip(self, flow, args, cancel),
    fields(flow_name = %flow.name(), run_id = tracing::field::Empty)
  )]
  pub async fn run(
    &self,
    flow: &Flow,
    args: FlowRunArgs,
    cancel: CancellationToken,
  ) -> Result<FlowState, RuntimeError> {
    self.config.validate()?;

    let FlowRunArgs {
      state,
      task_states,
      start_tasks,
      context,
      parameters,
      override_task_inputs,
    } = args;

    let run_id = context
      .run_id()
      .map(str::to_string)
      .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    Span::current().record("run_id", run_id.as_str());

    if let Some(task_id) = task_states.keys().find(|id| !flow.contains(id)) {
      return Err(RuntimeError::UnknownTask {
        flow: flow.name().to_string(),
        task_id: *task_id,
      });
    }

    let start = state.unwrap_or_default();
    if start.is_terminal() {
      info!(tag = %start.tag(), "flow_already_finished");
      return Ok(FlowState::new(start, task_states.into(), Some(run_id)));
    }

    let mut supplied = context.parameters().clone();
    supplied.extend(parameters);
    let parameters = resolve_parameters(flow, supplied)?;

    let executed = executed_set(flow, start_tasks.as_deref())?;

    for task_name in override_task_inputs.keys() {
      if flow.tasks_named(task_name).is_empty() {
        warn!(task_name = %task_name, "input override for unknown task");
      }
    }

    let context = context
      .with_parameters(parameters)
      .for_run(run_id.clone(), Some(flow.name()));

    // Executed tasks keep a terminal seed; anything else starts over
    let mut states: HashMap<TaskId, State> = HashMap::new();
    for task in flow.tasks() {
      let seeded = task_states.get(&task.id()).cloned();
      let initial = match seeded {
        Some(seed) if !executed.contains(&task.id()) || seed.is_terminal() => seed,
        _ => State::pending(),
      };
      states.insert(task.id(), initial);
    }

    info!(run_id = %run_id, executed_tasks = executed.len(), "flow_started");
    self.notifier.notify(ExecutionEvent::FlowStarted {
      run_id: run_id.clone(),
      flow_name: flow.name().to_string(),
    });

    let task_runner = TaskRunner::new(self.config.clone()).with_notifier(Arc::clone(&self.notifier));
    let semaphore = self.config.max_concurrency.map(|limit| Arc::new(Semaphore::new(limit)));

    let mut resolved: HashSet<TaskId> = flow
      .registry()
      .ids()
      .iter()
      .filter(|id| !executed.contains(id))
      .copied()
      .collect();
    let mut remaining: Vec<TaskId> = flow
      .graph()
      .topological_order()
      .iter()
      .filter(|id| executed.contains(id))
      .copied()
      .collect();

    while !remaining.is_empty() {
      if cancel.is_cancelled() {
        return Ok(self.cancelled(flow, &run_id, states));
      }

      let ready: Vec<TaskId> = remaining
        .iter()
        .filter(|id| flow.graph().upstream(id).iter().all(|u| resolved.contains(u)))
        .copied()
        .collect();
      remaining.retain(|id| !ready.contains(id));

      info!(
        run_id = %run_id,
        ready_tasks = ?ready.iter().filter_map(|id| flow.task(id).map(Task::name)).collect::<Vec<_>>(),
        "executing batch of ready tasks"
      );

      let mut in_flight: FuturesUnordered<JoinHandle<(TaskId, Result<State, RuntimeError>)>> =
        FuturesUnordered::new();

      for task_id in &ready {
        let Some(task) = flow.task(task_id).cloned() else {
          resolved.insert(*task_id);
          continue;
        };

        let upstream_states: HashMap<TaskId, State> = flow
          .graph()
          .upstream(task_id)
          .iter()
          .map(|upstream| (*upstream, states.get(upstream).cloned().unwrap_or_default()))
          .collect();

        let task_args = TaskRunArgs {
          state: states.get(task_id).cloned(),
          upstream_states,
          inputs: override_task_inputs.get(task.name()).cloned().unwrap_or_default(),
          context: context.clone(),
        };

        let runner = task_runner.clone();
        let semaphore = semaphore.clone();
        let cancel = cancel.clone();
        in_flight.push(tokio::spawn(async move {
          let _permit = match semaphore {
            Some(semaphore) => semaphore.acquire_owned().await.ok(),
            None => None,
          };
          // Not started before cancellation: keep the recorded state
          if cancel.is_cancelled() {
            return (task.id(), Ok(task_args.state.unwrap_or_default()));
          }
          let result = runner.run(&task, task_args).await;
          (task.id(), result)
        }));
      }

      // Started bodies cannot be interrupted, so every in-flight task is
      // collected before the run reports cancellation
      let mut cancelling = false;

      loop {
        tokio::select! {
          biased;
          _ = cancel.cancelled(), if !cancelling => {
            info!(run_id = %run_id, in_flight = in_flight.len(), "collecting in-flight tasks after cancellation");
            cancelling = true;
          }
          next = in_flight.next() => match next {
            Some(Ok((task_id, Ok(state)))) => {
              resolved.insert(task_id);
              states.insert(task_id, state);
            }
            Some(Ok((_, Err(e)))) => {
              abort_all(&in_flight);
              warn!(run_id = %run_id, error = %e, "flow_failed");
              return Err(e);
            }
            Some(Err(e)) => {
              abort_all(&in_flight);
              warn!(run_id = %run_id, error = %e, "flow_failed");
              return Err(RuntimeError::Join {
                message: e.to_string(),
              });
            }
            None => break,
          }
        }
      }
    }

    let states = TaskStates::from(states);
    let reference: Vec<TaskId> = match flow.reference_tasks() {
      Some(reference) => reference.to_vec(),
      None => flow
        .graph()
        .topological_order()
        .iter()
        .filter(|id| executed.contains(id))
        .copied()
        .collect(),
    };
    let flow_state = aggregate(flow, &reference, &states, &self.config);

    info!(run_id = %run_id, tag = %flow_state.tag(), "flow_finished");
    self.notifier.notify(ExecutionEvent::FlowFinished {
      run_id: run_id.clone(),
      flow_name: flow.name().to_string(),
      tag: flow_state.tag(),
    });

    Ok(FlowState::new(flow_state, states, Some(run_id)))
  }

  /// Keep finished states; unfinished tasks stay as recorded (`Pending` or a
  /// terminal seed).
  fn cancelled(&self, flow: &Flow, run_id: &str, states: HashMap<TaskId, State>) -> FlowState {
    warn!(run_id = %run_id, "flow_cancelled");
    self.notifier.notify(ExecutionEvent::FlowCancelled {
      run_id: run_id.to_string(),
      flow_name: flow.name().to_string(),
    });
    FlowState::new(
      State::pending().with_message("run cancelled"),
      states.into(),
      Some(run_id.to_string()),
    )
  }
}

impl Default for FlowRunner {
  fn default() -> Self {
    Self::new(RunnerConfig::default())
  }
}

impl fmt::Debug for FlowRunner {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("FlowRunner")
      .field("config", &self.config)
      .finish_non_exhaustive()
  }
}

fn abort_all<T>(in_flight: &FuturesUnordered<JoinHandle<T>>) {
  for handle in in_flight.iter() {
    handle.abort();
  }
}

/// Merge supplied parameter values over the flow's declared defaults.
fn resolve_parameters(
  flow: &Flow,
  supplied: HashMap<String, serde_json::Value>,
) -> Result<HashMap<String, serde_json::Value>, RuntimeError> {
  if let Some(name) = supplied.keys().find(|name| flow.parameter(name).is_none()) {
    return Err(RuntimeError::UnknownParameter { name: name.clone() });
  }

  let mut resolved = HashMap::new();
  for parameter in flow.parameters() {
    let value = supplied
      .get(&parameter.name)
      .or(parameter.default.as_ref())
      .cloned()
      .ok_or_else(|| RuntimeError::MissingParameter {
        name: parameter.name.clone(),
      })?;
    resolved.insert(parameter.name.clone(), value);
  }
  Ok(resolved)
}

/// Tasks this run executes: the whole flow, or the downstream closure of
/// `start_tasks`.
fn executed_set(flow: &Flow, start_tasks: Option<&[TaskId]>) -> Result<HashSet<TaskId>, RuntimeError> {
  let Some(start_tasks) = start_tasks else {
    return Ok(flow.registry().ids().iter().copied().collect());
  };

  if let Some(task_id) = start_tasks.iter().find(|id| !flow.contains(id)) {
    return Err(RuntimeError::UnknownTask {
      flow: flow.name().to_string(),
      task_id: *task_id,
    });
  }

  Ok(flow.graph().downstream_closure(start_tasks))
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use flowstate_flow::{Binding, FlowBuilder, Outcome, Parameter};
  use flowstate_state::StateTag;

  fn constant(name: &str, value: i64) -> Task {
    Task::new(name, move |_, _| Ok(Outcome::value(value)))
  }

  #[test]
  fn test_resolve_parameters() {
    let flow = FlowBuilder::new("params")
      .parameter(Parameter::required("x"))
      .parameter(Parameter::with_default("y", 2))
      .build()
      .unwrap();

    let resolved = resolve_parameters(&flow, HashMap::from([("x".to_string(), json!(1))])).unwrap();
    assert_eq!(resolved.get("x"), Some(&json!(1)));
    assert_eq!(resolved.get("y"), Some(&json!(2)));

    let missing = resolve_parameters(&flow, HashMap::new()).unwrap_err();
    assert!(matches!(missing, RuntimeError::MissingParameter { name } if name == "x"));

    let unknown =
      resolve_parameters(&flow, HashMap::from([("z".to_string(), json!(0))])).unwrap_err();
    assert!(matches!(unknown, RuntimeError::UnknownParameter { name } if name == "z"));
  }

  #[test]
  fn test_executed_set_closure() {
    let a = constant("a", 1);
    let b = constant("b", 2).after(&a);
    let c = constant("c", 3).after(&b);
    let other = constant("other", 4);
    let flow = FlowBuilder::new("closure")
      .tasks([a.clone(), b.clone(), c.clone(), other.clone()])
      .build()
      .unwrap();

    let all = executed_set(&flow, None).unwrap();
    assert_eq!(all.len(), 4);

    let from_b = executed_set(&flow, Some(&[b.id()][..])).unwrap();
    assert_eq!(from_b, HashSet::from([b.id(), c.id()]));

    let stranger = TaskId::new();
    let err = executed_set(&flow, Some(&[stranger][..])).unwrap_err();
    assert!(matches!(err, RuntimeError::UnknownTask { task_id, .. } if task_id == stranger));
  }

  #[tokio::test]
  async fn test_abort_all_stops_in_flight_handles() {
    let in_flight: FuturesUnordered<JoinHandle<()>> = FuturesUnordered::new();
    for _ in 0..2 {
      in_flight.push(tokio::spawn(std::future::pending::<()>()));
    }

    abort_all(&in_flight);

    let joined: Vec<_> = in_flight.collect().await;
    assert_eq!(joined.len(), 2);
    assert!(joined.iter().all(|result| matches!(result, Err(e) if e.is_cancelled())));
  }

  #[tokio::test]
  async fn test_terminal_flow_state_short_circuits() {
    let a = Task::new("a", |_, _| panic!("must not run"));
    let flow = FlowBuilder::new("done").task(a.clone()).build().unwrap();

    let args = FlowRunArgs::new()
      .with_state(State::new(StateTag::Success))
      .with_task_state(&a, State::success(1));
    let result = FlowRunner::default()
      .run(&flow, args, CancellationToken::new())
      .await
      .unwrap();

    assert_eq!(result, StateTag::Success);
    assert_eq!(result.task_state(&a.id()).unwrap().result(), Some(&json!(1)));
  }

  #[tokio::test]
  async fn test_rejects_zero_concurrency() {
    let flow = FlowBuilder::new("empty").build().unwrap();
    let runner = FlowRunner::new(RunnerConfig::default().max_concurrency(Some(0)));
    let err = runner
      .run(&flow, FlowRunArgs::new(), CancellationToken::new())
      .await
      .unwrap_err();
    assert!(matches!(err, RuntimeError::Config(_)));
  }

  #[tokio::test]
  async fn test_seeded_state_for_unknown_task_rejected() {
    let flow = FlowBuilder::new("f").task(constant("a", 1)).build().unwrap();
    let stranger = constant("stranger", 0);
    let err = FlowRunner::default()
      .run(
        &flow,
        FlowRunArgs::new().with_task_state(&stranger, State::success(0)),
        CancellationToken::new(),
      )
      .await
      .unwrap_err();
    assert!(matches!(err, RuntimeError::UnknownTask { .. }));
  }

  #[tokio::test]
  async fn test_data_flows_between_waves() {
    let a = constant("a", 20);
    let b = Task::new("b", |inputs, _| {
      let x: i64 = inputs.require("x")?;
      Ok(Outcome::value(x * 2))
    })
    .arg("x", Binding::upstream(&a));
    let flow = FlowBuilder::new("waves").tasks([b.clone(), a.clone()]).build().unwrap();

    let result = FlowRunner::default()
      .run(&flow, FlowRunArgs::new(), CancellationToken::new())
      .await
      .unwrap();

    assert_eq!(result, StateTag::Success);
    assert_eq!(result.task_state(&b.id()).unwrap().result(), Some(&json!(40)));
    assert!(result.run_id().is_some());
  }
}
