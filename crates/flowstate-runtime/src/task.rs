//! Single-task execution.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use anyhow::anyhow;
use flowstate_config::RunnerConfig;
use flowstate_flow::{Context, Outcome, Task, TaskId, Trigger};
use flowstate_state::{State, StateTag};
use tracing::{debug, info, instrument, warn};

use crate::error::RuntimeError;
use crate::events::{ExecutionEvent, ExecutionNotifier, NoopNotifier};
use crate::input::{is_overridden, resolve_inputs};

/// Arguments for one [`TaskRunner::run`] call. Every field is optional.
#[derive(Debug, Clone, Default)]
pub struct TaskRunArgs {
  /// Starting state. `None` means `Pending`.
  pub state: Option<State>,
  /// States of the task's upstream dependencies.
  pub upstream_states: HashMap<TaskId, State>,
  /// Explicit argument values. These win over every binding.
  pub inputs: HashMap<String, serde_json::Value>,
  pub context: Context,
}

impl TaskRunArgs {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_state(mut self, state: State) -> Self {
    self.state = Some(state);
    self
  }

  pub fn with_upstream_state(mut self, upstream: &Task, state: State) -> Self {
    self.upstream_states.insert(upstream.id(), state);
    self
  }

  pub fn with_upstream_states(mut self, states: HashMap<TaskId, State>) -> Self {
    self.upstream_states = states;
    self
  }

  pub fn with_input(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
    self.inputs.insert(name.into(), value.into());
    self
  }

  pub fn with_inputs(mut self, inputs: HashMap<String, serde_json::Value>) -> Self {
    self.inputs = inputs;
    self
  }

  pub fn with_context(mut self, context: Context) -> Self {
    self.context = context;
    self
  }
}

/// Runs one task to a state.
///
/// Task failures come back as `Failed` states, not errors, unless
/// [`RunnerConfig::raise_on_error`] is set.
#[derive(Clone)]
pub struct TaskRunner {
  config: RunnerConfig,
  notifier: Arc<dyn ExecutionNotifier>,
}

impl TaskRunner {
  pub fn new(config: RunnerConfig) -> Self {
    Self {
      config,
      notifier: Arc::new(NoopNotifier),
    }
  }

  /// Send state changes to `notifier`.
  pub fn with_notifier(mut self, notifier: Arc<dyn ExecutionNotifier>) -> Self {
    self.notifier = notifier;
    self
  }

  pub fn config(&self) -> &RunnerConfig {
    &self.config
  }

  /// Run `task` once.
  ///
  /// A terminal starting state is returned as-is without invoking the body.
  /// Otherwise upstream states are inspected, arguments resolved and the
  /// body executed on a blocking worker.
  #[instrument(
    name = "task_run",
    skip(self, task, args),
    fields(
      task_id = %task.id(),
      task_name = %task.name(),
      run_id = args.context.run_id().unwrap_or_default(),
    )
  )]
  pub async fn run(&self, task: &Task, args: TaskRunArgs) -> Result<State, RuntimeError> {
    let TaskRunArgs {
      state,
      upstream_states,
      inputs: overrides,
      context,
    } = args;

    let start = state.unwrap_or_default();
    if start.is_terminal() {
      debug!(tag = %start.tag(), "task_already_finished");
      return Ok(start);
    }

    // A run interrupted while `Running` is retried from the top
    let current = if start.is_running() {
      State::pending()
    } else {
      start
    };
    let context = context.for_task(task);

    if let Some(next) = self.check_upstream(task, &upstream_states, &overrides) {
      let next = current.transition(next)?;
      self.record(task, &context, &current, &next);
      if next.is_skipped() {
        info!(reason = next.message().unwrap_or_default(), "task_skipped");
      }
      return Ok(next);
    }

    let running = current.transition(State::running())?;
    self.record(task, &context, &current, &running);
    info!("task_started");

    let outcome = match resolve_inputs(task, &upstream_states, &overrides, &context) {
      Ok(inputs) => {
        let body = task.body();
        let body_context = context.clone();
        match tokio::task::spawn_blocking(move || body(&inputs, &body_context)).await {
          Ok(result) => result,
          Err(join_error) if join_error.is_panic() => Err(anyhow!(
            "task panicked: {}",
            panic_message(join_error.into_panic())
          )),
          Err(join_error) => Err(anyhow!("task was cancelled: {}", join_error)),
        }
      }
      Err(error) => {
        if self.config.raise_on_error {
          let failed = State::failed(error.to_string());
          self.record(task, &context, &running, &failed);
          return Err(error);
        }
        Err(anyhow!(error.to_string()))
      }
    };

    let finished = match outcome {
      Ok(Outcome::Value(value)) => State::success(value),
      Ok(Outcome::State(forced)) => match running.transition(forced) {
        Ok(state) => state,
        Err(error) => State::failed(format!("task returned an invalid state: {}", error)),
      },
      Err(error) => {
        let failed = State::failed(format!("{:#}", error));
        warn!(error = %format!("{:#}", error), "task_failed");
        if self.config.raise_on_error {
          self.record(task, &context, &running, &failed);
          return Err(RuntimeError::TaskFailed {
            task_id: task.id(),
            name: task.name().to_string(),
            source: error,
          });
        }
        failed
      }
    };

    self.record(task, &context, &running, &finished);
    info!(tag = %finished.tag(), "task_finished");
    Ok(finished)
  }

  /// Decide a state from upstream inspection alone, or `None` if the body
  /// should run.
  fn check_upstream(
    &self,
    task: &Task,
    upstream_states: &HashMap<TaskId, State>,
    overrides: &HashMap<String, serde_json::Value>,
  ) -> Option<State> {
    let inspected: Vec<(TaskId, StateTag)> = task
      .upstream_ids()
      .into_iter()
      .filter(|upstream| !is_overridden(task, *upstream, overrides))
      .filter_map(|upstream| upstream_states.get(&upstream).map(|state| (upstream, state.tag())))
      .collect();

    if let Some((upstream, tag)) = inspected.iter().find(|(_, tag)| !tag.is_terminal()) {
      return Some(State::pending().with_message(format!(
        "upstream task {} has not finished ({})",
        upstream, tag
      )));
    }

    if task.skips_on_upstream_skip() {
      if let Some((upstream, _)) = inspected.iter().find(|(_, tag)| tag.is_skipped()) {
        return Some(State::skipped().with_message(format!("upstream task {} was skipped", upstream)));
      }
    }

    let tags: Vec<StateTag> = inspected.iter().map(|(_, tag)| *tag).collect();
    if !task.trigger().is_satisfied(&tags) {
      let unsuccessful = inspected
        .iter()
        .filter(|(_, tag)| !tag.is_successful() && !tag.is_skipped())
        .count();
      let message = format!(
        "trigger {:?} was not met ({} of {} upstream tasks did not succeed)",
        task.trigger(),
        unsuccessful,
        inspected.len()
      );
      return Some(match task.trigger() {
        Trigger::AllSuccessful => State::upstream_failed(message),
        _ => State::trigger_failed(message),
      });
    }

    None
  }

  fn record(&self, task: &Task, context: &Context, from: &State, to: &State) {
    if from.tag() == to.tag() {
      return;
    }
    self.notifier.notify(ExecutionEvent::TaskStateChanged {
      run_id: context.run_id().map(str::to_string),
      task_id: task.id(),
      task_name: task.name().to_string(),
      from: from.tag(),
      to: to.tag(),
    });
  }
}

impl Default for TaskRunner {
  fn default() -> Self {
    Self::new(RunnerConfig::default())
  }
}

impl fmt::Debug for TaskRunner {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TaskRunner")
      .field("config", &self.config)
      .finish_non_exhaustive()
  }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
  if let Some(message) = payload.downcast_ref::<&str>() {
    message.to_string()
  } else if let Some(message) = payload.downcast_ref::<String>() {
    message.clone()
  } else {
    "non-string panic payload".to_string()
  }
}
