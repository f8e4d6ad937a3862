//! Execution events and notifiers for observability.
//!
//! Events are emitted as states change during a run so consumers can observe
//! progress, persist states, stream to UIs, etc.

use flowstate_flow::TaskId;
use flowstate_state::StateTag;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Events emitted during task and flow runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExecutionEvent {
  /// A flow run has started.
  FlowStarted { run_id: String, flow_name: String },

  /// A task moved from one state to another.
  TaskStateChanged {
    run_id: Option<String>,
    task_id: TaskId,
    task_name: String,
    from: StateTag,
    to: StateTag,
  },

  /// A flow run finished with the given aggregate tag.
  FlowFinished {
    run_id: String,
    flow_name: String,
    tag: StateTag,
  },

  /// A flow run was cancelled before every task finished.
  FlowCancelled { run_id: String, flow_name: String },
}

/// Trait for receiving execution events.
///
/// The runners call `notify` for each event; implementations decide what to
/// do with them.
pub trait ExecutionNotifier: Send + Sync {
  fn notify(&self, event: ExecutionEvent);
}

/// A notifier that discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl ExecutionNotifier for NoopNotifier {
  fn notify(&self, _event: ExecutionEvent) {}
}

/// A notifier that sends events to an unbounded channel.
///
/// Sends never block the run. Event volume is a handful per task.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  sender: mpsc::UnboundedSender<ExecutionEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<ExecutionEvent>) -> Self {
    Self { sender }
  }

  /// Create a notifier together with the receiving end of its channel.
  pub fn channel() -> (Self, mpsc::UnboundedReceiver<ExecutionEvent>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (Self::new(sender), receiver)
  }
}

impl ExecutionNotifier for ChannelNotifier {
  fn notify(&self, event: ExecutionEvent) {
    // Receiver may have been dropped
    let _ = self.sender.send(event);
  }
}
