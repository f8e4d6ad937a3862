//! Task and flow runners for flowstate.
//!
//! This crate turns task definitions into [`State`](flowstate_state::State)s.
//!
//! # Architecture
//!
//! ```text
//! FlowRunner
//! └── run(flow, args, cancel) -> FlowState
//!     ├── resolve parameters, executed set (start_tasks closure)
//!     ├── wave loop: ready tasks run concurrently via TaskRunner
//!     └── aggregate reference task states into the flow state
//!
//! TaskRunner
//! └── run(task, args) -> State
//!     ├── terminal starting state: returned unchanged
//!     ├── upstream inspection: Pending / Skipped / trigger
//!     ├── input resolution: parameters, constants, upstream results, overrides
//!     └── body on a blocking worker: Success / Failed / forced state
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use flowstate_runtime::{FlowRunArgs, FlowRunner};
//! use tokio_util::sync::CancellationToken;
//!
//! let runner = FlowRunner::new(RunnerConfig::default());
//! let result = runner.run(&flow, FlowRunArgs::new(), CancellationToken::new()).await?;
//!
//! let state = result.task_state(&task.id())?;
//! ```

mod aggregate;
mod error;
mod events;
mod flow;
mod input;
mod result;
mod task;

pub use aggregate::aggregate;
pub use error::RuntimeError;
pub use events::{ChannelNotifier, ExecutionEvent, ExecutionNotifier, NoopNotifier};
pub use flow::{FlowRunArgs, FlowRunner};
pub use input::resolve_inputs;
pub use result::{FlowState, TaskStates};
pub use task::{TaskRunArgs, TaskRunner};
