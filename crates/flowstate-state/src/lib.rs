//! Flowstate State
//!
//! Run states for tasks and flows. A [`State`] is the outcome record of one
//! run attempt: a [`StateTag`] from a closed set, an optional result payload
//! and an optional diagnostic message.
//!
//! States are values. Runners never mutate a state in place; every step of the
//! lifecycle produces a new [`State`].
//!
//! ```text
//! Pending ──► Running ──► Success | Failed | Skipped | TriggerFailed | UpstreamFailed
//!    │
//!    └──────► Skipped | TriggerFailed | UpstreamFailed   (upstream inspection)
//! ```

mod error;
mod state;
mod tag;

pub use error::StateError;
pub use state::State;
pub use tag::StateTag;
