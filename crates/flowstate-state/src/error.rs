use thiserror::Error;

use crate::tag::StateTag;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
  #[error("invalid state transition: {from} -> {to}")]
  InvalidTransition { from: StateTag, to: StateTag },
}
