//! Error types for `tiergate-core`.
//!
//! Access denials are not errors: they are [`AccessDecision`] values carrying
//! a machine-checkable reason. Errors here are what a caller cannot turn
//! into a decision: malformed input, a missing identity, or a store that did
//! not answer.
//!
//! [`AccessDecision`]: crate::gate::AccessDecision

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{identity::Identity, role::Role};

/// Rejected input to a subscription transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("validity window starts at {valid_from} but ends at {valid_until}")]
  InvalidWindow {
    valid_from:  DateTime<Utc>,
    valid_until: DateTime<Utc>,
  },

  #[error("unknown {field} value: {value:?}")]
  UnknownEnumValue { field: &'static str, value: String },

  #[error("role transition from {from} to {to} is not permitted")]
  ForbiddenTransition { from: Role, to: Role },
}

impl ValidationError {
  /// Stable machine-readable kind, suitable for API payloads.
  pub fn kind(&self) -> &'static str {
    match self {
      Self::InvalidWindow { .. } => "invalid_window",
      Self::UnknownEnumValue { .. } => "unknown_enum_value",
      Self::ForbiddenTransition { .. } => "forbidden_transition",
    }
  }
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("validation failed: {0}")]
  Validation(#[from] ValidationError),

  #[error("no subscription record for identity {0}")]
  NotFound(Identity),

  #[error("identity {0} is already registered")]
  AlreadyRegistered(Identity),

  #[error("subscription store unavailable: {0}")]
  StoreUnavailable(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
