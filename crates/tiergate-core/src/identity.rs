//! Identity: the opaque, stable identifier of an acting user.
//!
//! Identities are issued upstream by whatever authenticates the caller; this
//! crate only stores and compares them.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Identity(Uuid);

impl Identity {
  pub fn new(id: Uuid) -> Self { Self(id) }

  /// A fresh random identity; used by tests and fixtures.
  pub fn random() -> Self { Self(Uuid::new_v4()) }

  pub fn as_uuid(&self) -> Uuid { self.0 }
}

impl From<Uuid> for Identity {
  fn from(id: Uuid) -> Self { Self(id) }
}

impl fmt::Display for Identity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0.hyphenated())
  }
}

impl FromStr for Identity {
  type Err = uuid::Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> { Ok(Self(Uuid::parse_str(s)?)) }
}
