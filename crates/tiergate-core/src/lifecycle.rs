//! Subscription lifecycle: validating and applying role/status transitions.
//!
//! There is no formal state machine: any `(role, status)` pair can be reached
//! from any other, downgrades and regressions included. The only rules are
//! that enum values are known and the validity window is well-formed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  error::ValidationError,
  record::{SubscriptionRecord, validate_window},
  role::{Role, SubscriptionStatus, is_valid_transition},
};

/// A requested replacement of role, status and validity window.
///
/// The window is replaced wholesale: `None` clears a bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
  pub role:        Role,
  pub status:      SubscriptionStatus,
  pub valid_from:  Option<DateTime<Utc>>,
  pub valid_until: Option<DateTime<Utc>>,
}

impl Transition {
  /// Build a transition from untyped boundary input.
  pub fn parse(
    role: &str,
    status: &str,
    valid_from: Option<DateTime<Utc>>,
    valid_until: Option<DateTime<Utc>>,
  ) -> Result<Self, ValidationError> {
    let transition = Self {
      role: Role::parse(role)?,
      status: SubscriptionStatus::parse(status)?,
      valid_from,
      valid_until,
    };
    transition.validate()?;
    Ok(transition)
  }

  /// A role change that keeps the record's current status and window.
  pub fn role_only(record: &SubscriptionRecord, role: Role) -> Self {
    Self {
      role,
      status: record.status,
      valid_from: record.valid_from,
      valid_until: record.valid_until,
    }
  }

  pub fn validate(&self) -> Result<(), ValidationError> {
    validate_window(self.valid_from, self.valid_until)
  }
}

/// Compute the record that results from applying `transition` to `record`.
///
/// `resource_count` and `identity` are carried over untouched. Persisting
/// the result is the store's job; callers must use the record the store
/// returns rather than any value cached before the call.
pub fn apply_transition(
  record: &SubscriptionRecord,
  transition: &Transition,
) -> Result<SubscriptionRecord, ValidationError> {
  transition.validate()?;

  if !is_valid_transition(record.role, transition.role) {
    return Err(ValidationError::ForbiddenTransition {
      from: record.role,
      to:   transition.role,
    });
  }

  Ok(SubscriptionRecord {
    identity:       record.identity,
    role:           transition.role,
    status:         transition.status,
    valid_from:     transition.valid_from,
    valid_until:    transition.valid_until,
    resource_count: record.resource_count,
  })
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;
  use strum::IntoEnumIterator as _;

  use super::*;
  use crate::identity::Identity;

  fn at(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, day, 0, 0, 0).unwrap()
  }

  #[test]
  fn parse_rejects_unknown_values() {
    let err = Transition::parse("gold", "active", None, None).unwrap_err();
    assert!(matches!(err, ValidationError::UnknownEnumValue { field: "role", .. }));

    let err = Transition::parse("paid", "cancelled", None, None).unwrap_err();
    assert!(matches!(err, ValidationError::UnknownEnumValue { field: "status", .. }));
  }

  #[test]
  fn parse_rejects_inverted_window() {
    let err = Transition::parse("paid", "active", Some(at(10)), Some(at(9))).unwrap_err();
    assert_eq!(err.kind(), "invalid_window");
  }

  #[test]
  fn apply_rejects_inverted_window() {
    let record = SubscriptionRecord::new(Identity::random());
    let t = Transition {
      role:        Role::Paid,
      status:      SubscriptionStatus::Active,
      valid_from:  Some(at(2)),
      valid_until: Some(at(1)),
    };
    assert!(matches!(
      apply_transition(&record, &t),
      Err(ValidationError::InvalidWindow { .. })
    ));
  }

  #[test]
  fn every_enum_combination_is_accepted() {
    let mut record = SubscriptionRecord::new(Identity::random());
    record.resource_count = 5;

    for from_role in Role::iter() {
      record.role = from_role;
      for role in Role::iter() {
        for status in SubscriptionStatus::iter() {
          let t = Transition { role, status, valid_from: Some(at(1)), valid_until: Some(at(30)) };
          let next = apply_transition(&record, &t).unwrap();
          assert_eq!((next.role, next.status), (role, status));
          assert_eq!(next.resource_count, 5);
          assert_eq!(next.identity, record.identity);
        }
      }
    }
  }

  #[test]
  fn downgrade_and_regression() {
    let mut record = SubscriptionRecord::new(Identity::random());
    record.role = Role::Super;
    let t = Transition {
      role:        Role::Free,
      status:      SubscriptionStatus::Expired,
      valid_from:  None,
      valid_until: None,
    };
    let next = apply_transition(&record, &t).unwrap();
    assert_eq!(next.role, Role::Free);
    assert_eq!(next.status, SubscriptionStatus::Expired);
  }

  #[test]
  fn role_only_keeps_status_and_window() {
    let mut record = SubscriptionRecord::new(Identity::random());
    record.status = SubscriptionStatus::Trial;
    record.valid_until = Some(at(20));
    let t = Transition::role_only(&record, Role::Paid);
    let next = apply_transition(&record, &t).unwrap();
    assert_eq!(next.role, Role::Paid);
    assert_eq!(next.status, SubscriptionStatus::Trial);
    assert_eq!(next.valid_until, Some(at(20)));
  }
}
