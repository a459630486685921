//! SubscriptionRecord: the persisted entitlement state of one identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  error::ValidationError,
  identity::Identity,
  role::{Role, SubscriptionStatus},
};

/// Role, status, validity window and resource usage for one identity.
///
/// Created on registration as `(free, active)` with no window and a zero
/// count. Role, status and window change only through
/// [`lifecycle::apply_transition`](crate::lifecycle::apply_transition); the
/// count changes only through the store's claim/release primitives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
  pub identity:       Identity,
  pub role:           Role,
  pub status:         SubscriptionStatus,
  pub valid_from:     Option<DateTime<Utc>>,
  pub valid_until:    Option<DateTime<Utc>>,
  /// Resources currently owned by the identity.
  pub resource_count: u32,
}

impl SubscriptionRecord {
  /// The record every identity starts with.
  pub fn new(identity: Identity) -> Self {
    Self {
      identity,
      role: Role::Free,
      status: SubscriptionStatus::Active,
      valid_from: None,
      valid_until: None,
      resource_count: 0,
    }
  }

  /// Whether `now` falls inside the validity window. Missing bounds are open.
  pub fn within_window(&self, now: DateTime<Utc>) -> bool {
    self.valid_from.is_none_or(|from| from <= now)
      && self.valid_until.is_none_or(|until| now <= until)
  }

  /// Whether the role's entitlement is in effect at `now`.
  ///
  /// `free` has nothing that can lapse, so it is always in effect. `paid`
  /// and `super` need a live status and a window containing `now`.
  ///
  /// Quota evaluation does not consult this; see [`crate::quota`].
  pub fn entitlement_in_effect(&self, now: DateTime<Utc>) -> bool {
    match self.role {
      Role::Free => true,
      Role::Paid | Role::Super => {
        self.status.grants_entitlement() && self.within_window(now)
      }
    }
  }
}

/// Check that a validity window is well-formed.
pub fn validate_window(
  valid_from: Option<DateTime<Utc>>,
  valid_until: Option<DateTime<Utc>>,
) -> Result<(), ValidationError> {
  match (valid_from, valid_until) {
    (Some(valid_from), Some(valid_until)) if valid_from > valid_until => {
      Err(ValidationError::InvalidWindow { valid_from, valid_until })
    }
    _ => Ok(()),
  }
}

#[cfg(test)]
mod tests {
  use chrono::{Duration, TimeZone};

  use super::*;

  fn at(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, day, 12, 0, 0).unwrap()
  }

  #[test]
  fn new_record_defaults() {
    let id = Identity::random();
    let r = SubscriptionRecord::new(id);
    assert_eq!(r.identity, id);
    assert_eq!(r.role, Role::Free);
    assert_eq!(r.status, SubscriptionStatus::Active);
    assert!(r.valid_from.is_none() && r.valid_until.is_none());
    assert_eq!(r.resource_count, 0);
  }

  #[test]
  fn window_validation() {
    assert!(validate_window(None, None).is_ok());
    assert!(validate_window(Some(at(1)), None).is_ok());
    assert!(validate_window(Some(at(1)), Some(at(1))).is_ok());
    assert!(validate_window(Some(at(1)), Some(at(2))).is_ok());
    assert_eq!(
      validate_window(Some(at(2)), Some(at(1))),
      Err(ValidationError::InvalidWindow { valid_from: at(2), valid_until: at(1) })
    );
  }

  #[test]
  fn free_entitlement_never_lapses() {
    let mut r = SubscriptionRecord::new(Identity::random());
    r.status = SubscriptionStatus::Expired;
    r.valid_until = Some(at(1));
    assert!(r.entitlement_in_effect(at(20)));
  }

  #[test]
  fn paid_entitlement_needs_status_and_window() {
    let mut r = SubscriptionRecord::new(Identity::random());
    r.role = Role::Paid;
    r.valid_from = Some(at(1));
    r.valid_until = Some(at(10));

    assert!(r.entitlement_in_effect(at(5)));
    assert!(!r.entitlement_in_effect(at(11)));
    assert!(!r.entitlement_in_effect(at(1) - Duration::seconds(1)));

    r.status = SubscriptionStatus::Trial;
    assert!(r.entitlement_in_effect(at(5)));
    r.status = SubscriptionStatus::Expired;
    assert!(!r.entitlement_in_effect(at(5)));
  }
}
