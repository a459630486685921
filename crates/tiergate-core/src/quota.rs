//! Quota evaluation: may this identity create one more resource?
//!
//! Pure reads of a [`SubscriptionRecord`]; safe to call concurrently and in
//! any order. Because it is read-then-decide, it cannot by itself stop two
//! concurrent creations from both passing. Actual creation must go through
//! the store's atomic
//! [`increment_resource_count_if_under_limit`](crate::store::SubscriptionStore::increment_resource_count_if_under_limit).
//!
//! The ceiling comes from the role alone. A `paid` record whose status is
//! `expired` keeps its unlimited quota.

use serde::Serialize;

use crate::{
  record::SubscriptionRecord,
  role::{ResourceLimit, capabilities_of},
};

/// Current usage against the role's ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuotaUsage {
  pub count: u32,
  pub limit: ResourceLimit,
}

impl QuotaUsage {
  pub fn of(record: &SubscriptionRecord) -> Self {
    Self {
      count: record.resource_count,
      limit: capabilities_of(record.role).quota,
    }
  }

  pub fn has_room(&self) -> bool { self.limit.admits(self.count) }

  /// `"1 / 2"` or `"7 / Unlimited"`.
  pub fn display(&self) -> String { format!("{} / {}", self.count, self.limit) }
}

pub fn can_create_resource(record: &SubscriptionRecord) -> bool {
  QuotaUsage::of(record).has_room()
}
