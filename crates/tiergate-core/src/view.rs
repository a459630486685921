//! Derived read models for the acting identity's own subscription.
//!
//! [`SubscriptionView`] is a plain cache with explicit invalidation: nothing
//! re-fetches behind the holder's back. Call [`SubscriptionView::refresh`]
//! when fresh data is needed, or [`SubscriptionView::apply`] with the result
//! of a change.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
  Error, Result,
  identity::Identity,
  quota::QuotaUsage,
  record::SubscriptionRecord,
  role::{ResourceLimit, Role, StatusDisplay, SubscriptionStatus, capabilities_of},
  service::{AccessService, AppliedChange},
  store::SubscriptionStore,
};

// ─── Summary ─────────────────────────────────────────────────────────────────

/// Everything a client shows about a subscription. Computed, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionSummary {
  pub identity:           Identity,
  pub role:               Role,
  pub role_display_name:  &'static str,
  pub status:             SubscriptionStatus,
  pub status_display:     StatusDisplay,
  pub valid_from:         Option<DateTime<Utc>>,
  pub valid_until:        Option<DateTime<Utc>>,
  /// Whether the role's entitlement is live right now.
  pub entitlement_active: bool,
  pub resource_count:     u32,
  pub resource_limit:     ResourceLimit,
  pub can_create_more:    bool,
  /// e.g. `"1 / 2"` or `"4 / Unlimited"`.
  pub usage_display:      String,
  /// A free account that has used its whole quota.
  pub needs_upgrade:      bool,
  pub benefits:           &'static [&'static str],
}

impl SubscriptionSummary {
  pub fn of(record: &SubscriptionRecord, now: DateTime<Utc>) -> Self {
    let caps = capabilities_of(record.role);
    let usage = QuotaUsage::of(record);
    let can_create_more = usage.has_room();

    Self {
      identity: record.identity,
      role: record.role,
      role_display_name: caps.display_name,
      status: record.status,
      status_display: record.status.display(),
      valid_from: record.valid_from,
      valid_until: record.valid_until,
      entitlement_active: record.entitlement_in_effect(now),
      resource_count: record.resource_count,
      resource_limit: usage.limit,
      can_create_more,
      usage_display: usage.display(),
      needs_upgrade: record.role == Role::Free && !can_create_more,
      benefits: caps.benefits,
    }
  }
}

// ─── View ────────────────────────────────────────────────────────────────────

/// A caller-owned cached record for one identity.
#[derive(Debug, Clone)]
pub struct SubscriptionView {
  identity: Identity,
  record:   Option<SubscriptionRecord>,
}

impl SubscriptionView {
  /// An empty view; nothing is fetched until [`Self::refresh`].
  pub fn new(identity: Identity) -> Self { Self { identity, record: None } }

  pub fn identity(&self) -> Identity { self.identity }

  pub fn record(&self) -> Option<&SubscriptionRecord> { self.record.as_ref() }

  /// Re-fetch from the store.
  ///
  /// An identity with no record clears the view. On any other failure the
  /// previous value is kept and the error returned.
  pub async fn refresh<S: SubscriptionStore>(
    &mut self,
    service: &AccessService<S>,
  ) -> Result<Option<&SubscriptionRecord>> {
    match service.fetch_record(self.identity).await {
      Ok(record) => self.record = Some(record),
      Err(Error::NotFound(_)) => self.record = None,
      Err(e) => return Err(e),
    }
    Ok(self.record.as_ref())
  }

  /// Adopt the outcome of a change if it concerned this view's identity.
  /// Returns whether the view was updated.
  pub fn apply(&mut self, change: &AppliedChange) -> bool {
    if change.record.identity != self.identity {
      return false;
    }
    self.record = Some(change.record.clone());
    true
  }

  pub fn clear(&mut self) { self.record = None; }

  pub fn summary(&self, now: DateTime<Utc>) -> Option<SubscriptionSummary> {
    self.record.as_ref().map(|r| SubscriptionSummary::of(r, now))
  }

  /// A free account that cannot create more resources. `false` while
  /// nothing is cached.
  pub fn needs_upgrade(&self) -> bool {
    self
      .record
      .as_ref()
      .is_some_and(|r| r.role == Role::Free && !QuotaUsage::of(r).has_room())
  }
}
