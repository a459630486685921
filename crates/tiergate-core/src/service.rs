//! [`AccessService`]: the operations exposed to the invoking framework.
//!
//! Composes the store with the pure gates and lifecycle rules. The store is
//! injected at construction; every round-trip to it is bounded by
//! [`GateConfig::store_timeout`].
//!
//! Gates are total: a store failure or timeout yields a
//! [`ReasonCode::StoreUnavailable`] denial, never an allow and never an
//! error. Non-gate operations surface the failure as
//! [`Error::StoreUnavailable`].

use std::{future::Future, sync::Arc, time::Duration};

use chrono::Utc;
use serde::Serialize;

use crate::{
  Error, Result,
  account::{AccountDetails, DashboardStats, NewAccount, SearchBounds, UserSearchResult},
  gate::{AccessDecision, ReasonCode, RoutePattern, gate_admin_area, gate_resource_creation},
  identity::Identity,
  lifecycle::{Transition, apply_transition},
  record::SubscriptionRecord,
  role::Role,
  store::SubscriptionStore,
  view::SubscriptionSummary,
};

// ─── Configuration ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct GateConfig {
  /// Paths matching this pattern are subject to the resource quota.
  pub creation_route: RoutePattern,
  /// Upper bound on any single store round-trip.
  pub store_timeout:  Duration,
  pub search:         SearchBounds,
}

impl Default for GateConfig {
  fn default() -> Self {
    Self {
      creation_route: RoutePattern::default(),
      store_timeout:  Duration::from_secs(2),
      search:         SearchBounds::default(),
    }
  }
}

/// The result of a subscription change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedChange {
  /// The record as stored after the change.
  pub record:              SubscriptionRecord,
  /// The actor changed their own subscription; any view they hold is stale
  /// and should be replaced with `record` or refreshed.
  pub refresh_caller_view: bool,
}

// ─── Service ─────────────────────────────────────────────────────────────────

pub struct AccessService<S> {
  store:  Arc<S>,
  config: GateConfig,
}

impl<S> Clone for AccessService<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), config: self.config.clone() }
  }
}

impl<S: SubscriptionStore> AccessService<S> {
  pub fn new(store: Arc<S>, config: GateConfig) -> Self { Self { store, config } }

  pub fn config(&self) -> &GateConfig { &self.config }

  pub fn store(&self) -> &Arc<S> { &self.store }

  /// Run one store round-trip under the configured timeout.
  async fn call<T>(
    &self,
    op: &'static str,
    fut: impl Future<Output = Result<T, S::Error>>,
  ) -> Result<T> {
    match tokio::time::timeout(self.config.store_timeout, fut).await {
      Ok(Ok(value)) => Ok(value),
      Ok(Err(e)) => {
        tracing::error!(op, error = %e, "subscription store call failed");
        Err(Error::StoreUnavailable(e.to_string()))
      }
      Err(_) => {
        tracing::error!(
          op,
          timeout_ms = u64::try_from(self.config.store_timeout.as_millis()).unwrap_or(u64::MAX),
          "subscription store call timed out"
        );
        Err(Error::StoreUnavailable(format!("{op} timed out")))
      }
    }
  }

  /// Fetch the authoritative record for `identity`.
  pub async fn fetch_record(&self, identity: Identity) -> Result<SubscriptionRecord> {
    self
      .call("get_record", self.store.get_record(identity))
      .await?
      .ok_or(Error::NotFound(identity))
  }

  // ── Gates ─────────────────────────────────────────────────────────────

  /// May `identity` enter the admin area?
  ///
  /// An unknown identity gets the same `InsufficientRole` answer as a known
  /// non-super one, so the response does not reveal which it was.
  pub async fn check_admin_access(&self, identity: Identity) -> AccessDecision {
    let decision = match self.fetch_record(identity).await {
      Ok(record) => gate_admin_area(&record),
      Err(Error::NotFound(_)) => AccessDecision::insufficient_role(Role::Super),
      Err(_) => AccessDecision::store_unavailable(),
    };
    tracing::debug!(
      %identity,
      allowed = decision.allowed,
      reason = ?decision.reason,
      "admin gate"
    );
    decision
  }

  /// May `identity` proceed to `path`? Only the creation route is gated;
  /// every other path passes without touching the store.
  pub async fn check_resource_creation_access(
    &self,
    identity: Identity,
    path: &str,
  ) -> AccessDecision {
    let route = &self.config.creation_route;
    if !route.matches(path) {
      return AccessDecision::not_gated();
    }

    let decision = match self.fetch_record(identity).await {
      Ok(record) => gate_resource_creation(&record, path, route),
      Err(Error::NotFound(_)) => AccessDecision::unknown_identity(),
      Err(_) => AccessDecision::store_unavailable(),
    };
    tracing::debug!(
      %identity,
      path,
      allowed = decision.allowed,
      reason = ?decision.reason,
      "resource creation gate"
    );
    decision
  }

  // ── Resource counters ─────────────────────────────────────────────────

  /// Reserve one unit of quota for a resource about to be created.
  ///
  /// Unlike [`Self::check_resource_creation_access`] this is race-free: it
  /// relies on the store's atomic compare-and-increment.
  pub async fn claim_resource_slot(&self, identity: Identity) -> AccessDecision {
    let claimed = self
      .call(
        "increment_resource_count_if_under_limit",
        self.store.increment_resource_count_if_under_limit(identity),
      )
      .await;

    let decision = match claimed {
      Ok(true) => AccessDecision::allow(ReasonCode::Granted, "Resource slot claimed."),
      Ok(false) => match self.fetch_record(identity).await {
        Ok(record) => AccessDecision::quota_exceeded(&record),
        Err(Error::NotFound(_)) => AccessDecision::unknown_identity(),
        Err(_) => AccessDecision::store_unavailable(),
      },
      Err(_) => AccessDecision::store_unavailable(),
    };
    tracing::debug!(
      %identity,
      allowed = decision.allowed,
      reason = ?decision.reason,
      "resource slot claim"
    );
    decision
  }

  /// Return one unit of quota after a resource is deleted.
  ///
  /// Returns `false` if the count was already zero.
  pub async fn release_resource_slot(&self, identity: Identity) -> Result<bool> {
    let released = self
      .call("decrement_resource_count", self.store.decrement_resource_count(identity))
      .await?;
    if !released {
      // Distinguish "already zero" from "no such identity".
      self.fetch_record(identity).await?;
    }
    Ok(released)
  }

  // ── Lifecycle ─────────────────────────────────────────────────────────

  /// Replace the role, status and validity window of `target`.
  ///
  /// `actor` is the identity issuing the request; when it equals `target`
  /// the returned [`AppliedChange`] asks the caller to refresh its own view.
  pub async fn apply_subscription_change(
    &self,
    actor: Identity,
    target: Identity,
    transition: Transition,
  ) -> Result<AppliedChange> {
    transition.validate()?;
    let current = self.fetch_record(target).await?;
    self.persist_transition(actor, &current, transition).await
  }

  /// Change only the role of `target`, keeping its status and window.
  pub async fn apply_role_change(
    &self,
    actor: Identity,
    target: Identity,
    role: Role,
  ) -> Result<AppliedChange> {
    let current = self.fetch_record(target).await?;
    let transition = Transition::role_only(&current, role);
    self.persist_transition(actor, &current, transition).await
  }

  async fn persist_transition(
    &self,
    actor: Identity,
    current: &SubscriptionRecord,
    transition: Transition,
  ) -> Result<AppliedChange> {
    let target = current.identity;
    let expected = apply_transition(current, &transition)?;

    let record = self
      .call("update_record", self.store.update_record(target, transition))
      .await?
      .ok_or(Error::NotFound(target))?;
    // Stored timestamps may be coarser than the requested ones.
    debug_assert_eq!(
      (record.role, record.status, record.valid_from.is_some(), record.valid_until.is_some()),
      (expected.role, expected.status, expected.valid_from.is_some(), expected.valid_until.is_some()),
      "store applied a different transition"
    );

    tracing::info!(
      %actor,
      %target,
      from_role = %current.role,
      to_role = %record.role,
      from_status = %current.status,
      to_status = %record.status,
      "subscription transition applied"
    );

    Ok(AppliedChange { record, refresh_caller_view: actor == target })
  }

  // ── Accounts ──────────────────────────────────────────────────────────

  /// Register a new identity with the default `(free, active)` record.
  pub async fn register_account(
    &self,
    identity: Identity,
    account: NewAccount,
  ) -> Result<SubscriptionRecord> {
    let record = self
      .call("register", self.store.register(identity, account))
      .await?
      .ok_or(Error::AlreadyRegistered(identity))?;
    tracing::info!(%identity, "account registered");
    Ok(record)
  }

  pub async fn account_details(&self, identity: Identity) -> Result<AccountDetails> {
    self
      .call("get_account", self.store.get_account(identity))
      .await?
      .ok_or(Error::NotFound(identity))
  }

  pub async fn subscription_summary(&self, identity: Identity) -> Result<SubscriptionSummary> {
    let record = self.fetch_record(identity).await?;
    Ok(SubscriptionSummary::of(&record, Utc::now()))
  }

  // ── Admin reads ───────────────────────────────────────────────────────

  /// Paginated user search. `limit` and `offset` are clamped to
  /// [`GateConfig::search`] before reaching the store.
  pub async fn list_search_results(
    &self,
    term: &str,
    limit: Option<usize>,
    offset: Option<usize>,
  ) -> Result<Vec<UserSearchResult>> {
    let query = self.config.search.query(term, limit, offset);
    self.call("search", self.store.search(&query)).await
  }

  pub async fn dashboard_stats(&self) -> Result<DashboardStats> {
    self.call("stats", self.store.stats()).await
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use chrono::TimeZone;

  use super::*;
  use crate::{
    gate::QuotaScope,
    role::SubscriptionStatus,
    test_support::{BrokenStore, MemoryStore},
  };

  fn service(store: MemoryStore) -> AccessService<MemoryStore> {
    AccessService::new(Arc::new(store), GateConfig::default())
  }

  fn broken(store: BrokenStore) -> AccessService<BrokenStore> {
    let config = GateConfig { store_timeout: Duration::from_millis(20), ..GateConfig::default() };
    AccessService::new(Arc::new(store), config)
  }

  fn record(role: Role, status: SubscriptionStatus, count: u32) -> SubscriptionRecord {
    SubscriptionRecord {
      role,
      status,
      resource_count: count,
      ..SubscriptionRecord::new(Identity::random())
    }
  }

  // ── Admin gate ──────────────────────────────────────────────────────────

  #[tokio::test]
  async fn admin_access_for_super_only() {
    let admin = record(Role::Super, SubscriptionStatus::Active, 0);
    let paid = record(Role::Paid, SubscriptionStatus::Active, 0);
    let svc = service(MemoryStore::with_records([admin.clone(), paid.clone()]));

    assert!(svc.check_admin_access(admin.identity).await.allowed);
    let d = svc.check_admin_access(paid.identity).await;
    assert!(!d.allowed);
    assert_eq!(d.reason, ReasonCode::InsufficientRole);
  }

  #[tokio::test]
  async fn admin_denial_for_unknown_identity_looks_like_insufficient_role() {
    let paid = record(Role::Paid, SubscriptionStatus::Active, 0);
    let svc = service(MemoryStore::with_records([paid.clone()]));

    let unknown = svc.check_admin_access(Identity::random()).await;
    let known = svc.check_admin_access(paid.identity).await;
    assert_eq!(unknown, known);
  }

  #[tokio::test]
  async fn admin_gate_fails_closed_on_store_error() {
    let d = broken(BrokenStore::Failing).check_admin_access(Identity::random()).await;
    assert!(!d.allowed);
    assert_eq!(d.reason, ReasonCode::StoreUnavailable);
  }

  #[tokio::test]
  async fn admin_gate_fails_closed_on_timeout() {
    let d = broken(BrokenStore::Stalled).check_admin_access(Identity::random()).await;
    assert!(!d.allowed);
    assert_eq!(d.reason, ReasonCode::StoreUnavailable);
  }

  // ── Creation gate ───────────────────────────────────────────────────────

  #[tokio::test]
  async fn creation_gate_scenarios() {
    let full_free = record(Role::Free, SubscriptionStatus::Active, 2);
    let expired_paid = record(Role::Paid, SubscriptionStatus::Expired, 9);
    let svc = service(MemoryStore::with_records([full_free.clone(), expired_paid.clone()]));

    let d = svc.check_resource_creation_access(full_free.identity, "/listings/create").await;
    assert!(!d.allowed);
    assert_eq!(d.reason, ReasonCode::QuotaExceeded(QuotaScope::Free));
    assert!(d.message.contains("Upgrade"));

    let d = svc.check_resource_creation_access(expired_paid.identity, "/listings/create").await;
    assert!(d.allowed);
  }

  #[tokio::test]
  async fn ungated_paths_do_not_touch_the_store() {
    // A failing store would deny if it were consulted.
    let d = broken(BrokenStore::Failing)
      .check_resource_creation_access(Identity::random(), "/listings/mine")
      .await;
    assert!(d.allowed);
    assert_eq!(d.reason, ReasonCode::NotGated);
  }

  #[tokio::test]
  async fn creation_gate_fails_closed() {
    for store in [BrokenStore::Failing, BrokenStore::Stalled] {
      let d = broken(store)
        .check_resource_creation_access(Identity::random(), "/listings/create")
        .await;
      assert!(!d.allowed);
      assert_eq!(d.reason, ReasonCode::StoreUnavailable);
    }
  }

  #[tokio::test]
  async fn creation_gate_unknown_identity() {
    let svc = service(MemoryStore::default());
    let d = svc.check_resource_creation_access(Identity::random(), "/listings/create").await;
    assert!(!d.allowed);
    assert_eq!(d.reason, ReasonCode::UnknownIdentity);
  }

  // ── Claims ──────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn claim_until_quota_then_release() {
    let svc = service(MemoryStore::default());
    let id = Identity::random();
    svc
      .register_account(id, NewAccount { email: "a@example.com".into(), full_name: None, phone: None })
      .await
      .unwrap();

    assert!(svc.claim_resource_slot(id).await.allowed);
    assert!(svc.claim_resource_slot(id).await.allowed);
    let d = svc.claim_resource_slot(id).await;
    assert!(!d.allowed);
    assert_eq!(d.reason, ReasonCode::QuotaExceeded(QuotaScope::Free));
    assert!(d.message.contains("2 of 2"));

    assert!(svc.release_resource_slot(id).await.unwrap());
    assert!(svc.claim_resource_slot(id).await.allowed);
  }

  #[tokio::test]
  async fn release_at_zero_and_unknown() {
    let r = record(Role::Free, SubscriptionStatus::Active, 0);
    let svc = service(MemoryStore::with_records([r.clone()]));
    assert!(!svc.release_resource_slot(r.identity).await.unwrap());
    assert!(matches!(
      svc.release_resource_slot(Identity::random()).await,
      Err(Error::NotFound(_))
    ));
  }

  #[tokio::test]
  async fn claim_fails_closed() {
    let d = broken(BrokenStore::Failing).claim_resource_slot(Identity::random()).await;
    assert_eq!(d.reason, ReasonCode::StoreUnavailable);
  }

  // ── Lifecycle ───────────────────────────────────────────────────────────

  #[tokio::test]
  async fn transition_round_trip_keeps_count() {
    let r = record(Role::Free, SubscriptionStatus::Active, 2);
    let admin = Identity::random();
    let svc = service(MemoryStore::with_records([r.clone()]));

    let from = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    let until = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    let t = Transition {
      role:        Role::Paid,
      status:      SubscriptionStatus::Trial,
      valid_from:  Some(from),
      valid_until: Some(until),
    };

    let applied = svc.apply_subscription_change(admin, r.identity, t).await.unwrap();
    assert!(!applied.refresh_caller_view);

    let fetched = svc.fetch_record(r.identity).await.unwrap();
    assert_eq!(fetched, applied.record);
    assert_eq!(fetched.role, Role::Paid);
    assert_eq!(fetched.status, SubscriptionStatus::Trial);
    assert_eq!(fetched.valid_from, Some(from));
    assert_eq!(fetched.valid_until, Some(until));
    assert_eq!(fetched.resource_count, 2);
  }

  #[tokio::test]
  async fn transition_rejects_inverted_window_before_touching_store() {
    let svc = broken(BrokenStore::Failing);
    let from = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
    let t = Transition {
      role:        Role::Paid,
      status:      SubscriptionStatus::Active,
      valid_from:  Some(from),
      valid_until: Some(from - chrono::Duration::days(1)),
    };
    let err = svc
      .apply_subscription_change(Identity::random(), Identity::random(), t)
      .await
      .unwrap_err();
    assert!(matches!(err, Error::Validation(crate::ValidationError::InvalidWindow { .. })));
  }

  #[tokio::test]
  async fn transition_on_unknown_identity_is_not_found() {
    let svc = service(MemoryStore::default());
    let t = Transition::role_only(&SubscriptionRecord::new(Identity::random()), Role::Paid);
    let err = svc
      .apply_subscription_change(Identity::random(), Identity::random(), t)
      .await
      .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
  }

  #[tokio::test]
  async fn self_service_change_asks_for_refresh() {
    let r = record(Role::Super, SubscriptionStatus::Active, 0);
    let svc = service(MemoryStore::with_records([r.clone()]));
    let applied = svc.apply_role_change(r.identity, r.identity, Role::Free).await.unwrap();
    assert!(applied.refresh_caller_view);
    assert_eq!(applied.record.role, Role::Free);
    assert_eq!(applied.record.status, SubscriptionStatus::Active);
  }

  // ── Accounts and admin reads ────────────────────────────────────────────

  #[tokio::test]
  async fn register_twice_conflicts() {
    let svc = service(MemoryStore::default());
    let id = Identity::random();
    let account = NewAccount { email: "b@example.com".into(), full_name: None, phone: None };
    let record = svc.register_account(id, account.clone()).await.unwrap();
    assert_eq!(record, SubscriptionRecord::new(id));
    assert!(matches!(
      svc.register_account(id, account).await,
      Err(Error::AlreadyRegistered(_))
    ));
  }

  #[tokio::test]
  async fn search_on_empty_store_is_empty() {
    let svc = service(MemoryStore::default());
    let results = svc.list_search_results("", Some(20), Some(0)).await.unwrap();
    assert!(results.is_empty());
  }

  #[tokio::test]
  async fn search_surfaces_store_unavailable() {
    let err = broken(BrokenStore::Stalled)
      .list_search_results("", None, None)
      .await
      .unwrap_err();
    assert!(matches!(err, Error::StoreUnavailable(_)));
  }

  #[tokio::test]
  async fn summary_for_free_at_limit_needs_upgrade() {
    let r = record(Role::Free, SubscriptionStatus::Active, 2);
    let svc = service(MemoryStore::with_records([r.clone()]));
    let summary = svc.subscription_summary(r.identity).await.unwrap();
    assert!(summary.needs_upgrade);
    assert!(!summary.can_create_more);
    assert_eq!(summary.usage_display, "2 / 2");
  }
}
