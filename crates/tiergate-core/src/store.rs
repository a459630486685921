//! The `SubscriptionStore` trait: the durable record store this crate
//! depends on but does not own.
//!
//! Implemented by storage backends (e.g. `tiergate-store-sqlite`). Higher
//! layers reach the store only through
//! [`AccessService`](crate::service::AccessService), which injects it
//! explicitly; nothing here reads ambient global state.

use std::future::Future;

use crate::{
  account::{AccountDetails, AccountQuery, DashboardStats, NewAccount, UserSearchResult},
  identity::Identity,
  lifecycle::Transition,
  record::SubscriptionRecord,
};

/// Abstraction over a subscription record store.
///
/// Every method is a single round-trip to the backend and the only place a
/// caller may need to await. Backends must serialise writes per identity;
/// in particular [`Self::increment_resource_count_if_under_limit`] must be
/// an atomic compare-and-increment.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait SubscriptionStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Accounts ──────────────────────────────────────────────────────────

  /// Create the account and its default subscription record.
  ///
  /// Returns `None` if the identity is already registered; the existing
  /// record is left untouched.
  fn register(
    &self,
    identity: Identity,
    account: NewAccount,
  ) -> impl Future<Output = Result<Option<SubscriptionRecord>, Self::Error>> + Send + '_;

  /// Full admin view of one account. Returns `None` if not found.
  fn get_account(
    &self,
    identity: Identity,
  ) -> impl Future<Output = Result<Option<AccountDetails>, Self::Error>> + Send + '_;

  // ── Subscription records ──────────────────────────────────────────────

  /// Retrieve the record for `identity`. Returns `None` if not found.
  fn get_record(
    &self,
    identity: Identity,
  ) -> impl Future<Output = Result<Option<SubscriptionRecord>, Self::Error>> + Send + '_;

  /// Replace role, status and validity window in one atomic write and
  /// return the post-update record. `resource_count` is untouched.
  ///
  /// Returns `None` if the identity has no record.
  fn update_record(
    &self,
    identity: Identity,
    transition: Transition,
  ) -> impl Future<Output = Result<Option<SubscriptionRecord>, Self::Error>> + Send + '_;

  // ── Resource counters ─────────────────────────────────────────────────

  /// Atomically add one to `resource_count` if the role's quota admits it.
  ///
  /// Returns `false` when the quota is exhausted or the identity is
  /// unknown. Concurrent calls for the same identity never overshoot the
  /// limit.
  fn increment_resource_count_if_under_limit(
    &self,
    identity: Identity,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Atomically subtract one from `resource_count`, never going below zero.
  ///
  /// Returns `false` if the count was already zero or the identity is
  /// unknown.
  fn decrement_resource_count(
    &self,
    identity: Identity,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Admin reads ───────────────────────────────────────────────────────

  /// Paginated account search, newest account first. Callers are expected
  /// to have clamped `limit` and `offset` already.
  fn search<'a>(
    &'a self,
    query: &'a AccountQuery,
  ) -> impl Future<Output = Result<Vec<UserSearchResult>, Self::Error>> + Send + 'a;

  fn stats(&self) -> impl Future<Output = Result<DashboardStats, Self::Error>> + Send + '_;
}
