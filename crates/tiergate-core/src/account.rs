//! Account-level read models: registration input, admin views, statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  identity::Identity,
  record::SubscriptionRecord,
  role::{Role, SubscriptionStatus},
};

/// Input to [`SubscriptionStore::register`](crate::store::SubscriptionStore::register).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAccount {
  pub email:     String,
  pub full_name: Option<String>,
  pub phone:     Option<String>,
}

/// Everything an administrator sees about one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountDetails {
  pub identity:       Identity,
  pub email:          String,
  pub full_name:      Option<String>,
  pub phone:          Option<String>,
  pub role:           Role,
  pub status:         SubscriptionStatus,
  pub valid_from:     Option<DateTime<Utc>>,
  pub valid_until:    Option<DateTime<Utc>>,
  pub resource_count: u32,
  pub created_at:     DateTime<Utc>,
  pub updated_at:     DateTime<Utc>,
}

impl AccountDetails {
  pub fn record(&self) -> SubscriptionRecord {
    SubscriptionRecord {
      identity:       self.identity,
      role:           self.role,
      status:         self.status,
      valid_from:     self.valid_from,
      valid_until:    self.valid_until,
      resource_count: self.resource_count,
    }
  }
}

/// One row of an admin user search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSearchResult {
  pub identity:       Identity,
  pub email:          String,
  pub full_name:      Option<String>,
  pub role:           Role,
  pub status:         SubscriptionStatus,
  pub resource_count: u32,
  pub created_at:     DateTime<Utc>,
}

/// Parameters for [`SubscriptionStore::search`](crate::store::SubscriptionStore::search).
///
/// Build with [`SearchBounds::query`] so `limit` and `offset` are always
/// clamped before they reach a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountQuery {
  /// Case-insensitive match on email or full name; empty matches everyone.
  pub term:   String,
  pub limit:  usize,
  pub offset: usize,
}

/// Server-side ceilings on search pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchBounds {
  pub default_limit: usize,
  pub max_limit:     usize,
  pub max_offset:    usize,
}

impl Default for SearchBounds {
  fn default() -> Self {
    Self { default_limit: 20, max_limit: 100, max_offset: 10_000 }
  }
}

impl SearchBounds {
  pub fn query(
    &self,
    term: &str,
    limit: Option<usize>,
    offset: Option<usize>,
  ) -> AccountQuery {
    let max_limit = self.max_limit.max(1);
    AccountQuery {
      term:   term.trim().to_owned(),
      limit:  limit.unwrap_or(self.default_limit).clamp(1, max_limit),
      offset: offset.unwrap_or(0).min(self.max_offset),
    }
  }
}

/// Aggregate counts for the admin dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
  pub total_users:          u64,
  pub free_users:           u64,
  pub paid_users:           u64,
  pub super_users:          u64,
  /// Paid or super accounts whose status is `active` or `trial`.
  pub active_subscriptions: u64,
  pub total_resources:      u64,
}
