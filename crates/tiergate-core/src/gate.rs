//! Access gate: request-time allow/deny decisions.
//!
//! Both gates are pure functions of a [`SubscriptionRecord`] and the static
//! policy. Fetching the record, and failing closed when that fetch does not
//! complete, is [`AccessService`](crate::service::AccessService)'s job.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
  quota::QuotaUsage,
  record::SubscriptionRecord,
  role::{Role, capabilities_of},
};

// ─── Decision ────────────────────────────────────────────────────────────────

/// Which quota message family a denial belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaScope {
  /// The identity is on the free tier and can fix this by upgrading.
  Free,
  /// Any other tier; only support can help.
  Other,
}

/// Machine-checkable reason attached to every decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", content = "scope", rename_all = "snake_case")]
pub enum ReasonCode {
  /// The gate evaluated the request and let it through.
  Granted,
  /// The request is not guarded by this gate.
  NotGated,
  InsufficientRole,
  QuotaExceeded(QuotaScope),
  /// The identity has no subscription record.
  UnknownIdentity,
  /// The store could not be reached; the gate failed closed.
  StoreUnavailable,
}

/// The outcome of a gate. Never persisted.
///
/// `message` is human text and may be replaced or localised independently
/// of `reason`; automation should branch on `reason` only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDecision {
  pub allowed: bool,
  pub reason:  ReasonCode,
  pub message: String,
}

impl AccessDecision {
  pub fn allow(reason: ReasonCode, message: impl Into<String>) -> Self {
    Self { allowed: true, reason, message: message.into() }
  }

  pub fn deny(reason: ReasonCode, message: impl Into<String>) -> Self {
    Self { allowed: false, reason, message: message.into() }
  }

  pub fn not_gated() -> Self {
    Self::allow(ReasonCode::NotGated, "This request is not subject to a quota.")
  }

  pub fn store_unavailable() -> Self {
    Self::deny(
      ReasonCode::StoreUnavailable,
      "Unable to verify permissions right now. Please try again later.",
    )
  }

  pub fn unknown_identity() -> Self {
    Self::deny(
      ReasonCode::UnknownIdentity,
      "No subscription exists for this account.",
    )
  }

  /// Admin denial. Says nothing about whether the identity exists or what
  /// its role actually is.
  pub fn insufficient_role(required: Role) -> Self {
    Self::deny(
      ReasonCode::InsufficientRole,
      format!(
        "Admin access required. Only {} accounts can access this area.",
        capabilities_of(required).display_name
      ),
    )
  }

  /// Quota denial stating concrete usage so the user can decide to upgrade.
  pub fn quota_exceeded(record: &SubscriptionRecord) -> Self {
    let usage = QuotaUsage::of(record);
    match record.role {
      Role::Free => Self::deny(
        ReasonCode::QuotaExceeded(QuotaScope::Free),
        format!(
          "Listing limit reached. You have used {} of {} free listings. \
           Upgrade to {} for unlimited listings.",
          usage.count,
          usage.limit,
          capabilities_of(Role::Paid).display_name,
        ),
      ),
      Role::Paid | Role::Super => Self::deny(
        ReasonCode::QuotaExceeded(QuotaScope::Other),
        format!(
          "You have reached your listing limit ({} of {}). Please contact support.",
          usage.count, usage.limit,
        ),
      ),
    }
  }
}

// ─── Route pattern ───────────────────────────────────────────────────────────

/// The resource-creation route, matched segment-wise.
///
/// A path matches when the pattern's segments appear as a contiguous run of
/// the path's segments: `/listings/create` matches `/en/listings/create` and
/// `/listings/create/` but not `/listings/created`. Query strings and
/// fragments are ignored. An empty pattern matches nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
  segments: Vec<String>,
}

impl RoutePattern {
  pub fn new(pattern: &str) -> Self {
    Self { segments: segments(pattern).map(str::to_owned).collect() }
  }

  pub fn matches(&self, path: &str) -> bool {
    if self.segments.is_empty() {
      return false;
    }
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let path: Vec<&str> = segments(path).collect();
    path
      .windows(self.segments.len())
      .any(|window| window.iter().zip(&self.segments).all(|(a, b)| *a == b.as_str()))
  }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
  path.split('/').filter(|s| !s.is_empty())
}

impl Default for RoutePattern {
  fn default() -> Self { Self::new("/listings/create") }
}

impl fmt::Display for RoutePattern {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "/{}", self.segments.join("/"))
  }
}

// ─── Gates ───────────────────────────────────────────────────────────────────

/// Admin-area entry: allowed iff the stored role is `super`.
///
/// Only the authoritative stored role is consulted, never a role claimed by
/// the client.
pub fn gate_admin_area(record: &SubscriptionRecord) -> AccessDecision {
  match record.role {
    Role::Super => AccessDecision::allow(ReasonCode::Granted, "Admin access granted."),
    Role::Free | Role::Paid => AccessDecision::insufficient_role(Role::Super),
  }
}

/// Quota check for a creation that is definitely being attempted.
pub fn gate_quota(record: &SubscriptionRecord) -> AccessDecision {
  let usage = QuotaUsage::of(record);
  if usage.has_room() {
    AccessDecision::allow(
      ReasonCode::Granted,
      format!("Resource creation allowed ({}).", usage.display()),
    )
  } else {
    AccessDecision::quota_exceeded(record)
  }
}

/// Resource-creation entry: a pass-through unless `requested_path` is the
/// creation route, in which case the quota decides.
pub fn gate_resource_creation(
  record: &SubscriptionRecord,
  requested_path: &str,
  creation_route: &RoutePattern,
) -> AccessDecision {
  if creation_route.matches(requested_path) {
    gate_quota(record)
  } else {
    AccessDecision::not_gated()
  }
}
