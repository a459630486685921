//! Roles, subscription statuses, and the static role policy table.
//!
//! Roles are a closed set with per-role attributes, not a scalar tier:
//! `paid` and `super` share the same resource quota but differ in what else
//! they unlock.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumMessage, EnumString, IntoStaticStr};

use crate::error::ValidationError;

// ─── Role ────────────────────────────────────────────────────────────────────

/// The coarse entitlement tier of an identity.
///
/// The legacy names (`free_user`, `paid_user`, `super_user`) are accepted on
/// input; the short names are what gets written back.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumIter,
  EnumMessage,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum Role {
  #[serde(alias = "free_user")]
  #[strum(to_string = "free", serialize = "free_user")]
  Free,
  #[serde(alias = "paid_user")]
  #[strum(to_string = "paid", serialize = "paid_user")]
  Paid,
  #[serde(alias = "super_user")]
  #[strum(to_string = "super", serialize = "super_user")]
  Super,
}

impl Role {
  /// The canonical wire/storage name.
  pub fn as_str(self) -> &'static str { self.into() }

  /// Every lowercase name this role is recognised under, canonical and
  /// legacy. Matching against these is ASCII case-insensitive.
  pub fn accepted_names(self) -> &'static [&'static str] { self.get_serializations() }

  /// Parse caller-supplied input, rejecting anything outside the enum.
  pub fn parse(value: &str) -> Result<Self, ValidationError> {
    value.trim().parse().map_err(|_| ValidationError::UnknownEnumValue {
      field: "role",
      value: value.to_owned(),
    })
  }

  /// Decode a role read back from storage.
  ///
  /// An unrecognised value falls back to [`Role::Free`], the most restrictive
  /// tier, and is logged as an anomaly. It never grants an unlimited quota.
  pub fn from_stored(value: &str) -> Self {
    value.parse().unwrap_or_else(|_| {
      tracing::warn!(
        stored_role = value,
        "unknown role in subscription record; treating as free"
      );
      Self::Free
    })
  }

  pub fn capabilities(self) -> RoleCapabilities { capabilities_of(self) }
}

// ─── SubscriptionStatus ──────────────────────────────────────────────────────

/// Time-bound state of a paid entitlement. Orthogonal to [`Role`].
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumIter,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SubscriptionStatus {
  Active,
  Inactive,
  Trial,
  Expired,
}

/// How a UI should colour a status badge. Styling itself is out of scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusTone {
  Positive,
  Neutral,
  Informational,
  Negative,
}

/// Human-facing rendering of a [`SubscriptionStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusDisplay {
  pub text: &'static str,
  pub tone: StatusTone,
}

impl SubscriptionStatus {
  pub fn as_str(self) -> &'static str { self.into() }

  pub fn parse(value: &str) -> Result<Self, ValidationError> {
    value.trim().parse().map_err(|_| ValidationError::UnknownEnumValue {
      field: "status",
      value: value.to_owned(),
    })
  }

  /// Decode a status read back from storage; unknown values become
  /// `Inactive` so they never count as a live entitlement.
  pub fn from_stored(value: &str) -> Self {
    value.parse().unwrap_or_else(|_| {
      tracing::warn!(
        stored_status = value,
        "unknown subscription status in record; treating as inactive"
      );
      Self::Inactive
    })
  }

  /// Whether a paid entitlement is live in this status.
  pub fn grants_entitlement(self) -> bool { matches!(self, Self::Active | Self::Trial) }

  pub fn display(self) -> StatusDisplay {
    match self {
      Self::Active => StatusDisplay { text: "Active", tone: StatusTone::Positive },
      Self::Inactive => StatusDisplay { text: "Inactive", tone: StatusTone::Neutral },
      Self::Trial => {
        StatusDisplay { text: "Trial", tone: StatusTone::Informational }
      }
      Self::Expired => StatusDisplay { text: "Expired", tone: StatusTone::Negative },
    }
  }
}

// ─── Quota ceiling ───────────────────────────────────────────────────────────

/// How many resources a role may own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ResourceLimit {
  Limited(u32),
  Unlimited,
}

impl ResourceLimit {
  /// Whether an identity already owning `count` resources may create one more.
  pub fn admits(self, count: u32) -> bool {
    match self {
      Self::Limited(limit) => count < limit,
      Self::Unlimited => true,
    }
  }
}

impl fmt::Display for ResourceLimit {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Limited(limit) => write!(f, "{limit}"),
      Self::Unlimited => f.write_str("Unlimited"),
    }
  }
}

// ─── Policy table ────────────────────────────────────────────────────────────

pub const FREE_RESOURCE_LIMIT: u32 = 2;

/// Everything a role unlocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoleCapabilities {
  pub role:         Role,
  pub quota:        ResourceLimit,
  pub display_name: &'static str,
  /// Ordered; the first entry is the headline benefit.
  pub benefits:     &'static [&'static str],
}

/// The static role table.
pub fn capabilities_of(role: Role) -> RoleCapabilities {
  match role {
    Role::Free => RoleCapabilities {
      role,
      quota: ResourceLimit::Limited(FREE_RESOURCE_LIMIT),
      display_name: "Free Member",
      benefits: &[
        "2 free listings",
        "Basic listing features",
        "Browse all items",
        "Basic messaging",
      ],
    },
    Role::Paid => RoleCapabilities {
      role,
      quota: ResourceLimit::Unlimited,
      display_name: "Premium Member",
      benefits: &[
        "Unlimited listings",
        "Contact sellers directly",
        "Priority listing placement",
        "Advanced search filters",
      ],
    },
    Role::Super => RoleCapabilities {
      role,
      quota: ResourceLimit::Unlimited,
      display_name: "Super User",
      benefits: &[
        "Unlimited listings",
        "Priority support",
        "Advanced analytics",
        "All premium features",
      ],
    },
  }
}

/// Every role's capabilities, in declaration order.
pub fn catalog() -> Vec<RoleCapabilities> {
  use strum::IntoEnumIterator as _;
  Role::iter().map(capabilities_of).collect()
}

/// Whether an administrative change from `from` to `to` is legal.
///
/// Any role may move to any other role, downgrades included.
pub fn is_valid_transition(_from: Role, _to: Role) -> bool { true }
