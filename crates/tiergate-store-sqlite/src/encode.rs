//! Encoding and decoding helpers between tiergate domain types and the plain
//! text stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC strings (microsecond
//! precision, `Z` suffix) so lexical order equals chronological order.
//! UUIDs are stored as hyphenated lowercase strings.

use chrono::{DateTime, SecondsFormat, Utc};
use strum::IntoEnumIterator as _;
use tiergate_core::{
  Identity,
  account::{AccountDetails, UserSearchResult},
  role::{Role, ResourceLimit, SubscriptionStatus, capabilities_of},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Identity ────────────────────────────────────────────────────────────────

pub fn encode_identity(id: Identity) -> String { id.as_uuid().hyphenated().to_string() }

pub fn decode_identity(s: &str) -> Result<Identity> { Ok(Uuid::parse_str(s)?.into()) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Micros, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

// ─── Counters ────────────────────────────────────────────────────────────────

fn decode_count(n: i64) -> Result<u32> {
  u32::try_from(n).map_err(|_| Error::Decode { column: "resource_count", value: n.to_string() })
}

/// SQL predicate matching rows whose `role` column is any name `roles` are
/// recognised under, compared without regard to ASCII case.
pub fn role_in_sql(roles: &[Role]) -> String {
  let names: Vec<String> = roles
    .iter()
    .flat_map(|role| role.accepted_names())
    .map(|name| format!("'{name}'"))
    .collect();
  format!("lower(role) IN ({})", names.join(", "))
}

/// SQL expression yielding the quota limit for the row's `role` column, or
/// `NULL` when the role is unlimited.
///
/// Stored roles are matched the way [`Role::from_stored`] reads them, and
/// unrecognised ones get the free limit.
pub fn quota_limit_sql() -> String {
  let literal = |limit: ResourceLimit| match limit {
    ResourceLimit::Limited(n) => n.to_string(),
    ResourceLimit::Unlimited => "NULL".to_owned(),
  };
  let arms: String = Role::iter()
    .map(|role| {
      format!(" WHEN {} THEN {}", role_in_sql(&[role]), literal(capabilities_of(role).quota))
    })
    .collect();
  format!("(CASE{arms} ELSE {} END)", literal(capabilities_of(Role::Free).quota))
}

/// Lowercased form of `value` stored alongside it for searching. SQLite's
/// own `lower()` only folds ASCII.
pub fn search_key(value: &str) -> String { value.to_lowercase() }

/// Escape `%`, `_` and the escape character itself for a `LIKE ... ESCAPE '\'`
/// pattern, and wrap the term for a substring match against a [`search_key`].
pub fn like_pattern(term: &str) -> String {
  let mut out = String::with_capacity(term.len() + 2);
  out.push('%');
  for c in search_key(term).chars() {
    if matches!(c, '%' | '_' | '\\') {
      out.push('\\');
    }
    out.push(c);
  }
  out.push('%');
  out
}

// ─── Raw rows ────────────────────────────────────────────────────────────────

/// Column list matching the field order of [`RawAccount`].
pub const ACCOUNT_COLUMNS: &str = "identity, email, full_name, phone, role, status, \
                                   valid_from, valid_until, resource_count, created_at, updated_at";

/// Raw values read directly from an `accounts` row.
pub struct RawAccount {
  pub identity:       String,
  pub email:          String,
  pub full_name:      Option<String>,
  pub phone:          Option<String>,
  pub role:           String,
  pub status:         String,
  pub valid_from:     Option<String>,
  pub valid_until:    Option<String>,
  pub resource_count: i64,
  pub created_at:     String,
  pub updated_at:     String,
}

impl RawAccount {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      identity:       row.get(0)?,
      email:          row.get(1)?,
      full_name:      row.get(2)?,
      phone:          row.get(3)?,
      role:           row.get(4)?,
      status:         row.get(5)?,
      valid_from:     row.get(6)?,
      valid_until:    row.get(7)?,
      resource_count: row.get(8)?,
      created_at:     row.get(9)?,
      updated_at:     row.get(10)?,
    })
  }

  pub fn into_details(self) -> Result<AccountDetails> {
    Ok(AccountDetails {
      identity:       decode_identity(&self.identity)?,
      email:          self.email,
      full_name:      self.full_name,
      phone:          self.phone,
      role:           Role::from_stored(&self.role),
      status:         SubscriptionStatus::from_stored(&self.status),
      valid_from:     decode_opt_dt(self.valid_from)?,
      valid_until:    decode_opt_dt(self.valid_until)?,
      resource_count: decode_count(self.resource_count)?,
      created_at:     decode_dt(&self.created_at)?,
      updated_at:     decode_dt(&self.updated_at)?,
    })
  }
}

pub const SEARCH_COLUMNS: &str =
  "identity, email, full_name, role, status, resource_count, created_at";

/// Raw values for one search hit.
pub struct RawSearchRow {
  pub identity:       String,
  pub email:          String,
  pub full_name:      Option<String>,
  pub role:           String,
  pub status:         String,
  pub resource_count: i64,
  pub created_at:     String,
}

impl RawSearchRow {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      identity:       row.get(0)?,
      email:          row.get(1)?,
      full_name:      row.get(2)?,
      role:           row.get(3)?,
      status:         row.get(4)?,
      resource_count: row.get(5)?,
      created_at:     row.get(6)?,
    })
  }

  pub fn into_result(self) -> Result<UserSearchResult> {
    Ok(UserSearchResult {
      identity:       decode_identity(&self.identity)?,
      email:          self.email,
      full_name:      self.full_name,
      role:           Role::from_stored(&self.role),
      status:         SubscriptionStatus::from_stored(&self.status),
      resource_count: decode_count(self.resource_count)?,
      created_at:     decode_dt(&self.created_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn timestamps_are_fixed_width() {
    let a = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
    let b = a + chrono::Duration::microseconds(1);
    let (ea, eb) = (encode_dt(a), encode_dt(b));
    assert_eq!(ea, "2024-01-02T03:04:05.000000Z");
    assert_eq!(ea.len(), eb.len());
    assert!(ea < eb);
    assert_eq!(decode_dt(&eb).unwrap(), b);
  }

  #[test]
  fn quota_sql_reads_roles_like_the_decoder() {
    let conn = rusqlite::Connection::open_in_memory().unwrap();
    let limit_for = |stored: &str| -> Option<i64> {
      conn
        .query_row(
          &format!("SELECT {} FROM (SELECT ?1 AS role)", quota_limit_sql()),
          [stored],
          |r| r.get(0),
        )
        .unwrap()
    };
    for stored in ["free", "free_user", "platinum", ""] {
      assert_eq!(limit_for(stored), Some(2), "{stored}");
    }
    for stored in ["paid", "paid_user", "PAID_USER", "super", "SUPER", "Super_User"] {
      assert_eq!(limit_for(stored), None, "{stored}");
    }
  }

  #[test]
  fn role_predicate_lists_legacy_names() {
    let sql = role_in_sql(&[Role::Super]);
    assert!(sql.starts_with("lower(role) IN ("));
    assert!(sql.contains("'super'") && sql.contains("'super_user'"));
  }

  #[test]
  fn search_key_folds_non_ascii() {
    assert_eq!(search_key("ÉLODIE Ørsted"), "élodie ørsted");
    assert_eq!(like_pattern("Élo"), "%élo%");
  }

  #[test]
  fn like_pattern_escapes_wildcards() {
    assert_eq!(like_pattern("Al_ce%"), "%al\\_ce\\%%");
    assert_eq!(like_pattern(""), "%%");
  }

  #[test]
  fn negative_count_is_rejected() {
    assert!(matches!(decode_count(-1), Err(Error::Decode { column: "resource_count", .. })));
  }
}
