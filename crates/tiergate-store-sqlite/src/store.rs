//! [`SqliteStore`]: the SQLite implementation of [`SubscriptionStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;

use tiergate_core::{
  Identity,
  account::{AccountDetails, AccountQuery, DashboardStats, NewAccount, UserSearchResult},
  lifecycle::Transition,
  record::SubscriptionRecord,
  role::{Role, SubscriptionStatus},
  store::SubscriptionStore,
};

use crate::{
  Result,
  encode::{
    ACCOUNT_COLUMNS, RawAccount, RawSearchRow, SEARCH_COLUMNS, encode_dt, encode_identity,
    like_pattern, quota_limit_sql, role_in_sql, search_key,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A tiergate record store backed by a single SQLite file.
///
/// Cloning is cheap: the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, used by tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn fetch_account(&self, identity: Identity) -> Result<Option<AccountDetails>> {
    let id_str = encode_identity(identity);
    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE identity = ?1"),
              rusqlite::params![id_str],
              RawAccount::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawAccount::into_details).transpose()
  }
}

// ─── SubscriptionStore impl ──────────────────────────────────────────────────

impl SubscriptionStore for SqliteStore {
  type Error = crate::Error;

  async fn register(
    &self,
    identity: Identity,
    account: NewAccount,
  ) -> Result<Option<SubscriptionRecord>> {
    let record = SubscriptionRecord::new(identity);
    let id_str = encode_identity(identity);
    let role = record.role.as_str();
    let status = record.status.as_str();
    let now = encode_dt(Utc::now());
    let email_key = search_key(&account.email);
    let name_key = account.full_name.as_deref().map(search_key).unwrap_or_default();

    let inserted = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "INSERT INTO accounts
             (identity, email, full_name, phone, email_key, name_key, role, status,
              resource_count, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, ?9, ?9)
           ON CONFLICT(identity) DO NOTHING",
          rusqlite::params![
            id_str,
            account.email,
            account.full_name,
            account.phone,
            email_key,
            name_key,
            role,
            status,
            now
          ],
        )?;
        Ok(n == 1)
      })
      .await?;

    if inserted {
      tracing::debug!(%identity, "registered account");
    }
    Ok(inserted.then_some(record))
  }

  async fn get_account(&self, identity: Identity) -> Result<Option<AccountDetails>> {
    self.fetch_account(identity).await
  }

  async fn get_record(&self, identity: Identity) -> Result<Option<SubscriptionRecord>> {
    Ok(self.fetch_account(identity).await?.map(|a| a.record()))
  }

  async fn update_record(
    &self,
    identity: Identity,
    transition: Transition,
  ) -> Result<Option<SubscriptionRecord>> {
    let id_str = encode_identity(identity);
    let role = transition.role.as_str();
    let status = transition.status.as_str();
    let valid_from = transition.valid_from.map(encode_dt);
    let valid_until = transition.valid_until.map(encode_dt);
    let now = encode_dt(Utc::now());

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let changed = tx.execute(
          "UPDATE accounts
             SET role = ?2, status = ?3, valid_from = ?4, valid_until = ?5, updated_at = ?6
           WHERE identity = ?1",
          rusqlite::params![id_str, role, status, valid_from, valid_until, now],
        )?;
        if changed == 0 {
          return Ok(None);
        }
        let raw = tx.query_row(
          &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE identity = ?1"),
          rusqlite::params![id_str],
          RawAccount::from_row,
        )?;
        tx.commit()?;
        Ok(Some(raw))
      })
      .await?;

    Ok(raw.map(RawAccount::into_details).transpose()?.map(|a| a.record()))
  }

  async fn increment_resource_count_if_under_limit(&self, identity: Identity) -> Result<bool> {
    let id_str = encode_identity(identity);
    let now = encode_dt(Utc::now());
    let limit = quota_limit_sql();

    // Check and increment happen in one statement, so two racing callers
    // cannot both observe the last free slot.
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          &format!(
            "UPDATE accounts
               SET resource_count = resource_count + 1, updated_at = ?2
             WHERE identity = ?1
               AND ({limit} IS NULL OR resource_count < {limit})"
          ),
          rusqlite::params![id_str, now],
        )?)
      })
      .await?;

    Ok(changed == 1)
  }

  async fn decrement_resource_count(&self, identity: Identity) -> Result<bool> {
    let id_str = encode_identity(identity);
    let now = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE accounts
             SET resource_count = resource_count - 1, updated_at = ?2
           WHERE identity = ?1 AND resource_count > 0",
          rusqlite::params![id_str, now],
        )?)
      })
      .await?;

    Ok(changed == 1)
  }

  async fn search<'a>(&'a self, query: &'a AccountQuery) -> Result<Vec<UserSearchResult>> {
    let pattern = like_pattern(&query.term);
    let limit = i64::try_from(query.limit).unwrap_or(i64::MAX);
    let offset = i64::try_from(query.offset).unwrap_or(i64::MAX);

    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          r"SELECT {SEARCH_COLUMNS} FROM accounts
            WHERE email_key LIKE ?1 ESCAPE '\'
               OR name_key LIKE ?1 ESCAPE '\'
            ORDER BY created_at DESC, identity ASC
            LIMIT ?2 OFFSET ?3"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![pattern, limit, offset], RawSearchRow::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSearchRow::into_result).collect()
  }

  async fn stats(&self) -> Result<DashboardStats> {
    let paid = role_in_sql(&[Role::Paid]);
    let sup = role_in_sql(&[Role::Super]);
    let entitled_role = role_in_sql(&[Role::Paid, Role::Super]);
    let (active, trial) = (SubscriptionStatus::Active.as_str(), SubscriptionStatus::Trial.as_str());
    // Unrecognised roles count as free, the same fallback the decoder uses.
    let sql = format!(
      "SELECT COUNT(*),
              COALESCE(SUM(NOT ({entitled_role})), 0),
              COALESCE(SUM({paid}), 0),
              COALESCE(SUM({sup}), 0),
              COALESCE(SUM({entitled_role} AND lower(status) IN ('{active}', '{trial}')), 0),
              COALESCE(SUM(resource_count), 0)
         FROM accounts"
    );

    let row: [i64; 6] = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(&sql, [], |r| {
          Ok([r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?, r.get(5)?])
        })?)
      })
      .await?;

    let [total_users, free_users, paid_users, super_users, active_subscriptions, total_resources] =
      row.map(|n| u64::try_from(n).unwrap_or(0));
    Ok(DashboardStats {
      total_users,
      free_users,
      paid_users,
      super_users,
      active_subscriptions,
      total_resources,
    })
  }
}
