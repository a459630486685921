//! Store doubles for unit tests.

use std::{collections::HashMap, convert::Infallible, io, sync::Mutex};

use chrono::Utc;

use crate::{
  account::{AccountDetails, AccountQuery, DashboardStats, NewAccount, UserSearchResult},
  identity::Identity,
  lifecycle::Transition,
  record::SubscriptionRecord,
  role::{Role, capabilities_of},
  store::SubscriptionStore,
};

/// A map-backed store. A single mutex serialises every write, which is
/// enough to make the compare-and-increment atomic.
#[derive(Default)]
pub struct MemoryStore {
  accounts: Mutex<HashMap<Identity, AccountDetails>>,
}

impl MemoryStore {
  pub fn with_records(records: impl IntoIterator<Item = SubscriptionRecord>) -> Self {
    let store = Self::default();
    {
      let mut accounts = store.accounts.lock().unwrap();
      for r in records {
        let now = Utc::now();
        accounts.insert(r.identity, AccountDetails {
          identity:       r.identity,
          email:          format!("{}@example.com", r.identity),
          full_name:      None,
          phone:          None,
          role:           r.role,
          status:         r.status,
          valid_from:     r.valid_from,
          valid_until:    r.valid_until,
          resource_count: r.resource_count,
          created_at:     now,
          updated_at:     now,
        });
      }
    }
    store
  }

  /// Change a count behind any cached view's back.
  pub fn set_count(&self, identity: Identity, count: u32) {
    if let Some(a) = self.accounts.lock().unwrap().get_mut(&identity) {
      a.resource_count = count;
    }
  }
}

impl SubscriptionStore for MemoryStore {
  type Error = Infallible;

  async fn register(
    &self,
    identity: Identity,
    account: NewAccount,
  ) -> Result<Option<SubscriptionRecord>, Infallible> {
    let mut accounts = self.accounts.lock().unwrap();
    if accounts.contains_key(&identity) {
      return Ok(None);
    }
    let record = SubscriptionRecord::new(identity);
    let now = Utc::now();
    accounts.insert(identity, AccountDetails {
      identity,
      email: account.email,
      full_name: account.full_name,
      phone: account.phone,
      role: record.role,
      status: record.status,
      valid_from: None,
      valid_until: None,
      resource_count: 0,
      created_at: now,
      updated_at: now,
    });
    Ok(Some(record))
  }

  async fn get_account(&self, identity: Identity) -> Result<Option<AccountDetails>, Infallible> {
    Ok(self.accounts.lock().unwrap().get(&identity).cloned())
  }

  async fn get_record(
    &self,
    identity: Identity,
  ) -> Result<Option<SubscriptionRecord>, Infallible> {
    Ok(self.accounts.lock().unwrap().get(&identity).map(AccountDetails::record))
  }

  async fn update_record(
    &self,
    identity: Identity,
    transition: Transition,
  ) -> Result<Option<SubscriptionRecord>, Infallible> {
    let mut accounts = self.accounts.lock().unwrap();
    Ok(accounts.get_mut(&identity).map(|a| {
      a.role = transition.role;
      a.status = transition.status;
      a.valid_from = transition.valid_from;
      a.valid_until = transition.valid_until;
      a.updated_at = Utc::now();
      a.record()
    }))
  }

  async fn increment_resource_count_if_under_limit(
    &self,
    identity: Identity,
  ) -> Result<bool, Infallible> {
    let mut accounts = self.accounts.lock().unwrap();
    Ok(match accounts.get_mut(&identity) {
      Some(a) if capabilities_of(a.role).quota.admits(a.resource_count) => {
        a.resource_count += 1;
        true
      }
      _ => false,
    })
  }

  async fn decrement_resource_count(&self, identity: Identity) -> Result<bool, Infallible> {
    let mut accounts = self.accounts.lock().unwrap();
    Ok(match accounts.get_mut(&identity) {
      Some(a) if a.resource_count > 0 => {
        a.resource_count -= 1;
        true
      }
      _ => false,
    })
  }

  async fn search<'a>(
    &'a self,
    query: &'a AccountQuery,
  ) -> Result<Vec<UserSearchResult>, Infallible> {
    let term = query.term.to_lowercase();
    let accounts = self.accounts.lock().unwrap();
    let mut hits: Vec<_> = accounts
      .values()
      .filter(|a| {
        term.is_empty()
          || a.email.to_lowercase().contains(&term)
          || a.full_name.as_deref().is_some_and(|n| n.to_lowercase().contains(&term))
      })
      .map(|a| UserSearchResult {
        identity:       a.identity,
        email:          a.email.clone(),
        full_name:      a.full_name.clone(),
        role:           a.role,
        status:         a.status,
        resource_count: a.resource_count,
        created_at:     a.created_at,
      })
      .collect();
    hits.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.identity.cmp(&b.identity)));
    Ok(hits.into_iter().skip(query.offset).take(query.limit).collect())
  }

  async fn stats(&self) -> Result<DashboardStats, Infallible> {
    let accounts = self.accounts.lock().unwrap();
    let mut stats = DashboardStats::default();
    for a in accounts.values() {
      stats.total_users += 1;
      stats.total_resources += u64::from(a.resource_count);
      match a.role {
        Role::Free => stats.free_users += 1,
        Role::Paid => stats.paid_users += 1,
        Role::Super => stats.super_users += 1,
      }
      if a.role != Role::Free && a.status.grants_entitlement() {
        stats.active_subscriptions += 1;
      }
    }
    Ok(stats)
  }
}

/// A store that never answers successfully.
#[derive(Clone, Copy)]
pub enum BrokenStore {
  /// Every call returns an error immediately.
  Failing,
  /// Every call hangs forever; only a timeout gets the caller out.
  Stalled,
}

impl BrokenStore {
  async fn fail<T>(&self) -> Result<T, io::Error> {
    match self {
      Self::Failing => Err(io::Error::other("connection refused")),
      Self::Stalled => std::future::pending().await,
    }
  }
}

impl SubscriptionStore for BrokenStore {
  type Error = io::Error;

  async fn register(&self, _: Identity, _: NewAccount) -> io::Result<Option<SubscriptionRecord>> {
    self.fail().await
  }
  async fn get_account(&self, _: Identity) -> io::Result<Option<AccountDetails>> { self.fail().await }
  async fn get_record(&self, _: Identity) -> io::Result<Option<SubscriptionRecord>> { self.fail().await }
  async fn update_record(&self, _: Identity, _: Transition) -> io::Result<Option<SubscriptionRecord>> {
    self.fail().await
  }
  async fn increment_resource_count_if_under_limit(&self, _: Identity) -> io::Result<bool> {
    self.fail().await
  }
  async fn decrement_resource_count(&self, _: Identity) -> io::Result<bool> { self.fail().await }
  async fn search<'a>(&'a self, _: &'a AccountQuery) -> io::Result<Vec<UserSearchResult>> {
    self.fail().await
  }
  async fn stats(&self) -> io::Result<DashboardStats> { self.fail().await }
}
