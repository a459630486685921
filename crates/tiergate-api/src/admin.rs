//! Admin-area handlers. Every handler takes an [`AdminCaller`], so requests
//! from non-super identities are rejected before the handler body runs.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/admin/users` | `?search=&limit=&offset=` |
//! | `GET`  | `/admin/users/{id}` | 404 if not found |
//! | `PUT`  | `/admin/users/{id}/subscription` | Body: role, status, optional window |
//! | `PUT`  | `/admin/users/{id}/role` | Body: `{"role":"paid"}` |
//! | `GET`  | `/admin/stats` | |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tiergate_core::{
  Identity,
  account::{AccountDetails, DashboardStats, UserSearchResult},
  lifecycle::Transition,
  role::Role,
  service::{AccessService, AppliedChange},
  store::SubscriptionStore,
};

use crate::{error::ApiError, extract::AdminCaller};

// ─── Users ───────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
  #[serde(default)]
  pub search: String,
  pub limit:  Option<usize>,
  pub offset: Option<usize>,
}

/// `GET /admin/users[?search=<term>&limit=<n>&offset=<n>]`
pub async fn search<S>(
  State(service): State<Arc<AccessService<S>>>,
  AdminCaller(_): AdminCaller,
  Query(params): Query<SearchParams>,
) -> Result<Json<Vec<UserSearchResult>>, ApiError>
where
  S: SubscriptionStore + 'static,
{
  let results = service
    .list_search_results(&params.search, params.limit, params.offset)
    .await?;
  Ok(Json(results))
}

/// `GET /admin/users/{id}`
pub async fn get_one<S>(
  State(service): State<Arc<AccessService<S>>>,
  AdminCaller(_): AdminCaller,
  Path(id): Path<Identity>,
) -> Result<Json<AccountDetails>, ApiError>
where
  S: SubscriptionStore + 'static,
{
  Ok(Json(service.account_details(id).await?))
}

// ─── Changes ─────────────────────────────────────────────────────────────────

/// Role and status travel as strings so unknown values come back as
/// validation errors rather than generic body rejections.
#[derive(Debug, Deserialize)]
pub struct SubscriptionBody {
  pub role:        String,
  pub status:      String,
  #[serde(default)]
  pub valid_from:  Option<DateTime<Utc>>,
  #[serde(default)]
  pub valid_until: Option<DateTime<Utc>>,
}

/// `PUT /admin/users/{id}/subscription`
pub async fn set_subscription<S>(
  State(service): State<Arc<AccessService<S>>>,
  AdminCaller(actor): AdminCaller,
  Path(target): Path<Identity>,
  Json(body): Json<SubscriptionBody>,
) -> Result<Json<AppliedChange>, ApiError>
where
  S: SubscriptionStore + 'static,
{
  let transition =
    Transition::parse(&body.role, &body.status, body.valid_from, body.valid_until)?;
  Ok(Json(service.apply_subscription_change(actor, target, transition).await?))
}

#[derive(Debug, Deserialize)]
pub struct RoleBody {
  pub role: String,
}

/// `PUT /admin/users/{id}/role`
pub async fn set_role<S>(
  State(service): State<Arc<AccessService<S>>>,
  AdminCaller(actor): AdminCaller,
  Path(target): Path<Identity>,
  Json(body): Json<RoleBody>,
) -> Result<Json<AppliedChange>, ApiError>
where
  S: SubscriptionStore + 'static,
{
  let role = Role::parse(&body.role)?;
  Ok(Json(service.apply_role_change(actor, target, role).await?))
}

// ─── Stats ───────────────────────────────────────────────────────────────────

/// `GET /admin/stats`
pub async fn stats<S>(
  State(service): State<Arc<AccessService<S>>>,
  AdminCaller(_): AdminCaller,
) -> Result<Json<DashboardStats>, ApiError>
where
  S: SubscriptionStore + 'static,
{
  Ok(Json(service.dashboard_stats().await?))
}
