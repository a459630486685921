//! Handlers for `/access` endpoints.
//!
//! Both return the gate's [`AccessDecision`] with `200 OK` whatever the
//! outcome; the caller branches on `allowed` and `reason`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/access/admin` | |
//! | `GET`  | `/access/resource` | `?path=/listings/create` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
};
use serde::Deserialize;
use tiergate_core::{gate::AccessDecision, service::AccessService, store::SubscriptionStore};

use crate::{error::ApiError, extract::Caller};

/// `GET /access/admin`
pub async fn admin<S>(
  State(service): State<Arc<AccessService<S>>>,
  Caller(identity): Caller,
) -> Result<Json<AccessDecision>, ApiError>
where
  S: SubscriptionStore + 'static,
{
  Ok(Json(service.check_admin_access(identity).await))
}

#[derive(Debug, Deserialize)]
pub struct ResourceParams {
  pub path: String,
}

/// `GET /access/resource?path=<path>`
pub async fn resource<S>(
  State(service): State<Arc<AccessService<S>>>,
  Caller(identity): Caller,
  Query(params): Query<ResourceParams>,
) -> Result<Json<AccessDecision>, ApiError>
where
  S: SubscriptionStore + 'static,
{
  Ok(Json(service.check_resource_creation_access(identity, &params.path).await))
}
