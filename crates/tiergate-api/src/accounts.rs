//! Self-service handlers: registration, the caller's own subscription, and
//! resource slots.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/accounts` | Body: `{"email":..,"full_name":..,"phone":..}` |
//! | `GET`    | `/me/subscription` | |
//! | `POST`   | `/me/resources` | 201 with the decision, or 403 |
//! | `DELETE` | `/me/resources` | 204, or 409 when nothing to release |

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use tiergate_core::{
  account::NewAccount, service::AccessService, store::SubscriptionStore,
  view::SubscriptionSummary,
};

use crate::{error::ApiError, extract::Caller};

// ─── Registration ────────────────────────────────────────────────────────────

/// `POST /accounts`
pub async fn register<S>(
  State(service): State<Arc<AccessService<S>>>,
  Caller(identity): Caller,
  Json(body): Json<NewAccount>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SubscriptionStore + 'static,
{
  let record = service.register_account(identity, body).await?;
  Ok((StatusCode::CREATED, Json(record)))
}

// ─── Subscription ────────────────────────────────────────────────────────────

/// `GET /me/subscription`
pub async fn subscription<S>(
  State(service): State<Arc<AccessService<S>>>,
  Caller(identity): Caller,
) -> Result<Json<SubscriptionSummary>, ApiError>
where
  S: SubscriptionStore + 'static,
{
  Ok(Json(service.subscription_summary(identity).await?))
}

// ─── Resource slots ──────────────────────────────────────────────────────────

/// `POST /me/resources`
pub async fn claim<S>(
  State(service): State<Arc<AccessService<S>>>,
  Caller(identity): Caller,
) -> Result<impl IntoResponse, ApiError>
where
  S: SubscriptionStore + 'static,
{
  let decision = service.claim_resource_slot(identity).await;
  if !decision.allowed {
    return Err(ApiError::Denied(decision));
  }
  Ok((StatusCode::CREATED, Json(decision)))
}

/// `DELETE /me/resources`
pub async fn release<S>(
  State(service): State<Arc<AccessService<S>>>,
  Caller(identity): Caller,
) -> Result<StatusCode, ApiError>
where
  S: SubscriptionStore + 'static,
{
  if service.release_resource_slot(identity).await? {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError::Conflict("no resources to release".into()))
  }
}
