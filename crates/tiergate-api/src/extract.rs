//! Request extractors for the calling identity.
//!
//! The identity arrives in the [`IDENTITY_HEADER`] header, set by whatever
//! authenticates the request upstream. This crate trusts it as given.

use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};
use tiergate_core::{Identity, service::AccessService, store::SubscriptionStore};

use crate::error::ApiError;

pub const IDENTITY_HEADER: &str = "x-identity";

/// The identity issuing the request.
#[derive(Debug, Clone, Copy)]
pub struct Caller(pub Identity);

impl<St> FromRequestParts<St> for Caller
where
  St: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, _state: &St) -> Result<Self, Self::Rejection> {
    parts
      .headers
      .get(IDENTITY_HEADER)
      .and_then(|v| v.to_str().ok())
      .and_then(|s| s.trim().parse().ok())
      .map(Caller)
      .ok_or(ApiError::Unauthenticated)
  }
}

/// A caller that has passed the admin gate.
///
/// Extraction fails with the gate's own decision, so a handler taking an
/// `AdminCaller` never runs for anyone else.
#[derive(Debug, Clone, Copy)]
pub struct AdminCaller(pub Identity);

impl<S> FromRequestParts<Arc<AccessService<S>>> for AdminCaller
where
  S: SubscriptionStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    service: &Arc<AccessService<S>>,
  ) -> Result<Self, Self::Rejection> {
    let Caller(identity) = Caller::from_request_parts(parts, service).await?;
    let decision = service.check_admin_access(identity).await;
    if decision.allowed {
      Ok(AdminCaller(identity))
    } else {
      Err(ApiError::Denied(decision))
    }
  }
}
