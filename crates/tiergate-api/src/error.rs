//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tiergate_core::{
  Error as CoreError,
  gate::{AccessDecision, ReasonCode},
};

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  /// The `x-identity` header was missing or not a UUID.
  #[error("missing or malformed x-identity header")]
  Unauthenticated,

  /// A gate said no. The decision travels back to the caller verbatim.
  #[error("{}", .0.message)]
  Denied(AccessDecision),

  #[error("{0}")]
  Conflict(String),

  #[error(transparent)]
  Core(#[from] CoreError),
}

impl From<tiergate_core::ValidationError> for ApiError {
  fn from(e: tiergate_core::ValidationError) -> Self { Self::Core(e.into()) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let message = self.to_string();
    let (status, body) = match self {
      ApiError::Unauthenticated => (StatusCode::UNAUTHORIZED, json!({ "error": message })),
      ApiError::Denied(decision) => {
        let status = match decision.reason {
          ReasonCode::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
          _ => StatusCode::FORBIDDEN,
        };
        (status, json!({ "error": message, "decision": decision }))
      }
      ApiError::Conflict(_) => (StatusCode::CONFLICT, json!({ "error": message })),
      ApiError::Core(CoreError::Validation(e)) => {
        (StatusCode::BAD_REQUEST, json!({ "error": message, "kind": e.kind() }))
      }
      ApiError::Core(CoreError::NotFound(_)) => {
        (StatusCode::NOT_FOUND, json!({ "error": message }))
      }
      ApiError::Core(CoreError::AlreadyRegistered(_)) => {
        (StatusCode::CONFLICT, json!({ "error": message }))
      }
      ApiError::Core(CoreError::StoreUnavailable(detail)) => {
        // Store details stay in the server log.
        tracing::warn!(%detail, "request failed: store unavailable");
        (StatusCode::SERVICE_UNAVAILABLE, json!({ "error": "subscription store unavailable" }))
      }
    };
    (status, Json(body)).into_response()
  }
}
