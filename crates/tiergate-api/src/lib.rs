//! JSON REST API for tiergate.
//!
//! Exposes an axum [`Router`] backed by an [`AccessService`] over any
//! [`SubscriptionStore`]. Authenticating the caller, TLS, and transport
//! concerns are the embedding server's responsibility; handlers read the
//! already-verified identity from the `x-identity` header.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", tiergate_api::api_router(service.clone()))
//! ```

pub mod access;
pub mod accounts;
pub mod admin;
pub mod error;
pub mod extract;
pub mod roles;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post, put},
};
use tiergate_core::{service::AccessService, store::SubscriptionStore};

pub use error::ApiError;
pub use extract::{AdminCaller, Caller, IDENTITY_HEADER};

/// Build a fully-materialised API router for `service`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(service: Arc<AccessService<S>>) -> Router<()>
where
  S: SubscriptionStore + 'static,
{
  Router::new()
    // Gates
    .route("/access/admin", get(access::admin::<S>))
    .route("/access/resource", get(access::resource::<S>))
    .route("/roles", get(roles::list))
    // Self-service
    .route("/accounts", post(accounts::register::<S>))
    .route("/me/subscription", get(accounts::subscription::<S>))
    .route("/me/resources", post(accounts::claim::<S>).delete(accounts::release::<S>))
    // Admin
    .route("/admin/users", get(admin::search::<S>))
    .route("/admin/users/{id}", get(admin::get_one::<S>))
    .route("/admin/users/{id}/subscription", put(admin::set_subscription::<S>))
    .route("/admin/users/{id}/role", put(admin::set_role::<S>))
    .route("/admin/stats", get(admin::stats::<S>))
    .with_state(service)
}
