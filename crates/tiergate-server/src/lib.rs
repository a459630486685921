//! HTTP server wiring for tiergate.
//!
//! Turns a [`ServerConfig`] into the [`GateConfig`] the access service runs
//! with, and mounts the JSON API under `/api` behind a request trace layer.

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::Router;
use serde::Deserialize;
use tiergate_core::{
  account::SearchBounds,
  gate::RoutePattern,
  service::{AccessService, GateConfig},
  store::SubscriptionStore,
};
use tower_http::trace::TraceLayer;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `TIERGATE_*` environment variables. Every key is optional.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:              String,
  pub port:              u16,
  pub store_path:        PathBuf,
  /// Path pattern subject to the resource quota.
  pub creation_route:    String,
  pub store_timeout_ms:  u64,
  pub search_max_limit:  usize,
  pub search_max_offset: usize,
}

impl Default for ServerConfig {
  fn default() -> Self {
    let gate = GateConfig::default();
    Self {
      host:              "127.0.0.1".into(),
      port:              8080,
      store_path:        PathBuf::from("tiergate.db"),
      creation_route:    gate.creation_route.to_string(),
      store_timeout_ms:  whole_millis(gate.store_timeout),
      search_max_limit:  gate.search.max_limit,
      search_max_offset: gate.search.max_offset,
    }
  }
}

/// Milliseconds in `d`, saturating at `u64::MAX`.
fn whole_millis(d: Duration) -> u64 { u64::try_from(d.as_millis()).unwrap_or(u64::MAX) }

impl ServerConfig {
  pub fn gate_config(&self) -> GateConfig {
    GateConfig {
      creation_route: RoutePattern::new(&self.creation_route),
      store_timeout:  Duration::from_millis(self.store_timeout_ms),
      search:         SearchBounds {
        max_limit: self.search_max_limit,
        max_offset: self.search_max_offset,
        ..SearchBounds::default()
      },
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the full application router for `service`.
pub fn app<S>(service: Arc<AccessService<S>>) -> Router
where
  S: SubscriptionStore + 'static,
{
  Router::new()
    .nest("/api", tiergate_api::api_router(service))
    .layer(TraceLayer::new_for_http())
}

// ─── Tests ───────────────────────────────────────────────────────────────────
