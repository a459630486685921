//! `GET /roles` returns the static role catalog, for pricing and upgrade pages.

use axum::Json;
use tiergate_core::role::{RoleCapabilities, catalog};

pub async fn list() -> Json<Vec<RoleCapabilities>> { Json(catalog()) }
