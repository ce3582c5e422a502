//! Versioned query API

pub mod details;
pub mod query;

use axum::{
    routing::{get, post},
    Router,
};

use super::state::AppState;

/// Create v1 API router
pub fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route("/query", post(query::run_query))
        .route("/details/{source_type}/{source_id}", get(details::get_detail))
}
