//! Detail endpoint handler

use axum::extract::{Path, State};
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::search::{DetailRecord, SourceType};

/// GET /v1/details/{source_type}/{source_id}
pub async fn get_detail(
    State(state): State<AppState>,
    Path((source_type, source_id)): Path<(String, String)>,
) -> Result<Json<DetailRecord>, ApiError> {
    let source_type: SourceType = source_type
        .parse()
        .map_err(|e| ApiError::from(e).with_param("source_type"))?;

    debug!(%source_type, %source_id, "Fetching detail record");

    if !source_type.supports_detail() {
        return Err(ApiError::not_found(format!(
            "Results of type '{}' have no detail record",
            source_type
        )));
    }

    let record = state
        .detail_lookup
        .fetch(source_type, &source_id)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| {
            ApiError::not_found(format!("No {} record for '{}'", source_type, source_id))
        })?;

    Ok(Json(record))
}
