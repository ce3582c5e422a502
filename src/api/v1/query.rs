//! Query endpoint handler

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::Json;
use crate::domain::query::QueryRequest;

/// POST /v1/query
///
/// Failures are answered with `{error, kind, metrics}`: 400 when the request
/// itself was rejected, 502 when the pipeline failed.
pub async fn run_query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Response {
    debug!(
        sources = ?request.sources,
        limit = ?request.limit,
        synthesize = ?request.synthesize,
        "Processing query request"
    );

    match state.query_service.query(request).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(failure) => {
            let status = if failure.is_validation() {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::BAD_GATEWAY
            };

            (status, Json(failure)).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    use crate::api::router::create_router_with_state;
    use crate::api::state::mock::MockQueryService;
    use crate::api::state::AppState;
    use crate::domain::query::{QueryFailure, QueryMetrics, QueryResponse};
    use crate::domain::search::{SourceType, VectorResult};
    use crate::domain::DomainError;
    use crate::infrastructure::search::InMemoryDetailLookup;

    use super::*;

    fn state(service: Arc<MockQueryService>) -> AppState {
        AppState::new(service, Arc::new(InMemoryDetailLookup::new()))
    }

    fn post(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/v1/query")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_success() {
        let service = Arc::new(MockQueryService::succeeding(QueryResponse::new(
            vec![VectorResult::new("1", "Upload retries", SourceType::Git, "abc", 0.8)],
            Some("Uploads retry.".to_string()),
            QueryMetrics::default(),
        )));
        let app = create_router_with_state(state(service.clone()));

        let response = app
            .oneshot(post(r#"{"query": "upload", "sources": ["git"], "limit": 5}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["synthesis"], "Uploads retry.");
        assert_eq!(json["results"][0]["source_type"], "git");

        let request = service.last_request().unwrap();
        assert_eq!(request.limit, Some(5));
    }

    #[tokio::test]
    async fn test_validation_failure_is_400() {
        let failure = QueryFailure::new(&DomainError::validation("Query must not be empty"), QueryMetrics::default());
        let app = create_router_with_state(state(Arc::new(MockQueryService::failing(failure))));

        let response = app.oneshot(post(r#"{"query": "  "}"#)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert!(json["error"].as_str().unwrap().contains("empty"));
        assert!(json.get("metrics").is_some());
    }

    #[tokio::test]
    async fn test_pipeline_failure_is_502() {
        let metrics = QueryMetrics {
            total_ms: 40,
            embedding_ms: 39,
            ..Default::default()
        };
        let failure = QueryFailure::new(&DomainError::provider("openai", "HTTP 503"), metrics);
        let app = create_router_with_state(state(Arc::new(MockQueryService::failing(failure))));

        let response = app.oneshot(post(r#"{"query": "q"}"#)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let json = body_json(response).await;
        assert_eq!(json["metrics"]["embedding_ms"], 39);
    }

    #[tokio::test]
    async fn test_malformed_body_is_400() {
        let service = Arc::new(MockQueryService::succeeding(QueryResponse::new(vec![], None, QueryMetrics::default())));
        let app = create_router_with_state(state(service.clone()));

        let response = app.oneshot(post(r#"{"limit": 3}"#)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(service.last_request().is_none());
        let json = body_json(response).await;
        assert_eq!(json["kind"], "validation");
    }
}
