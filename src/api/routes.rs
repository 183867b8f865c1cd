//! API Routes
//!
//! Configures the Axum router with all offline cache endpoints.

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    api_handler, clear_handler, connectivity_handler, get_handler, health_handler, set_handler,
    stats_handler, status_handler, sweep_handler, sync_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// `GET /api/*path` is only mounted when the state carries an upstream.
///
/// # Middleware
/// - CORS: Allows any origin (the dashboard is served from another origin)
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut router = Router::new()
        .route("/cache", put(set_handler).delete(clear_handler))
        .route("/cache/sweep", post(sweep_handler))
        .route("/cache/:key", get(get_handler))
        .route("/status", get(status_handler))
        .route("/connectivity", put(connectivity_handler))
        .route("/sync", post(sync_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler));

    if state.upstream.is_some() {
        router = router.route("/api/*path", get(api_handler));
    }

    router
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::connectivity::ConnectivityMonitor;
    use crate::manager::OfflineManager;
    use crate::storage::{MemoryStorage, DEFAULT_STORAGE_KEY};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use std::sync::Arc;
    use tower::util::ServiceExt;

    fn create_test_app() -> Router {
        let clock = Arc::new(SystemClock);
        let manager = OfflineManager::new(
            Arc::new(MemoryStorage::new()),
            DEFAULT_STORAGE_KEY,
            clock.clone(),
            ConnectivityMonitor::new(true, clock),
        );
        create_router(AppState::new(manager))
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_set_endpoint() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/cache")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"key":"test","data":{"a":1}}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_get_not_found() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/cache/nonexistent")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_api_route_absent_without_upstream() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/orders")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
