use std::sync::Arc;

use axum::extract::Extension;
use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::AppState;

/// Build the daemon router with CORS and request tracing applied.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/calculate", post(handlers::calculate))
        .route("/health", get(handlers::health))
        .layer(Extension(Arc::new(state)))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt as _;

    fn app() -> Router {
        router(AppState::default())
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn post_json(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/calculate")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_calculate_returns_result_and_variables() {
        let body = r#"{"expression":"x + 1","context":{"variables":{"x":"41"}}}"#;
        let response = app().oneshot(post_json(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["result"]["number"], 42.0);
        assert_eq!(json["result"]["type"], "Number");
        assert_eq!(json["result"]["isError"], false);
        assert_eq!(json["variables"]["x"]["number"], 41.0);
        assert!(json.get("error").is_none());
    }

    #[tokio::test]
    async fn test_calculate_with_ordinal_types() {
        let body = r#"{"expression":"x + 1","context":{"variables":{"x":"4 USD"}}}"#;
        let request = Request::builder()
            .method("POST")
            .uri("/api/calculate?types=ordinal")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["result"]["number"], 5.0);
        assert_eq!(json["result"]["type"], 1);
        assert_eq!(json["variables"]["x"]["type"], 1);
    }

    #[tokio::test]
    async fn test_unknown_type_format_is_bad_request() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/calculate?types=roman")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"expression":"1"}"#))
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn test_calculate_without_context() {
        let response = app().oneshot(post_json(r#"{"expression":"2 * 3"}"#)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["result"]["number"], 6.0);
    }

    #[tokio::test]
    async fn test_evaluation_error_is_ok_response() {
        let response = app().oneshot(post_json(r#"{"expression":"1 / 0"}"#)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["result"]["isError"], true);
        assert_eq!(json["result"]["errorMsg"], "division by zero");
        assert_eq!(json["error"], "division by zero");
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let response = app().oneshot(post_json("{not json")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert!(json["error"].as_str().is_some_and(|msg| !msg.is_empty()));
    }

    #[tokio::test]
    async fn test_invalid_settings_are_bad_request() {
        let body = r#"{"expression":"1","context":{"timezone":"Nowhere/Special"}}"#;
        let response = app().oneshot(post_json(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_get_on_calculate_is_method_not_allowed() {
        let request = Request::builder()
            .method("GET")
            .uri("/api/calculate")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_health() {
        let request = Request::builder().method("GET").uri("/health").body(Body::empty()).unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let request = Request::builder()
            .method("OPTIONS")
            .uri("/api/calculate")
            .header("origin", "http://localhost:3000")
            .header("access-control-request-method", "POST")
            .header("access-control-request-headers", "content-type")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
    }
}
