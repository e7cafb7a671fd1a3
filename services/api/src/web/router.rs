//! services/api/src/web/router.rs
//!
//! Assembles the HTTP routes, body limit, CORS and request tracing into a
//! single `Router`.

use crate::error::ApiError;
use crate::web::rest::{
    chat_handler, clinics_handler, health_handler, history_handler, reset_conversation_handler,
    triage_handler, upload_handler,
};
use crate::web::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{header::CONTENT_TYPE, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Headroom above the upload limit for multipart boundaries and part headers,
/// so an oversized file is reported by the upload handler rather than cut off
/// mid-stream.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Builds the API router.
pub fn api_router(app_state: Arc<AppState>) -> Result<Router, ApiError> {
    let origin = app_state
        .config
        .allowed_origin
        .parse::<HeaderValue>()
        .map_err(|e| ApiError::Internal(format!("Invalid ALLOWED_ORIGIN: {}", e)))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]);

    let body_limit = app_state
        .config
        .max_upload_bytes
        .saturating_add(MULTIPART_OVERHEAD);

    let router = Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/chat", post(chat_handler))
        .route("/api/upload", post(upload_handler))
        .route("/api/reset-conversation", post(reset_conversation_handler))
        .route("/api/history/{user_id}", get(history_handler))
        .route("/api/triage", post(triage_handler))
        .route("/api/clinics", get(clinics_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    Ok(router)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemorySessionStore;
    use crate::config::Config;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use nurse_ally_core::composer::EMERGENCY_WARNING;
    use nurse_ally_core::insurance::summarize;
    use serde_json::{json, Value};
    use std::time::Duration;
    use async_trait::async_trait;
    use nurse_ally_core::ports::{PortError, PortResult, TriageService};
    use nurse_ally_core::{ReplyComposer, StaticClinicDirectory, TriageResult};
    use tower::ServiceExt;

    const BOUNDARY: &str = "nurse-ally-test-boundary";

    fn test_config() -> Config {
        Config {
            max_upload_bytes: 1024,
            ..Config::default()
        }
    }

    fn test_app() -> Router {
        let config = Arc::new(test_config());
        let store = Arc::new(InMemorySessionStore::new(
            config.session_capacity,
            Duration::from_secs(3600),
        ));
        api_router(Arc::new(AppState::with_mock_services(config, store))).unwrap()
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    fn upload_request(filename: &str, content_type: &str, data: &[u8]) -> Request<Body> {
        let mut body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
             Content-Type: {content_type}\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/api/upload")
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn health_reports_service_name() {
        let app = test_app();
        let (status, body) = send(&app, get_request("/api/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({ "status": "healthy", "service": "Nurse Ally Backend" })
        );
    }

    #[tokio::test]
    async fn chest_pain_chat_returns_emergency_reply() {
        let app = test_app();
        let (status, body) = send(
            &app,
            json_request("POST", "/api/chat", json!({ "message": "I have chest pain" })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        let reply = body["reply"].as_str().unwrap();
        assert!(reply.contains(EMERGENCY_WARNING));
        assert!(reply.contains("emergency"));
        assert!(body["thread_id"]
            .as_str()
            .unwrap()
            .starts_with("thread_default_"));
    }

    #[tokio::test]
    async fn chat_uses_profile_location() {
        let app = test_app();
        let (_, body) = send(
            &app,
            json_request(
                "POST",
                "/api/chat",
                json!({
                    "message": "my knee hurts",
                    "user_id": "pat",
                    "profile": { "location": "Springfield" }
                }),
            ),
        )
        .await;

        assert!(body["reply"].as_str().unwrap().contains(", Springfield"));
        assert!(body["thread_id"].as_str().unwrap().starts_with("thread_pat_"));
    }

    #[tokio::test]
    async fn malformed_profile_is_ignored() {
        let app = test_app();
        let (status, body) = send(
            &app,
            json_request(
                "POST",
                "/api/chat",
                json!({ "message": "my knee hurts", "profile": { "location": 42 } }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(body["reply"].as_str().unwrap().contains("your area"));
    }

    #[tokio::test]
    async fn chat_without_message_is_rejected() {
        let app = test_app();
        for payload in [json!({}), json!({ "message": "" }), json!({ "message": null })] {
            let (status, body) = send(&app, json_request("POST", "/api/chat", payload)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body, json!({ "error": "Message is required" }));
        }
    }

    #[tokio::test]
    async fn chat_with_invalid_json_is_rejected() {
        let app = test_app();
        let req = Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header("Content-Type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid JSON body");
    }

    #[tokio::test]
    async fn chat_turns_are_recorded_in_history() {
        let app = test_app();
        send(
            &app,
            json_request("POST", "/api/chat", json!({ "message": "hello", "user_id": "u1" })),
        )
        .await;
        send(
            &app,
            json_request("POST", "/api/chat", json!({ "message": "I have a rash", "user_id": "u1" })),
        )
        .await;

        let (status, body) = send(&app, get_request("/api/history/u1")).await;
        assert_eq!(status, StatusCode::OK);
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0]["text"], "hello");
        assert_eq!(messages[0]["sender"], "user");
        assert_eq!(messages[1]["sender"], "assistant");
        assert_eq!(messages[2]["text"], "I have a rash");
    }

    #[tokio::test]
    async fn reset_conversation_clears_history() {
        let app = test_app();
        send(
            &app,
            json_request("POST", "/api/chat", json!({ "message": "hello", "user_id": "u2" })),
        )
        .await;

        let (status, body) = send(
            &app,
            json_request("POST", "/api/reset-conversation", json!({ "user_id": "u2" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({ "status": "success", "message": "Conversation reset successfully" })
        );

        let (_, body) = send(&app, get_request("/api/history/u2")).await;
        assert_eq!(body["messages"], json!([]));
    }

    #[tokio::test]
    async fn reset_without_body_targets_default_user() {
        let app = test_app();
        send(&app, json_request("POST", "/api/chat", json!({ "message": "hello" }))).await;

        let req = Request::builder()
            .method("POST")
            .uri("/api/reset-conversation")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = send(&app, get_request("/api/history/default")).await;
        assert_eq!(body["messages"], json!([]));
    }

    #[tokio::test]
    async fn pdf_upload_returns_fixed_summary() {
        let app = test_app();
        let (status, body) = send(
            &app,
            upload_request("my card.pdf", "application/pdf", b"%PDF-1.4 whatever"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["filename"], "my card.pdf");
        assert_eq!(
            body["insurance_summary"],
            serde_json::to_value(summarize("my card.pdf")).unwrap()
        );
    }

    #[tokio::test]
    async fn pdf_content_type_parameters_are_accepted() {
        let app = test_app();
        for content_type in ["application/pdf; name=card.pdf", "Application/PDF"] {
            let (status, body) = send(&app, upload_request("card.pdf", content_type, b"%PDF")).await;
            assert_eq!(status, StatusCode::OK, "{content_type}");
            assert_eq!(body["filename"], "card.pdf");
        }

        let (status, _) = send(
            &app,
            upload_request("card.pdf", "application/pdfx", b"%PDF"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn non_pdf_upload_is_rejected() {
        let app = test_app();
        let (status, body) = send(&app, upload_request("notes.txt", "text/plain", b"hello")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Only PDF files are allowed" }));
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected_with_413() {
        let app = test_app();
        let data = vec![b'x'; 4096];
        let (status, body) = send(&app, upload_request("big.pdf", "application/pdf", &data)).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert!(body["error"].as_str().unwrap().starts_with("File too large"));
    }

    #[tokio::test]
    async fn upload_without_file_is_rejected() {
        let app = test_app();
        let body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"note\"\r\n\r\n\
             no file here\r\n\
             --{BOUNDARY}--\r\n"
        );
        let req = Request::builder()
            .method("POST")
            .uri("/api/upload")
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No file provided");

        let req = json_request("POST", "/api/upload", json!({}));
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No file provided");
    }

    #[tokio::test]
    async fn triage_endpoint_classifies_text() {
        let app = test_app();
        let (status, body) = send(
            &app,
            json_request("POST", "/api/triage", json!({ "text": "I think I broke my wrist, it's broken" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["urgency"], "high");

        let (status, body) = send(&app, json_request("POST", "/api/triage", json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Text is required");
    }

    #[tokio::test]
    async fn clinics_endpoint_falls_back_to_low_tier() {
        let app = test_app();
        let (status, body) = send(
            &app,
            get_request("/api/clinics?location=Shelbyville&urgency=bogus"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["urgency"], "low");
        assert_eq!(body["location"], "Shelbyville");
        let address = body["clinics"][0]["address"].as_str().unwrap();
        assert!(address.ends_with(", Shelbyville"));

        let (_, body) = send(&app, get_request("/api/clinics?urgency=emergency")).await;
        assert_eq!(body["urgency"], "emergency");
        assert_eq!(body["location"], "your area");
    }

    #[tokio::test]
    async fn invalid_allowed_origin_fails_router_construction() {
        let config = Arc::new(Config {
            allowed_origin: "bad\norigin".to_string(),
            ..test_config()
        });
        let store = Arc::new(InMemorySessionStore::new(10, Duration::from_secs(60)));
        let result = api_router(Arc::new(AppState::with_mock_services(config, store)));
        assert!(matches!(result, Err(ApiError::Internal(_))));
    }

    struct UnavailableTriage;

    #[async_trait]
    impl TriageService for UnavailableTriage {
        async fn classify(&self, _text: &str) -> PortResult<TriageResult> {
            Err(PortError::Unexpected("triage backend offline".to_string()))
        }
    }

    #[tokio::test]
    async fn failed_chat_turn_leaves_history_untouched() {
        let config = Arc::new(test_config());
        let store = Arc::new(InMemorySessionStore::new(10, Duration::from_secs(3600)));
        let mut state = AppState::with_mock_services(config, store);
        let triage: Arc<dyn TriageService> = Arc::new(UnavailableTriage);
        state.composer = Arc::new(ReplyComposer::new(
            triage.clone(),
            Arc::new(StaticClinicDirectory::new()),
        ));
        state.triage = triage;
        let app = api_router(Arc::new(state)).unwrap();

        let (status, body) = send(
            &app,
            json_request("POST", "/api/chat", json!({ "message": "my head hurts", "user_id": "p" })),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Internal server error" }));

        let (_, body) = send(&app, get_request("/api/history/p")).await;
        assert_eq!(body["messages"], json!([]));

        // Turns that never reach triage are still recorded as a pair.
        send(
            &app,
            json_request("POST", "/api/chat", json!({ "message": "hello", "user_id": "p" })),
        )
        .await;
        let (_, body) = send(&app, get_request("/api/history/p")).await;
        assert_eq!(body["messages"].as_array().unwrap().len(), 2);
    }
}
