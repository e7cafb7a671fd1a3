//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::error::ApiError;
use crate::web::state::AppState;
use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
        Multipart, Path, Query, State,
    },
    http::StatusCode,
    response::Json,
};
use bytes::Bytes;
use chrono::Utc;
use nurse_ally_core::composer::DEFAULT_LOCATION;
use nurse_ally_core::domain::{
    ClinicSearch, InsuranceDocument, InsuranceSummary, Message, TriageResult, UrgencyTier,
    UserProfile,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::{OpenApi, ToSchema};

/// Fallback for requests that do not name a user.
pub const DEFAULT_USER_ID: &str = "default";

/// The only upload type accepted.
pub const PDF_MIME_TYPE: &str = "application/pdf";

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        chat_handler,
        upload_handler,
        reset_conversation_handler,
        history_handler,
        triage_handler,
        clinics_handler,
    ),
    components(
        schemas(
            HealthResponse,
            ChatRequest,
            ChatResponse,
            UploadResponse,
            ResetRequest,
            ResetResponse,
            HistoryResponse,
            TriageRequest,
            crate::error::ErrorBody,
        )
    ),
    tags(
        (name = "Nurse Ally API", description = "Chat, triage and insurance endpoints for the virtual nurse assistant.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    status: &'static str,
    service: &'static str,
}

/// A chat turn sent by the UI.
#[derive(Deserialize, ToSchema)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
    /// Client-held profile; malformed profiles are ignored rather than rejected.
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub profile: Option<serde_json::Value>,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct ChatResponse {
    reply: String,
    status: &'static str,
    /// Informational only; regenerated on every turn.
    thread_id: String,
}

#[derive(Serialize, ToSchema)]
pub struct UploadResponse {
    status: &'static str,
    filename: String,
    #[schema(value_type = Object)]
    insurance_summary: InsuranceSummary,
    message: &'static str,
}

#[derive(Deserialize, Default, ToSchema)]
pub struct ResetRequest {
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct ResetResponse {
    status: &'static str,
    message: &'static str,
}

#[derive(Serialize, ToSchema)]
pub struct HistoryResponse {
    user_id: String,
    #[schema(value_type = Vec<Object>)]
    messages: Vec<Message>,
}

#[derive(Deserialize, ToSchema)]
pub struct TriageRequest {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Deserialize)]
pub struct ClinicsQuery {
    pub location: Option<String>,
    pub urgency: Option<String>,
}

//=========================================================================================
// Helpers
//=========================================================================================

/// Resolves an optional user id, treating missing or blank ids as the default user.
fn user_id_or_default(user_id: Option<String>) -> String {
    user_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| DEFAULT_USER_ID.to_string())
}

fn thread_id(user_id: &str) -> String {
    format!("thread_{}_{}", user_id, Utc::now().timestamp_millis())
}

/// Matches the PDF media type, ignoring parameters such as `; name=...`.
fn is_pdf(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(|essence| essence.trim().eq_ignore_ascii_case(PDF_MIME_TYPE))
        .unwrap_or(false)
}

fn invalid_json(rejection: JsonRejection) -> ApiError {
    warn!("Rejected request body: {}", rejection.body_text());
    ApiError::validation("Invalid JSON body")
}

fn too_large(limit: usize) -> ApiError {
    const MIB: usize = 1024 * 1024;
    let limit = if limit >= MIB && limit % MIB == 0 {
        format!("{}MB", limit / MIB)
    } else {
        format!("{} bytes", limit)
    };
    ApiError::PayloadTooLarge(format!("File too large. Maximum size is {}", limit))
}

fn multipart_error(err: MultipartError, limit: usize) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        too_large(limit)
    } else {
        warn!("Malformed multipart upload: {}", err.body_text());
        ApiError::validation("Invalid multipart request")
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Liveness check.
#[utoipa::path(
    get,
    path = "/api/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "Nurse Ally Backend",
    })
}

/// Send a chat message and receive the assistant's reply.
///
/// The message and the reply are appended to the user's conversation.
#[utoipa::path(
    post,
    path = "/api/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Reply composed", body = ChatResponse),
        (status = 400, description = "Missing message or invalid JSON", body = crate::error::ErrorBody),
        (status = 500, description = "Internal server error", body = crate::error::ErrorBody)
    )
)]
pub async fn chat_handler(
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) = payload.map_err(invalid_json)?;

    let message = request
        .message
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| ApiError::validation("Message is required"))?;
    let user_id = user_id_or_default(request.user_id);
    let profile = match request.profile {
        Some(raw) => serde_json::from_value::<UserProfile>(raw).unwrap_or_else(|e| {
            warn!(user_id = %user_id, "Ignoring malformed profile: {}", e);
            UserProfile::default()
        }),
        None => UserProfile::default(),
    };

    let sessions = &app_state.sessions;
    let history = sessions.history(&user_id).await?;

    // Record the turn only once a reply exists.
    let reply = app_state
        .composer
        .compose(&message, &profile, &history)
        .await?;
    sessions
        .append(&user_id, Message::from_user(message.as_str()))
        .await?;
    sessions
        .append(&user_id, Message::from_assistant(reply.as_str()))
        .await?;

    info!(user_id = %user_id, "Chat reply composed");
    Ok(Json(ChatResponse {
        reply,
        status: "success",
        thread_id: thread_id(&user_id),
    }))
}

/// Upload an insurance document (PDF) and receive its summary.
///
/// The summary is a fixed demonstration record; the document's contents are
/// not parsed.
#[utoipa::path(
    post,
    path = "/api/upload",
    request_body(content_type = "multipart/form-data", description = "A PDF in the `file` field."),
    responses(
        (status = 200, description = "Document summarized", body = UploadResponse),
        (status = 400, description = "No file, or not a PDF", body = crate::error::ErrorBody),
        (status = 413, description = "File exceeds the upload limit", body = crate::error::ErrorBody),
        (status = 500, description = "Internal server error", body = crate::error::ErrorBody)
    )
)]
pub async fn upload_handler(
    State(app_state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let limit = app_state.config.max_upload_bytes;
    let mut multipart = multipart.map_err(|rejection| {
        warn!("Upload was not multipart: {}", rejection.body_text());
        ApiError::validation("No file provided")
    })?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        if filename.is_empty() {
            return Err(ApiError::validation("No file selected"));
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        if !is_pdf(&content_type) {
            warn!(filename = %filename, content_type = %content_type, "Rejected non-PDF upload");
            return Err(ApiError::validation("Only PDF files are allowed"));
        }

        let data: Bytes = field.bytes().await.map_err(|e| multipart_error(e, limit))?;
        if data.len() > limit {
            warn!(filename = %filename, size = data.len(), "Rejected oversized upload");
            return Err(too_large(limit));
        }

        let document = InsuranceDocument {
            filename,
            content_type,
            data,
        };
        let insurance_summary = app_state.insurance.summarize(&document).await?;

        info!(filename = %document.filename, size = document.data.len(), "Insurance document summarized");
        return Ok(Json(UploadResponse {
            status: "success",
            filename: document.filename,
            insurance_summary,
            message: "Insurance document processed successfully",
        }));
    }

    Err(ApiError::validation("No file provided"))
}

/// Clear a user's conversation history.
#[utoipa::path(
    post,
    path = "/api/reset-conversation",
    request_body = ResetRequest,
    responses(
        (status = 200, description = "Conversation cleared", body = ResetResponse),
        (status = 500, description = "Internal server error", body = crate::error::ErrorBody)
    )
)]
pub async fn reset_conversation_handler(
    State(app_state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<ResetResponse>, ApiError> {
    // The body is optional; an empty request resets the default user.
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        ResetRequest::default()
    } else {
        serde_json::from_slice::<ResetRequest>(&body).map_err(|e| {
            warn!("Rejected reset body: {}", e);
            ApiError::validation("Invalid JSON body")
        })?
    };
    let user_id = user_id_or_default(request.user_id);

    app_state.sessions.reset(&user_id).await?;

    info!(user_id = %user_id, "Conversation reset");
    Ok(Json(ResetResponse {
        status: "success",
        message: "Conversation reset successfully",
    }))
}

/// Fetch a user's conversation history, oldest message first.
#[utoipa::path(
    get,
    path = "/api/history/{user_id}",
    params(("user_id" = String, Path, description = "The user whose history to fetch.")),
    responses(
        (status = 200, description = "Conversation history", body = HistoryResponse),
        (status = 500, description = "Internal server error", body = crate::error::ErrorBody)
    )
)]
pub async fn history_handler(
    State(app_state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let messages = app_state.sessions.history(&user_id).await?;
    Ok(Json(HistoryResponse { user_id, messages }))
}

/// Classify a symptom description without starting a conversation.
#[utoipa::path(
    post,
    path = "/api/triage",
    request_body = TriageRequest,
    responses(
        (status = 200, description = "Urgency tier, reasoning and recommendations"),
        (status = 400, description = "Missing text", body = crate::error::ErrorBody)
    )
)]
pub async fn triage_handler(
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<TriageRequest>, JsonRejection>,
) -> Result<Json<TriageResult>, ApiError> {
    let Json(request) = payload.map_err(invalid_json)?;
    let text = request
        .text
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::validation("Text is required"))?;

    let result = app_state.triage.classify(&text).await?;
    Ok(Json(result))
}

/// List care facilities for a location and urgency tier.
///
/// Unknown urgency labels fall back to the `low` tier.
#[utoipa::path(
    get,
    path = "/api/clinics",
    params(
        ("location" = Option<String>, Query, description = "Free-text location."),
        ("urgency" = Option<String>, Query, description = "emergency, high, medium or low.")
    ),
    responses((status = 200, description = "Matching clinics"))
)]
pub async fn clinics_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<ClinicsQuery>,
) -> Result<Json<ClinicSearch>, ApiError> {
    let location = query
        .location
        .map(|loc| loc.trim().to_string())
        .filter(|loc| !loc.is_empty())
        .unwrap_or_else(|| DEFAULT_LOCATION.to_string());
    let urgency = query
        .urgency
        .as_deref()
        .map(UrgencyTier::parse_or_low)
        .unwrap_or(UrgencyTier::Low);

    let search = app_state.clinics.find_clinics(&location, urgency).await?;
    Ok(Json(search))
}
