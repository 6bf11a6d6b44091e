//! HTTP endpoints over the inbox.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use log::error;
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::email::NormalizedEmail;
use crate::error::MailError;
use crate::inbox::Inbox;

pub const LIVENESS_MESSAGE: &str = "Google Mail App Server is running. Use /api/emails to fetch emails.";

/// Application context shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub inbox: Arc<Inbox>,
    /// Answer 404 instead of `[]` when nothing is listed
    pub empty_inbox_not_found: bool,
}

/// `{error, details}` body returned on failure
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: &'static str,
    details: String,
}

impl ApiError {
    fn internal(error: &'static str, source: MailError) -> Self {
        error!("❌ {}: {}", error, source);
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error,
            details: source.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({ "error": self.error, "details": self.details })),
        )
            .into_response()
    }
}

async fn root() -> &'static str {
    LIVENESS_MESSAGE
}

/// GET /api/emails
async fn list_emails(State(state): State<AppState>) -> Result<Json<Vec<NormalizedEmail>>, ApiError> {
    let emails = state
        .inbox
        .fetch_emails()
        .await
        .map_err(|e| ApiError::internal("Failed to fetch emails", e))?;

    if emails.is_empty() && state.empty_inbox_not_found {
        return Err(ApiError {
            status: StatusCode::NOT_FOUND,
            error: "No emails found",
            details: "the mailbox listing returned no message".to_string(),
        });
    }

    Ok(Json(emails))
}

/// POST /api/emails/{id}/read
async fn mark_read(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<serde_json::Value>, ApiError> {
    state
        .inbox
        .mark_read(&id)
        .await
        .map_err(|e| ApiError::internal("Failed to mark message as read", e))?;
    Ok(Json(json!({ "success": true })))
}

/// DELETE /api/emails/{id}
async fn delete_email(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<serde_json::Value>, ApiError> {
    state
        .inbox
        .trash(&id)
        .await
        .map_err(|e| ApiError::internal("Failed to delete message", e))?;
    Ok(Json(json!({ "success": true })))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/emails", get(list_emails))
        .route("/api/emails/{id}/read", post(mark_read))
        .route("/api/emails/{id}", delete(delete_email))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
