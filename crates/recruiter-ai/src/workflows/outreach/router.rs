use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use serde_json::json;

use super::dispatch::WebhookTransport;
use super::domain::{CallbackNotice, CandidateId, NewCandidate, StatusUpdate};
use super::repository::{CandidateRepository, RepositoryError};
use super::service::{BatchRequest, CallbackError, OutreachService};

/// Router builder exposing the outreach workflow endpoints.
pub fn outreach_router<R, T>(service: Arc<OutreachService<R, T>>) -> Router
where
    R: CandidateRepository + 'static,
    T: WebhookTransport + 'static,
{
    Router::new()
        .route("/api/v1/candidates", post(add_candidate_handler::<R, T>))
        .route(
            "/api/v1/candidates/:candidate_id/status",
            put(status_update_handler::<R, T>),
        )
        .route(
            "/api/v1/candidates/:candidate_id/calls",
            get(call_history_handler::<R, T>),
        )
        .route(
            "/api/v1/outreach/calls",
            post(trigger_calls_handler::<R, T>),
        )
        .route(
            "/api/v1/outreach/callback",
            post(callback_handler::<R, T>),
        )
        .with_state(service)
}

pub(crate) async fn add_candidate_handler<R, T>(
    State(service): State<Arc<OutreachService<R, T>>>,
    axum::Json(candidate): axum::Json<NewCandidate>,
) -> Response
where
    R: CandidateRepository + 'static,
    T: WebhookTransport + 'static,
{
    match service.add_candidate(candidate) {
        Ok(record) => {
            let payload = json!({
                "status": "success",
                "candidate_id": record.profile.id,
                "name": record.profile.name,
            });
            (StatusCode::CREATED, axum::Json(payload)).into_response()
        }
        Err(err) => repository_error_response(err),
    }
}

pub(crate) async fn status_update_handler<R, T>(
    State(service): State<Arc<OutreachService<R, T>>>,
    Path(candidate_id): Path<i64>,
    axum::Json(update): axum::Json<StatusUpdate>,
) -> Response
where
    R: CandidateRepository + 'static,
    T: WebhookTransport + 'static,
{
    let candidate_id = CandidateId(candidate_id);
    match service.apply_status_update(candidate_id, &update) {
        Ok(()) => {
            let payload = json!({
                "status": "success",
                "candidate_id": candidate_id,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => repository_error_response(err),
    }
}

pub(crate) async fn call_history_handler<R, T>(
    State(service): State<Arc<OutreachService<R, T>>>,
    Path(candidate_id): Path<i64>,
) -> Response
where
    R: CandidateRepository + 'static,
    T: WebhookTransport + 'static,
{
    match service.call_history(CandidateId(candidate_id)) {
        Ok(entries) => {
            let payload = json!({
                "status": "success",
                "count": entries.len(),
                "calls": entries,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => repository_error_response(err),
    }
}

pub(crate) async fn trigger_calls_handler<R, T>(
    State(service): State<Arc<OutreachService<R, T>>>,
    axum::Json(request): axum::Json<BatchRequest>,
) -> Response
where
    R: CandidateRepository + 'static,
    T: WebhookTransport + 'static,
{
    let results = service.trigger_batch(request).await;
    let payload = json!({
        "status": "success",
        "results": results,
    });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

pub(crate) async fn callback_handler<R, T>(
    State(service): State<Arc<OutreachService<R, T>>>,
    axum::Json(notice): axum::Json<CallbackNotice>,
) -> Response
where
    R: CandidateRepository + 'static,
    T: WebhookTransport + 'static,
{
    match service.process_callback(notice) {
        Ok(receipt) => {
            let payload = json!({
                "status": "success",
                "candidate_id": receipt.candidate_id,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(CallbackError::Unauthorized) => {
            let payload = json!({ "error": "invalid webhook secret" });
            (StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response()
        }
        Err(err @ CallbackError::UnknownCandidate(_)) => {
            let payload = json!({ "error": err.to_string() });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(other) => {
            let payload = json!({ "error": other.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

fn repository_error_response(err: RepositoryError) -> Response {
    match err {
        RepositoryError::NotFound => {
            let payload = json!({ "error": "candidate not found" });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        other => {
            let payload = json!({ "error": other.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}
