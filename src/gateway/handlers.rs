use super::dto::{feedback_dto, history_dto, interview_dto};
use super::{ApiError, AppState, authenticate};
use crate::service::{
    self, ConfirmUploadRequest, FeedbackOutcome,
};
use axum::{
    extract::{Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use std::collections::HashSet;

// ── Request shapes ───────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct StartRequest {
    resume_id: String,
    job_role_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct UploadUrlQuery {
    question_id: String,
    content_type: Option<String>,
}

/// The optional `contentType` clients send alongside is accepted and
/// ignored; the object's type was fixed when the PUT URL was issued.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ConfirmUploadBody {
    question_id: String,
    s3_key: String,
    duration: Option<f64>,
}

// ── Handlers ─────────────────────────────────────────────────

/// GET /health: unauthenticated liveness with a component snapshot.
pub(super) async fn handle_health(State(state): State<AppState>) -> impl IntoResponse {
    let db_ok = state.ctx.store.ping().await;
    let status = if db_ok { "ok" } else { "degraded" };
    Json(serde_json::json!({
        "status": status,
        "components": { "database": db_ok },
    }))
}

/// POST /api/interviews/start
pub(super) async fn handle_start(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Json<StartRequest>,
) -> Result<Response, ApiError> {
    let user_id = authenticate(&state, &headers)?;
    let (interview, questions) =
        service::start_interview(&state.ctx, &user_id, &body.resume_id, &body.job_role_id).await?;
    // Fresh interview: nothing is answered yet.
    let dto = interview_dto(&state.ctx, interview, questions, &HashSet::new());
    Ok((StatusCode::CREATED, Json(dto)).into_response())
}

/// GET /api/interviews/{id}
pub(super) async fn handle_get_interview(
    State(state): State<AppState>,
    Path(interview_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let user_id = authenticate(&state, &headers)?;
    let (interview, questions, answered) =
        service::load_interview(&state.ctx, &user_id, &interview_id).await?;
    Ok(Json(interview_dto(&state.ctx, interview, questions, &answered)).into_response())
}

/// GET /api/interviews/history
pub(super) async fn handle_history(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let user_id = authenticate(&state, &headers)?;
    let interviews = service::interview_history(&state.ctx, &user_id).await?;
    Ok(Json(history_dto(interviews)).into_response())
}

/// POST /api/interviews/{id}/upload-url
pub(super) async fn handle_upload_url(
    State(state): State<AppState>,
    Path(interview_id): Path<String>,
    Query(query): Query<UploadUrlQuery>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let user_id = authenticate(&state, &headers)?;
    let ticket = service::issue_upload_url(
        &state.ctx,
        &user_id,
        &interview_id,
        &query.question_id,
        query.content_type.as_deref(),
    )
    .await?;
    Ok(Json(ticket).into_response())
}

/// POST /api/interviews/{id}/confirm-upload
pub(super) async fn handle_confirm_upload(
    State(state): State<AppState>,
    Path(interview_id): Path<String>,
    headers: HeaderMap,
    body: Json<ConfirmUploadBody>,
) -> Result<Response, ApiError> {
    let user_id = authenticate(&state, &headers)?;
    let body = body.0;
    service::confirm_upload(
        &state.ctx,
        &user_id,
        &interview_id,
        ConfirmUploadRequest {
            question_id: body.question_id,
            key: body.s3_key,
            duration_secs: body.duration,
        },
    )
    .await?;
    Ok(Json(serde_json::json!({ "confirmed": true })).into_response())
}

/// POST /api/interviews/{id}/response, the deprecated multipart fallback.
pub(super) async fn handle_multipart_response(
    State(state): State<AppState>,
    Path(interview_id): Path<String>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let user_id = authenticate(&state, &headers)?;

    let mut question_id: Option<String> = None;
    let mut duration: Option<f64> = None;
    let mut video: Option<(Vec<u8>, Option<String>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request("multipart", e.to_string()))?
    {
        match field.name().unwrap_or_default() {
            "questionId" => {
                question_id = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::bad_request("questionId", e.to_string()))?,
                );
            }
            "duration" => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request("duration", e.to_string()))?;
                duration = raw.parse().ok();
            }
            "video" => {
                let content_type = field.content_type().map(ToOwned::to_owned);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request("video", e.to_string()))?;
                video = Some((bytes.to_vec(), content_type));
            }
            other => {
                tracing::debug!(field = other, "ignoring unknown multipart field");
            }
        }
    }

    let question_id =
        question_id.ok_or_else(|| ApiError::bad_request("questionId", "missing field"))?;
    let (bytes, content_type) =
        video.ok_or_else(|| ApiError::bad_request("video", "missing field"))?;

    let key = service::upload_response_direct(
        &state.ctx,
        &user_id,
        &interview_id,
        &question_id,
        bytes,
        content_type.as_deref(),
        duration,
    )
    .await?;
    Ok(Json(serde_json::json!({ "confirmed": true, "s3Key": key })).into_response())
}

/// POST /api/interviews/{id}/complete
pub(super) async fn handle_complete(
    State(state): State<AppState>,
    Path(interview_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let user_id = authenticate(&state, &headers)?;
    service::complete_interview(&state.ctx, &user_id, &interview_id).await?;
    Ok(Json(serde_json::json!({ "status": "PROCESSING" })).into_response())
}

/// GET /api/interviews/{id}/feedback
pub(super) async fn handle_feedback(
    State(state): State<AppState>,
    Path(interview_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let user_id = authenticate(&state, &headers)?;
    match service::feedback_for(&state.ctx, &user_id, &interview_id).await? {
        FeedbackOutcome::Ready(feedback) => Ok(Json(feedback_dto(feedback)).into_response()),
        FeedbackOutcome::Pending => Ok((
            StatusCode::ACCEPTED,
            Json(serde_json::json!({ "status": "PROCESSING" })),
        )
            .into_response()),
        FeedbackOutcome::NotAvailable => Ok((
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({
                "error": "complete the interview first",
                "status": 404,
            })),
        )
            .into_response()),
    }
}
