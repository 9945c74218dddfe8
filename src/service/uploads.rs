use crate::app::AppContext;
use crate::blobstore::keys;
use crate::domain::{Interview, InterviewStatus, Question, Response};
use crate::error::{CoreError, CoreResult, DomainError};
use crate::store::now_utc;
use std::sync::Arc;
use uuid::Uuid;

const DEFAULT_VIDEO_CONTENT_TYPE: &str = "video/webm";

#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadTicket {
    pub upload_url: String,
    #[serde(rename = "s3Key")]
    pub key: String,
    #[serde(rename = "expiresInSeconds")]
    pub expires_in_secs: u64,
}

#[derive(Debug, Clone)]
pub struct ConfirmUploadRequest {
    pub question_id: String,
    pub key: String,
    pub duration_secs: Option<f64>,
}

/// Presigned-PUT issuance. The caller must upload to exactly the returned
/// key and then confirm.
pub async fn issue_upload_url(
    ctx: &AppContext,
    user_id: &str,
    interview_id: &str,
    question_id: &str,
    content_type: Option<&str>,
) -> CoreResult<UploadTicket> {
    let (interview, question) =
        validate_answer_slot(ctx, user_id, interview_id, question_id).await?;

    let key = keys::response_key(&interview.user_id, &interview.id, &question.id);
    let content_type = content_type.unwrap_or(DEFAULT_VIDEO_CONTENT_TYPE);
    let upload_url = ctx.presign_put(&key, content_type)?;

    Ok(UploadTicket {
        upload_url,
        key,
        expires_in_secs: ctx.config.presign.put_ttl_secs,
    })
}

/// Upload confirmation: verifies the object actually landed, creates the
/// Response exactly once, and kicks off transcription out-of-band.
pub async fn confirm_upload(
    ctx: &Arc<AppContext>,
    user_id: &str,
    interview_id: &str,
    request: ConfirmUploadRequest,
) -> CoreResult<()> {
    let (interview, question) =
        validate_answer_slot(ctx, user_id, interview_id, &request.question_id).await?;

    // The key must be one this handshake issued for this exact slot;
    // anything else could smuggle in another user's object.
    let expected_prefix = format!(
        "interviews/{}/{}/response_{}_",
        interview.user_id, interview.id, question.id
    );
    if !request.key.starts_with(&expected_prefix) || !request.key.ends_with(".webm") {
        return Err(CoreError::validation(
            "s3Key",
            "key was not issued for this question",
        ));
    }

    if !ctx.blobs.head_object(&request.key).await? {
        return Err(CoreError::Domain(DomainError::UploadNotFound {
            key: request.key,
        }));
    }

    create_response(ctx, &interview, &question, request.key, request.duration_secs).await
}

/// Deprecated multipart path: the server PUTs the bytes itself, then joins
/// the normal confirmation flow so Response creation has one code path.
pub async fn upload_response_direct(
    ctx: &Arc<AppContext>,
    user_id: &str,
    interview_id: &str,
    question_id: &str,
    bytes: Vec<u8>,
    content_type: Option<&str>,
    duration_secs: Option<f64>,
) -> CoreResult<String> {
    if bytes.is_empty() {
        return Err(CoreError::validation("video", "empty upload"));
    }
    let (interview, question) =
        validate_answer_slot(ctx, user_id, interview_id, question_id).await?;

    let key = keys::response_key(&interview.user_id, &interview.id, &question.id);
    ctx.blobs
        .put_object(
            &key,
            bytes,
            content_type.unwrap_or(DEFAULT_VIDEO_CONTENT_TYPE),
        )
        .await?;

    create_response(ctx, &interview, &question, key.clone(), duration_secs).await?;
    Ok(key)
}

/// Shared gate for both handshake steps: ownership, IN_PROGRESS, the
/// question belongs to the interview, and the slot is still empty.
async fn validate_answer_slot(
    ctx: &AppContext,
    user_id: &str,
    interview_id: &str,
    question_id: &str,
) -> CoreResult<(Interview, Question)> {
    let interview = ctx.store.get_owned_interview(interview_id, user_id).await?;
    if interview.status != InterviewStatus::InProgress {
        return Err(CoreError::illegal_state(
            interview.status.to_string(),
            InterviewStatus::InProgress.to_string(),
        ));
    }
    let question = ctx.store.get_interview_question(interview_id, question_id).await?;
    if ctx
        .store
        .get_response_for_question(question_id)
        .await?
        .is_some()
    {
        return Err(CoreError::duplicate("response"));
    }
    Ok((interview, question))
}

async fn create_response(
    ctx: &Arc<AppContext>,
    interview: &Interview,
    question: &Question,
    video_key: String,
    duration_secs: Option<f64>,
) -> CoreResult<()> {
    let response = Response {
        id: Uuid::new_v4().to_string(),
        question_id: question.id.clone(),
        interview_id: interview.id.clone(),
        user_id: interview.user_id.clone(),
        video_key: video_key.clone(),
        transcript: None,
        transcript_confidence: None,
        duration_secs,
        created_at: now_utc(),
    };
    // The UNIQUE(question_id) insert is the idempotency point: a racing
    // duplicate confirm loses here with `Duplicate`.
    ctx.store.insert_response(&response).await?;

    tracing::info!(
        interview_id = %interview.id,
        question_id = %question.id,
        "answer upload confirmed"
    );

    // Response creation happens-before STT submission. Transcription
    // failure is logged, never bubbled into the confirmation.
    let ctx_bg = ctx.clone();
    let response_id = response.id;
    ctx.tracker.spawn(async move {
        crate::pipeline::transcribe::run_transcription(&ctx_bg, response_id, video_key).await;
    });
    Ok(())
}
