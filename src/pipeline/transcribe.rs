//! Asynchronous answer transcription.
//!
//! Fired after a confirmed upload. Failure here never fails the upload;
//! the transcript stays null and the feedback prompt uses a placeholder.

use crate::app::AppContext;
use crate::error::{CoreError, CoreResult};
use crate::vendors::SttStatus;
use std::time::Duration;

const STT_LANGUAGE: &str = "en";

/// Submit the stored answer video and poll until text arrives. Logs and
/// returns on any terminal condition; callers fire-and-forget.
pub async fn run_transcription(ctx: &AppContext, response_id: String, video_key: String) {
    match transcribe(ctx, &response_id, &video_key).await {
        Ok(()) => tracing::info!(response_id, "transcription stored"),
        Err(err) => {
            tracing::warn!(response_id, error = %err, "transcription failed; transcript stays empty");
        }
    }
}

async fn transcribe(ctx: &AppContext, response_id: &str, video_key: &str) -> CoreResult<()> {
    let audio_url = ctx.presign_get_for_vendor(video_key)?;
    let job_id = ctx
        .shields
        .stt
        .run(|| ctx.stt.submit(&audio_url, STT_LANGUAGE))
        .await?;

    let (text, confidence) = poll_transcript(ctx, &job_id).await?;
    let stored = ctx
        .store
        .set_response_transcript(response_id, &text, confidence)
        .await?;
    if !stored {
        tracing::debug!(response_id, "transcript already present; keeping the first");
    }
    Ok(())
}

/// Poll loop with its own deadline; deliberately outside the retrier.
async fn poll_transcript(
    ctx: &AppContext,
    job_id: &str,
) -> CoreResult<(String, Option<f64>)> {
    let interval = Duration::from_secs(ctx.config.pipeline.stt_poll_interval_secs);
    for _ in 0..ctx.config.pipeline.stt_poll_attempts {
        tokio::time::sleep(interval).await;
        match ctx.stt.poll(job_id).await {
            Ok(SttStatus::Completed { text, confidence }) => return Ok((text, confidence)),
            Ok(SttStatus::Error { message }) => {
                return Err(CoreError::Internal(anyhow::anyhow!(
                    "transcription job failed: {message}"
                )));
            }
            Ok(SttStatus::Queued | SttStatus::Processing) => {}
            Err(err) => tracing::debug!(job_id, error = %err, "stt poll error"),
        }
    }
    Err(CoreError::Timeout { stage: "stt" })
}
