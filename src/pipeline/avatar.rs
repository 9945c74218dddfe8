//! Per-question avatar generation and the interview-wide fan-out.
//!
//! Order within one question is fixed: TTS audio is stored before the
//! render job is created, the job is created before any poll, the video
//! lands under `avatar-videos/` before the cache copy. Across questions
//! there is no ordering, only a bounded in-flight count.

use super::fingerprint;
use crate::app::AppContext;
use crate::blobstore::keys;
use crate::domain::InterviewStatus;
use crate::error::{CoreError, CoreResult, FailureKind, VendorError, VendorTarget};
use crate::notify::ProgressEvent;
use crate::vendors::TalkStatus;
use chrono::Duration as ChronoDuration;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Avatar cache rows get a soft expiry stamp; the TTS cache carries none.
const AVATAR_CACHE_EXPIRY_DAYS: i64 = 30;

/// Render one question's avatar and return the canonical blob key
/// (cache key when cached or cacheable, fresh key when the copy failed).
pub async fn generate_avatar(
    ctx: &AppContext,
    question_id: &str,
    question_text: &str,
) -> CoreResult<String> {
    let portrait_url = ctx.config.avatar.portrait_url.clone();
    let fp = fingerprint::avatar_fingerprint(question_text, &ctx.voice, &portrait_url);
    let cache_key = keys::avatar_cache_key(&fp);

    // Cache hit path: no vendor is consulted at all.
    if ctx.blobs.head_object(&cache_key).await.unwrap_or(false) {
        tracing::debug!(question_id, fingerprint = %fp, "avatar cache hit");
        return Ok(cache_key);
    }

    // Miss path, step 1: obtain TTS audio (its own cache inside).
    let audio_key = ensure_tts_audio(ctx, question_id, question_text).await?;
    let audio_url = ctx.presign_get_for_vendor(&audio_key)?;

    // Step 2: create the render job under resilience.
    let avatar_cfg = &ctx.config.avatar;
    let job_id = ctx
        .shields
        .avatar
        .run(|| {
            ctx.avatar.create_talk(
                &audio_url,
                &portrait_url,
                avatar_cfg.pad_audio_secs,
                avatar_cfg.fluent,
            )
        })
        .await?;

    // Step 3: poll to completion. Not wrapped by the retrier: "still
    // processing" is not a failure; the loop has its own deadline.
    let result_url = poll_talk(ctx, &job_id).await?;

    // Step 4: store the video, then copy into the cache key. A failed
    // copy only costs a future cache hit.
    let bytes = ctx
        .shields
        .avatar
        .run(|| ctx.avatar.fetch_video(&result_url))
        .await?;
    let video_key = keys::avatar_video_key(question_id);
    ctx.blobs
        .put_object(&video_key, bytes.clone(), "video/mp4")
        .await?;

    match ctx.blobs.head_object(&cache_key).await {
        Ok(false) => {
            if let Err(err) = ctx.blobs.put_object(&cache_key, bytes, "video/mp4").await {
                tracing::warn!(question_id, error = %err, "avatar cache copy failed");
                return Ok(video_key);
            }
        }
        Ok(true) => {}
        Err(err) => {
            tracing::warn!(question_id, error = %err, "avatar cache probe failed");
            return Ok(video_key);
        }
    }

    let expires_at = crate::store::now_utc() + ChronoDuration::days(AVATAR_CACHE_EXPIRY_DAYS);
    ctx.store
        .put_avatar_cache(&fp, &cache_key, Some(expires_at))
        .await?;
    Ok(cache_key)
}

/// TTS with the content-addressed cache in front. On a hit the stored blob
/// is re-verified; a missing blob degrades to a regular miss.
async fn ensure_tts_audio(
    ctx: &AppContext,
    question_id: &str,
    question_text: &str,
) -> CoreResult<String> {
    let fp = fingerprint::tts_fingerprint(question_text, &ctx.voice);
    if let Some(row) = ctx.store.get_tts_cache(&fp).await? {
        if ctx.blobs.head_object(&row.audio_key).await.unwrap_or(false) {
            tracing::debug!(question_id, fingerprint = %fp, "tts cache hit");
            return Ok(row.audio_key);
        }
        tracing::warn!(
            question_id,
            audio_key = %row.audio_key,
            "tts cache row points at a missing blob; regenerating"
        );
    }

    let audio = ctx
        .shields
        .tts
        .run(|| ctx.tts.synthesize(question_text, &ctx.voice))
        .await?;
    let audio_key = keys::tts_audio_key(question_id);
    ctx.blobs.put_object(&audio_key, audio, "audio/mpeg").await?;
    ctx.store.put_tts_cache(&fp, &audio_key).await?;
    Ok(audio_key)
}

async fn poll_talk(ctx: &AppContext, job_id: &str) -> CoreResult<String> {
    let interval = Duration::from_secs(ctx.config.pipeline.avatar_poll_interval_secs);
    for _ in 0..ctx.config.pipeline.avatar_poll_attempts {
        tokio::time::sleep(interval).await;
        match ctx.avatar.poll_talk(job_id).await {
            Ok(TalkStatus::Done { result_url }) => return Ok(result_url),
            Ok(TalkStatus::Error { message }) => {
                return Err(CoreError::Vendor(VendorError {
                    target: VendorTarget::Avatar,
                    kind: FailureKind::NonRetryable,
                    message: format!("render failed: {message}"),
                }));
            }
            Ok(TalkStatus::Queued | TalkStatus::Processing) => {}
            // A flaky poll is not a render failure; keep waiting.
            Err(err) => tracing::debug!(job_id, error = %err, "avatar poll error"),
        }
    }
    Err(CoreError::Timeout { stage: "avatar" })
}

/// Fan the avatar pipeline out over an interview's questions with a
/// bounded in-flight count. Failures stay per-question; once every task
/// has finished one way or the other, the interview leaves
/// GENERATING_VIDEOS.
pub async fn run_fanout(ctx: Arc<AppContext>, interview_id: String, question_ids: Vec<String>) {
    let limit = ctx.config.pipeline.max_concurrent_questions.max(1);
    let semaphore = Arc::new(Semaphore::new(limit));
    let mut tasks = JoinSet::new();

    for question_id in question_ids {
        let ctx = ctx.clone();
        let interview_id = interview_id.clone();
        let semaphore = semaphore.clone();
        tasks.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .expect("fan-out semaphore is never closed");
            process_question(&ctx, &interview_id, &question_id).await;
        });
    }
    while let Some(joined) = tasks.join_next().await {
        if let Err(err) = joined {
            tracing::error!(interview_id, error = %err, "avatar task panicked");
        }
    }

    match ctx
        .store
        .transition_status(
            &interview_id,
            InterviewStatus::GeneratingVideos,
            InterviewStatus::InProgress,
        )
        .await
    {
        Ok(()) => {
            tracing::info!(interview_id, "avatar pipeline finished; interview ready");
            ctx.hub.publish(&interview_id, &ProgressEvent::InterviewReady {});
        }
        // The sweeper may have rescued the interview first; that is fine.
        Err(err) => tracing::debug!(interview_id, error = %err, "interview already transitioned"),
    }
}

async fn process_question(ctx: &AppContext, interview_id: &str, question_id: &str) {
    let question = match ctx.store.get_question(question_id).await {
        Ok(Some(question)) => question,
        Ok(None) => {
            tracing::error!(question_id, "question vanished before avatar generation");
            return;
        }
        Err(err) => {
            tracing::error!(question_id, error = %err, "question lookup failed");
            return;
        }
    };

    match generate_avatar(ctx, question_id, &question.text).await {
        Ok(avatar_key) => {
            match ctx.store.set_question_avatar_key(question_id, &avatar_key).await {
                Ok(true) => {}
                Ok(false) => {
                    tracing::debug!(question_id, "avatar key already set; keeping the first");
                    return;
                }
                Err(err) => {
                    tracing::error!(question_id, error = %err, "failed to persist avatar key");
                    return;
                }
            }
            match ctx.presign_get(&avatar_key) {
                Ok(presigned_url) => ctx.hub.publish(
                    interview_id,
                    &ProgressEvent::AvatarReady {
                        question_id: question_id.to_owned(),
                        presigned_url,
                    },
                ),
                Err(err) => {
                    tracing::warn!(question_id, error = %err, "presign for progress event failed");
                }
            }
        }
        Err(err) => {
            // Absorbed: the question simply has no avatar and the UI shows
            // text only.
            tracing::warn!(interview_id, question_id, error = %err, "avatar generation failed");
            ctx.hub.publish(
                interview_id,
                &ProgressEvent::AvatarFailed {
                    question_id: question_id.to_owned(),
                },
            );
        }
    }
}
