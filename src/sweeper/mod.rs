//! Recovery sweeper: unsticks interviews stranded in transient states by
//! crashes, vendor outages, or lost background tasks.
//!
//! Single-flight by construction: one task, and the next pass starts a
//! full interval after the previous one finishes (fixed delay, not fixed
//! rate).

use crate::app::AppContext;
use crate::domain::InterviewStatus;
use crate::error::CoreResult;
use crate::notify::ProgressEvent;
use crate::store::now_utc;
use chrono::Duration as ChronoDuration;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub async fn run(ctx: Arc<AppContext>, shutdown: CancellationToken) {
    let recovery = &ctx.config.recovery;
    let initial_delay = Duration::from_secs(recovery.initial_delay_secs);
    let interval = Duration::from_secs(recovery.interval_secs);

    tokio::select! {
        () = tokio::time::sleep(initial_delay) => {}
        () = shutdown.cancelled() => return,
    }

    loop {
        match sweep_once(&ctx).await {
            Ok((videos, processing)) if videos + processing > 0 => {
                tracing::info!(
                    rescued_generating = videos,
                    failed_processing = processing,
                    "sweep pass rescued stuck interviews"
                );
            }
            Ok(_) => tracing::debug!("sweep pass found nothing stuck"),
            Err(err) => tracing::warn!(error = %err, "sweep pass failed"),
        }

        tokio::select! {
            () = tokio::time::sleep(interval) => {}
            () = shutdown.cancelled() => return,
        }
    }
}

/// One pass. Idempotent: rescued rows no longer match the stuck queries,
/// so an immediate re-run returns no rows.
pub async fn sweep_once(ctx: &AppContext) -> CoreResult<(usize, usize)> {
    let recovery = &ctx.config.recovery;
    let now = now_utc();

    // GENERATING_VIDEOS past its deadline: release with whatever avatars
    // exist; the UI shows the rest as text-only.
    let video_cutoff = now - ChronoDuration::seconds(recovery.video_timeout_secs as i64);
    let mut rescued_videos = 0;
    for interview in ctx.store.list_stuck_generating(video_cutoff).await? {
        let elapsed_secs = (now - interview.created_at).num_seconds();
        let (total, with_avatar) = ctx.store.count_questions_with_avatar(&interview.id).await?;
        tracing::warn!(
            interview_id = %interview.id,
            user_id = %interview.user_id,
            elapsed_secs,
            avatars_ready = with_avatar,
            questions = total,
            "interview stuck generating videos; releasing with text-only fallback"
        );
        match ctx
            .store
            .transition_status(
                &interview.id,
                InterviewStatus::GeneratingVideos,
                InterviewStatus::InProgress,
            )
            .await
        {
            Ok(()) => {
                ctx.hub.publish(&interview.id, &ProgressEvent::InterviewReady {});
                rescued_videos += 1;
            }
            // Lost the CAS to the pipeline finishing just now; fine.
            Err(err) => tracing::debug!(interview_id = %interview.id, error = %err, "rescue lost the race"),
        }
    }

    // PROCESSING past its deadline: feedback never landed; fail the
    // interview so the UI stops waiting.
    let processing_cutoff =
        now - ChronoDuration::seconds(recovery.processing_timeout_secs as i64);
    let mut failed_processing = 0;
    for interview in ctx.store.list_stuck_processing(processing_cutoff).await? {
        let reference = interview.completed_at.unwrap_or(interview.created_at);
        tracing::warn!(
            interview_id = %interview.id,
            user_id = %interview.user_id,
            elapsed_secs = (now - reference).num_seconds(),
            "interview stuck processing; marking failed"
        );
        match ctx
            .store
            .transition_status(
                &interview.id,
                InterviewStatus::Processing,
                InterviewStatus::Failed,
            )
            .await
        {
            Ok(()) => failed_processing += 1,
            Err(err) => tracing::debug!(interview_id = %interview.id, error = %err, "fail lost the race"),
        }
    }

    Ok((rescued_videos, failed_processing))
}
