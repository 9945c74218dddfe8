//! Feedback generation after the candidate completes the interview.
//!
//! Terminal vendor failure is NOT surfaced to the user from here: nothing
//! is persisted, the interview stays in PROCESSING, and the sweeper
//! eventually moves it to FAILED for the UI to poll.

use crate::app::AppContext;
use crate::domain::Feedback;
use crate::error::CoreResult;
use crate::store::now_utc;
use crate::vendors::AnswerPair;
use uuid::Uuid;

/// Stand-in answer when a response was uploaded but never transcribed.
const MISSING_ANSWER: &str = "(no answer transcript available)";

pub async fn run_feedback(ctx: &AppContext, interview_id: String, user_id: String) {
    match generate_and_store(ctx, &interview_id, &user_id).await {
        Ok(()) => tracing::info!(interview_id, "feedback stored; interview completed"),
        Err(err) => {
            tracing::warn!(
                interview_id,
                error = %err,
                "feedback generation failed; sweeper will fail the interview if it stays stuck"
            );
        }
    }
}

async fn generate_and_store(
    ctx: &AppContext,
    interview_id: &str,
    user_id: &str,
) -> CoreResult<()> {
    let answered = ctx.store.list_answered_questions(interview_id).await?;
    let pairs: Vec<AnswerPair> = answered
        .into_iter()
        .map(|item| AnswerPair {
            question: item.question_text,
            answer: item.transcript.unwrap_or_else(|| MISSING_ANSWER.into()),
        })
        .collect();

    let draft = ctx
        .shields
        .feedback_gen
        .run(|| ctx.feedback_gen.generate(&pairs))
        .await?;

    let feedback = Feedback {
        id: Uuid::new_v4().to_string(),
        interview_id: interview_id.to_owned(),
        user_id: user_id.to_owned(),
        overall_score: draft.overall_score,
        strengths: draft.strengths,
        weaknesses: draft.weaknesses,
        recommendations: draft.recommendations,
        detailed_analysis: draft.detailed_analysis,
        generated_at: now_utc(),
    };
    ctx.store.finalize_feedback(&feedback).await
}
