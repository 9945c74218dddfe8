use crate::app::AppContext;
use crate::domain::{Feedback, Interview, InterviewStatus, Question};
use crate::error::{CoreError, CoreResult};
use crate::events::{DomainEvent, UnitOfWork};
use crate::store::{Store, now_utc};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

/// START: create the interview, generate questions synchronously, persist
/// everything in one transaction, and stage the fan-out event. The row is
/// already in GENERATING_VIDEOS when the caller sees it; CREATED never
/// escapes this function.
pub async fn start_interview(
    ctx: &Arc<AppContext>,
    user_id: &str,
    resume_id: &str,
    job_role_id: &str,
) -> CoreResult<(Interview, Vec<Question>)> {
    let resume = ctx.store.get_owned_resume(resume_id, user_id).await?;
    let role = ctx.store.get_job_role(job_role_id).await?;

    let count = ctx.config.pipeline.question_count;
    let generated = ctx
        .shields
        .question_gen
        .run(|| ctx.question_gen.generate(&resume.content, &role.title, count))
        .await?;

    let now = now_utc();
    let interview = Interview {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_owned(),
        resume_id: resume.id,
        job_role_id: role.id,
        status: InterviewStatus::GeneratingVideos,
        interview_type: "standard".into(),
        overall_score: None,
        created_at: now,
        completed_at: None,
    };

    let questions: Vec<Question> = generated
        .into_iter()
        .take(count)
        .enumerate()
        .map(|(idx, item)| Question {
            id: Uuid::new_v4().to_string(),
            interview_id: interview.id.clone(),
            ordinal: idx as i64 + 1,
            text: item.text,
            category: item.category,
            difficulty: item.difficulty,
            avatar_key: None,
            created_at: now,
        })
        .collect();

    let mut uow = UnitOfWork::begin(&ctx.store).await?;
    Store::insert_interview(&mut *uow.executor(), &interview).await?;
    for question in &questions {
        Store::insert_question(&mut *uow.executor(), question).await?;
    }
    uow.stage(DomainEvent::QuestionsCreated {
        interview_id: interview.id.clone(),
        question_ids: questions.iter().map(|q| q.id.clone()).collect(),
    });
    uow.commit(&ctx.bus).await?;

    tracing::info!(
        interview_id = %interview.id,
        user_id,
        questions = questions.len(),
        "interview started"
    );
    Ok((interview, questions))
}

/// Interview plus its questions and answered-question ids, all
/// ownership-checked. This is the polling fallback: avatar keys set or
/// unset, answers present or absent, and the status reconstruct progress.
pub async fn load_interview(
    ctx: &AppContext,
    user_id: &str,
    interview_id: &str,
) -> CoreResult<(Interview, Vec<Question>, HashSet<String>)> {
    let interview = ctx.store.get_owned_interview(interview_id, user_id).await?;
    let questions = ctx.store.list_questions(interview_id).await?;
    let answered = ctx.store.list_answered_question_ids(interview_id).await?;
    Ok((interview, questions, answered))
}

/// Lightweight history list; questions deliberately omitted.
pub async fn interview_history(ctx: &AppContext, user_id: &str) -> CoreResult<Vec<Interview>> {
    ctx.store.list_interviews_by_user(user_id).await
}

/// COMPLETE: move to PROCESSING and fire the feedback pipeline. The CAS
/// makes a second complete fail with `IllegalState`.
pub async fn complete_interview(
    ctx: &Arc<AppContext>,
    user_id: &str,
    interview_id: &str,
) -> CoreResult<()> {
    let interview = ctx.store.get_owned_interview(interview_id, user_id).await?;
    ctx.store
        .transition_status(
            &interview.id,
            InterviewStatus::InProgress,
            InterviewStatus::Processing,
        )
        .await?;

    let ctx_bg = ctx.clone();
    let interview_id = interview.id;
    let user_id = user_id.to_owned();
    ctx.tracker.spawn(async move {
        crate::pipeline::feedback::run_feedback(&ctx_bg, interview_id, user_id).await;
    });
    Ok(())
}

/// What `GET /feedback` should say right now.
pub enum FeedbackOutcome {
    Ready(Feedback),
    /// Feedback pipeline still running; worth re-polling.
    Pending,
    /// No feedback and none coming without further user action.
    NotAvailable,
}

pub async fn feedback_for(
    ctx: &AppContext,
    user_id: &str,
    interview_id: &str,
) -> CoreResult<FeedbackOutcome> {
    let interview = ctx.store.get_owned_interview(interview_id, user_id).await?;
    match interview.status {
        InterviewStatus::Completed => match ctx.store.get_feedback(interview_id).await? {
            Some(feedback) => Ok(FeedbackOutcome::Ready(feedback)),
            None => Err(CoreError::Internal(anyhow::anyhow!(
                "interview {interview_id} is COMPLETED without feedback"
            ))),
        },
        InterviewStatus::Processing => Ok(FeedbackOutcome::Pending),
        _ => Ok(FeedbackOutcome::NotAvailable),
    }
}
