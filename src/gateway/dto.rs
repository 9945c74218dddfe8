//! Wire DTOs. Presigned URLs appear here and only here; stored rows keep
//! object keys, and a URL is minted each time a DTO leaves the process.

use crate::app::AppContext;
use crate::domain::{Feedback, Interview, InterviewStatus, Question};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewDto {
    pub id: String,
    pub status: InterviewStatus,
    pub resume_id: String,
    pub job_role_id: String,
    pub interview_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall_score: Option<i64>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub questions: Vec<QuestionDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDto {
    pub id: String,
    pub ordinal: i64,
    pub text: String,
    pub category: String,
    pub difficulty: String,
    /// Fresh presigned GET URL, present once the avatar is rendered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_video_url: Option<String>,
    pub avatar_ready: bool,
    /// Whether an answer has been confirmed for this question.
    pub answered: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItemDto {
    pub id: String,
    pub status: InterviewStatus,
    pub interview_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall_score: Option<i64>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackDto {
    pub interview_id: String,
    pub overall_score: i64,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub recommendations: Vec<String>,
    pub detailed_analysis: String,
    pub generated_at: DateTime<Utc>,
}

pub fn interview_dto(
    ctx: &AppContext,
    interview: Interview,
    questions: Vec<Question>,
    answered: &HashSet<String>,
) -> InterviewDto {
    let questions = questions
        .into_iter()
        .map(|question| {
            let is_answered = answered.contains(&question.id);
            question_dto(ctx, question, is_answered)
        })
        .collect();
    InterviewDto {
        id: interview.id,
        status: interview.status,
        resume_id: interview.resume_id,
        job_role_id: interview.job_role_id,
        interview_type: interview.interview_type,
        overall_score: interview.overall_score,
        created_at: interview.created_at,
        completed_at: interview.completed_at,
        questions,
    }
}

fn question_dto(ctx: &AppContext, question: Question, answered: bool) -> QuestionDto {
    let avatar_video_url = question.avatar_key.as_deref().and_then(|key| {
        ctx.presign_get(key)
            .map_err(|err| {
                tracing::warn!(question_id = %question.id, error = %err, "avatar presign failed");
            })
            .ok()
    });
    QuestionDto {
        avatar_ready: avatar_video_url.is_some(),
        answered,
        id: question.id,
        ordinal: question.ordinal,
        text: question.text,
        category: question.category.to_string(),
        difficulty: question.difficulty.to_string(),
        avatar_video_url,
    }
}

pub fn history_dto(interviews: Vec<Interview>) -> Vec<HistoryItemDto> {
    interviews
        .into_iter()
        .map(|interview| HistoryItemDto {
            id: interview.id,
            status: interview.status,
            interview_type: interview.interview_type,
            overall_score: interview.overall_score,
            created_at: interview.created_at,
            completed_at: interview.completed_at,
        })
        .collect()
}

pub fn feedback_dto(feedback: Feedback) -> FeedbackDto {
    FeedbackDto {
        interview_id: feedback.interview_id,
        overall_score: feedback.overall_score,
        strengths: feedback.strengths,
        weaknesses: feedback.weaknesses,
        recommendations: feedback.recommendations,
        detailed_analysis: feedback.detailed_analysis,
        generated_at: feedback.generated_at,
    }
}
