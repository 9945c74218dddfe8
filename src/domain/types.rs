use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

// ── Interview lifecycle ──────────────────────────────────────

/// Lifecycle of one interview session.
///
/// ```text
/// CREATED → GENERATING_VIDEOS → IN_PROGRESS → PROCESSING → COMPLETED
///                 │                  │             │
///                 └──────────────────┴─────────────┴──► FAILED
/// ```
///
/// `status` changes go through [`InterviewStatus::can_transition`]; the
/// store refuses anything else with `IllegalState`. Every edge here has
/// exactly one owner: START, avatar-pipeline completion or sweeper video
/// rescue, COMPLETE, feedback success, sweeper processing timeout.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, Hash,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InterviewStatus {
    Created,
    GeneratingVideos,
    InProgress,
    Processing,
    Completed,
    Failed,
}

impl InterviewStatus {
    /// Whether moving from `self` to `to` is a legal lifecycle step.
    pub fn can_transition(self, to: InterviewStatus) -> bool {
        use InterviewStatus::{
            Completed, Created, Failed, GeneratingVideos, InProgress, Processing,
        };
        matches!(
            (self, to),
            (Created, GeneratingVideos)
                | (GeneratingVideos, InProgress | Failed)
                | (InProgress, Processing | Failed)
                | (Processing, Completed | Failed)
        )
    }

    /// Transient states the recovery sweeper watches.
    pub fn is_transient(self) -> bool {
        matches!(self, Self::GeneratingVideos | Self::Processing)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

// ── Question taxonomy ────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionCategory {
    Technical,
    Behavioral,
    Situational,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionDifficulty {
    Easy,
    Medium,
    Hard,
}

// ── Entities ─────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Interview {
    pub id: String,
    pub user_id: String,
    pub resume_id: String,
    pub job_role_id: String,
    pub status: InterviewStatus,
    pub interview_type: String,
    /// Set only once the interview reaches COMPLETED.
    pub overall_score: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct Question {
    pub id: String,
    pub interview_id: String,
    /// 1-based, unique within the interview.
    pub ordinal: i64,
    pub text: String,
    pub category: QuestionCategory,
    pub difficulty: QuestionDifficulty,
    /// Blob-store object key of the rendered avatar video. Never a URL.
    pub avatar_key: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Response {
    pub id: String,
    pub question_id: String,
    pub interview_id: String,
    pub user_id: String,
    /// Blob-store object key of the answer video. Never a URL.
    pub video_key: String,
    pub transcript: Option<String>,
    pub transcript_confidence: Option<f64>,
    pub duration_secs: Option<f64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub id: String,
    pub interview_id: String,
    pub user_id: String,
    pub overall_score: i64,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub recommendations: Vec<String>,
    pub detailed_analysis: String,
    pub generated_at: DateTime<Utc>,
}

// ── Media caches ─────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct TtsCacheRow {
    pub cache_key: String,
    pub audio_key: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct AvatarCacheRow {
    pub cache_key: String,
    pub video_key: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

// ── Voice profile ────────────────────────────────────────────

/// TTS voice parameters. Part of the avatar fingerprint, so two interviews
/// configured with different voices never share cache entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceProfile {
    pub voice_id: String,
    pub model_id: String,
    pub stability: f64,
    pub similarity_boost: f64,
}
