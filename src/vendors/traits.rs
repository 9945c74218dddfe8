use crate::domain::{QuestionCategory, QuestionDifficulty, VoiceProfile};
use crate::resilience::CallError;
use async_trait::async_trait;

// ── Question generation ──────────────────────────────────────

#[derive(Debug, Clone)]
pub struct GeneratedQuestion {
    pub text: String,
    pub category: QuestionCategory,
    pub difficulty: QuestionDifficulty,
}

#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    /// Produce up to `count` interview questions for the given resume and
    /// role. Invalid items are filtered; zero valid items is an error.
    async fn generate(
        &self,
        resume_text: &str,
        role_title: &str,
        count: usize,
    ) -> Result<Vec<GeneratedQuestion>, CallError>;
}

// ── Text-to-speech ───────────────────────────────────────────

#[async_trait]
pub trait TextToSpeech: Send + Sync {
    /// Synthesize `text` into MP3 bytes.
    async fn synthesize(&self, text: &str, voice: &VoiceProfile) -> Result<Vec<u8>, CallError>;
}

// ── Avatar rendering ─────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum TalkStatus {
    Queued,
    Processing,
    Done { result_url: String },
    Error { message: String },
}

#[async_trait]
pub trait AvatarVideo: Send + Sync {
    /// Start a talking-head render reading the audio at `audio_url` over
    /// the portrait at `portrait_url`. Returns the vendor job id.
    async fn create_talk(
        &self,
        audio_url: &str,
        portrait_url: &str,
        pad_audio_secs: f64,
        fluent: bool,
    ) -> Result<String, CallError>;

    async fn poll_talk(&self, job_id: &str) -> Result<TalkStatus, CallError>;

    /// Download the finished video from the vendor-hosted result URL.
    async fn fetch_video(&self, result_url: &str) -> Result<Vec<u8>, CallError>;
}

// ── Speech-to-text ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum SttStatus {
    Queued,
    Processing,
    Completed {
        text: String,
        confidence: Option<f64>,
    },
    Error {
        message: String,
    },
}

#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn submit(&self, audio_url: &str, language_code: &str) -> Result<String, CallError>;

    async fn poll(&self, job_id: &str) -> Result<SttStatus, CallError>;
}

// ── Feedback generation ──────────────────────────────────────

#[derive(Debug, Clone)]
pub struct AnswerPair {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone)]
pub struct FeedbackDraft {
    /// Already clamped to [0, 100] by the adapter.
    pub overall_score: i64,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub recommendations: Vec<String>,
    pub detailed_analysis: String,
}

#[async_trait]
pub trait FeedbackGenerator: Send + Sync {
    async fn generate(&self, answers: &[AnswerPair]) -> Result<FeedbackDraft, CallError>;
}
