//! Shared test harness: in-memory store, deterministic blob store, and
//! scriptable stub vendors behind the real capability traits.

#![allow(dead_code)]

use async_trait::async_trait;
use greenroom::app::AppContext;
use greenroom::blobstore::MemoryBlobStore;
use greenroom::config::Config;
use greenroom::domain::{InterviewStatus, QuestionCategory, QuestionDifficulty, VoiceProfile};
use greenroom::events::EventBus;
use greenroom::gateway::{AppState, TokenVerifier, run_gateway};
use greenroom::notify::ProgressHub;
use greenroom::pipeline::run_dispatcher;
use greenroom::resilience::{CallError, Shields};
use greenroom::store::Store;
use greenroom::vendors::{
    AnswerPair, AvatarVideo, FeedbackDraft, FeedbackGenerator, GeneratedQuestion,
    QuestionGenerator, SpeechToText, SttStatus, TalkStatus, TextToSpeech,
};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

pub const TEST_SECRET: &str = "test-token-secret";

// ── Stub vendors ─────────────────────────────────────────────

#[derive(Default)]
pub struct StubQuestionGen {
    pub calls: AtomicUsize,
}

#[async_trait]
impl QuestionGenerator for StubQuestionGen {
    async fn generate(
        &self,
        _resume_text: &str,
        _role_title: &str,
        count: usize,
    ) -> Result<Vec<GeneratedQuestion>, CallError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let categories = [
            QuestionCategory::Technical,
            QuestionCategory::Behavioral,
            QuestionCategory::Situational,
        ];
        let difficulties = [
            QuestionDifficulty::Easy,
            QuestionDifficulty::Medium,
            QuestionDifficulty::Hard,
        ];
        Ok((0..count)
            .map(|i| GeneratedQuestion {
                // Deterministic texts so a second interview repeats them
                // and exercises the caches.
                text: format!("Tell me about area {i} of your experience."),
                category: categories[i % categories.len()],
                difficulty: difficulties[i % difficulties.len()],
            })
            .collect())
    }
}

/// Scriptable failure queue shared by the stubs: each queued status code
/// is consumed by one call and returned as an HTTP-style failure.
#[derive(Default)]
pub struct FailureScript {
    queue: Mutex<VecDeque<u16>>,
}

impl FailureScript {
    pub fn push(&self, code: u16) {
        self.queue.lock().unwrap().push_back(code);
    }

    pub fn push_n(&self, code: u16, n: usize) {
        for _ in 0..n {
            self.push(code);
        }
    }

    fn pop(&self) -> Option<u16> {
        self.queue.lock().unwrap().pop_front()
    }
}

#[derive(Default)]
pub struct StubTts {
    pub calls: AtomicUsize,
    pub failures: FailureScript,
}

#[async_trait]
impl TextToSpeech for StubTts {
    async fn synthesize(&self, text: &str, _voice: &VoiceProfile) -> Result<Vec<u8>, CallError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(code) = self.failures.pop() {
            return Err(CallError::status(code, "scripted tts failure"));
        }
        Ok(format!("MP3:{text}").into_bytes())
    }
}

#[derive(Default)]
pub struct StubAvatar {
    pub create_calls: AtomicUsize,
    pub poll_calls: AtomicUsize,
    pub fetch_calls: AtomicUsize,
    pub create_failures: FailureScript,
    /// When true, polls never report done, for exercising the deadline.
    pub never_done: std::sync::atomic::AtomicBool,
    job_counter: AtomicUsize,
}

#[async_trait]
impl AvatarVideo for StubAvatar {
    async fn create_talk(
        &self,
        _audio_url: &str,
        _portrait_url: &str,
        _pad_audio_secs: f64,
        _fluent: bool,
    ) -> Result<String, CallError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(code) = self.create_failures.pop() {
            return Err(CallError::status(code, "scripted avatar failure"));
        }
        let job = self.job_counter.fetch_add(1, Ordering::SeqCst);
        Ok(format!("talk-{job}"))
    }

    async fn poll_talk(&self, job_id: &str) -> Result<TalkStatus, CallError> {
        self.poll_calls.fetch_add(1, Ordering::SeqCst);
        if self.never_done.load(Ordering::SeqCst) {
            return Ok(TalkStatus::Processing);
        }
        Ok(TalkStatus::Done {
            result_url: format!("https://stub-vendor/{job_id}.mp4"),
        })
    }

    async fn fetch_video(&self, result_url: &str) -> Result<Vec<u8>, CallError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("MP4:{result_url}").into_bytes())
    }
}

#[derive(Default)]
pub struct StubStt {
    pub submit_calls: AtomicUsize,
    pub failures: FailureScript,
}

#[async_trait]
impl SpeechToText for StubStt {
    async fn submit(&self, _audio_url: &str, _language_code: &str) -> Result<String, CallError> {
        let n = self.submit_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(code) = self.failures.pop() {
            return Err(CallError::status(code, "scripted stt failure"));
        }
        Ok(format!("transcript-{n}"))
    }

    async fn poll(&self, job_id: &str) -> Result<SttStatus, CallError> {
        Ok(SttStatus::Completed {
            text: format!("Spoken answer for {job_id}."),
            confidence: Some(0.92),
        })
    }
}

#[derive(Default)]
pub struct StubFeedback {
    pub calls: AtomicUsize,
    pub failures: FailureScript,
}

#[async_trait]
impl FeedbackGenerator for StubFeedback {
    async fn generate(&self, _answers: &[AnswerPair]) -> Result<FeedbackDraft, CallError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(code) = self.failures.pop() {
            return Err(CallError::status(code, "scripted feedback failure"));
        }
        Ok(FeedbackDraft {
            overall_score: 78,
            strengths: vec![
                "clear communication".into(),
                "strong fundamentals".into(),
                "structured answers".into(),
            ],
            weaknesses: vec![
                "rushed conclusions".into(),
                "few concrete metrics".into(),
                "limited follow-up questions".into(),
            ],
            recommendations: vec![
                "use the STAR format".into(),
                "quantify impact".into(),
                "slow down".into(),
                "ask clarifying questions".into(),
            ],
            detailed_analysis: "Solid performance with room to grow.".into(),
        })
    }
}

// ── Harness ──────────────────────────────────────────────────

pub struct Harness {
    pub ctx: Arc<AppContext>,
    pub blobs: Arc<MemoryBlobStore>,
    pub question_gen: Arc<StubQuestionGen>,
    pub tts: Arc<StubTts>,
    pub avatar: Arc<StubAvatar>,
    pub stt: Arc<StubStt>,
    pub feedback: Arc<StubFeedback>,
    pub verifier: Arc<TokenVerifier>,
    shutdown: CancellationToken,
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.auth.token_secret = Some(TEST_SECRET.into());
    config.openai.api_key = Some("sk-test".into());
    config.tts.api_key = Some("el-test".into());
    config.avatar.api_key = Some("did-test".into());
    config.stt.api_key = Some("aai-test".into());
    // Zero-length poll sleeps keep the pipelines fast under test.
    config.pipeline.avatar_poll_interval_secs = 0;
    config.pipeline.stt_poll_interval_secs = 0;
    config.resilience.avatar.base_backoff_ms = 1;
    config.resilience.tts.base_backoff_ms = 1;
    config.resilience.stt.base_backoff_ms = 1;
    config.resilience.question_gen.base_backoff_ms = 1;
    config.resilience.feedback_gen.base_backoff_ms = 1;
    config
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(config: Config) -> Self {
        config.validate().expect("test config should validate");

        let store = Store::in_memory().await.expect("in-memory store");
        store.insert_user("u1", "u1@example.com").await.unwrap();
        store
            .insert_resume("r10", "u1", "Experienced backend developer")
            .await
            .unwrap();
        store
            .insert_job_role("j5", "Software Engineer", "Builds reliable software")
            .await
            .unwrap();

        let blobs = Arc::new(MemoryBlobStore::new());
        let question_gen = Arc::new(StubQuestionGen::default());
        let tts = Arc::new(StubTts::default());
        let avatar = Arc::new(StubAvatar::default());
        let stt = Arc::new(StubStt::default());
        let feedback = Arc::new(StubFeedback::default());

        let (bus, rx) = EventBus::new();
        let ctx = Arc::new(AppContext {
            voice: config.voice.profile(),
            store,
            blobs: blobs.clone(),
            question_gen: question_gen.clone(),
            tts: tts.clone(),
            avatar: avatar.clone(),
            stt: stt.clone(),
            feedback_gen: feedback.clone(),
            shields: Shields::new(&config.resilience),
            bus,
            hub: ProgressHub::new(),
            tracker: TaskTracker::new(),
            config,
        });
        tokio::spawn(run_dispatcher(ctx.clone(), rx));

        Self {
            ctx,
            blobs,
            question_gen,
            tts,
            avatar,
            stt,
            feedback,
            verifier: Arc::new(TokenVerifier::new(TEST_SECRET)),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn token(&self, user_id: &str) -> String {
        self.verifier.mint(user_id, 3600)
    }

    /// Bind an ephemeral port and serve the real router; returns the base
    /// URL. The server dies with the harness.
    pub async fn spawn_gateway(&self) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("ephemeral gateway listener should bind");
        let port = listener.local_addr().unwrap().port();
        let state = AppState {
            ctx: self.ctx.clone(),
            verifier: self.verifier.clone(),
        };
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            let _ = run_gateway(listener, state, shutdown).await;
        });
        format!("http://127.0.0.1:{port}")
    }

    /// Poll the store until the interview reaches `status` or the deadline
    /// passes.
    pub async fn wait_for_status(&self, interview_id: &str, status: InterviewStatus) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let current = self
                .ctx
                .store
                .get_interview(interview_id)
                .await
                .unwrap()
                .map(|interview| interview.status);
            if current == Some(status) {
                return;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "interview {interview_id} never reached {status} (currently {current:?})"
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Poll until the predicate holds; used for background side effects
    /// like transcription landing on a response row.
    pub async fn wait_until<F, Fut>(&self, what: &str, mut predicate: F)
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = bool>,
    {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            if predicate().await {
                return;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "timed out waiting for {what}"
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
