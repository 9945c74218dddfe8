use crate::domain::VoiceProfile;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

// ── Top-level config ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Path the config was loaded from - not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub blobstore: BlobStoreConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub openai: OpenAiConfig,

    #[serde(default)]
    pub tts: TtsConfig,

    #[serde(default)]
    pub avatar: AvatarConfig,

    #[serde(default)]
    pub stt: SttConfig,

    #[serde(default)]
    pub voice: VoiceConfig,

    #[serde(default)]
    pub presign: PresignConfig,

    #[serde(default)]
    pub resilience: ResilienceConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub recovery: RecoveryConfig,
}

// ── Server ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    /// Seconds granted to in-flight pipelines on shutdown before abort.
    /// Survivors are rescued by the recovery sweeper on next start.
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

fn default_server_host() -> String {
    "127.0.0.1".into()
}

fn default_server_port() -> u16 {
    8080
}

fn default_shutdown_grace_secs() -> u64 {
    5
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }
}

// ── Database ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// sqlx connection URL.
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_url() -> String {
    "sqlite:greenroom.db?mode=rwc".into()
}

fn default_max_connections() -> u32 {
    8
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

// ── Blob store ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobStoreConfig {
    #[serde(default = "default_blob_region")]
    pub region: String,
    #[serde(default = "default_blob_bucket")]
    pub bucket: String,
    /// Override endpoint (MinIO, localstack). Empty means the AWS default.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Credentials; when absent, ambient `AWS_ACCESS_KEY_ID` /
    /// `AWS_SECRET_ACCESS_KEY` are used.
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default)]
    pub secret_access_key: Option<String>,
}

fn default_blob_region() -> String {
    "us-east-1".into()
}

fn default_blob_bucket() -> String {
    "greenroom-media".into()
}

impl Default for BlobStoreConfig {
    fn default() -> Self {
        Self {
            region: default_blob_region(),
            bucket: default_blob_bucket(),
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
        }
    }
}

// ── Auth ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    /// HMAC secret for bearer token verification. No default; missing is
    /// a fatal startup error.
    #[serde(default)]
    pub token_secret: Option<String>,
}

// ── Vendors ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    #[serde(default = "default_openai_model")]
    pub model: String,
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".into()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".into()
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_openai_base_url(),
            model: default_openai_model(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_tts_base_url")]
    pub base_url: String,
}

fn default_tts_base_url() -> String {
    "https://api.elevenlabs.io".into()
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_tts_base_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvatarConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_avatar_base_url")]
    pub base_url: String,
    /// Portrait the talking head is rendered from. Part of the cache
    /// fingerprint: changing it invalidates every cached video.
    #[serde(default = "default_portrait_url")]
    pub portrait_url: String,
    #[serde(default = "default_pad_audio_secs")]
    pub pad_audio_secs: f64,
    #[serde(default = "default_true")]
    pub fluent: bool,
}

fn default_avatar_base_url() -> String {
    "https://api.d-id.com".into()
}

fn default_portrait_url() -> String {
    "https://cdn.greenroom.dev/interviewer.png".into()
}

fn default_pad_audio_secs() -> f64 {
    0.5
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_avatar_base_url(),
            portrait_url: default_portrait_url(),
            pad_audio_secs: default_pad_audio_secs(),
            fluent: default_true(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SttConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_stt_base_url")]
    pub base_url: String,
}

fn default_stt_base_url() -> String {
    "https://api.assemblyai.com".into()
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_stt_base_url(),
        }
    }
}

// ── Voice profile ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceConfig {
    #[serde(default = "default_voice_id")]
    pub voice_id: String,
    #[serde(default = "default_voice_model")]
    pub model_id: String,
    #[serde(default = "default_stability")]
    pub stability: f64,
    #[serde(default = "default_similarity_boost")]
    pub similarity_boost: f64,
}

fn default_voice_id() -> String {
    "21m00Tcm4TlvDq8ikWAM".into()
}

fn default_voice_model() -> String {
    "eleven_monolingual_v1".into()
}

fn default_stability() -> f64 {
    0.5
}

fn default_similarity_boost() -> f64 {
    0.75
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            voice_id: default_voice_id(),
            model_id: default_voice_model(),
            stability: default_stability(),
            similarity_boost: default_similarity_boost(),
        }
    }
}

impl VoiceConfig {
    pub fn profile(&self) -> VoiceProfile {
        VoiceProfile {
            voice_id: self.voice_id.clone(),
            model_id: self.model_id.clone(),
            stability: self.stability.clamp(0.0, 1.0),
            similarity_boost: self.similarity_boost.clamp(0.0, 1.0),
        }
    }
}

// ── Presigned URL TTLs ────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresignConfig {
    #[serde(default = "default_get_ttl_secs")]
    pub get_ttl_secs: u64,
    #[serde(default = "default_put_ttl_secs")]
    pub put_ttl_secs: u64,
}

fn default_get_ttl_secs() -> u64 {
    3600
}

fn default_put_ttl_secs() -> u64 {
    900
}

impl Default for PresignConfig {
    fn default() -> Self {
        Self {
            get_ttl_secs: default_get_ttl_secs(),
            put_ttl_secs: default_put_ttl_secs(),
        }
    }
}

// ── Resilience (per vendor target) ────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetPolicy {
    /// Attempt budget, including the first call.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// First backoff delay; doubles each attempt, ±20% jitter.
    #[serde(default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,
    /// Sliding window of call outcomes the breaker looks at.
    #[serde(default = "default_breaker_window")]
    pub breaker_window: usize,
    /// Failure ratio at which the breaker opens.
    pub breaker_failure_ratio: f64,
    /// How long an open breaker rejects before probing.
    pub breaker_open_secs: u64,
    /// Probes allowed while half-open; that many successes close it.
    #[serde(default = "default_breaker_probes")]
    pub breaker_probes: u32,
    /// In-flight cap, enforced outside the retry loop.
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_backoff_ms() -> u64 {
    1000
}

fn default_breaker_window() -> usize {
    10
}

fn default_breaker_probes() -> u32 {
    3
}

fn default_max_in_flight() -> usize {
    5
}

impl TargetPolicy {
    fn with_breaker(ratio: f64, open_secs: u64) -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_backoff_ms: default_base_backoff_ms(),
            breaker_window: default_breaker_window(),
            breaker_failure_ratio: ratio,
            breaker_open_secs: open_secs,
            breaker_probes: default_breaker_probes(),
            max_in_flight: default_max_in_flight(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResilienceConfig {
    #[serde(default = "default_text_policy")]
    pub question_gen: TargetPolicy,
    #[serde(default = "default_media_policy")]
    pub tts: TargetPolicy,
    #[serde(default = "default_media_policy")]
    pub avatar: TargetPolicy,
    #[serde(default = "default_media_policy")]
    pub stt: TargetPolicy,
    #[serde(default = "default_feedback_policy")]
    pub feedback_gen: TargetPolicy,
}

fn default_text_policy() -> TargetPolicy {
    TargetPolicy::with_breaker(0.5, 30)
}

fn default_media_policy() -> TargetPolicy {
    TargetPolicy::with_breaker(0.3, 60)
}

fn default_feedback_policy() -> TargetPolicy {
    TargetPolicy::with_breaker(0.5, 60)
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            question_gen: default_text_policy(),
            tts: default_media_policy(),
            avatar: default_media_policy(),
            stt: default_media_policy(),
            feedback_gen: default_feedback_policy(),
        }
    }
}

// ── Pipeline ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Questions requested per interview.
    #[serde(default = "default_question_count")]
    pub question_count: usize,
    /// Fan-out bound: questions rendered concurrently per interview.
    #[serde(default = "default_max_concurrent_questions")]
    pub max_concurrent_questions: usize,
    /// Avatar render poll cadence and budget (3 s × 60 = 180 s deadline).
    #[serde(default = "default_poll_interval_secs")]
    pub avatar_poll_interval_secs: u64,
    #[serde(default = "default_poll_attempts")]
    pub avatar_poll_attempts: u32,
    /// Transcription poll cadence and budget.
    #[serde(default = "default_poll_interval_secs")]
    pub stt_poll_interval_secs: u64,
    #[serde(default = "default_poll_attempts")]
    pub stt_poll_attempts: u32,
}

fn default_question_count() -> usize {
    10
}

fn default_max_concurrent_questions() -> usize {
    5
}

fn default_poll_interval_secs() -> u64 {
    3
}

fn default_poll_attempts() -> u32 {
    60
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            question_count: default_question_count(),
            max_concurrent_questions: default_max_concurrent_questions(),
            avatar_poll_interval_secs: default_poll_interval_secs(),
            avatar_poll_attempts: default_poll_attempts(),
            stt_poll_interval_secs: default_poll_interval_secs(),
            stt_poll_attempts: default_poll_attempts(),
        }
    }
}

// ── Recovery sweeper ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryConfig {
    #[serde(default = "default_sweep_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_sweep_initial_delay_secs")]
    pub initial_delay_secs: u64,
    /// Deadline for GENERATING_VIDEOS before text-only rescue.
    #[serde(default = "default_video_timeout_secs")]
    pub video_timeout_secs: u64,
    /// Deadline for PROCESSING before the interview is failed.
    #[serde(default = "default_processing_timeout_secs")]
    pub processing_timeout_secs: u64,
}

fn default_sweep_interval_secs() -> u64 {
    300
}

fn default_sweep_initial_delay_secs() -> u64 {
    60
}

fn default_video_timeout_secs() -> u64 {
    900
}

fn default_processing_timeout_secs() -> u64 {
    1800
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_sweep_interval_secs(),
            initial_delay_secs: default_sweep_initial_delay_secs(),
            video_timeout_secs: default_video_timeout_secs(),
            processing_timeout_secs: default_processing_timeout_secs(),
        }
    }
}

fn default_true() -> bool {
    true
}

// ── Loading ───────────────────────────────────────────────────────

impl Config {
    /// Load from `path` (missing file means all defaults), apply env
    /// overrides, then validate secrets. Fails loudly on any missing
    /// secret; dev defaults exist only for non-secret fields.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let contents = fs::read_to_string(path)?;
            toml::from_str::<Config>(&contents)
                .map_err(|e| ConfigError::Load(format!("{}: {e}", path.display())))?
        } else {
            Config::default()
        };
        config.config_path = path.to_path_buf();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        override_from_env(&mut self.auth.token_secret, "GREENROOM_TOKEN_SECRET");
        override_from_env(&mut self.openai.api_key, "OPENAI_API_KEY");
        override_from_env(&mut self.tts.api_key, "ELEVENLABS_API_KEY");
        override_from_env(&mut self.avatar.api_key, "DID_API_KEY");
        override_from_env(&mut self.stt.api_key, "ASSEMBLYAI_API_KEY");
        override_from_env(&mut self.blobstore.access_key_id, "AWS_ACCESS_KEY_ID");
        override_from_env(&mut self.blobstore.secret_access_key, "AWS_SECRET_ACCESS_KEY");
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if is_unset(&self.auth.token_secret) {
            return Err(ConfigError::MissingSecret("auth.token_secret"));
        }
        if is_unset(&self.openai.api_key) {
            return Err(ConfigError::MissingSecret("openai.api_key"));
        }
        if is_unset(&self.tts.api_key) {
            return Err(ConfigError::MissingSecret("tts.api_key"));
        }
        if is_unset(&self.avatar.api_key) {
            return Err(ConfigError::MissingSecret("avatar.api_key"));
        }
        if is_unset(&self.stt.api_key) {
            return Err(ConfigError::MissingSecret("stt.api_key"));
        }
        if self.pipeline.question_count == 0 {
            return Err(ConfigError::Validation(
                "pipeline.question_count must be at least 1".into(),
            ));
        }
        for (name, policy) in self.resilience.iter() {
            if policy.max_attempts == 0 {
                return Err(ConfigError::Validation(format!(
                    "resilience.{name}.max_attempts must be at least 1"
                )));
            }
            if !(0.0..=1.0).contains(&policy.breaker_failure_ratio) {
                return Err(ConfigError::Validation(format!(
                    "resilience.{name}.breaker_failure_ratio must be within [0, 1]"
                )));
            }
        }
        Ok(())
    }

    /// Non-secret settings worth echoing at startup.
    pub fn startup_summary(&self) -> String {
        format!(
            "bind={}:{} db={} bucket={} region={} model={} questions={} sweep={}s",
            self.server.host,
            self.server.port,
            self.database.url,
            self.blobstore.bucket,
            self.blobstore.region,
            self.openai.model,
            self.pipeline.question_count,
            self.recovery.interval_secs,
        )
    }
}

impl ResilienceConfig {
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &TargetPolicy)> {
        [
            ("question_gen", &self.question_gen),
            ("tts", &self.tts),
            ("avatar", &self.avatar),
            ("stt", &self.stt),
            ("feedback_gen", &self.feedback_gen),
        ]
        .into_iter()
    }
}

fn override_from_env(slot: &mut Option<String>, var: &str) {
    if let Ok(value) = std::env::var(var) {
        let value = value.trim();
        if !value.is_empty() {
            *slot = Some(value.to_owned());
        }
    }
}

fn is_unset(slot: &Option<String>) -> bool {
    slot.as_deref().is_none_or(|s| s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_secrets(mut config: Config) -> Config {
        config.auth.token_secret = Some("test-secret".into());
        config.openai.api_key = Some("sk-test".into());
        config.tts.api_key = Some("el-test".into());
        config.avatar.api_key = Some("did-test".into());
        config.stt.api_key = Some("aai-test".into());
        config
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.presign.get_ttl_secs, 3600);
        assert_eq!(config.presign.put_ttl_secs, 900);
        assert_eq!(config.pipeline.question_count, 10);
        assert_eq!(config.recovery.video_timeout_secs, 900);
        assert_eq!(config.recovery.processing_timeout_secs, 1800);
        assert!((config.resilience.avatar.breaker_failure_ratio - 0.3).abs() < f64::EPSILON);
        assert!((config.resilience.question_gen.breaker_failure_ratio - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.resilience.avatar.breaker_open_secs, 60);
        assert_eq!(config.resilience.question_gen.breaker_open_secs, 30);
    }

    #[test]
    fn missing_secret_is_fatal() {
        let config = with_secrets(Config::default());
        assert!(config.validate().is_ok());

        let mut broken = config.clone();
        broken.auth.token_secret = None;
        assert!(matches!(
            broken.validate(),
            Err(ConfigError::MissingSecret("auth.token_secret"))
        ));

        let mut broken = config;
        broken.avatar.api_key = Some("   ".into());
        assert!(matches!(
            broken.validate(),
            Err(ConfigError::MissingSecret("avatar.api_key"))
        ));
    }

    #[test]
    fn toml_round_trip_keeps_overrides() {
        let toml = r#"
            [server]
            port = 9090

            [pipeline]
            question_count = 5

            [resilience.avatar]
            breaker_failure_ratio = 0.25
            breaker_open_secs = 120
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.pipeline.question_count, 5);
        assert!((config.resilience.avatar.breaker_failure_ratio - 0.25).abs() < f64::EPSILON);
        assert_eq!(config.resilience.avatar.breaker_open_secs, 120);
        // Untouched groups keep their defaults.
        assert_eq!(config.resilience.tts.breaker_open_secs, 60);
    }

    #[test]
    fn zero_attempts_rejected() {
        let mut config = with_secrets(Config::default());
        config.resilience.stt.max_attempts = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }
}
