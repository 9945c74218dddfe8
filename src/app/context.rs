use crate::blobstore::BlobStore;
use crate::config::Config;
use crate::domain::VoiceProfile;
use crate::error::CoreResult;
use crate::events::EventBus;
use crate::notify::ProgressHub;
use crate::resilience::Shields;
use crate::store::Store;
use crate::vendors::{
    AvatarVideo, FeedbackGenerator, QuestionGenerator, SpeechToText, TextToSpeech,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::task::TaskTracker;

/// Everything the orchestration core needs, wired once at the composition
/// root and passed around explicitly; no ambient globals.
pub struct AppContext {
    pub config: Config,
    pub store: Store,
    pub blobs: Arc<dyn BlobStore>,
    pub question_gen: Arc<dyn QuestionGenerator>,
    pub tts: Arc<dyn TextToSpeech>,
    pub avatar: Arc<dyn AvatarVideo>,
    pub stt: Arc<dyn SpeechToText>,
    pub feedback_gen: Arc<dyn FeedbackGenerator>,
    pub shields: Shields,
    pub bus: EventBus,
    pub hub: ProgressHub,
    pub voice: VoiceProfile,
    /// Background pipeline tasks register here so shutdown can grant them
    /// a grace window before the process exits.
    pub tracker: TaskTracker,
}

impl AppContext {
    /// Presigned GET for a stored media key, with the configured TTL.
    pub fn presign_get(&self, key: &str) -> CoreResult<String> {
        Ok(self
            .blobs
            .presign_get(key, Duration::from_secs(self.config.presign.get_ttl_secs))?)
    }

    /// Presigned GET long enough for a render vendor to fetch the input;
    /// never shorter than an hour regardless of the configured DTO TTL.
    pub fn presign_get_for_vendor(&self, key: &str) -> CoreResult<String> {
        let ttl = self.config.presign.get_ttl_secs.max(3600);
        Ok(self.blobs.presign_get(key, Duration::from_secs(ttl))?)
    }

    pub fn presign_put(&self, key: &str, content_type: &str) -> CoreResult<String> {
        Ok(self.blobs.presign_put(
            key,
            content_type,
            Duration::from_secs(self.config.presign.put_ttl_secs),
        )?)
    }
}
