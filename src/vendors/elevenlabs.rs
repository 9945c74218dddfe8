use super::http::{build_client, ensure_success};
use super::traits::TextToSpeech;
use crate::config::TtsConfig;
use crate::domain::VoiceProfile;
use crate::resilience::CallError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

pub struct ElevenLabsClient {
    api_key: String,
    base_url: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

#[derive(Debug, Serialize)]
struct VoiceSettings {
    stability: f64,
    similarity_boost: f64,
}

impl ElevenLabsClient {
    pub fn new(config: &TtsConfig) -> Self {
        Self {
            api_key: config.api_key.clone().unwrap_or_default(),
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            client: build_client(120),
        }
    }
}

#[async_trait]
impl TextToSpeech for ElevenLabsClient {
    async fn synthesize(&self, text: &str, voice: &VoiceProfile) -> Result<Vec<u8>, CallError> {
        let request = SynthesisRequest {
            text,
            model_id: &voice.model_id,
            voice_settings: VoiceSettings {
                stability: voice.stability,
                similarity_boost: voice.similarity_boost,
            },
        };

        let response = self
            .client
            .post(format!(
                "{}/v1/text-to-speech/{}",
                self.base_url, voice.voice_id
            ))
            .header("xi-api-key", &self.api_key)
            .header("accept", "audio/mpeg")
            .json(&request)
            .send()
            .await
            .map_err(|e| CallError::from_reqwest(&e))?;
        let response = ensure_success(response).await?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| CallError::Transport(e.to_string()))?;
        if bytes.is_empty() {
            return Err(CallError::Fatal("vendor returned empty audio".into()));
        }
        Ok(bytes.to_vec())
    }
}
