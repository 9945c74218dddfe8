use super::http::{build_client, ensure_success};
use super::traits::{SpeechToText, SttStatus};
use crate::config::SttConfig;
use crate::resilience::CallError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub struct AssemblyAiClient {
    api_key: String,
    base_url: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct SubmitRequest<'a> {
    audio_url: &'a str,
    language_code: &'a str,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct TranscriptResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    error: Option<String>,
}

impl AssemblyAiClient {
    pub fn new(config: &SttConfig) -> Self {
        Self {
            api_key: config.api_key.clone().unwrap_or_default(),
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            client: build_client(60),
        }
    }
}

fn map_status(response: TranscriptResponse) -> SttStatus {
    match response.status.as_str() {
        "completed" => SttStatus::Completed {
            text: response.text.unwrap_or_default(),
            confidence: response.confidence,
        },
        "error" => SttStatus::Error {
            message: response.error.unwrap_or_else(|| "transcription failed".into()),
        },
        "processing" => SttStatus::Processing,
        _ => SttStatus::Queued,
    }
}

#[async_trait]
impl SpeechToText for AssemblyAiClient {
    async fn submit(&self, audio_url: &str, language_code: &str) -> Result<String, CallError> {
        let response = self
            .client
            .post(format!("{}/v2/transcript", self.base_url))
            .header("authorization", &self.api_key)
            .json(&SubmitRequest {
                audio_url,
                language_code,
            })
            .send()
            .await
            .map_err(|e| CallError::from_reqwest(&e))?;
        let response = ensure_success(response).await?;

        let parsed: SubmitResponse = response
            .json()
            .await
            .map_err(|e| CallError::Fatal(format!("malformed transcript submission: {e}")))?;
        Ok(parsed.id)
    }

    async fn poll(&self, job_id: &str) -> Result<SttStatus, CallError> {
        let response = self
            .client
            .get(format!("{}/v2/transcript/{job_id}", self.base_url))
            .header("authorization", &self.api_key)
            .send()
            .await
            .map_err(|e| CallError::from_reqwest(&e))?;
        let response = ensure_success(response).await?;

        let parsed: TranscriptResponse = response
            .json()
            .await
            .map_err(|e| CallError::Fatal(format!("malformed transcript status: {e}")))?;
        Ok(map_status(parsed))
    }
}
