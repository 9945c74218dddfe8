use super::http::{build_client, ensure_success};
use super::traits::{AvatarVideo, TalkStatus};
use crate::config::AvatarConfig;
use crate::resilience::CallError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Talking-head rendering over the two-step talks API: create a job, then
/// poll it until the vendor publishes a result URL.
pub struct DidClient {
    auth_header: String,
    base_url: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct CreateTalkRequest<'a> {
    script: TalkScript<'a>,
    source_url: &'a str,
    config: TalkConfig,
}

#[derive(Debug, Serialize)]
struct TalkScript<'a> {
    r#type: &'static str,
    audio_url: &'a str,
}

#[derive(Debug, Serialize)]
struct TalkConfig {
    fluent: bool,
    pad_audio: f64,
}

#[derive(Debug, Deserialize)]
struct CreateTalkResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct TalkStatusResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    result_url: Option<String>,
    #[serde(default)]
    error: Option<TalkError>,
}

#[derive(Debug, Deserialize)]
struct TalkError {
    #[serde(default)]
    description: String,
}

impl DidClient {
    pub fn new(config: &AvatarConfig) -> Self {
        Self {
            auth_header: format!("Basic {}", config.api_key.as_deref().unwrap_or_default()),
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            client: build_client(120),
        }
    }
}

fn map_status(response: TalkStatusResponse) -> TalkStatus {
    match response.status.as_str() {
        "done" => match response.result_url {
            Some(result_url) => TalkStatus::Done { result_url },
            None => TalkStatus::Error {
                message: "job done but no result URL".into(),
            },
        },
        "error" | "rejected" => TalkStatus::Error {
            message: response
                .error
                .map(|e| e.description)
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| "render failed".into()),
        },
        "started" | "processing" => TalkStatus::Processing,
        // "created" plus anything unrecognized: keep waiting.
        _ => TalkStatus::Queued,
    }
}

#[async_trait]
impl AvatarVideo for DidClient {
    async fn create_talk(
        &self,
        audio_url: &str,
        portrait_url: &str,
        pad_audio_secs: f64,
        fluent: bool,
    ) -> Result<String, CallError> {
        let request = CreateTalkRequest {
            script: TalkScript {
                r#type: "audio",
                audio_url,
            },
            source_url: portrait_url,
            config: TalkConfig {
                fluent,
                pad_audio: pad_audio_secs,
            },
        };

        let response = self
            .client
            .post(format!("{}/talks", self.base_url))
            .header("authorization", &self.auth_header)
            .json(&request)
            .send()
            .await
            .map_err(|e| CallError::from_reqwest(&e))?;
        let response = ensure_success(response).await?;

        let parsed: CreateTalkResponse = response
            .json()
            .await
            .map_err(|e| CallError::Fatal(format!("malformed create-talk response: {e}")))?;
        Ok(parsed.id)
    }

    async fn poll_talk(&self, job_id: &str) -> Result<TalkStatus, CallError> {
        let response = self
            .client
            .get(format!("{}/talks/{job_id}", self.base_url))
            .header("authorization", &self.auth_header)
            .send()
            .await
            .map_err(|e| CallError::from_reqwest(&e))?;
        let response = ensure_success(response).await?;

        let parsed: TalkStatusResponse = response
            .json()
            .await
            .map_err(|e| CallError::Fatal(format!("malformed talk status: {e}")))?;
        Ok(map_status(parsed))
    }

    async fn fetch_video(&self, result_url: &str) -> Result<Vec<u8>, CallError> {
        let response = self
            .client
            .get(result_url)
            .send()
            .await
            .map_err(|e| CallError::from_reqwest(&e))?;
        let response = ensure_success(response).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| CallError::Transport(e.to_string()))?;
        if bytes.is_empty() {
            return Err(CallError::Fatal("vendor returned empty video".into()));
        }
        Ok(bytes.to_vec())
    }
}
