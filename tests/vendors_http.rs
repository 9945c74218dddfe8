//! Vendor adapters against wiremock HTTP stubs.

use greenroom::config::{AvatarConfig, OpenAiConfig, SttConfig, TtsConfig};
use greenroom::domain::VoiceProfile;
use greenroom::resilience::CallError;
use greenroom::vendors::{
    AnswerPair, AssemblyAiClient, AvatarVideo, DidClient, ElevenLabsClient, FeedbackGenerator,
    OpenAiClient, QuestionGenerator, SpeechToText, SttStatus, TalkStatus, TextToSpeech,
};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn voice() -> VoiceProfile {
    VoiceProfile {
        voice_id: "voice-1".into(),
        model_id: "model-1".into(),
        stability: 0.5,
        similarity_boost: 0.75,
    }
}

fn openai_config(base_url: String) -> OpenAiConfig {
    OpenAiConfig {
        api_key: Some("sk-test".into()),
        base_url,
        model: "gpt-4o-mini".into(),
    }
}

fn chat_body(content: &str) -> serde_json::Value {
    serde_json::json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }]
    })
}

#[tokio::test]
async fn question_generator_parses_fenced_json() {
    let server = MockServer::start().await;
    let content = "```json\n[\
        {\"question\": \"Explain backpressure.\", \"category\": \"technical\", \"difficulty\": \"hard\"},\
        {\"question\": \"Describe a team conflict.\", \"category\": \"behavioral\", \"difficulty\": \"medium\"}\
    ]\n```";
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(serde_json::json!({ "model": "gpt-4o-mini" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body(content)))
        .expect(1)
        .mount(&server)
        .await;

    let client = OpenAiClient::new(&openai_config(server.uri()));
    let questions = QuestionGenerator::generate(&client, "resume text", "Software Engineer", 2)
        .await
        .unwrap();
    assert_eq!(questions.len(), 2);
    assert_eq!(questions[0].text, "Explain backpressure.");
}

#[tokio::test]
async fn question_generator_maps_http_status_for_the_retrier() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = OpenAiClient::new(&openai_config(server.uri()));
    let err = QuestionGenerator::generate(&client, "resume", "role", 5)
        .await
        .unwrap_err();
    assert!(matches!(err, CallError::Status { code: 503, .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn feedback_generator_round_trips() {
    let server = MockServer::start().await;
    let content = r#"{"score": 78, "strengths": ["a", "b", "c"], "weaknesses": ["x"],
        "recommendations": [], "detailed_analysis": "good"}"#;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body(content)))
        .mount(&server)
        .await;

    let client = OpenAiClient::new(&openai_config(server.uri()));
    let draft = FeedbackGenerator::generate(
        &client,
        &[AnswerPair {
            question: "Q1".into(),
            answer: "A1".into(),
        }],
    )
    .await
    .unwrap();
    assert_eq!(draft.overall_score, 78);
    assert_eq!(draft.strengths.len(), 3);
    assert!(draft.recommendations.is_empty());
}

#[tokio::test]
async fn tts_posts_voice_settings_and_returns_audio() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/text-to-speech/voice-1"))
        .and(header("xi-api-key", "el-test"))
        .and(body_partial_json(serde_json::json!({
            "model_id": "model-1",
            "voice_settings": { "stability": 0.5, "similarity_boost": 0.75 },
        })))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ID3mp3data".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let client = ElevenLabsClient::new(&TtsConfig {
        api_key: Some("el-test".into()),
        base_url: server.uri(),
    });
    let audio = client.synthesize("Say this", &voice()).await.unwrap();
    assert_eq!(audio, b"ID3mp3data");
}

#[tokio::test]
async fn avatar_create_then_poll_to_done() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/talks"))
        .and(body_partial_json(serde_json::json!({
            "script": { "type": "audio", "audio_url": "https://signed/audio.mp3" },
            "source_url": "https://cdn/portrait.png",
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({ "id": "tlk_1" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/talks/tlk_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "done",
            "result_url": "https://cdn/result.mp4",
        })))
        .mount(&server)
        .await;

    let client = DidClient::new(&AvatarConfig {
        api_key: Some("did-test".into()),
        base_url: server.uri(),
        portrait_url: "https://cdn/portrait.png".into(),
        pad_audio_secs: 0.5,
        fluent: true,
    });

    let job_id = client
        .create_talk("https://signed/audio.mp3", "https://cdn/portrait.png", 0.5, true)
        .await
        .unwrap();
    assert_eq!(job_id, "tlk_1");
    let status = client.poll_talk(&job_id).await.unwrap();
    assert_eq!(
        status,
        TalkStatus::Done {
            result_url: "https://cdn/result.mp4".into()
        }
    );
}

#[tokio::test]
async fn stt_submit_and_poll() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/transcript"))
        .and(header("authorization", "aai-test"))
        .and(body_partial_json(serde_json::json!({
            "audio_url": "https://signed/answer.webm",
            "language_code": "en",
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "id": "tr_1", "status": "queued" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/transcript/tr_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "tr_1",
            "status": "completed",
            "text": "I shipped the project.",
            "confidence": 0.87,
        })))
        .mount(&server)
        .await;

    let client = AssemblyAiClient::new(&SttConfig {
        api_key: Some("aai-test".into()),
        base_url: server.uri(),
    });
    let job_id = client.submit("https://signed/answer.webm", "en").await.unwrap();
    let status = client.poll(&job_id).await.unwrap();
    assert_eq!(
        status,
        SttStatus::Completed {
            text: "I shipped the project.".into(),
            confidence: Some(0.87)
        }
    );
}
