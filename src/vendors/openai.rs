use super::http::{build_client, ensure_success};
use super::parse::{clamp_score, strip_code_fences};
use super::traits::{
    AnswerPair, FeedbackDraft, FeedbackGenerator, GeneratedQuestion, QuestionGenerator,
};
use crate::config::OpenAiConfig;
use crate::resilience::CallError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Chat-completions client used for both question generation and feedback
/// scoring. One HTTP client, two capability impls.
pub struct OpenAiClient {
    /// Pre-computed `"Bearer <key>"` header value (avoids `format!` per request).
    cached_auth_header: String,
    base_url: String,
    model: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawQuestion {
    #[serde(default)]
    question: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    difficulty: String,
}

#[derive(Debug, Deserialize)]
struct RawFeedback {
    #[serde(default)]
    score: i64,
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    weaknesses: Vec<String>,
    #[serde(default)]
    recommendations: Vec<String>,
    #[serde(default)]
    detailed_analysis: String,
}

impl OpenAiClient {
    pub fn new(config: &OpenAiConfig) -> Self {
        Self {
            cached_auth_header: format!("Bearer {}", config.api_key.as_deref().unwrap_or_default()),
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            model: config.model.clone(),
            client: build_client(120),
        }
    }

    async fn chat(&self, system: &str, user: String, temperature: f64) -> Result<String, CallError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system",
                    content: system.to_owned(),
                },
                Message {
                    role: "user",
                    content: user,
                },
            ],
            temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("authorization", &self.cached_auth_header)
            .json(&request)
            .send()
            .await
            .map_err(|e| CallError::from_reqwest(&e))?;
        let response = ensure_success(response).await?;

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| CallError::Fatal(format!("malformed chat response: {e}")))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| CallError::Fatal("chat response has no content".into()))
    }
}

fn parse_questions(raw: &str) -> Result<Vec<GeneratedQuestion>, CallError> {
    let items: Vec<RawQuestion> = serde_json::from_str(strip_code_fences(raw))
        .map_err(|e| CallError::Fatal(format!("malformed question list: {e}")))?;

    let questions: Vec<GeneratedQuestion> = items
        .into_iter()
        .filter_map(|item| {
            let text = item.question.trim().to_owned();
            if text.is_empty() {
                return None;
            }
            // Vendor casing varies; normalize and drop unknown values.
            let category = item.category.trim().parse().ok()?;
            let difficulty = item.difficulty.trim().parse().ok()?;
            Some(GeneratedQuestion {
                text,
                category,
                difficulty,
            })
        })
        .collect();

    if questions.is_empty() {
        return Err(CallError::Fatal("no valid questions in response".into()));
    }
    Ok(questions)
}

fn parse_feedback(raw: &str) -> Result<FeedbackDraft, CallError> {
    let parsed: RawFeedback = serde_json::from_str(strip_code_fences(raw))
        .map_err(|e| CallError::Fatal(format!("malformed feedback: {e}")))?;
    Ok(FeedbackDraft {
        overall_score: clamp_score(parsed.score),
        strengths: parsed.strengths,
        weaknesses: parsed.weaknesses,
        recommendations: parsed.recommendations,
        detailed_analysis: parsed.detailed_analysis,
    })
}

const QUESTION_SYSTEM_PROMPT: &str = "You generate mock-interview questions. \
Respond with a JSON array only; each item has the fields \"question\", \
\"category\" (TECHNICAL, BEHAVIORAL or SITUATIONAL) and \"difficulty\" \
(EASY, MEDIUM or HARD). No prose around the JSON.";

const FEEDBACK_SYSTEM_PROMPT: &str = "You score a finished mock interview. \
Respond with a JSON object only, with fields \"score\" (integer 0-100), \
\"strengths\", \"weaknesses\", \"recommendations\" (arrays of strings) and \
\"detailed_analysis\" (string). No prose around the JSON.";

#[async_trait]
impl QuestionGenerator for OpenAiClient {
    async fn generate(
        &self,
        resume_text: &str,
        role_title: &str,
        count: usize,
    ) -> Result<Vec<GeneratedQuestion>, CallError> {
        let user = format!(
            "Generate {count} interview questions for a candidate applying as \
             \"{role_title}\".\n\nResume:\n{resume_text}"
        );
        let content = self.chat(QUESTION_SYSTEM_PROMPT, user, 0.7).await?;
        parse_questions(&content)
    }
}

#[async_trait]
impl FeedbackGenerator for OpenAiClient {
    async fn generate(&self, answers: &[AnswerPair]) -> Result<FeedbackDraft, CallError> {
        let mut transcript = String::new();
        for (idx, pair) in answers.iter().enumerate() {
            transcript.push_str(&format!(
                "Q{}: {}\nA{}: {}\n\n",
                idx + 1,
                pair.question,
                idx + 1,
                pair.answer
            ));
        }
        let user = format!("Evaluate this interview transcript:\n\n{transcript}");
        let content = self.chat(FEEDBACK_SYSTEM_PROMPT, user, 0.3).await?;
        parse_feedback(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{QuestionCategory, QuestionDifficulty};

    #[test]
    fn parses_well_formed_question_list() {
        let raw = r#"[
            {"question": "Explain ownership in Rust.", "category": "technical", "difficulty": "medium"},
            {"question": "Describe a conflict you resolved.", "category": "BEHAVIORAL", "difficulty": "easy"}
        ]"#;
        let questions = parse_questions(raw).unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].category, QuestionCategory::Technical);
        assert_eq!(questions[1].difficulty, QuestionDifficulty::Easy);
    }

    #[test]
    fn filters_invalid_items() {
        let raw = r#"[
            {"question": "", "category": "technical", "difficulty": "medium"},
            {"question": "ok?", "category": "nonsense", "difficulty": "medium"},
            {"question": "Valid one", "category": "situational", "difficulty": "hard"}
        ]"#;
        let questions = parse_questions(raw).unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].text, "Valid one");
    }

    #[test]
    fn all_invalid_items_fail() {
        let raw = r#"[{"question": "", "category": "", "difficulty": ""}]"#;
        assert!(matches!(parse_questions(raw), Err(CallError::Fatal(_))));
    }

    #[test]
    fn fenced_question_list_parses() {
        let raw = "```json\n[{\"question\": \"Q\", \"category\": \"technical\", \"difficulty\": \"easy\"}]\n```";
        assert_eq!(parse_questions(raw).unwrap().len(), 1);
    }

    #[test]
    fn feedback_clamps_and_defaults() {
        let raw = r#"{"score": 140, "strengths": ["clear"], "detailed_analysis": "solid"}"#;
        let feedback = parse_feedback(raw).unwrap();
        assert_eq!(feedback.overall_score, 100);
        assert_eq!(feedback.strengths, vec!["clear".to_string()]);
        assert!(feedback.weaknesses.is_empty());
        assert!(feedback.recommendations.is_empty());
    }

    #[test]
    fn malformed_feedback_is_fatal() {
        assert!(matches!(parse_feedback("not json"), Err(CallError::Fatal(_))));
    }
}
