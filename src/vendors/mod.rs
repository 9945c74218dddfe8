//! External AI vendor adapters.
//!
//! Each vendor is a thin request/response client behind a capability trait;
//! the resilience layer and pipelines only ever see the traits. Responses
//! are parsed defensively: fenced JSON is unwrapped, out-of-range scores
//! are clamped, missing list fields default to empty.

mod assemblyai;
mod did;
mod elevenlabs;
mod http;
mod openai;
mod parse;
pub mod traits;

pub use assemblyai::AssemblyAiClient;
pub use did::DidClient;
pub use elevenlabs::ElevenLabsClient;
pub use openai::OpenAiClient;
pub use traits::{
    AnswerPair, AvatarVideo, FeedbackDraft, FeedbackGenerator, GeneratedQuestion,
    QuestionGenerator, SpeechToText, SttStatus, TalkStatus, TextToSpeech,
};
