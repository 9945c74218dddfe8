//! Object key layout.
//!
//! Entity rows store these keys verbatim; presigned URLs are minted from
//! them on demand and never persisted.

use chrono::Utc;

/// `interviews/{user}/{interview}/response_{question}_{epochMillis}.webm`
pub fn response_key(user_id: &str, interview_id: &str, question_id: &str) -> String {
    format!(
        "interviews/{user_id}/{interview_id}/response_{question_id}_{}.webm",
        Utc::now().timestamp_millis()
    )
}

/// `resumes/{user}/resume_{epochMillis}{ext}` with ext ∈ {.pdf, .docx}.
pub fn resume_key(user_id: &str, ext: &str) -> String {
    let ext = match ext {
        ".docx" => ".docx",
        _ => ".pdf",
    };
    format!("resumes/{user_id}/resume_{}{ext}", Utc::now().timestamp_millis())
}

/// `tts/question_{question}_{epochMillis}.mp3`
pub fn tts_audio_key(question_id: &str) -> String {
    format!("tts/question_{question_id}_{}.mp3", Utc::now().timestamp_millis())
}

/// `avatar-videos/question_{question}_{epochMillis}.mp4`
pub fn avatar_video_key(question_id: &str) -> String {
    format!(
        "avatar-videos/question_{question_id}_{}.mp4",
        Utc::now().timestamp_millis()
    )
}

/// `avatar-cache/{sha256-fingerprint}.mp4`
pub fn avatar_cache_key(fingerprint: &str) -> String {
    format!("avatar-cache/{fingerprint}.mp4")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_key_shape() {
        let key = response_key("u1", "i2", "q3");
        assert!(key.starts_with("interviews/u1/i2/response_q3_"));
        assert!(key.ends_with(".webm"));
    }

    #[test]
    fn resume_key_defaults_unknown_extensions_to_pdf() {
        assert!(resume_key("u1", ".docx").ends_with(".docx"));
        assert!(resume_key("u1", ".pdf").ends_with(".pdf"));
        assert!(resume_key("u1", ".exe").ends_with(".pdf"));
        assert!(resume_key("u1", "").ends_with(".pdf"));
    }

    #[test]
    fn cache_key_is_deterministic() {
        assert_eq!(avatar_cache_key("abc123"), "avatar-cache/abc123.mp4");
    }

    #[test]
    fn media_keys_carry_question_id() {
        assert!(tts_audio_key("q9").starts_with("tts/question_q9_"));
        assert!(avatar_video_key("q9").starts_with("avatar-videos/question_q9_"));
    }
}
