//! Deterministic media fingerprints.
//!
//! Equal inputs must produce equal keys across processes and restarts, so
//! every field that influences the rendered artifact participates and the
//! text goes through one canonical normalization.

use crate::domain::VoiceProfile;
use sha2::{Digest, Sha256};

/// Lowercase, trim, collapse runs of whitespace (tabs and newlines
/// included) to single spaces.
pub fn normalize(text: &str) -> String {
    text.to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cache key for a rendered avatar video: everything that shapes the
/// output: the spoken text, the voice, the portrait.
pub fn avatar_fingerprint(text: &str, voice: &VoiceProfile, portrait_url: &str) -> String {
    digest(&[
        &normalize(text),
        &voice.voice_id,
        &voice.model_id,
        &voice.stability.to_string(),
        &voice.similarity_boost.to_string(),
        portrait_url,
    ])
}

/// Cache key for synthesized speech: same rules, minus the portrait.
pub fn tts_fingerprint(text: &str, voice: &VoiceProfile) -> String {
    digest(&[
        &normalize(text),
        &voice.voice_id,
        &voice.model_id,
        &voice.stability.to_string(),
        &voice.similarity_boost.to_string(),
    ])
}

fn digest(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for (idx, part) in parts.iter().enumerate() {
        if idx > 0 {
            hasher.update(b"|");
        }
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voice() -> VoiceProfile {
        VoiceProfile {
            voice_id: "21m00Tcm4TlvDq8ikWAM".into(),
            model_id: "eleven_monolingual_v1".into(),
            stability: 0.5,
            similarity_boost: 0.75,
        }
    }

    #[test]
    fn normalize_canonicalizes_whitespace_and_case() {
        assert_eq!(normalize("  Tell me\tabout  Rust\n"), "tell me about rust");
        assert_eq!(normalize("tell me about rust"), "tell me about rust");
    }

    #[test]
    fn fingerprint_ignores_casing_and_padding() {
        let text = "tell me about your last project";
        let noisy = format!("  {}\t", text.to_uppercase());
        assert_eq!(
            avatar_fingerprint(text, &voice(), "https://cdn/p.png"),
            avatar_fingerprint(&noisy, &voice(), "https://cdn/p.png"),
        );
        assert_eq!(tts_fingerprint(text, &voice()), tts_fingerprint(&noisy, &voice()));
    }

    #[test]
    fn fingerprint_is_sensitive_to_every_input() {
        let base = avatar_fingerprint("q", &voice(), "https://cdn/p.png");
        assert_ne!(base, avatar_fingerprint("other q", &voice(), "https://cdn/p.png"));
        assert_ne!(base, avatar_fingerprint("q", &voice(), "https://cdn/other.png"));

        let mut other_voice = voice();
        other_voice.stability = 0.6;
        assert_ne!(base, avatar_fingerprint("q", &other_voice, "https://cdn/p.png"));
    }

    #[test]
    fn fingerprint_is_hex_sha256() {
        let fp = tts_fingerprint("q", &voice());
        assert_eq!(fp.len(), 64);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
