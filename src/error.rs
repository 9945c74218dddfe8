use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `greenroom`.
///
/// Each subsystem defines its own error variant. The gateway maps these to
/// HTTP status codes at the boundary; internal code continues to use
/// `anyhow::Result` for ad-hoc context chains during bootstrap.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Domain invariants ───────────────────────────────────────────────
    #[error("domain: {0}")]
    Domain(#[from] DomainError),

    // ── External vendors (question-gen, TTS, avatar, STT, feedback-gen) ─
    #[error("vendor: {0}")]
    Vendor(#[from] VendorError),

    // ── Blob store ──────────────────────────────────────────────────────
    #[error("blob store: {0}")]
    Blob(#[from] BlobError),

    // ── Async job deadlines ─────────────────────────────────────────────
    #[error("timeout waiting for {stage}")]
    Timeout { stage: &'static str },

    // ── Database ────────────────────────────────────────────────────────
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("missing required secret: {0}")]
    MissingSecret(&'static str),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Domain errors ──────────────────────────────────────────────────────────

/// Violations of interview-lifecycle invariants.
///
/// `NotFound` deliberately covers both "no such row" and "row owned by
/// someone else" so the API cannot be used to enumerate other users' ids.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    #[error("illegal transition from {from} to {to}")]
    IllegalState { from: String, to: String },

    #[error("{entity} already exists")]
    Duplicate { entity: &'static str },

    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("no uploaded object found at {key}")]
    UploadNotFound { key: String },
}

// ─── Vendor errors ──────────────────────────────────────────────────────────

/// The five external AI capabilities, as resilience targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VendorTarget {
    QuestionGen,
    Tts,
    Avatar,
    Stt,
    FeedbackGen,
}

impl VendorTarget {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::QuestionGen => "question-gen",
            Self::Tts => "tts",
            Self::Avatar => "avatar",
            Self::Stt => "stt",
            Self::FeedbackGen => "feedback-gen",
        }
    }
}

impl std::fmt::Display for VendorTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a wrapped vendor call ultimately failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Retry budget spent on transient failures.
    Exhausted,
    /// Rejected fast by an open circuit breaker.
    Open,
    /// A 4xx-class response that retrying cannot fix.
    NonRetryable,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Exhausted => "exhausted",
            Self::Open => "open",
            Self::NonRetryable => "non-retryable",
        })
    }
}

#[derive(Debug, Error)]
#[error("{target} failed ({kind}): {message}")]
pub struct VendorError {
    pub target: VendorTarget,
    pub kind: FailureKind,
    pub message: String,
}

// ─── Blob store errors ──────────────────────────────────────────────────────

#[derive(Debug, Error)]
#[error("{op} {key}: {message}")]
pub struct BlobError {
    pub op: &'static str,
    pub key: String,
    pub message: String,
}

impl BlobError {
    pub fn new(op: &'static str, key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            op,
            key: key.into(),
            message: message.into(),
        }
    }
}

// ─── Convenience constructors ───────────────────────────────────────────────

impl CoreError {
    pub fn not_found(entity: &'static str) -> Self {
        Self::Domain(DomainError::NotFound { entity })
    }

    pub fn duplicate(entity: &'static str) -> Self {
        Self::Domain(DomainError::Duplicate { entity })
    }

    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Domain(DomainError::Validation {
            field,
            reason: reason.into(),
        })
    }

    pub fn illegal_state(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::Domain(DomainError::IllegalState {
            from: from.into(),
            to: to.into(),
        })
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
