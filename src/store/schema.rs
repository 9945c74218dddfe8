use anyhow::Context;
use sqlx::SqlitePool;

/// DDL for collaborator tables the core reads but never mutates.
const CREATE_COLLABORATOR_TABLES: &str = "
CREATE TABLE IF NOT EXISTS users (
    id         TEXT PRIMARY KEY,
    email      TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS resumes (
    id         TEXT PRIMARY KEY,
    user_id    TEXT NOT NULL,
    content    TEXT NOT NULL,
    file_key   TEXT,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_resumes_user ON resumes(user_id);

CREATE TABLE IF NOT EXISTS job_roles (
    id          TEXT PRIMARY KEY,
    title       TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT ''
);
";

/// DDL for the interview aggregate.
const CREATE_INTERVIEW_TABLES: &str = "
CREATE TABLE IF NOT EXISTS interviews (
    id             TEXT PRIMARY KEY,
    user_id        TEXT NOT NULL,
    resume_id      TEXT NOT NULL,
    job_role_id    TEXT NOT NULL,
    status         TEXT NOT NULL,
    interview_type TEXT NOT NULL DEFAULT 'standard',
    overall_score  INTEGER,
    created_at     TEXT NOT NULL,
    completed_at   TEXT
);
CREATE INDEX IF NOT EXISTS idx_interviews_user   ON interviews(user_id);
CREATE INDEX IF NOT EXISTS idx_interviews_status ON interviews(status);

CREATE TABLE IF NOT EXISTS questions (
    id            TEXT PRIMARY KEY,
    interview_id  TEXT NOT NULL,
    ordinal       INTEGER NOT NULL,
    question_text TEXT NOT NULL,
    category      TEXT NOT NULL,
    difficulty    TEXT NOT NULL,
    avatar_key    TEXT,
    created_at    TEXT NOT NULL,
    UNIQUE(interview_id, ordinal)
);
CREATE INDEX IF NOT EXISTS idx_questions_interview ON questions(interview_id);

CREATE TABLE IF NOT EXISTS responses (
    id                    TEXT PRIMARY KEY,
    question_id           TEXT NOT NULL UNIQUE,
    interview_id          TEXT NOT NULL,
    user_id               TEXT NOT NULL,
    video_key             TEXT NOT NULL,
    transcript            TEXT,
    transcript_confidence REAL,
    duration_secs         REAL,
    created_at            TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_responses_interview ON responses(interview_id);

CREATE TABLE IF NOT EXISTS feedback (
    id                TEXT PRIMARY KEY,
    interview_id      TEXT NOT NULL UNIQUE,
    user_id           TEXT NOT NULL,
    overall_score     INTEGER NOT NULL,
    strengths         TEXT NOT NULL,
    weaknesses        TEXT NOT NULL,
    recommendations   TEXT NOT NULL,
    detailed_analysis TEXT NOT NULL,
    generated_at      TEXT NOT NULL
);
";

/// DDL for the content-addressed media caches. Rows are append-only; only
/// the avatar cache carries an optional expiry.
const CREATE_CACHE_TABLES: &str = "
CREATE TABLE IF NOT EXISTS tts_audio_cache (
    cache_key  TEXT PRIMARY KEY,
    audio_key  TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS avatar_video_cache (
    cache_key  TEXT PRIMARY KEY,
    video_key  TEXT NOT NULL,
    created_at TEXT NOT NULL,
    expires_at TEXT
);
";

pub(super) async fn init_schema(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::raw_sql(CREATE_COLLABORATOR_TABLES)
        .execute(pool)
        .await
        .context("create collaborator tables")?;
    sqlx::raw_sql(CREATE_INTERVIEW_TABLES)
        .execute(pool)
        .await
        .context("create interview tables")?;
    sqlx::raw_sql(CREATE_CACHE_TABLES)
        .execute(pool)
        .await
        .context("create cache tables")?;
    Ok(())
}
