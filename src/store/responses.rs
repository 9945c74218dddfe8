use super::codec::{str_to_ts, ts_to_str};
use super::Store;
use crate::domain::Response;
use crate::error::{CoreError, CoreResult};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

fn map_response(row: &SqliteRow) -> Result<Response, sqlx::Error> {
    let created_at: String = row.try_get("created_at")?;
    Ok(Response {
        id: row.try_get("id")?,
        question_id: row.try_get("question_id")?,
        interview_id: row.try_get("interview_id")?,
        user_id: row.try_get("user_id")?,
        video_key: row.try_get("video_key")?,
        transcript: row.try_get("transcript")?,
        transcript_confidence: row.try_get("transcript_confidence")?,
        duration_secs: row.try_get("duration_secs")?,
        created_at: str_to_ts(&created_at)?,
    })
}

const SELECT_RESPONSE: &str = "SELECT id, question_id, interview_id, user_id, video_key, \
     transcript, transcript_confidence, duration_secs, created_at FROM responses";

/// One (question, answer) pair for the feedback prompt.
#[derive(Debug, Clone)]
pub struct AnsweredQuestion {
    pub question_text: String,
    pub transcript: Option<String>,
}

impl Store {
    /// The UNIQUE(question_id) constraint is the duplicate guard: a second
    /// confirm for the same question surfaces as `Duplicate`.
    pub async fn insert_response(&self, response: &Response) -> CoreResult<()> {
        let result = sqlx::query(
            "INSERT INTO responses \
             (id, question_id, interview_id, user_id, video_key, transcript, \
              transcript_confidence, duration_secs, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(&response.id)
        .bind(&response.question_id)
        .bind(&response.interview_id)
        .bind(&response.user_id)
        .bind(&response.video_key)
        .bind(&response.transcript)
        .bind(response.transcript_confidence)
        .bind(response.duration_secs)
        .bind(ts_to_str(response.created_at))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(CoreError::duplicate("response"))
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn get_response_for_question(
        &self,
        question_id: &str,
    ) -> CoreResult<Option<Response>> {
        let row = sqlx::query(&format!("{SELECT_RESPONSE} WHERE question_id = ?1"))
            .bind(question_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(map_response).transpose().map_err(Into::into)
    }

    /// Transcription is monotonic: once set it is never cleared, so the
    /// guard keeps a late poll result from clobbering an earlier one.
    pub async fn set_response_transcript(
        &self,
        response_id: &str,
        transcript: &str,
        confidence: Option<f64>,
    ) -> CoreResult<bool> {
        let result = sqlx::query(
            "UPDATE responses SET transcript = ?1, transcript_confidence = ?2 \
             WHERE id = ?3 AND transcript IS NULL",
        )
        .bind(transcript)
        .bind(confidence)
        .bind(response_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Questions with their transcripts, interview order, for the feedback
    /// prompt. Unanswered questions come back with `transcript: None`.
    pub async fn list_answered_questions(
        &self,
        interview_id: &str,
    ) -> CoreResult<Vec<AnsweredQuestion>> {
        let rows = sqlx::query(
            "SELECT q.question_text AS question_text, r.transcript AS transcript \
             FROM questions q \
             LEFT JOIN responses r ON r.question_id = q.id \
             WHERE q.interview_id = ?1 \
             ORDER BY q.ordinal",
        )
        .bind(interview_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(AnsweredQuestion {
                    question_text: row.try_get("question_text")?,
                    transcript: row.try_get("transcript")?,
                })
            })
            .collect::<Result<_, sqlx::Error>>()
            .map_err(Into::into)
    }

    /// Question ids that already have an answer; the DTO layer marks them.
    pub async fn list_answered_question_ids(
        &self,
        interview_id: &str,
    ) -> CoreResult<std::collections::HashSet<String>> {
        let rows = sqlx::query("SELECT question_id FROM responses WHERE interview_id = ?1")
            .bind(interview_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| row.try_get("question_id"))
            .collect::<Result<_, sqlx::Error>>()
            .map_err(Into::into)
    }

    pub async fn count_responses(&self, interview_id: &str) -> CoreResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM responses WHERE interview_id = ?1")
            .bind(interview_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("n")?)
    }
}
