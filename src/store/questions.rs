use super::codec::{decode_error, str_to_ts, ts_to_str};
use super::Store;
use crate::domain::Question;
use crate::error::{CoreError, CoreResult};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite};

fn map_question(row: &SqliteRow) -> Result<Question, sqlx::Error> {
    let category: String = row.try_get("category")?;
    let difficulty: String = row.try_get("difficulty")?;
    let created_at: String = row.try_get("created_at")?;
    Ok(Question {
        id: row.try_get("id")?,
        interview_id: row.try_get("interview_id")?,
        ordinal: row.try_get("ordinal")?,
        text: row.try_get("question_text")?,
        category: category
            .parse()
            .map_err(|e| decode_error(format!("bad category {category:?}: {e:?}")))?,
        difficulty: difficulty
            .parse()
            .map_err(|e| decode_error(format!("bad difficulty {difficulty:?}: {e:?}")))?,
        avatar_key: row.try_get("avatar_key")?,
        created_at: str_to_ts(&created_at)?,
    })
}

const SELECT_QUESTION: &str = "SELECT id, interview_id, ordinal, question_text, category, \
     difficulty, avatar_key, created_at FROM questions";

impl Store {
    pub async fn insert_question<'e, E>(executor: E, question: &Question) -> CoreResult<()>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            "INSERT INTO questions \
             (id, interview_id, ordinal, question_text, category, difficulty, avatar_key, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&question.id)
        .bind(&question.interview_id)
        .bind(question.ordinal)
        .bind(&question.text)
        .bind(question.category.to_string())
        .bind(question.difficulty.to_string())
        .bind(&question.avatar_key)
        .bind(ts_to_str(question.created_at))
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn get_question(&self, id: &str) -> CoreResult<Option<Question>> {
        let row = sqlx::query(&format!("{SELECT_QUESTION} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(map_question).transpose().map_err(Into::into)
    }

    /// Question scoped to its interview; the upload handshake uses this to
    /// reject question ids from someone else's interview.
    pub async fn get_interview_question(
        &self,
        interview_id: &str,
        question_id: &str,
    ) -> CoreResult<Question> {
        let row = sqlx::query(&format!(
            "{SELECT_QUESTION} WHERE id = ?1 AND interview_id = ?2"
        ))
        .bind(question_id)
        .bind(interview_id)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => Ok(map_question(&row)?),
            None => Err(CoreError::not_found("question")),
        }
    }

    pub async fn list_questions(&self, interview_id: &str) -> CoreResult<Vec<Question>> {
        let rows = sqlx::query(&format!(
            "{SELECT_QUESTION} WHERE interview_id = ?1 ORDER BY ordinal"
        ))
        .bind(interview_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(map_question)
            .collect::<Result<_, _>>()
            .map_err(Into::into)
    }

    /// null→set at most once: a second write loses and reports it.
    pub async fn set_question_avatar_key(&self, id: &str, avatar_key: &str) -> CoreResult<bool> {
        let result =
            sqlx::query("UPDATE questions SET avatar_key = ?1 WHERE id = ?2 AND avatar_key IS NULL")
                .bind(avatar_key)
                .bind(id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn count_questions_with_avatar(&self, interview_id: &str) -> CoreResult<(i64, i64)> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS total, COUNT(avatar_key) AS with_avatar \
             FROM questions WHERE interview_id = ?1",
        )
        .bind(interview_id)
        .fetch_one(&self.pool)
        .await?;
        Ok((row.try_get("total")?, row.try_get("with_avatar")?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Interview, InterviewStatus, QuestionCategory, QuestionDifficulty};
    use crate::store::now_utc;

    async fn seeded_store() -> Store {
        let store = Store::in_memory().await.unwrap();
        let interview = Interview {
            id: "i1".into(),
            user_id: "u1".into(),
            resume_id: "r1".into(),
            job_role_id: "j1".into(),
            status: InterviewStatus::GeneratingVideos,
            interview_type: "standard".into(),
            overall_score: None,
            created_at: now_utc(),
            completed_at: None,
        };
        Store::insert_interview(store.pool(), &interview).await.unwrap();
        store
    }

    fn question(id: &str, ordinal: i64) -> Question {
        Question {
            id: id.into(),
            interview_id: "i1".into(),
            ordinal,
            text: format!("Question {ordinal}?"),
            category: QuestionCategory::Technical,
            difficulty: QuestionDifficulty::Medium,
            avatar_key: None,
            created_at: now_utc(),
        }
    }

    #[tokio::test]
    async fn ordinals_are_unique_per_interview() {
        let store = seeded_store().await;
        Store::insert_question(store.pool(), &question("q1", 1)).await.unwrap();
        let duplicate = Store::insert_question(store.pool(), &question("q2", 1)).await;
        assert!(duplicate.is_err());
    }

    #[tokio::test]
    async fn listing_orders_by_ordinal() {
        let store = seeded_store().await;
        Store::insert_question(store.pool(), &question("q2", 2)).await.unwrap();
        Store::insert_question(store.pool(), &question("q1", 1)).await.unwrap();
        let listed = store.list_questions("i1").await.unwrap();
        assert_eq!(
            listed.iter().map(|q| q.ordinal).collect::<Vec<_>>(),
            vec![1, 2]
        );
    }

    #[tokio::test]
    async fn avatar_key_sets_at_most_once() {
        let store = seeded_store().await;
        Store::insert_question(store.pool(), &question("q1", 1)).await.unwrap();

        assert!(store.set_question_avatar_key("q1", "avatar-cache/a.mp4").await.unwrap());
        assert!(!store.set_question_avatar_key("q1", "avatar-cache/b.mp4").await.unwrap());

        let loaded = store.get_question("q1").await.unwrap().unwrap();
        assert_eq!(loaded.avatar_key.as_deref(), Some("avatar-cache/a.mp4"));
    }

    #[tokio::test]
    async fn cross_interview_lookup_is_not_found() {
        let store = seeded_store().await;
        Store::insert_question(store.pool(), &question("q1", 1)).await.unwrap();
        assert!(store.get_interview_question("other", "q1").await.is_err());
        assert!(store.get_interview_question("i1", "q1").await.is_ok());
    }

    #[tokio::test]
    async fn avatar_counts() {
        let store = seeded_store().await;
        Store::insert_question(store.pool(), &question("q1", 1)).await.unwrap();
        Store::insert_question(store.pool(), &question("q2", 2)).await.unwrap();
        store.set_question_avatar_key("q1", "k").await.unwrap();
        assert_eq!(store.count_questions_with_avatar("i1").await.unwrap(), (2, 1));
    }
}
