use super::codec::{json_to_list, list_to_json, str_to_ts, ts_to_str};
use super::Store;
use crate::domain::Feedback;
use crate::error::{CoreError, CoreResult};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

fn map_feedback(row: &SqliteRow) -> Result<Feedback, sqlx::Error> {
    let strengths: String = row.try_get("strengths")?;
    let weaknesses: String = row.try_get("weaknesses")?;
    let recommendations: String = row.try_get("recommendations")?;
    let generated_at: String = row.try_get("generated_at")?;
    Ok(Feedback {
        id: row.try_get("id")?,
        interview_id: row.try_get("interview_id")?,
        user_id: row.try_get("user_id")?,
        overall_score: row.try_get("overall_score")?,
        strengths: json_to_list(&strengths),
        weaknesses: json_to_list(&weaknesses),
        recommendations: json_to_list(&recommendations),
        detailed_analysis: row.try_get("detailed_analysis")?,
        generated_at: str_to_ts(&generated_at)?,
    })
}

impl Store {
    pub async fn insert_feedback(&self, feedback: &Feedback) -> CoreResult<()> {
        let result = sqlx::query(
            "INSERT INTO feedback \
             (id, interview_id, user_id, overall_score, strengths, weaknesses, \
              recommendations, detailed_analysis, generated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(&feedback.id)
        .bind(&feedback.interview_id)
        .bind(&feedback.user_id)
        .bind(feedback.overall_score)
        .bind(list_to_json(&feedback.strengths))
        .bind(list_to_json(&feedback.weaknesses))
        .bind(list_to_json(&feedback.recommendations))
        .bind(&feedback.detailed_analysis)
        .bind(ts_to_str(feedback.generated_at))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(CoreError::duplicate("feedback"))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Terminal step of the feedback pipeline, in one transaction: the
    /// PROCESSING→COMPLETED compare-and-set, the score, and the feedback
    /// row land together or not at all, keeping "feedback exists iff
    /// COMPLETED" true under races with the sweeper.
    pub async fn finalize_feedback(&self, feedback: &Feedback) -> CoreResult<()> {
        use crate::domain::InterviewStatus;

        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE interviews SET status = ?1, overall_score = ?2 \
             WHERE id = ?3 AND status = ?4",
        )
        .bind(InterviewStatus::Completed.to_string())
        .bind(feedback.overall_score)
        .bind(&feedback.interview_id)
        .bind(InterviewStatus::Processing.to_string())
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() != 1 {
            // Release the transaction (and its connection) before probing
            // the current status; the sweeper got there first.
            drop(tx);
            let current = self.get_interview(&feedback.interview_id).await?;
            return Err(match current {
                None => CoreError::not_found("interview"),
                Some(interview) => CoreError::illegal_state(
                    interview.status.to_string(),
                    InterviewStatus::Completed.to_string(),
                ),
            });
        }

        let inserted = sqlx::query(
            "INSERT INTO feedback \
             (id, interview_id, user_id, overall_score, strengths, weaknesses, \
              recommendations, detailed_analysis, generated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9) \
             ON CONFLICT(interview_id) DO NOTHING",
        )
        .bind(&feedback.id)
        .bind(&feedback.interview_id)
        .bind(&feedback.user_id)
        .bind(feedback.overall_score)
        .bind(list_to_json(&feedback.strengths))
        .bind(list_to_json(&feedback.weaknesses))
        .bind(list_to_json(&feedback.recommendations))
        .bind(&feedback.detailed_analysis)
        .bind(ts_to_str(feedback.generated_at))
        .execute(&mut *tx)
        .await?;
        if inserted.rows_affected() != 1 {
            return Err(CoreError::duplicate("feedback"));
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn get_feedback(&self, interview_id: &str) -> CoreResult<Option<Feedback>> {
        let row = sqlx::query(
            "SELECT id, interview_id, user_id, overall_score, strengths, weaknesses, \
             recommendations, detailed_analysis, generated_at \
             FROM feedback WHERE interview_id = ?1",
        )
        .bind(interview_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(map_feedback).transpose().map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Interview, InterviewStatus};
    use crate::error::DomainError;
    use crate::store::now_utc;

    fn feedback() -> Feedback {
        Feedback {
            id: "f1".into(),
            interview_id: "i1".into(),
            user_id: "u1".into(),
            overall_score: 78,
            strengths: vec!["clear communication".into(), "system design depth".into()],
            weaknesses: vec!["rushed answers".into()],
            recommendations: vec!["practice STAR stories".into()],
            detailed_analysis: "Solid overall performance.".into(),
            generated_at: now_utc(),
        }
    }

    #[tokio::test]
    async fn round_trips_structured_lists() {
        let store = Store::in_memory().await.unwrap();
        let interview = Interview {
            id: "i1".into(),
            user_id: "u1".into(),
            resume_id: "r1".into(),
            job_role_id: "j1".into(),
            status: InterviewStatus::Processing,
            interview_type: "standard".into(),
            overall_score: None,
            created_at: now_utc(),
            completed_at: None,
        };
        Store::insert_interview(store.pool(), &interview).await.unwrap();

        store.insert_feedback(&feedback()).await.unwrap();
        let loaded = store.get_feedback("i1").await.unwrap().unwrap();
        assert_eq!(loaded.overall_score, 78);
        assert_eq!(loaded.strengths.len(), 2);
        assert_eq!(loaded.weaknesses, vec!["rushed answers".to_string()]);
    }

    #[tokio::test]
    async fn finalize_is_atomic_with_the_status_cas() {
        let store = Store::in_memory().await.unwrap();
        let interview = Interview {
            id: "i1".into(),
            user_id: "u1".into(),
            resume_id: "r1".into(),
            job_role_id: "j1".into(),
            status: InterviewStatus::Processing,
            interview_type: "standard".into(),
            overall_score: None,
            created_at: now_utc(),
            completed_at: None,
        };
        Store::insert_interview(store.pool(), &interview).await.unwrap();

        store.finalize_feedback(&feedback()).await.unwrap();
        let loaded = store.get_interview("i1").await.unwrap().unwrap();
        assert_eq!(loaded.status, InterviewStatus::Completed);
        assert_eq!(loaded.overall_score, Some(78));
        assert!(store.get_feedback("i1").await.unwrap().is_some());

        // Re-finalizing loses the CAS: status is no longer PROCESSING.
        let err = store.finalize_feedback(&feedback()).await.unwrap_err();
        assert!(matches!(err, CoreError::Domain(DomainError::IllegalState { .. })));
    }

    #[tokio::test]
    async fn finalize_after_sweeper_failure_leaves_no_feedback() {
        let store = Store::in_memory().await.unwrap();
        let interview = Interview {
            id: "i1".into(),
            user_id: "u1".into(),
            resume_id: "r1".into(),
            job_role_id: "j1".into(),
            status: InterviewStatus::Failed,
            interview_type: "standard".into(),
            overall_score: None,
            created_at: now_utc(),
            completed_at: None,
        };
        Store::insert_interview(store.pool(), &interview).await.unwrap();

        assert!(store.finalize_feedback(&feedback()).await.is_err());
        assert!(store.get_feedback("i1").await.unwrap().is_none());
        assert_eq!(
            store.get_interview("i1").await.unwrap().unwrap().status,
            InterviewStatus::Failed
        );
    }

    #[tokio::test]
    async fn one_feedback_per_interview() {
        let store = Store::in_memory().await.unwrap();
        store.insert_feedback(&feedback()).await.unwrap();

        let mut second = feedback();
        second.id = "f2".into();
        let err = store.insert_feedback(&second).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::Domain(DomainError::Duplicate { entity: "feedback" })
        ));
    }
}
