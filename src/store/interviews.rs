use super::codec::{opt_str_to_ts, str_to_ts, ts_to_str};
use super::{Store, now_utc};
use crate::domain::{Interview, InterviewStatus};
use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite};

fn map_interview(row: &SqliteRow) -> Result<Interview, sqlx::Error> {
    let status: String = row.try_get("status")?;
    let created_at: String = row.try_get("created_at")?;
    Ok(Interview {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        resume_id: row.try_get("resume_id")?,
        job_role_id: row.try_get("job_role_id")?,
        status: status
            .parse::<InterviewStatus>()
            .map_err(|e| super::codec::decode_error(format!("bad status {status:?}: {e:?}")))?,
        interview_type: row.try_get("interview_type")?,
        overall_score: row.try_get("overall_score")?,
        created_at: str_to_ts(&created_at)?,
        completed_at: opt_str_to_ts(row.try_get("completed_at")?)?,
    })
}

const SELECT_INTERVIEW: &str = "SELECT id, user_id, resume_id, job_role_id, status, \
     interview_type, overall_score, created_at, completed_at FROM interviews";

impl Store {
    /// Insert inside the START transaction; executor-generic so it runs on
    /// the same connection as the question inserts.
    pub async fn insert_interview<'e, E>(executor: E, interview: &Interview) -> CoreResult<()>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            "INSERT INTO interviews \
             (id, user_id, resume_id, job_role_id, status, interview_type, overall_score, created_at, completed_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(&interview.id)
        .bind(&interview.user_id)
        .bind(&interview.resume_id)
        .bind(&interview.job_role_id)
        .bind(interview.status.to_string())
        .bind(&interview.interview_type)
        .bind(interview.overall_score)
        .bind(ts_to_str(interview.created_at))
        .bind(interview.completed_at.map(ts_to_str))
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn get_interview(&self, id: &str) -> CoreResult<Option<Interview>> {
        let row = sqlx::query(&format!("{SELECT_INTERVIEW} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(map_interview).transpose().map_err(Into::into)
    }

    /// Fetch with the ownership check folded in. Unowned and missing rows
    /// are indistinguishable to the caller.
    pub async fn get_owned_interview(&self, id: &str, user_id: &str) -> CoreResult<Interview> {
        let row = sqlx::query(&format!(
            "{SELECT_INTERVIEW} WHERE id = ?1 AND user_id = ?2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => Ok(map_interview(&row)?),
            None => Err(CoreError::not_found("interview")),
        }
    }

    pub async fn list_interviews_by_user(&self, user_id: &str) -> CoreResult<Vec<Interview>> {
        let rows = sqlx::query(&format!(
            "{SELECT_INTERVIEW} WHERE user_id = ?1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(map_interview)
            .collect::<Result<_, _>>()
            .map_err(Into::into)
    }

    /// Compare-and-set status transition. Per-interview serialization:
    /// two sweepers or two completions cannot both win the same step.
    pub async fn transition_status(
        &self,
        id: &str,
        from: InterviewStatus,
        to: InterviewStatus,
    ) -> CoreResult<()> {
        if !from.can_transition(to) {
            return Err(CoreError::illegal_state(from.to_string(), to.to_string()));
        }

        // Leaving IN_PROGRESS stamps completed_at, exactly once.
        let leaves_in_progress = from == InterviewStatus::InProgress;

        let result = if leaves_in_progress {
            sqlx::query(
                "UPDATE interviews SET status = ?1, completed_at = COALESCE(completed_at, ?2) \
                 WHERE id = ?3 AND status = ?4",
            )
            .bind(to.to_string())
            .bind(ts_to_str(now_utc()))
            .bind(id)
            .bind(from.to_string())
            .execute(&self.pool)
            .await?
        } else {
            sqlx::query("UPDATE interviews SET status = ?1 WHERE id = ?2 AND status = ?3")
                .bind(to.to_string())
                .bind(id)
                .bind(from.to_string())
                .execute(&self.pool)
                .await?
        };

        if result.rows_affected() == 1 {
            return Ok(());
        }
        match self.get_interview(id).await? {
            None => Err(CoreError::not_found("interview")),
            Some(current) => Err(CoreError::illegal_state(
                current.status.to_string(),
                to.to_string(),
            )),
        }
    }

    /// Interviews sitting in GENERATING_VIDEOS since before `cutoff`.
    pub async fn list_stuck_generating(
        &self,
        cutoff: DateTime<Utc>,
    ) -> CoreResult<Vec<Interview>> {
        let rows = sqlx::query(&format!(
            "{SELECT_INTERVIEW} WHERE status = ?1 AND created_at < ?2"
        ))
        .bind(InterviewStatus::GeneratingVideos.to_string())
        .bind(ts_to_str(cutoff))
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(map_interview)
            .collect::<Result<_, _>>()
            .map_err(Into::into)
    }

    /// Interviews sitting in PROCESSING since before `cutoff`, measured
    /// from completed_at when present, else created_at.
    pub async fn list_stuck_processing(
        &self,
        cutoff: DateTime<Utc>,
    ) -> CoreResult<Vec<Interview>> {
        let rows = sqlx::query(&format!(
            "{SELECT_INTERVIEW} WHERE status = ?1 AND COALESCE(completed_at, created_at) < ?2"
        ))
        .bind(InterviewStatus::Processing.to_string())
        .bind(ts_to_str(cutoff))
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(map_interview)
            .collect::<Result<_, _>>()
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DomainError;

    fn interview(id: &str, status: InterviewStatus) -> Interview {
        Interview {
            id: id.into(),
            user_id: "u1".into(),
            resume_id: "r1".into(),
            job_role_id: "j1".into(),
            status,
            interview_type: "standard".into(),
            overall_score: None,
            created_at: now_utc(),
            completed_at: None,
        }
    }

    #[tokio::test]
    async fn insert_and_fetch_round_trip() {
        let store = Store::in_memory().await.unwrap();
        let iv = interview("i1", InterviewStatus::GeneratingVideos);
        Store::insert_interview(store.pool(), &iv).await.unwrap();

        let loaded = store.get_interview("i1").await.unwrap().unwrap();
        assert_eq!(loaded.status, InterviewStatus::GeneratingVideos);
        assert_eq!(loaded.created_at, iv.created_at);
        assert!(loaded.completed_at.is_none());
    }

    #[tokio::test]
    async fn ownership_is_part_of_lookup() {
        let store = Store::in_memory().await.unwrap();
        Store::insert_interview(store.pool(), &interview("i1", InterviewStatus::InProgress))
            .await
            .unwrap();

        assert!(store.get_owned_interview("i1", "u1").await.is_ok());
        let err = store.get_owned_interview("i1", "intruder").await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::Domain(DomainError::NotFound { entity: "interview" })
        ));
    }

    #[tokio::test]
    async fn cas_transition_happy_path_and_conflict() {
        let store = Store::in_memory().await.unwrap();
        Store::insert_interview(store.pool(), &interview("i1", InterviewStatus::InProgress))
            .await
            .unwrap();

        store
            .transition_status("i1", InterviewStatus::InProgress, InterviewStatus::Processing)
            .await
            .unwrap();

        let loaded = store.get_interview("i1").await.unwrap().unwrap();
        assert_eq!(loaded.status, InterviewStatus::Processing);
        assert!(loaded.completed_at.is_some(), "leaving IN_PROGRESS stamps completed_at");

        // Second completion loses the CAS and reports the actual state.
        let err = store
            .transition_status("i1", InterviewStatus::InProgress, InterviewStatus::Processing)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Domain(DomainError::IllegalState { .. })));
    }

    #[tokio::test]
    async fn illegal_transition_rejected_without_touching_the_row() {
        let store = Store::in_memory().await.unwrap();
        Store::insert_interview(store.pool(), &interview("i1", InterviewStatus::Completed))
            .await
            .unwrap();

        let err = store
            .transition_status("i1", InterviewStatus::Completed, InterviewStatus::Processing)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Domain(DomainError::IllegalState { .. })));
        let loaded = store.get_interview("i1").await.unwrap().unwrap();
        assert_eq!(loaded.status, InterviewStatus::Completed);
    }

    #[tokio::test]
    async fn stuck_queries_respect_cutoff() {
        let store = Store::in_memory().await.unwrap();
        let mut old = interview("old", InterviewStatus::GeneratingVideos);
        old.created_at = now_utc() - chrono::Duration::minutes(20);
        let fresh = interview("fresh", InterviewStatus::GeneratingVideos);
        Store::insert_interview(store.pool(), &old).await.unwrap();
        Store::insert_interview(store.pool(), &fresh).await.unwrap();

        let cutoff = now_utc() - chrono::Duration::minutes(15);
        let stuck = store.list_stuck_generating(cutoff).await.unwrap();
        assert_eq!(stuck.len(), 1);
        assert_eq!(stuck[0].id, "old");
    }

    #[tokio::test]
    async fn processing_cutoff_prefers_completed_at() {
        let store = Store::in_memory().await.unwrap();
        // Created long ago but completed recently: not stuck yet.
        let mut recent = interview("recent", InterviewStatus::Processing);
        recent.created_at = now_utc() - chrono::Duration::hours(3);
        recent.completed_at = Some(now_utc() - chrono::Duration::minutes(5));
        // No completed_at: falls back to created_at.
        let mut orphan = interview("orphan", InterviewStatus::Processing);
        orphan.created_at = now_utc() - chrono::Duration::hours(1);
        Store::insert_interview(store.pool(), &recent).await.unwrap();
        Store::insert_interview(store.pool(), &orphan).await.unwrap();

        let cutoff = now_utc() - chrono::Duration::minutes(30);
        let stuck = store.list_stuck_processing(cutoff).await.unwrap();
        assert_eq!(stuck.len(), 1);
        assert_eq!(stuck[0].id, "orphan");
    }
}
