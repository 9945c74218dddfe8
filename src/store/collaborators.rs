//! Read access to collaborator-owned entities.
//!
//! Users, resumes, and job roles are managed elsewhere; the core only
//! reads them by id and checks ownership. The insert helpers exist so the
//! owning service (and tests) can seed rows through the same pool.

use super::codec::ts_to_str;
use super::{Store, now_utc};
use crate::error::{CoreError, CoreResult};
use sqlx::Row;

#[derive(Debug, Clone)]
pub struct ResumeRef {
    pub id: String,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct JobRoleRef {
    pub id: String,
    pub title: String,
}

impl Store {
    pub async fn get_owned_resume(&self, id: &str, user_id: &str) -> CoreResult<ResumeRef> {
        let row = sqlx::query("SELECT id, content FROM resumes WHERE id = ?1 AND user_id = ?2")
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(ResumeRef {
                id: row.try_get("id")?,
                content: row.try_get("content")?,
            }),
            None => Err(CoreError::not_found("resume")),
        }
    }

    pub async fn get_job_role(&self, id: &str) -> CoreResult<JobRoleRef> {
        let row = sqlx::query("SELECT id, title FROM job_roles WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(JobRoleRef {
                id: row.try_get("id")?,
                title: row.try_get("title")?,
            }),
            None => Err(CoreError::not_found("job role")),
        }
    }

    pub async fn insert_user(&self, id: &str, email: &str) -> CoreResult<()> {
        sqlx::query("INSERT INTO users (id, email, created_at) VALUES (?1, ?2, ?3)")
            .bind(id)
            .bind(email)
            .bind(ts_to_str(now_utc()))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn insert_resume(&self, id: &str, user_id: &str, content: &str) -> CoreResult<()> {
        sqlx::query(
            "INSERT INTO resumes (id, user_id, content, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(id)
        .bind(user_id)
        .bind(content)
        .bind(ts_to_str(now_utc()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn insert_job_role(&self, id: &str, title: &str, description: &str) -> CoreResult<()> {
        sqlx::query("INSERT INTO job_roles (id, title, description) VALUES (?1, ?2, ?3)")
            .bind(id)
            .bind(title)
            .bind(description)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
