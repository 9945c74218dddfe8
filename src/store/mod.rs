//! SQLite-backed persistence.
//!
//! Plain structs plus explicit SQL; no lazy loading, no entity graphs.
//! Repositories are grouped per aggregate in sibling files, all as methods
//! on [`Store`]. Timestamps are RFC3339 TEXT at millisecond precision so
//! lexicographic comparison in SQL matches chronological order.

mod cache;
mod codec;
mod collaborators;
mod feedback;
mod interviews;
mod questions;
mod responses;
mod schema;

pub use codec::now_utc;
pub use collaborators::{JobRoleRef, ResumeRef};
pub use responses::AnsweredQuestion;

use anyhow::Context;
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (or create) the database behind `url` and run DDL.
    pub async fn connect(url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .context("open database")?;
        schema::init_schema(&pool).await?;
        Ok(Self { pool })
    }

    /// In-memory database (tests and `check-config`). Pinned to a single
    /// pooled connection: every `:memory:` connection is its own database,
    /// so handing out more than one would split the data.
    pub async fn in_memory() -> anyhow::Result<Self> {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .context("open in-memory SQLite")?;
        schema::init_schema(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Cheap liveness probe for the health endpoint.
    pub async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}
