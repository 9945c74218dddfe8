use super::codec::{opt_str_to_ts, str_to_ts, ts_to_str};
use super::{Store, now_utc};
use crate::domain::{AvatarCacheRow, TtsCacheRow};
use crate::error::CoreResult;
use chrono::{DateTime, Utc};
use sqlx::Row;

impl Store {
    /// `ON CONFLICT DO NOTHING`: concurrent writers race, the second one
    /// loses, both end up pointing at a valid blob.
    pub async fn put_tts_cache(&self, cache_key: &str, audio_key: &str) -> CoreResult<()> {
        sqlx::query(
            "INSERT INTO tts_audio_cache (cache_key, audio_key, created_at) \
             VALUES (?1, ?2, ?3) ON CONFLICT(cache_key) DO NOTHING",
        )
        .bind(cache_key)
        .bind(audio_key)
        .bind(ts_to_str(now_utc()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_tts_cache(&self, cache_key: &str) -> CoreResult<Option<TtsCacheRow>> {
        let row = sqlx::query(
            "SELECT cache_key, audio_key, created_at FROM tts_audio_cache WHERE cache_key = ?1",
        )
        .bind(cache_key)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|row| {
            let created_at: String = row.try_get("created_at")?;
            Ok::<_, sqlx::Error>(TtsCacheRow {
                cache_key: row.try_get("cache_key")?,
                audio_key: row.try_get("audio_key")?,
                created_at: str_to_ts(&created_at)?,
            })
        })
        .transpose()
        .map_err(Into::into)
    }

    pub async fn put_avatar_cache(
        &self,
        cache_key: &str,
        video_key: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> CoreResult<()> {
        sqlx::query(
            "INSERT INTO avatar_video_cache (cache_key, video_key, created_at, expires_at) \
             VALUES (?1, ?2, ?3, ?4) ON CONFLICT(cache_key) DO NOTHING",
        )
        .bind(cache_key)
        .bind(video_key)
        .bind(ts_to_str(now_utc()))
        .bind(expires_at.map(ts_to_str))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// `expires_at` is carried but not enforced: whether rows self-expire
    /// is an operator decision, and pruning lives outside the core.
    pub async fn get_avatar_cache(&self, cache_key: &str) -> CoreResult<Option<AvatarCacheRow>> {
        let row = sqlx::query(
            "SELECT cache_key, video_key, created_at, expires_at \
             FROM avatar_video_cache WHERE cache_key = ?1",
        )
        .bind(cache_key)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else { return Ok(None) };
        let created_at: String = row.try_get("created_at")?;
        Ok(Some(AvatarCacheRow {
            cache_key: row.try_get("cache_key")?,
            video_key: row.try_get("video_key")?,
            created_at: str_to_ts(&created_at)?,
            expires_at: opt_str_to_ts(row.try_get("expires_at")?)?,
        }))
    }
}
