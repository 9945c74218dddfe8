//! The store against a real database file: schema bootstrap and reopen.

use greenroom::domain::{Interview, InterviewStatus};
use greenroom::store::{Store, now_utc};
use tempfile::TempDir;

#[tokio::test]
async fn data_survives_a_reopen() {
    let dir = TempDir::new().unwrap();
    let url = format!(
        "sqlite:{}?mode=rwc",
        dir.path().join("greenroom.db").display()
    );

    let store = Store::connect(&url, 4).await.unwrap();
    store.insert_user("u1", "u1@example.com").await.unwrap();
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
    store.put_tts_cache("fp1", "tts/a.mp3").await.unwrap();
    store.pool().close().await;
    drop(store);

    // Second process: same file, schema init is idempotent, data intact.
    let reopened = Store::connect(&url, 4).await.unwrap();
    let loaded = reopened.get_interview("i1").await.unwrap().unwrap();
    assert_eq!(loaded.status, InterviewStatus::GeneratingVideos);
    assert_eq!(loaded.created_at, interview.created_at);
    let cache = reopened.get_tts_cache("fp1").await.unwrap().unwrap();
    assert_eq!(cache.audio_key, "tts/a.mp3");
}
