//! Background orchestration pipelines.

pub mod avatar;
pub mod feedback;
pub mod fingerprint;
pub mod transcribe;

use crate::app::AppContext;
use crate::events::DomainEvent;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Drain the event bus and hand each event to its pipeline on the worker
/// pool. Runs until the bus side is dropped at shutdown.
pub async fn run_dispatcher(ctx: Arc<AppContext>, mut rx: mpsc::UnboundedReceiver<DomainEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            DomainEvent::QuestionsCreated {
                interview_id,
                question_ids,
            } => {
                tracing::info!(
                    interview_id,
                    questions = question_ids.len(),
                    "questions created; starting avatar fan-out"
                );
                let tracker = ctx.tracker.clone();
                let ctx = ctx.clone();
                tracker.spawn(async move {
                    avatar::run_fanout(ctx, interview_id, question_ids).await;
                });
            }
        }
    }
    tracing::debug!("event bus closed; dispatcher exiting");
}
