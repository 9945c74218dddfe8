//! In-process domain events with after-commit publication.
//!
//! Events staged on a [`UnitOfWork`] go to the bus only if the enclosing
//! transaction commits; a rollback (or plain drop) discards them. Listeners
//! run on the orchestration worker pool, never on the publishing task.

use crate::error::CoreResult;
use crate::store::Store;
use sqlx::{Sqlite, SqliteConnection, Transaction};
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub enum DomainEvent {
    QuestionsCreated {
        interview_id: String,
        question_ids: Vec<String>,
    },
}

/// Publishing half of the bus. The receiving half is drained by the
/// dispatcher the app spawns at bootstrap.
#[derive(Clone)]
pub struct EventBus {
    tx: mpsc::UnboundedSender<DomainEvent>,
}

impl EventBus {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DomainEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn publish(&self, event: DomainEvent) {
        if self.tx.send(event).is_err() {
            tracing::warn!("event bus has no dispatcher; event dropped");
        }
    }
}

/// A write transaction that collects events for after-commit dispatch.
pub struct UnitOfWork<'a> {
    tx: Transaction<'a, Sqlite>,
    pending: Vec<DomainEvent>,
}

impl<'a> UnitOfWork<'a> {
    pub async fn begin(store: &'a Store) -> CoreResult<UnitOfWork<'a>> {
        let tx = store.pool().begin().await?;
        Ok(Self {
            tx,
            pending: Vec::new(),
        })
    }

    /// Executor for statements that must ride this transaction.
    pub fn executor(&mut self) -> &mut SqliteConnection {
        &mut self.tx
    }

    /// Stage an event. It fires only if [`UnitOfWork::commit`] succeeds.
    pub fn stage(&mut self, event: DomainEvent) {
        self.pending.push(event);
    }

    pub async fn commit(self, bus: &EventBus) -> CoreResult<()> {
        self.tx.commit().await?;
        for event in self.pending {
            bus.publish(event);
        }
        Ok(())
    }
}
