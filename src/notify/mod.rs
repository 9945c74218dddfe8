//! Per-interview progress notification.
//!
//! The hub fans pipeline progress out to any number of subscribers (the
//! SSE endpoint); polling `GET /api/interviews/{id}` stays available as a
//! fallback and carries enough state to reconstruct progress.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::mpsc;

/// Channel depth per subscriber. A consumer that falls this far behind is
/// treated as dead and dropped.
const SUBSCRIBER_BUFFER: usize = 32;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged, rename_all_fields = "camelCase")]
pub enum ProgressEvent {
    AvatarReady {
        question_id: String,
        presigned_url: String,
    },
    AvatarFailed {
        question_id: String,
    },
    InterviewReady {},
}

impl ProgressEvent {
    /// Wire name of the event (the SSE `event:` field).
    pub fn name(&self) -> &'static str {
        match self {
            Self::AvatarReady { .. } => "avatar-ready",
            Self::AvatarFailed { .. } => "avatar-failed",
            Self::InterviewReady {} => "interview-ready",
        }
    }
}

#[derive(Default)]
pub struct ProgressHub {
    subscribers: Mutex<HashMap<String, Vec<mpsc::Sender<ProgressEvent>>>>,
}

impl ProgressHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, interview_id: &str) -> mpsc::Receiver<ProgressEvent> {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        self.subscribers
            .lock()
            .unwrap()
            .entry(interview_id.to_owned())
            .or_default()
            .push(tx);
        rx
    }

    /// Send to every live subscriber; dead and lagging subscribers are
    /// pruned silently. `interview-ready` additionally closes the set, so
    /// remaining receivers see end-of-stream.
    pub fn publish(&self, interview_id: &str, event: &ProgressEvent) {
        let mut subscribers = self.subscribers.lock().unwrap();
        let Some(list) = subscribers.get_mut(interview_id) else {
            return;
        };
        list.retain(|tx| tx.try_send(event.clone()).is_ok());

        if matches!(event, ProgressEvent::InterviewReady {}) || list.is_empty() {
            subscribers.remove(interview_id);
        }
    }

    pub fn subscriber_count(&self, interview_id: &str) -> usize {
        self.subscribers
            .lock()
            .unwrap()
            .get(interview_id)
            .map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready(question_id: &str) -> ProgressEvent {
        ProgressEvent::AvatarReady {
            question_id: question_id.into(),
            presigned_url: format!("https://signed/{question_id}"),
        }
    }

    #[tokio::test]
    async fn events_reach_all_subscribers() {
        let hub = ProgressHub::new();
        let mut a = hub.subscribe("i1");
        let mut b = hub.subscribe("i1");

        hub.publish("i1", &ready("q1"));
        assert_eq!(a.recv().await.unwrap().name(), "avatar-ready");
        assert_eq!(b.recv().await.unwrap().name(), "avatar-ready");
    }

    #[tokio::test]
    async fn interviews_are_isolated() {
        let hub = ProgressHub::new();
        let mut other = hub.subscribe("i2");
        hub.publish("i1", &ready("q1"));
        assert!(other.try_recv().is_err());
    }

    #[tokio::test]
    async fn interview_ready_closes_the_stream() {
        let hub = ProgressHub::new();
        let mut rx = hub.subscribe("i1");

        hub.publish("i1", &ProgressEvent::InterviewReady {});
        assert_eq!(rx.recv().await.unwrap(), ProgressEvent::InterviewReady {});
        // Sender side dropped: stream ends.
        assert!(rx.recv().await.is_none());
        assert_eq!(hub.subscriber_count("i1"), 0);
    }

    #[tokio::test]
    async fn dropped_subscriber_is_pruned_on_next_publish() {
        let hub = ProgressHub::new();
        let rx = hub.subscribe("i1");
        drop(rx);
        hub.publish("i1", &ready("q1"));
        assert_eq!(hub.subscriber_count("i1"), 0);
    }

    #[tokio::test]
    async fn publishing_without_subscribers_is_a_no_op() {
        let hub = ProgressHub::new();
        hub.publish("ghost", &ready("q1"));
        assert_eq!(hub.subscriber_count("ghost"), 0);
    }
}
