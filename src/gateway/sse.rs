//! Server-push progress channel (SSE) with the hub behind it.

use super::{ApiError, AppState, authenticate};
use crate::domain::InterviewStatus;
use crate::notify::ProgressEvent;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, Response, StatusCode, header},
};
use std::time::Duration;

/// Subscriptions die on interview-ready, client disconnect, or this idle
/// window, whichever comes first.
const IDLE_TIMEOUT: Duration = Duration::from_secs(600);

fn frame(event: &ProgressEvent) -> String {
    let data = serde_json::to_string(event).unwrap_or_else(|_| "{}".into());
    format!("event: {}\ndata: {data}\n\n", event.name())
}

/// GET /api/interviews/{id}/events
pub(super) async fn handle_events(
    State(state): State<AppState>,
    Path(interview_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response<Body>, ApiError> {
    let user_id = authenticate(&state, &headers)?;

    // Subscribe before reading status: a transition landing between the
    // two is then visible either in the status or on the channel.
    let mut rx = state.ctx.hub.subscribe(&interview_id);
    let interview = state
        .ctx
        .store
        .get_owned_interview(&interview_id, &user_id)
        .await?;

    // Late subscriber: the pipeline already finished, so emit the terminal
    // event immediately instead of waiting for a broadcast that will never
    // come. The poll fallback covers everything else.
    let already_ready = interview.status != InterviewStatus::GeneratingVideos;

    let stream = async_stream::stream! {
        if already_ready {
            yield Ok::<_, std::convert::Infallible>(frame(&ProgressEvent::InterviewReady {}));
            return;
        }
        loop {
            match tokio::time::timeout(IDLE_TIMEOUT, rx.recv()).await {
                Ok(Some(event)) => {
                    let done = matches!(event, ProgressEvent::InterviewReady {});
                    yield Ok(frame(&event));
                    if done {
                        break;
                    }
                }
                // Hub closed the subscriber set.
                Ok(None) => break,
                // Idle timeout: drop this subscriber, pipeline unaffected.
                Err(_) => break,
            }
        }
    };

    let mut response = Response::new(Body::from_stream(stream));
    *response.status_mut() = StatusCode::OK;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("text/event-stream"),
    );
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-cache"),
    );
    response.headers_mut().insert(
        header::CONNECTION,
        header::HeaderValue::from_static("keep-alive"),
    );
    Ok(response)
}
