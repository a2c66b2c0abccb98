use std::convert::Infallible;
use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::{self, Stream};
use tokio::sync::broadcast::error::RecvError;
use tracing::debug;

use crate::api::models::{ResultsResponse, StatusResponse};
use crate::api::AppState;
use crate::errors::ZeronError;
use crate::reporting::executive::statistics;

pub async fn get_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StatusResponse>, ZeronError> {
    let scan = super::load_scan(&state, &id)?;
    Ok(Json(StatusResponse::from(&scan)))
}

pub async fn get_results(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ResultsResponse>, ZeronError> {
    let scan = super::load_scan(&state, &id)?;
    Ok(Json(ResultsResponse {
        statistics: statistics(&scan.vulnerabilities),
        scan_id: scan.id,
        domain: scan.domain,
        status: scan.status.to_string(),
        vulnerabilities: scan.vulnerabilities,
        error: scan.error,
    }))
}

/// Server-sent progress events for one active scan; ends after the terminal event.
pub async fn stream_events(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ZeronError> {
    if !state.active_scans.contains_key(&id) {
        let scan = super::load_scan(&state, &id)?;
        return Err(ZeronError::Conflict(format!("scan {} is {}, not running", id, scan.status)));
    }

    let rx = state.events.subscribe();
    let events = stream::unfold((rx, false), move |(mut rx, done)| {
        let id = id.clone();
        async move {
            if done {
                return None;
            }
            loop {
                match rx.recv().await {
                    Ok(event) if event.scan_id() == id => {
                        let terminal = event.is_terminal();
                        let sse = Event::default()
                            .event(event.kind())
                            .json_data(&event)
                            .unwrap_or_else(|_| Event::default().comment("unserializable event"));
                        return Some((Ok(sse), (rx, terminal)));
                    }
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(scan_id = %id, skipped, "Event subscriber lagged");
                        continue;
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        }
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
