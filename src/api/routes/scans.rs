use std::sync::Arc;
use dashmap::DashMap;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::api::models::{CreateScanRequest, ScanResponse};
use crate::api::{AppState, ScanHandle};
use crate::discovery::{normalize_domain, Scope};
use crate::errors::ZeronError;
use crate::models::{Plan, Scan};
use crate::pipeline::ScanOrchestrator;

#[derive(Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

pub async fn list_plans(State(state): State<AppState>) -> Json<Value> {
    let plans: Vec<Value> = Plan::ALL
        .iter()
        .map(|plan| {
            let limits = state.config.limits_for(*plan);
            json!({
                "name": plan.as_str(),
                "max_endpoints": limits.max_endpoints,
                "max_payloads": limits.max_payloads,
                "concurrency": limits.concurrency,
            })
        })
        .collect();
    Json(json!({ "plans": plans }))
}

/// Keeps a scan in the active registry until the task holding it ends, even by unwinding.
struct Registration {
    active: Arc<DashMap<String, Arc<ScanHandle>>>,
    scan_id: String,
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.active.remove(&self.scan_id);
    }
}

/// Spawn the orchestrator for `scan` and register it as active until it finishes.
pub fn launch_scan(state: &AppState, scan: Scan) -> Arc<ScanHandle> {
    let scan_id = scan.id.clone();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let orchestrator = ScanOrchestrator::new(
        scan,
        state.config.clone(),
        state.fetcher.clone(),
        state.resolver.clone(),
    )
    .with_store(Arc::new(state.db.clone()))
    .with_event_channel(tx);

    let handle = Arc::new(ScanHandle {
        state: orchestrator.state(),
        cancel_token: orchestrator.cancel_token(),
    });
    state.active_scans.insert(scan_id.clone(), handle.clone());

    let events = state.events.clone();
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            // No subscribers is fine
            let _ = events.send(event);
        }
    });

    let registration = Registration { active: state.active_scans.clone(), scan_id };
    tokio::spawn(async move {
        let _registration = registration;
        let scan = orchestrator.run().await;
        info!(scan_id = %scan.id, status = %scan.status, "Scan task finished");
    });

    handle
}

pub async fn create_scan(
    State(state): State<AppState>,
    Json(req): Json<CreateScanRequest>,
) -> Result<Response, ZeronError> {
    let domain = normalize_domain(&req.domain)?;
    let plan: Plan = match req.plan.as_deref() {
        Some(p) => p.parse().map_err(ZeronError::Config)?,
        None => Plan::default(),
    };
    let scope_lines = req.scope.map(|s| s.into_lines()).unwrap_or_default();
    Scope::from_lines(&scope_lines)?;

    if state.active_scans.len() >= state.config.server.max_concurrent_scans {
        warn!(active = state.active_scans.len(), "Scan rejected at capacity");
        return Ok((
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({"error": "Too many concurrent scans, try again later"})),
        )
            .into_response());
    }

    let scan = Scan::new(&domain, plan, state.config.limits_for(plan), scope_lines);
    state.db.upsert_scan(&scan)?;
    let response = ScanResponse {
        scan_id: scan.id.clone(),
        status: scan.status.to_string(),
        domain: scan.domain.clone(),
        plan: plan.to_string(),
    };
    info!(scan_id = %scan.id, domain = %domain, plan = %plan, "Scan accepted");
    launch_scan(&state, scan);

    Ok((StatusCode::CREATED, Json(response)).into_response())
}

pub async fn list_scans(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, ZeronError> {
    let limit = query.limit.unwrap_or(20).min(200);
    let offset = query.offset.unwrap_or(0);
    let scans = state.db.list_scans(limit, offset)?;
    Ok(Json(json!({ "scans": scans, "total": scans.len() })))
}

pub async fn get_scan(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Scan>, ZeronError> {
    super::load_scan(&state, &id).map(Json)
}

pub async fn delete_scan(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ZeronError> {
    if state.active_scans.contains_key(&id) {
        return Err(ZeronError::Conflict(format!("scan {} is still running; stop it first", id)));
    }
    if state.db.delete_scan(&id)? {
        Ok(Json(json!({"deleted": true})))
    } else {
        Err(ZeronError::NotFound(format!("scan {}", id)))
    }
}

pub async fn stop_scan(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ZeronError> {
    match state.active_scans.get(&id) {
        Some(handle) => {
            handle.cancel_token.cancel();
            info!(scan_id = %id, "Stop requested");
            Ok(Json(json!({"stopped": true, "scan_id": id})))
        }
        None => Err(ZeronError::NotFound(format!("no active scan {}", id))),
    }
}
