pub mod routes;
pub mod models;
pub mod errors;
pub mod auth;

use std::sync::Arc;
use axum::{middleware, routing::{get, post}, Router};
use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::ZeronConfig;
use crate::db::Database;
use crate::discovery::{HickoryResolver, Resolver};
use crate::errors::ZeronError;
use crate::http::{Fetcher, ReqwestFetcher};
use crate::pipeline::{recover_interrupted, ScanEvent, ScanState};

const EVENT_BUFFER: usize = 1024;

/// Live handle on a running scan.
pub struct ScanHandle {
    pub state: ScanState,
    pub cancel_token: CancellationToken,
}

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub active_scans: Arc<DashMap<String, Arc<ScanHandle>>>,
    pub config: Arc<ZeronConfig>,
    pub fetcher: Arc<dyn Fetcher>,
    pub resolver: Arc<dyn Resolver>,
    pub events: broadcast::Sender<ScanEvent>,
    /// Bearer token required on every route but health, when set.
    pub api_token: Option<String>,
}

impl AppState {
    pub fn new(
        db: Database,
        config: ZeronConfig,
        fetcher: Arc<dyn Fetcher>,
        resolver: Arc<dyn Resolver>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            db,
            active_scans: Arc::new(DashMap::new()),
            config: Arc::new(config),
            fetcher,
            resolver,
            events,
            api_token: None,
        }
    }

    pub fn with_api_token(mut self, token: Option<String>) -> Self {
        self.api_token = token.filter(|t| !t.is_empty());
        self
    }
}

pub async fn create_app_state(db_path: &str, config: ZeronConfig) -> Result<AppState, ZeronError> {
    let db = Database::new(db_path)?;
    recover_interrupted(&db)?;
    let fetcher = Arc::new(ReqwestFetcher::new(&config.http)?);
    let resolver = Arc::new(HickoryResolver::new());
    Ok(AppState::new(db, config, fetcher, resolver)
        .with_api_token(std::env::var("ZERON_API_TOKEN").ok()))
}

pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/plans", get(routes::scans::list_plans))
        .route("/api/scans", post(routes::scans::create_scan).get(routes::scans::list_scans))
        .route("/api/scans/:id", get(routes::scans::get_scan).delete(routes::scans::delete_scan))
        .route("/api/scans/:id/status", get(routes::status::get_status))
        .route("/api/scans/:id/results", get(routes::status::get_results))
        .route("/api/scans/:id/events", get(routes::status::stream_events))
        .route("/api/scans/:id/report", get(routes::reports::get_report))
        .route("/api/scans/:id/export/:platform", get(routes::reports::export_report))
        .route("/api/scans/:id/stop", post(routes::scans::stop_scan))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::api_auth_middleware));

    Router::new()
        .route("/api/health", get(routes::health::health_check))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
