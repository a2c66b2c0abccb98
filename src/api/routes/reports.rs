use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::Value;

use crate::api::AppState;
use crate::errors::ZeronError;
use crate::reporting::{self, Platform, ReportFormat};

#[derive(Deserialize)]
pub struct ReportQuery {
    pub format: Option<String>,
}

#[derive(Deserialize)]
pub struct ExportQuery {
    pub program: Option<String>,
}

pub async fn get_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ReportQuery>,
) -> Result<Response, ZeronError> {
    let format: ReportFormat = match query.format.as_deref() {
        Some(f) => f.parse().map_err(ZeronError::Config)?,
        None => ReportFormat::Json,
    };
    let scan = super::load_scan(&state, &id)?;
    let report = reporting::build_report(&scan);

    Ok(match format {
        ReportFormat::Json => Json(report).into_response(),
        ReportFormat::Markdown => (
            [(header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
            reporting::render(&report, format)?,
        )
            .into_response(),
        ReportFormat::Html => (
            [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
            reporting::render(&report, format)?,
        )
            .into_response(),
    })
}

pub async fn export_report(
    State(state): State<AppState>,
    Path((id, platform)): Path<(String, String)>,
    Query(query): Query<ExportQuery>,
) -> Result<Json<Value>, ZeronError> {
    let platform: Platform = platform.parse().map_err(ZeronError::Config)?;
    let scan = super::load_scan(&state, &id)?;
    let report = reporting::build_report(&scan);
    Ok(Json(reporting::export(&report, platform, query.program.as_deref())))
}
