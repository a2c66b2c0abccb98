use serde::{Deserialize, Serialize};

use crate::models::{FindingCounts, PhaseRecord, Scan, Statistics, Vulnerability};

/// Scope as newline-delimited text or as a list of tokens.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ScopeInput {
    Text(String),
    Lines(Vec<String>),
}

impl ScopeInput {
    pub fn into_lines(self) -> Vec<String> {
        match self {
            ScopeInput::Text(text) => text.lines().map(str::to_string).collect(),
            ScopeInput::Lines(lines) => lines,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateScanRequest {
    pub domain: String,
    pub plan: Option<String>,
    pub scope: Option<ScopeInput>,
}

#[derive(Serialize)]
pub struct ScanResponse {
    pub scan_id: String,
    pub status: String,
    pub domain: String,
    pub plan: String,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub scan_id: String,
    pub status: String,
    pub progress: u8,
    pub current_phase: Option<String>,
    pub phases: Vec<PhaseRecord>,
    pub findings_count: FindingCounts,
    pub error: Option<String>,
}

impl From<&Scan> for StatusResponse {
    fn from(scan: &Scan) -> Self {
        Self {
            scan_id: scan.id.clone(),
            status: scan.status.to_string(),
            progress: scan.progress,
            current_phase: scan.current_phase.clone(),
            phases: scan.phases.clone(),
            findings_count: scan.finding_counts(),
            error: scan.error.clone(),
        }
    }
}

#[derive(Serialize)]
pub struct ResultsResponse {
    pub scan_id: String,
    pub domain: String,
    pub status: String,
    pub vulnerabilities: Vec<Vulnerability>,
    pub statistics: Statistics,
    pub error: Option<String>,
}

