use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::severity::Severity;
use super::vulnerability::Vulnerability;

/// Reproduction material attached to a vulnerability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofOfConcept {
    pub title: String,
    pub summary: String,
    pub steps: Vec<String>,
    pub http_request: String,
    pub curl: String,
    pub python: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_snippet: Option<String>,
    pub impact: Impact,
    pub remediation: Remediation,
    pub cwe: Vec<u32>,
    pub references: Vec<String>,
    pub cvss_vector: String,
    pub cvss_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Impact {
    pub description: String,
    pub confidentiality: String,
    pub integrity: String,
    pub availability: String,
    pub business: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Remediation {
    pub immediate: Vec<String>,
    pub long_term: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_example: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub scan_id: String,
    pub domain: String,
    pub status: String,
    pub generated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Statistics {
    pub total: usize,
    pub by_severity: BTreeMap<String, usize>,
    pub by_category: BTreeMap<String, usize>,
    pub by_endpoint: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutiveSummary {
    pub risk_level: Severity,
    pub summary: String,
    pub recommendation: String,
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub info: usize,
    pub estimated_bounty: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorityTier {
    pub priority: u8,
    pub severity: Severity,
    pub timeline: String,
    pub count: usize,
    pub vulnerabilities: Vec<PriorityEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorityEntry {
    pub id: String,
    pub title: String,
    pub endpoint: String,
    pub parameter: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub category: String,
    pub count: usize,
    pub recommendation: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DedupStats {
    pub original: usize,
    pub deduplicated: usize,
    pub removed: usize,
    pub reduction_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearDuplicate {
    pub first: String,
    pub second: String,
    pub similarity: f64,
}

/// Aggregate report derived from a scan's vulnerabilities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub statistics: Statistics,
    pub executive_summary: ExecutiveSummary,
    pub remediation_priority: Vec<PriorityTier>,
    pub recommendations: Vec<Recommendation>,
    pub dedup: DedupStats,
    pub near_duplicates: Vec<NearDuplicate>,
    pub vulnerabilities: Vec<Vulnerability>,
    /// Set when some inputs could not be rendered and were skipped.
    pub partial: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}
