use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::severity::Severity;
use super::vulnerability::Vulnerability;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    #[default]
    Basic,
    Pro,
    Enterprise,
}

impl Plan {
    pub const ALL: [Plan; 3] = [Plan::Basic, Plan::Pro, Plan::Enterprise];

    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Basic => "basic",
            Plan::Pro => "pro",
            Plan::Enterprise => "enterprise",
        }
    }

    pub fn default_limits(&self) -> PlanLimits {
        match self {
            Plan::Basic => PlanLimits { max_endpoints: 10, max_payloads: 100, concurrency: 1 },
            Plan::Pro => PlanLimits { max_endpoints: 100, max_payloads: 1000, concurrency: 5 },
            Plan::Enterprise => PlanLimits { max_endpoints: 1000, max_payloads: 5000, concurrency: 20 },
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Plan {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(Plan::Basic),
            "pro" => Ok(Plan::Pro),
            "enterprise" => Ok(Plan::Enterprise),
            other => Err(format!("unknown plan '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanLimits {
    pub max_endpoints: usize,
    /// Total probe budget for the exploitation phase.
    pub max_payloads: usize,
    pub concurrency: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl ScanStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScanStatus::Completed | ScanStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScanStatus::Pending => "pending",
            ScanStatus::Running => "running",
            ScanStatus::Completed => "completed",
            ScanStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    Pending,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseRecord {
    pub id: u8,
    pub name: String,
    pub status: PhaseStatus,
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingCounts {
    pub total: usize,
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub info: usize,
}

impl FindingCounts {
    pub fn from_vulnerabilities(vulns: &[Vulnerability]) -> Self {
        let mut counts = FindingCounts { total: vulns.len(), ..Default::default() };
        for v in vulns {
            match v.severity {
                Severity::Critical => counts.critical += 1,
                Severity::High => counts.high += 1,
                Severity::Medium => counts.medium += 1,
                Severity::Low => counts.low += 1,
                Severity::Info => counts.info += 1,
            }
        }
        counts
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Technology {
    pub name: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub occurrences: usize,
}

/// What discovery and surface construction produced, kept for reporting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetSummary {
    pub subdomains: Vec<String>,
    pub endpoints: usize,
    pub vectors: usize,
    pub probes_sent: usize,
    pub technologies: Vec<Technology>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub collector_errors: Vec<String>,
    /// Page SimHashes keyed by URL, used for near-duplicate clustering.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fingerprints: Vec<(String, u64)>,
}

/// The single mutable record a scan run owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scan {
    pub id: String,
    pub domain: String,
    pub plan: Plan,
    pub limits: PlanLimits,
    #[serde(default)]
    pub scope: Vec<String>,
    pub status: ScanStatus,
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_phase: Option<String>,
    pub phases: Vec<PhaseRecord>,
    #[serde(default)]
    pub vulnerabilities: Vec<Vulnerability>,
    #[serde(default)]
    pub assets: AssetSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Scan {
    pub fn new(domain: &str, plan: Plan, limits: PlanLimits, scope: Vec<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            domain: domain.to_string(),
            plan,
            limits,
            scope,
            status: ScanStatus::Pending,
            progress: 0,
            current_phase: None,
            phases: crate::pipeline::phase::initial_records(),
            vulnerabilities: Vec::new(),
            assets: AssetSummary::default(),
            error: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    pub fn finding_counts(&self) -> FindingCounts {
        FindingCounts::from_vulnerabilities(&self.vulnerabilities)
    }

    pub fn duration_ms(&self) -> u64 {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => (end - start).num_milliseconds().max(0) as u64,
            (Some(start), None) => (Utc::now() - start).num_milliseconds().max(0) as u64,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_limits() {
        let basic = Plan::Basic.default_limits();
        assert_eq!(basic.max_endpoints, 10);
        assert_eq!(basic.max_payloads, 100);
        assert_eq!(basic.concurrency, 1);
        assert_eq!(Plan::Enterprise.default_limits().concurrency, 20);
    }

    #[test]
    fn test_plan_from_str() {
        assert_eq!("PRO".parse::<Plan>().unwrap(), Plan::Pro);
        assert!("gold".parse::<Plan>().is_err());
    }

    #[test]
    fn test_new_scan_has_five_pending_phases() {
        let scan = Scan::new("example.com", Plan::Pro, Plan::Pro.default_limits(), vec![]);
        assert_eq!(scan.status, ScanStatus::Pending);
        assert_eq!(scan.phases.len(), 5);
        assert!(scan.phases.iter().all(|p| p.status == PhaseStatus::Pending));
        assert_eq!(scan.progress, 0);
    }

    #[test]
    fn test_scan_document_roundtrip_keeps_status() {
        let scan = Scan::new("example.com", Plan::Basic, Plan::Basic.default_limits(), vec![]);
        let json = serde_json::to_value(&scan).unwrap();
        assert_eq!(json["status"], "pending");
        assert_eq!(json["phases"][0]["status"], "pending");
        let back: Scan = serde_json::from_value(json).unwrap();
        assert_eq!(back.id, scan.id);
    }
}
