use serde::Serialize;

use crate::models::{FindingCounts, PhaseStatus, Scan};

#[derive(Debug, Clone, Serialize)]
pub struct ScanSummary {
    pub scan_id: String,
    pub domain: String,
    pub status: String,
    pub duration_ms: u64,
    pub subdomains: usize,
    pub endpoints: usize,
    pub vectors: usize,
    pub probes_sent: usize,
    pub phases_completed: usize,
    pub findings: FindingCounts,
    pub collector_errors: usize,
}

pub fn compute_summary(scan: &Scan) -> ScanSummary {
    ScanSummary {
        scan_id: scan.id.clone(),
        domain: scan.domain.clone(),
        status: scan.status.to_string(),
        duration_ms: scan.duration_ms(),
        subdomains: scan.assets.subdomains.len(),
        endpoints: scan.assets.endpoints,
        vectors: scan.assets.vectors,
        probes_sent: scan.assets.probes_sent,
        phases_completed: scan
            .phases
            .iter()
            .filter(|p| p.status == PhaseStatus::Completed)
            .count(),
        findings: scan.finding_counts(),
        collector_errors: scan.assets.collector_errors.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Plan;

    #[test]
    fn test_summary_of_fresh_scan() {
        let mut scan = Scan::new("shop.test", Plan::Pro, Plan::Pro.default_limits(), vec![]);
        scan.assets.endpoints = 7;
        scan.phases[0].status = PhaseStatus::Completed;
        let summary = compute_summary(&scan);
        assert_eq!(summary.status, "pending");
        assert_eq!(summary.endpoints, 7);
        assert_eq!(summary.phases_completed, 1);
        assert_eq!(summary.findings.total, 0);
        assert_eq!(summary.duration_ms, 0);
    }
}
