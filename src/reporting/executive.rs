use chrono::Utc;
use std::collections::BTreeMap;
use url::Url;

use crate::models::{
    ExecutiveSummary, PriorityEntry, PriorityTier, Recommendation, Report, ReportMetadata, Scan, Severity,
    Statistics, Vulnerability,
};
use crate::scoring::{dedup::deduplicate, simhash};
use crate::utils::formatting::format_usd;
use super::{poc, remediation};

const TIER_LIMIT: usize = 5;
const MEDIUM_RISK_THRESHOLD: usize = 10;

const TIERS: [(u8, Severity, &str); 3] = [
    (1, Severity::Critical, "IMMEDIATE (within 24 hours)"),
    (2, Severity::High, "URGENT (within 7 days)"),
    (3, Severity::Medium, "SOON (within 30 days)"),
];

pub fn bounty_estimate(severity: Severity) -> u64 {
    match severity {
        Severity::Critical => 5000,
        Severity::High => 2000,
        Severity::Medium => 500,
        Severity::Low => 100,
        Severity::Info => 0,
    }
}

pub fn risk_level(vulns: &[Vulnerability]) -> Severity {
    if vulns.iter().any(|v| v.severity == Severity::Critical) {
        Severity::Critical
    } else if vulns.iter().any(|v| v.severity == Severity::High) {
        Severity::High
    } else if vulns.len() > MEDIUM_RISK_THRESHOLD {
        Severity::Medium
    } else {
        Severity::Low
    }
}

pub fn statistics(vulns: &[Vulnerability]) -> Statistics {
    let mut stats = Statistics { total: vulns.len(), ..Default::default() };
    for severity in Severity::ALL {
        stats.by_severity.insert(severity.as_str().to_string(), 0);
    }
    for v in vulns {
        *stats.by_severity.entry(v.severity.as_str().to_string()).or_default() += 1;
        *stats.by_category.entry(v.category.as_str().to_string()).or_default() += 1;
        *stats.by_endpoint.entry(v.endpoint.clone()).or_default() += 1;
    }
    stats
}

fn executive_summary(scan: &Scan, vulns: &[Vulnerability]) -> ExecutiveSummary {
    let count = |s: Severity| vulns.iter().filter(|v| v.severity == s).count();
    let risk = risk_level(vulns);
    let bounty: u64 = vulns.iter().map(|v| bounty_estimate(v.severity)).sum();
    let summary = if vulns.is_empty() {
        format!("No confirmed vulnerabilities were found on {}.", scan.domain)
    } else {
        format!(
            "The assessment of {} confirmed {} vulnerabilities ({} critical, {} high). Overall risk is {}. Estimated bounty value: {}.",
            scan.domain,
            vulns.len(),
            count(Severity::Critical),
            count(Severity::High),
            risk,
            format_usd(bounty)
        )
    };
    let recommendation = match risk {
        Severity::Critical => "Remediate critical findings immediately and consider taking affected endpoints offline.",
        Severity::High => "Schedule fixes for high-severity findings within the week.",
        Severity::Medium => "Address findings in the next release cycle.",
        _ => "Maintain current controls and rescan after significant changes.",
    };
    ExecutiveSummary {
        risk_level: risk,
        summary,
        recommendation: recommendation.to_string(),
        critical: count(Severity::Critical),
        high: count(Severity::High),
        medium: count(Severity::Medium),
        low: count(Severity::Low),
        info: count(Severity::Info),
        estimated_bounty: bounty,
    }
}

pub fn remediation_priority(vulns: &[Vulnerability]) -> Vec<PriorityTier> {
    TIERS
        .iter()
        .map(|(priority, severity, timeline)| {
            let matching: Vec<&Vulnerability> = vulns.iter().filter(|v| v.severity == *severity).collect();
            PriorityTier {
                priority: *priority,
                severity: *severity,
                timeline: timeline.to_string(),
                count: matching.len(),
                vulnerabilities: matching
                    .into_iter()
                    .take(TIER_LIMIT)
                    .map(|v| PriorityEntry {
                        id: v.id.clone(),
                        title: v.title(),
                        endpoint: v.endpoint.clone(),
                        parameter: v.parameter.clone(),
                    })
                    .collect(),
            }
        })
        .collect()
}

fn recommendations(vulns: &[Vulnerability]) -> Vec<Recommendation> {
    let mut by_category: BTreeMap<&'static str, (usize, &'static str)> = BTreeMap::new();
    for v in vulns {
        let entry = by_category
            .entry(v.category.as_str())
            .or_insert((0, remediation::recommendation(v.category)));
        entry.0 += 1;
    }
    let mut out: Vec<Recommendation> = by_category
        .into_iter()
        .map(|(category, (count, text))| Recommendation {
            category: category.to_string(),
            count,
            recommendation: text.to_string(),
        })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.category.cmp(&b.category)));
    out
}

/// Assemble the aggregate report for a scan.
///
/// Never fails: records that cannot be rendered are kept without a proof of concept
/// and flagged through `partial` and `warnings`.
pub fn build_report(scan: &Scan) -> Report {
    let mut warnings = Vec::new();
    let (mut vulns, dedup) = deduplicate(scan.vulnerabilities.clone());

    for v in vulns.iter_mut() {
        if Url::parse(&v.endpoint).is_err() {
            warnings.push(format!("{}: endpoint '{}' is not a valid URL", v.id, v.endpoint));
            continue;
        }
        if v.confidence > 100 {
            warnings.push(format!("{}: confidence {} clamped to 100", v.id, v.confidence));
            v.confidence = 100;
        }
        if v.poc.is_none() {
            v.poc = Some(poc::build_poc(v));
        }
    }
    vulns.sort_by_key(|v| (v.severity.rank(), std::cmp::Reverse(v.confidence)));

    let near_duplicates = simhash::near_duplicates(&scan.assets.fingerprints, simhash::DEFAULT_THRESHOLD);

    Report {
        metadata: ReportMetadata {
            scan_id: scan.id.clone(),
            domain: scan.domain.clone(),
            status: scan.status.as_str().to_string(),
            generated_at: Utc::now(),
            started_at: scan.started_at,
            completed_at: scan.completed_at,
            duration_ms: scan.duration_ms(),
        },
        statistics: statistics(&vulns),
        executive_summary: executive_summary(scan, &vulns),
        remediation_priority: remediation_priority(&vulns),
        recommendations: recommendations(&vulns),
        dedup,
        near_duplicates,
        partial: !warnings.is_empty(),
        warnings,
        vulnerabilities: vulns,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Plan, VulnCategory};

    fn vuln(category: VulnCategory, severity: Severity, endpoint: &str, parameter: &str) -> Vulnerability {
        Vulnerability {
            id: Vulnerability::generate_id(),
            category,
            severity,
            score: 80,
            endpoint: endpoint.into(),
            method: "GET".into(),
            parameter: parameter.into(),
            description: String::new(),
            payload: "'".into(),
            confidence: 86,
            evidence: vec![],
            response_status: Some(200),
            response_snippet: None,
            poc: None,
            discovered_at: Utc::now(),
            occurrences: 1,
            endpoints: vec![],
        }
    }

    fn scan_with(vulns: Vec<Vulnerability>) -> Scan {
        let mut scan = Scan::new("shop.test", Plan::Pro, Plan::Pro.default_limits(), vec![]);
        scan.vulnerabilities = vulns;
        scan
    }

    #[test]
    fn test_report_sections() {
        let scan = scan_with(vec![
            vuln(VulnCategory::Sqli, Severity::Critical, "https://shop.test/a?id=1", "id"),
            vuln(VulnCategory::Sqli, Severity::Critical, "https://shop.test/b?id=1", "id"),
            vuln(VulnCategory::Xss, Severity::High, "https://shop.test/s?q=x", "q"),
            vuln(VulnCategory::Cors, Severity::Medium, "https://shop.test/", ""),
        ]);
        let report = build_report(&scan);
        assert_eq!(report.statistics.total, 3);
        assert_eq!(report.dedup.original, 4);
        assert_eq!(report.dedup.removed, 1);
        assert_eq!(report.executive_summary.risk_level, Severity::Critical);
        assert_eq!(report.executive_summary.estimated_bounty, 5000 + 2000 + 500);
        assert_eq!(report.remediation_priority.len(), 3);
        assert_eq!(report.remediation_priority[0].timeline, "IMMEDIATE (within 24 hours)");
        assert_eq!(report.remediation_priority[0].count, 1);
        assert!(report.vulnerabilities.iter().all(|v| v.poc.is_some()));
        assert!(!report.partial);
        assert_eq!(report.vulnerabilities[0].severity, Severity::Critical);
    }

    #[test]
    fn test_risk_levels() {
        assert_eq!(risk_level(&[]), Severity::Low);
        let many: Vec<Vulnerability> = (0..11)
            .map(|i| vuln(VulnCategory::InfoDisclosure, Severity::Low, "https://shop.test/", &format!("p{}", i)))
            .collect();
        assert_eq!(risk_level(&many), Severity::Medium);
        assert_eq!(risk_level(&many[..10]), Severity::Low);
    }

    #[test]
    fn test_tier_lists_at_most_five() {
        let vulns: Vec<Vulnerability> = (0..8)
            .map(|i| vuln(VulnCategory::Xss, Severity::High, "https://shop.test/s", &format!("q{}", i)))
            .collect();
        let tiers = remediation_priority(&vulns);
        assert_eq!(tiers[1].count, 8);
        assert_eq!(tiers[1].vulnerabilities.len(), 5);
    }

    #[test]
    fn test_malformed_record_degrades_to_partial() {
        let scan = scan_with(vec![
            vuln(VulnCategory::Sqli, Severity::High, "not a url", "id"),
            vuln(VulnCategory::Xss, Severity::High, "https://shop.test/s?q=1", "q"),
        ]);
        let report = build_report(&scan);
        assert!(report.partial);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.vulnerabilities.len(), 2);
        assert_eq!(report.vulnerabilities.iter().filter(|v| v.poc.is_none()).count(), 1);
    }

    #[test]
    fn test_empty_scan_report() {
        let report = build_report(&scan_with(vec![]));
        assert_eq!(report.statistics.total, 0);
        assert_eq!(report.statistics.by_severity["CRITICAL"], 0);
        assert!(report.executive_summary.summary.contains("No confirmed vulnerabilities"));
    }
}
