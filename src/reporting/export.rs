//! Submission payloads for bug bounty platforms.

use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

use crate::models::{Report, Severity, Vulnerability};
use super::{poc, remediation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    HackerOne,
    Bugcrowd,
    Intigriti,
    Synack,
}

impl Platform {
    pub const ALL: [Platform; 4] = [Platform::HackerOne, Platform::Bugcrowd, Platform::Intigriti, Platform::Synack];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::HackerOne => "hackerone",
            Platform::Bugcrowd => "bugcrowd",
            Platform::Intigriti => "intigriti",
            Platform::Synack => "synack",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hackerone" | "h1" => Ok(Platform::HackerOne),
            "bugcrowd" => Ok(Platform::Bugcrowd),
            "intigriti" => Ok(Platform::Intigriti),
            "synack" => Ok(Platform::Synack),
            other => Err(format!("unknown platform '{}'", other)),
        }
    }
}

fn hackerone_priority(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "critical",
        Severity::High => "high",
        Severity::Medium => "medium",
        Severity::Low => "low",
        Severity::Info => "none",
    }
}

fn synack_severity(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "critical",
        Severity::High => "major",
        Severity::Medium => "minor",
        _ => "informational",
    }
}

fn overall_severity(vulns: &[Vulnerability]) -> &'static str {
    let worst = vulns.iter().map(|v| v.severity).min_by_key(|s| s.rank());
    match worst {
        Some(Severity::Critical) => "critical",
        Some(Severity::High) => "high",
        Some(Severity::Medium) => "medium",
        _ => "low",
    }
}

fn overall_impact(vulns: &[Vulnerability]) -> String {
    let critical = vulns.iter().filter(|v| v.severity == Severity::Critical).count();
    let high = vulns.iter().filter(|v| v.severity == Severity::High).count();
    if critical > 0 {
        format!("{} critical vulnerabilities could lead to complete system compromise", critical)
    } else if high > 0 {
        format!("{} high-severity vulnerabilities could lead to data theft or system compromise", high)
    } else {
        "Multiple security issues discovered".to_string()
    }
}

fn description(v: &Vulnerability) -> String {
    let mut text = format!(
        "{} was confirmed at {} {} with {}% confidence using payload `{}`.",
        v.category.display_name(),
        v.method,
        v.endpoint,
        v.confidence,
        v.payload
    );
    if !v.evidence.is_empty() {
        text.push_str(&format!(" Evidence: {}.", v.evidence.join("; ")));
    }
    text
}

fn cvss(v: &Vulnerability) -> (String, f64) {
    match &v.poc {
        Some(p) => (p.cvss_vector.clone(), p.cvss_score),
        None => {
            let p = poc::build_poc(v);
            (p.cvss_vector, p.cvss_score)
        }
    }
}

fn steps(v: &Vulnerability) -> Vec<String> {
    v.poc.as_ref().map(|p| p.steps.clone()).unwrap_or_else(|| poc::steps(v))
}

fn curl(v: &Vulnerability) -> String {
    v.poc.as_ref().map(|p| p.curl.clone()).unwrap_or_else(|| poc::curl_command(v))
}

fn hackerone(report: &Report, program: &str) -> Value {
    let vulns = &report.vulnerabilities;
    let mut body = format!(
        "# Security Vulnerability Report\n\n## Summary\nDiscovered {} security vulnerabilities during automated security assessment of {}.\n\n## Vulnerabilities Found\n\n",
        vulns.len(),
        report.metadata.domain
    );
    for (i, v) in vulns.iter().enumerate() {
        body.push_str(&format!(
            "### {}. {}\n- **Endpoint:** {}\n- **Parameter:** {}\n- **Severity:** {}\n- **Impact:** {}\n\n",
            i + 1,
            v.category.display_name(),
            v.endpoint,
            v.parameter,
            v.severity,
            remediation::impact(v.category).description
        ));
    }
    json!({
        "program_id": program,
        "report_body": body,
        "vulnerability_information": vulns.iter().map(|v| {
            let (vector, score) = cvss(v);
            json!({
                "vulnerability_types": [v.category.as_str()],
                "cwe_ids": remediation::cwe_ids(v.category).iter().map(|c| format!("CWE-{}", c)).collect::<Vec<_>>(),
                "cvss_vector": vector,
                "cvss_score": score,
                "priority": hackerone_priority(v.severity),
                "summary": format!("{} in {}", v.category.as_str(), v.endpoint),
                "description": description(v),
                "steps_to_reproduce": steps(v),
                "proof_of_concept": curl(v),
                "impact": remediation::impact(v.category).description,
            })
        }).collect::<Vec<_>>(),
    })
}

fn bugcrowd(report: &Report, program: &str) -> Value {
    let vulns = &report.vulnerabilities;
    let mut body = format!("# Vulnerability Discovery Report\n**Total Vulnerabilities:** {}\n\n", vulns.len());
    for v in vulns {
        body.push_str(&format!(
            "## {}\nEndpoint: `{}`\nParameter: `{}`\nSeverity: {}\n\n",
            v.category.display_name(),
            v.endpoint,
            v.parameter,
            v.severity
        ));
    }
    json!({
        "program": program,
        "submission_type": "vulnerability",
        "severity": overall_severity(vulns),
        "title": format!("Security Issues Found - {} vulnerabilities", vulns.len()),
        "description": body,
        "vulnerabilities": vulns.iter().map(|v| json!({
            "type": v.category.as_str(),
            "endpoint": v.endpoint,
            "parameter": v.parameter,
            "severity": v.severity.as_str(),
            "cwe_ids": remediation::cwe_ids(v.category),
            "description": description(v),
            "remediation": remediation::recommendation(v.category),
            "steps": steps(v),
            "poc": curl(v),
        })).collect::<Vec<_>>(),
        "impact": overall_impact(vulns),
    })
}

fn intigriti(report: &Report, program: &str) -> Value {
    let vulns = &report.vulnerabilities;
    let mut body = format!("Automated security scan discovered {} potential vulnerabilities:\n\n", vulns.len());
    for v in vulns {
        body.push_str(&format!("- {} ({}) on {}\n", v.category.as_str(), v.severity, v.endpoint));
    }
    json!({
        "program": program,
        "domain": report.metadata.domain,
        "submission": {
            "title": format!("Multiple {} Vulnerabilities Discovered", vulns.len()),
            "description": body,
            "vulnerabilities": vulns.iter().map(|v| {
                let (vector, score) = cvss(v);
                json!({
                    "type": v.category.as_str(),
                    "severity": v.severity.as_str(),
                    "cvss_vector": vector,
                    "cvss_score": score,
                    "cwe_ids": remediation::cwe_ids(v.category),
                    "endpoint": v.endpoint,
                    "parameter": v.parameter,
                    "steps": steps(v),
                    "impact": remediation::impact(v.category).description,
                    "remediation": remediation::recommendation(v.category),
                })
            }).collect::<Vec<_>>(),
        }
    })
}

fn synack(report: &Report, program: &str) -> Value {
    let vulns = &report.vulnerabilities;
    json!({
        "task_id": program,
        "vulnerabilities": vulns.iter().enumerate().map(|(i, v)| json!({
            "id": i + 1,
            "type": v.category.as_str(),
            "severity": synack_severity(v.severity),
            "description": description(v),
            "affected_url": v.endpoint,
            "affected_parameter": v.parameter,
            "cwe_ids": remediation::cwe_ids(v.category),
            "proof_of_concept": v.poc.clone().unwrap_or_else(|| poc::build_poc(v)),
            "remediation": remediation::recommendation(v.category),
            "references": remediation::references(v.category),
        })).collect::<Vec<_>>(),
        "summary": format!("Found {} vulnerabilities", vulns.len()),
    })
}

/// Platform-shaped submission for every vulnerability in the report.
pub fn export(report: &Report, platform: Platform, program: Option<&str>) -> Value {
    let program = program.unwrap_or(&report.metadata.domain);
    match platform {
        Platform::HackerOne => hackerone(report, program),
        Platform::Bugcrowd => bugcrowd(report, program),
        Platform::Intigriti => intigriti(report, program),
        Platform::Synack => synack(report, program),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Plan, Scan, VulnCategory};
    use crate::reporting::build_report;
    use chrono::Utc;

    fn report() -> Report {
        let mut scan = Scan::new("shop.test", Plan::Pro, Plan::Pro.default_limits(), vec![]);
        for (category, severity, param) in [
            (VulnCategory::Sqli, Severity::Critical, "id"),
            (VulnCategory::Xss, Severity::High, "q"),
            (VulnCategory::Cors, Severity::Medium, ""),
        ] {
            scan.vulnerabilities.push(Vulnerability {
                id: Vulnerability::generate_id(),
                category,
                severity,
                score: 80,
                endpoint: "https://shop.test/list.php?id=1".into(),
                method: "GET".into(),
                parameter: param.into(),
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
            });
        }
        build_report(&scan)
    }

    #[test]
    fn test_platform_parse() {
        assert_eq!("HackerOne".parse::<Platform>().unwrap(), Platform::HackerOne);
        assert!("yeswehack".parse::<Platform>().is_err());
    }

    #[test]
    fn test_hackerone_shape() {
        let value = export(&report(), Platform::HackerOne, Some("acme"));
        assert_eq!(value["program_id"], "acme");
        let info = value["vulnerability_information"].as_array().unwrap();
        assert_eq!(info.len(), 3);
        assert_eq!(info[0]["priority"], "critical");
        assert_eq!(info[0]["cwe_ids"][0], "CWE-89");
    }

    #[test]
    fn test_synack_severity_mapping() {
        let value = export(&report(), Platform::Synack, None);
        assert_eq!(value["task_id"], "shop.test");
        let sev: Vec<&str> = value["vulnerabilities"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v["severity"].as_str().unwrap())
            .collect();
        assert_eq!(sev, vec!["critical", "major", "minor"]);
    }

    #[test]
    fn test_bugcrowd_overall_severity() {
        let value = export(&report(), Platform::Bugcrowd, None);
        assert_eq!(value["severity"], "critical");
        assert!(value["impact"].as_str().unwrap().starts_with("1 critical"));
    }
}
