use crate::models::{Report, Severity, Vulnerability};
use crate::utils::formatting::{format_duration, format_usd};

pub fn format_vulnerability_markdown(vuln: &Vulnerability) -> String {
    let mut out = format!(
        "### {} ({})\n\n**Severity:** {} ({})\n**Category:** {}\n**Endpoint:** `{} {}`\n**Confidence:** {}%\n",
        vuln.title(),
        vuln.id,
        vuln.severity,
        vuln.score,
        vuln.category.display_name(),
        vuln.method,
        vuln.endpoint,
        vuln.confidence,
    );
    if vuln.occurrences > 1 {
        out.push_str(&format!("**Occurrences:** {} across {} endpoints\n", vuln.occurrences, vuln.endpoints.len()));
    }
    out.push_str(&format!("\n**Payload:** `{}`\n", vuln.payload.replace('`', "\\`")));
    if !vuln.evidence.is_empty() {
        out.push_str("\n**Evidence:**\n```\n");
        out.push_str(&vuln.evidence.join("\n"));
        out.push_str("\n```\n");
    }
    if let Some(poc) = &vuln.poc {
        out.push_str("\n**Steps to reproduce:**\n\n");
        for (i, step) in poc.steps.iter().enumerate() {
            out.push_str(&format!("{}. {}\n", i + 1, step));
        }
        out.push_str(&format!("\n```bash\n{}\n```\n", poc.curl));
        out.push_str(&format!("\n**CVSS:** {} `{}`\n", poc.cvss_score, poc.cvss_vector));
        if let Some(first) = poc.remediation.immediate.first() {
            out.push_str(&format!("\n**Recommendation:** {}\n", first));
        }
    }
    out
}

pub fn format_executive_summary(report: &Report) -> String {
    let s = &report.executive_summary;
    format!(
        "## Executive Summary\n\n{}\n\n**Risk level:** {}\n**Estimated bounty:** {}\n\n| Severity | Count |\n|---|---|\n| Critical | {} |\n| High | {} |\n| Medium | {} |\n| Low | {} |\n| Info | {} |\n| **Total** | **{}** |\n",
        s.summary,
        s.risk_level,
        format_usd(s.estimated_bounty),
        s.critical,
        s.high,
        s.medium,
        s.low,
        s.info,
        report.statistics.total
    )
}

pub fn format_report_markdown(report: &Report) -> String {
    let m = &report.metadata;
    let mut out = format!(
        "# Security Assessment Report: {}\n\n**Scan:** `{}`  \n**Status:** {}  \n**Generated:** {}  \n**Duration:** {}\n\n",
        m.domain,
        m.scan_id,
        m.status,
        m.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
        format_duration(m.duration_ms)
    );
    if report.partial {
        out.push_str("> **Partial report:** some records could not be rendered.\n");
        for w in &report.warnings {
            out.push_str(&format!("> - {}\n", w));
        }
        out.push('\n');
    }
    out.push_str(&format_executive_summary(report));

    out.push_str("\n## Remediation Priority\n\n| Priority | Severity | Timeline | Count |\n|---|---|---|---|\n");
    for tier in &report.remediation_priority {
        out.push_str(&format!("| {} | {} | {} | {} |\n", tier.priority, tier.severity, tier.timeline, tier.count));
    }

    if !report.recommendations.is_empty() {
        out.push_str("\n## Recommendations\n\n");
        for r in &report.recommendations {
            out.push_str(&format!("- **{}** ({}): {}\n", r.category, r.count, r.recommendation));
        }
    }

    if report.dedup.removed > 0 {
        out.push_str(&format!(
            "\n_Deduplication merged {} of {} raw findings ({}% reduction)._\n",
            report.dedup.removed, report.dedup.original, report.dedup.reduction_percent
        ));
    }
    if !report.near_duplicates.is_empty() {
        out.push_str("\n## Near-Duplicate Assets\n\n| First | Second | Similarity |\n|---|---|---|\n");
        for pair in &report.near_duplicates {
            out.push_str(&format!("| {} | {} | {:.2} |\n", pair.first, pair.second, pair.similarity));
        }
    }

    out.push_str("\n## Findings\n\n");
    if report.vulnerabilities.is_empty() {
        out.push_str("No exploitable vulnerabilities were confirmed during this assessment.\n");
    }
    for severity in Severity::ALL {
        for vuln in report.vulnerabilities.iter().filter(|v| v.severity == severity) {
            out.push_str(&format_vulnerability_markdown(vuln));
            out.push_str("\n---\n\n");
        }
    }
    out
}
