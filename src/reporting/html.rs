use crate::models::{Report, Severity};
use crate::utils::formatting::format_usd;

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

fn severity_color(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "#b91c1c",
        Severity::High => "#ea580c",
        Severity::Medium => "#ca8a04",
        Severity::Low => "#2563eb",
        Severity::Info => "#6b7280",
    }
}

/// Standalone HTML page with inline styles.
pub fn format_report_html(report: &Report) -> String {
    let s = &report.executive_summary;
    let mut body = String::new();

    body.push_str(&format!(
        "<h1>Security Assessment Report: {}</h1>\n<p class=\"meta\">Scan {} &middot; {} &middot; generated {}</p>\n",
        escape(&report.metadata.domain),
        escape(&report.metadata.scan_id),
        escape(&report.metadata.status),
        report.metadata.generated_at.format("%Y-%m-%d %H:%M UTC")
    ));
    if report.partial {
        body.push_str("<div class=\"warn\"><strong>Partial report.</strong><ul>");
        for w in &report.warnings {
            body.push_str(&format!("<li>{}</li>", escape(w)));
        }
        body.push_str("</ul></div>\n");
    }

    body.push_str(&format!(
        "<h2>Executive Summary</h2>\n<p>{}</p>\n<p><span class=\"badge\" style=\"background:{}\">{}</span> Estimated bounty: {}</p>\n",
        escape(&s.summary),
        severity_color(s.risk_level),
        s.risk_level,
        format_usd(s.estimated_bounty)
    ));
    body.push_str("<table><tr><th>Severity</th><th>Count</th></tr>");
    for (severity, count) in [
        (Severity::Critical, s.critical),
        (Severity::High, s.high),
        (Severity::Medium, s.medium),
        (Severity::Low, s.low),
        (Severity::Info, s.info),
    ] {
        body.push_str(&format!(
            "<tr><td style=\"color:{}\">{}</td><td>{}</td></tr>",
            severity_color(severity),
            severity,
            count
        ));
    }
    body.push_str("</table>\n");

    body.push_str("<h2>Remediation Priority</h2>\n<table><tr><th>Priority</th><th>Timeline</th><th>Findings</th></tr>");
    for tier in &report.remediation_priority {
        let items: Vec<String> = tier.vulnerabilities.iter().map(|e| escape(&e.title)).collect();
        body.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
            tier.priority,
            escape(&tier.timeline),
            if items.is_empty() { "&ndash;".to_string() } else { items.join("<br>") }
        ));
    }
    body.push_str("</table>\n<h2>Findings</h2>\n");

    if report.vulnerabilities.is_empty() {
        body.push_str("<p>No exploitable vulnerabilities were confirmed during this assessment.</p>\n");
    }
    for v in &report.vulnerabilities {
        body.push_str(&format!(
            "<div class=\"finding\" style=\"border-left-color:{}\">\n<h3>{}</h3>\n<p><strong>{}</strong> ({}) &middot; confidence {}% &middot; <code>{} {}</code></p>\n<p>Payload: <code>{}</code></p>\n",
            severity_color(v.severity),
            escape(&v.title()),
            v.severity,
            v.score,
            v.confidence,
            escape(&v.method),
            escape(&v.endpoint),
            escape(&v.payload)
        ));
        if !v.evidence.is_empty() {
            body.push_str("<ul>");
            for e in &v.evidence {
                body.push_str(&format!("<li>{}</li>", escape(e)));
            }
            body.push_str("</ul>\n");
        }
        if let Some(poc) = &v.poc {
            body.push_str("<ol>");
            for step in &poc.steps {
                body.push_str(&format!("<li>{}</li>", escape(step)));
            }
            body.push_str("</ol>\n");
            body.push_str(&format!("<pre>{}</pre>\n", escape(&poc.curl)));
            body.push_str(&format!(
                "<p>CVSS {} <code>{}</code> &middot; {}</p>\n",
                poc.cvss_score,
                escape(&poc.cvss_vector),
                poc.cwe.iter().map(|c| format!("CWE-{}", c)).collect::<Vec<_>>().join(", ")
            ));
        }
        body.push_str("</div>\n");
    }

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>Security Report: {}</title>\n<style>\nbody{{font-family:system-ui,sans-serif;max-width:960px;margin:2rem auto;color:#111}}\ntable{{border-collapse:collapse;margin:1rem 0}}td,th{{border:1px solid #ddd;padding:.4rem .8rem;text-align:left}}\n.badge{{color:#fff;padding:.2rem .6rem;border-radius:4px}}\n.finding{{border-left:4px solid #999;padding:.5rem 1rem;margin:1rem 0;background:#fafafa}}\n.warn{{background:#fff7ed;padding:.5rem 1rem}}.meta{{color:#555}}\npre{{background:#111;color:#eee;padding:.6rem;overflow-x:auto}}\n</style>\n</head>\n<body>\n{}</body>\n</html>\n",
        escape(&report.metadata.domain),
        body
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Plan, Scan};
    use crate::reporting::build_report;

    #[test]
    fn test_html_is_standalone_and_escaped() {
        let scan = Scan::new("<shop>.test", Plan::Basic, Plan::Basic.default_limits(), vec![]);
        let html = format_report_html(&build_report(&scan));
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("&lt;shop&gt;.test"));
        assert!(!html.contains("<shop>"));
        assert!(html.trim_end().ends_with("</html>"));
    }
}
