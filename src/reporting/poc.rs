//! Proof-of-concept material: reproduction steps and equivalent requests.

use url::Url;

use crate::exploit::probes::with_query_value;
use crate::models::{ProofOfConcept, Vulnerability, VulnCategory};
use crate::scoring::CvssVector;
use crate::utils::truncation::truncate_chars;
use super::remediation;

const SNIPPET_CHARS: usize = 500;

/// URL and optional form body that reproduce the finding.
fn reproduction(vuln: &Vulnerability) -> (String, Option<String>) {
    if vuln.method == "GET" || vuln.parameter.is_empty() {
        let url = if vuln.parameter.is_empty() {
            vuln.endpoint.clone()
        } else {
            with_query_value(&vuln.endpoint, &vuln.parameter, &vuln.payload)
        };
        return (url, None);
    }
    let body = url::form_urlencoded::Serializer::new(String::new())
        .append_pair(&vuln.parameter, &vuln.payload)
        .finish();
    (vuln.endpoint.clone(), Some(body))
}

fn extra_headers(vuln: &Vulnerability) -> Vec<(String, String)> {
    if vuln.category == VulnCategory::Cors {
        vec![("Origin".to_string(), vuln.payload.clone())]
    } else {
        Vec::new()
    }
}

pub fn http_request(vuln: &Vulnerability) -> String {
    let (url, body) = reproduction(vuln);
    let parsed = Url::parse(&url).ok();
    let host = parsed
        .as_ref()
        .and_then(|u| u.host_str().map(String::from))
        .unwrap_or_default();
    let target = parsed
        .as_ref()
        .map(|u| match u.query() {
            Some(q) => format!("{}?{}", u.path(), q),
            None => u.path().to_string(),
        })
        .unwrap_or_else(|| url.clone());

    let mut lines = vec![format!("{} {} HTTP/1.1", vuln.method, target), format!("Host: {}", host)];
    for (name, value) in extra_headers(vuln) {
        lines.push(format!("{}: {}", name, value));
    }
    match body {
        Some(body) => {
            lines.push("Content-Type: application/x-www-form-urlencoded".to_string());
            lines.push(format!("Content-Length: {}", body.len()));
            lines.push(String::new());
            lines.push(body);
        }
        None => lines.push(String::new()),
    }
    lines.join("\r\n")
}

fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}

pub fn curl_command(vuln: &Vulnerability) -> String {
    let (url, body) = reproduction(vuln);
    let mut parts = vec!["curl".to_string(), "-i".to_string()];
    if vuln.method != "GET" {
        parts.push(format!("-X {}", vuln.method));
    }
    for (name, value) in extra_headers(vuln) {
        parts.push(format!("-H {}", shell_quote(&format!("{}: {}", name, value))));
    }
    if let Some(body) = body {
        parts.push(format!("--data {}", shell_quote(&body)));
    }
    parts.push(shell_quote(&url));
    parts.join(" ")
}

pub fn python_snippet(vuln: &Vulnerability) -> String {
    let mut args = vec![format!("{:?}", vuln.method)];
    let field = format!("{{{:?}: {:?}}}", vuln.parameter, vuln.payload);
    if vuln.parameter.is_empty() {
        args.push(format!("{:?}", vuln.endpoint));
    } else if vuln.method == "GET" {
        args.push(format!("{:?}", strip_param(&vuln.endpoint, &vuln.parameter)));
        args.push(format!("params={}", field));
    } else {
        args.push(format!("{:?}", vuln.endpoint));
        args.push(format!("data={}", field));
    }
    let headers: Vec<String> = extra_headers(vuln)
        .into_iter()
        .map(|(k, v)| format!("{:?}: {:?}", k, v))
        .collect();
    if !headers.is_empty() {
        args.push(format!("headers={{{}}}", headers.join(", ")));
    }
    args.push("allow_redirects=False".to_string());
    format!(
        "import requests\n\nresp = requests.request({})\nprint(resp.status_code)\nprint(resp.text[:500])\n",
        args.join(", ")
    )
}

fn strip_param(url: &str, name: &str) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        return url.to_string();
    };
    let pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| k != name)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if pairs.is_empty() {
        parsed.set_query(None);
    } else {
        parsed.query_pairs_mut().clear().extend_pairs(pairs);
    }
    parsed.to_string()
}

pub fn steps(vuln: &Vulnerability) -> Vec<String> {
    let target = format!("{} {}", vuln.method, vuln.endpoint);
    let param = &vuln.parameter;
    let payload = &vuln.payload;
    match vuln.category {
        VulnCategory::Sqli => vec![
            format!("Send {} with the '{}' parameter set to: {}", target, param, payload),
            "Observe the database error or altered result set in the response".to_string(),
            "Confirm with a boolean pair (' AND '1'='1 vs ' AND '1'='2) or a time-based payload".to_string(),
        ],
        VulnCategory::Xss => vec![
            format!("Open {} with '{}' set to: {}", target, param, payload),
            "View the response source and locate the unencoded reflection".to_string(),
            "Load the URL in a browser and observe script execution".to_string(),
        ],
        VulnCategory::Ssrf => vec![
            format!("Send {} with '{}' pointing at an internal address: {}", target, param, payload),
            "Observe internal service or metadata content in the response".to_string(),
        ],
        VulnCategory::Rce => vec![
            format!("Send {} with '{}' set to: {}", target, param, payload),
            "Observe command output (for example uid/gid) in the response".to_string(),
        ],
        VulnCategory::PathTraversal | VulnCategory::Lfi => vec![
            format!("Send {} with '{}' set to: {}", target, param, payload),
            "Observe the contents of the server file in the response".to_string(),
        ],
        VulnCategory::Idor => vec![
            format!("Request {} with the original '{}' value and note the returned object", target, param),
            format!("Change '{}' to {} and resend", param, payload),
            "Observe another user's object returned without an authorization error".to_string(),
        ],
        VulnCategory::Cors => vec![
            format!("Send {} with header Origin: {}", target, payload),
            "Observe Access-Control-Allow-Origin reflecting the untrusted origin".to_string(),
            "Check whether Access-Control-Allow-Credentials is true".to_string(),
        ],
        VulnCategory::OpenRedirect => vec![
            format!("Open {} with '{}' set to: {}", target, param, payload),
            "Observe the redirect to the external host".to_string(),
        ],
        VulnCategory::AuthBypass => vec![
            format!("Submit the login form at {} with '{}' set to: {}", target, param, payload),
            "Observe an authenticated session or redirect into the application".to_string(),
        ],
        VulnCategory::BusinessLogic => vec![
            format!("Send {} with '{}' set to the out-of-range value {}", target, param, payload),
            "Observe the value accepted and processed without validation".to_string(),
        ],
        VulnCategory::InfoDisclosure => vec![
            format!("Send {} with '{}' set to: {}", target, param, payload),
            "Observe the internal details disclosed in the response".to_string(),
        ],
        _ => vec![
            format!("Send {} with '{}' set to: {}", target, param, payload),
            "Compare the response against an unmodified request".to_string(),
        ],
    }
}

fn summary(vuln: &Vulnerability) -> String {
    let location = if vuln.parameter.is_empty() {
        vuln.endpoint.clone()
    } else {
        format!("the '{}' parameter of {}", vuln.parameter, vuln.endpoint)
    };
    format!(
        "{} was confirmed in {} with {}% confidence.",
        vuln.category.display_name(),
        location,
        vuln.confidence
    )
}

pub fn build_poc(vuln: &Vulnerability) -> ProofOfConcept {
    let cvss = CvssVector::for_category(vuln.category);
    ProofOfConcept {
        title: vuln.title(),
        summary: summary(vuln),
        steps: steps(vuln),
        http_request: http_request(vuln),
        curl: curl_command(vuln),
        python: python_snippet(vuln),
        response_snippet: vuln
            .response_snippet
            .as_deref()
            .map(|s| truncate_chars(s, SNIPPET_CHARS)),
        impact: remediation::impact(vuln.category),
        remediation: remediation::remediation(vuln.category),
        cwe: remediation::cwe_ids(vuln.category),
        references: remediation::references(vuln.category),
        cvss_vector: cvss.to_string(),
        cvss_score: cvss.base_score(),
    }
}

/// Submission-ready markdown for a single finding.
pub fn bug_bounty_markdown(vuln: &Vulnerability) -> String {
    let poc = vuln.poc.clone().unwrap_or_else(|| build_poc(vuln));
    let mut out = String::new();
    out.push_str(&format!("# {}\n\n", poc.title));
    out.push_str(&format!(
        "**Severity:** {} ({})  \n**CVSS:** {} `{}`  \n**CWE:** {}\n\n",
        vuln.severity,
        vuln.score,
        poc.cvss_score,
        poc.cvss_vector,
        poc.cwe.iter().map(|c| format!("CWE-{}", c)).collect::<Vec<_>>().join(", ")
    ));
    out.push_str(&format!("## Summary\n\n{}\n\n", poc.summary));
    out.push_str("## Steps to Reproduce\n\n");
    for (i, step) in poc.steps.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, step));
    }
    out.push_str(&format!("\n## Request\n\n```http\n{}\n```\n\n", poc.http_request.replace("\r\n", "\n")));
    out.push_str(&format!("```bash\n{}\n```\n\n", poc.curl));
    if let Some(snippet) = &poc.response_snippet {
        out.push_str(&format!("## Response Excerpt\n\n```\n{}\n```\n\n", snippet));
    }
    out.push_str(&format!("## Impact\n\n{}\n\n", poc.impact.description));
    for item in &poc.impact.business {
        out.push_str(&format!("- {}\n", item));
    }
    out.push_str("\n## Remediation\n\n");
    for item in poc.remediation.immediate.iter().chain(&poc.remediation.long_term) {
        out.push_str(&format!("- {}\n", item));
    }
    out.push_str("\n## References\n\n");
    for r in &poc.references {
        out.push_str(&format!("- {}\n", r));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Severity;
    use chrono::Utc;

    fn sample(category: VulnCategory, method: &str) -> Vulnerability {
        Vulnerability {
            id: "VULN-1-abcdef".into(),
            category,
            severity: Severity::Critical,
            score: 100,
            endpoint: "https://shop.test/list.php?id=1&sort=asc".into(),
            method: method.into(),
            parameter: "id".into(),
            description: "d".into(),
            payload: "' OR '1'='1".into(),
            confidence: 86,
            evidence: vec!["MySQL error signature in response".into()],
            response_status: Some(500),
            response_snippet: Some("You have an error in your SQL syntax".into()),
            poc: None,
            discovered_at: Utc::now(),
            occurrences: 1,
            endpoints: vec![],
        }
    }

    #[test]
    fn test_get_request_carries_payload_in_query() {
        let req = http_request(&sample(VulnCategory::Sqli, "GET"));
        assert!(req.starts_with("GET /list.php?id=%27+OR+%271%27%3D%271&sort=asc HTTP/1.1\r\nHost: shop.test"));
    }

    #[test]
    fn test_post_request_uses_form_body() {
        let mut vuln = sample(VulnCategory::Sqli, "POST");
        vuln.endpoint = "https://shop.test/login".into();
        let req = http_request(&vuln);
        assert!(req.contains("Content-Type: application/x-www-form-urlencoded"));
        assert!(req.ends_with("id=%27+OR+%271%27%3D%271"));
        let curl = curl_command(&vuln);
        assert!(curl.starts_with("curl -i -X POST --data"));
    }

    #[test]
    fn test_poc_fields() {
        let poc = build_poc(&sample(VulnCategory::Sqli, "GET"));
        assert_eq!(poc.cwe, vec![89]);
        assert_eq!(poc.cvss_score, 10.0);
        assert_eq!(poc.steps.len(), 3);
        assert!(poc.python.contains("params={\"id\": \"' OR '1'='1\"}"));
        assert!(bug_bounty_markdown(&sample(VulnCategory::Sqli, "GET")).contains("## Steps to Reproduce"));
    }

    #[test]
    fn test_cors_poc_sends_origin() {
        let mut vuln = sample(VulnCategory::Cors, "GET");
        vuln.parameter = String::new();
        vuln.payload = "https://evil.zeron-probe.test".into();
        assert!(curl_command(&vuln).contains("-H 'Origin: https://evil.zeron-probe.test'"));
        assert!(!python_snippet(&vuln).contains("params="));
    }
}
