use crate::models::{TestResult, VulnCategory};
use super::{Analyzer, Probe, Verdict};

const DANGEROUS_TOKENS: [&str; 7] = [
    "<script", "onerror=", "onload=", "javascript:", "<svg", "<img", "<iframe",
];

const PARTIAL_PREFIX_CHARS: usize = 10;

/// HTML entity encodings a server might apply to reflected input.
fn html_escapes(payload: &str) -> Vec<String> {
    let base = payload
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;");
    let mut out = vec![base.replace('\'', "&#x27;"), base.replace('\'', "&#39;")];
    out.dedup();
    out
}

fn encoded_reflection(body: &str, payload: &str) -> bool {
    let encoded_whole = html_escapes(payload)
        .iter()
        .any(|escaped| escaped != payload && body.contains(escaped.as_str()));
    if encoded_whole {
        return true;
    }
    if body.contains(payload) {
        return false;
    }
    let lower_payload = payload.to_lowercase();
    let lower_body = body.to_lowercase();
    DANGEROUS_TOKENS
        .iter()
        .filter(|token| token.starts_with('<') && lower_payload.contains(*token))
        .any(|token| lower_body.contains(&token.replacen('<', "&lt;", 1)))
}

/// Reflection immediately after an attribute value or script string was closed.
fn quote_break(body: &str, payload: &str) -> bool {
    let Some(first) = payload.chars().next() else {
        return false;
    };
    if first != '"' && first != '\'' {
        return false;
    }
    body.match_indices(payload).any(|(idx, _)| {
        let before = &body[..idx];
        let open_tag = before.rfind('<').map_or(false, |lt| !before[lt..].contains('>'));
        let open_string = before.matches(first).count() % 2 == 1;
        open_tag || open_string
    })
}

pub struct XssAnalyzer;

impl Analyzer for XssAnalyzer {
    fn category(&self) -> VulnCategory {
        VulnCategory::Xss
    }

    fn analyze(&self, probe: &Probe<'_>) -> TestResult {
        let body = probe.response.body.as_str();
        let payload = probe.payload;
        if payload.is_empty() {
            return TestResult::negative(VulnCategory::Xss, payload);
        }
        if encoded_reflection(body, payload) {
            return TestResult::negative(VulnCategory::Xss, payload).with_context("encoded");
        }

        let mut verdict = Verdict::default();
        let reflected = body.contains(payload);
        if reflected {
            verdict.indicate("Payload reflected without encoding");
            verdict.at_least(90);
            verdict.context("html_body");
        } else {
            let prefix: String = payload.chars().take(PARTIAL_PREFIX_CHARS).collect();
            if prefix.chars().count() == PARTIAL_PREFIX_CHARS && body.contains(&prefix) {
                verdict.indicate("Payload partially reflected");
                verdict.at_least(60);
                verdict.context("partial");
            }
        }

        if verdict.has_indicators() {
            let lower_payload = payload.to_lowercase();
            let lower_body = body.to_lowercase();
            for token in DANGEROUS_TOKENS {
                if lower_payload.contains(token) && lower_body.contains(token) {
                    verdict.indicate(format!("Executable construct '{}' present", token));
                    verdict.at_least(80);
                }
            }
            if quote_break(body, payload) {
                verdict.indicate("Reflection breaks out of a quoted context");
                verdict.at_least(75);
                verdict.context("attribute");
            }
            if probe.response.header("content-security-policy").is_none() {
                verdict.indicate("No Content-Security-Policy header");
            }
        }
        verdict.finish(VulnCategory::Xss, payload)
    }
}
