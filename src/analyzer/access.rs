//! Differential checks that compare a probe against an unmodified baseline request.

use crate::models::{TestResult, VulnCategory};
use crate::utils::similarity::similarity_ratio;
use super::{Analyzer, Probe, Verdict};

const IDOR_MIN_BODY: usize = 100;
const IDOR_MAX_SIMILARITY: f64 = 0.95;

const DENIAL_MARKERS: [&str; 8] = [
    "access denied",
    "unauthorized",
    "forbidden",
    "not authorized",
    "permission denied",
    "not found",
    "invalid id",
    "login required",
];

const SUCCESS_MARKERS: [&str; 5] = ["logout", "welcome", "dashboard", "my account", "sign out"];

const VALIDATION_MARKERS: [&str; 9] = [
    "invalid",
    "must be",
    "not allowed",
    "out of range",
    "cannot be negative",
    "minimum",
    "maximum",
    "validation",
    "error",
];

const ORDER_MARKERS: [&str; 7] = [
    "success", "total", "order", "confirmed", "updated", "balance", "added",
];

fn contains_any(haystack: &str, needles: &[&str]) -> Option<String> {
    needles
        .iter()
        .find(|n| haystack.contains(*n))
        .map(|n| n.to_string())
}

pub struct IdorAnalyzer;

impl Analyzer for IdorAnalyzer {
    fn category(&self) -> VulnCategory {
        VulnCategory::Idor
    }

    fn analyze(&self, probe: &Probe<'_>) -> TestResult {
        let Some(baseline) = probe.baseline else {
            return TestResult::negative(VulnCategory::Idor, probe.payload).with_context("no_baseline");
        };
        let response = probe.response;
        let mut verdict = Verdict::default();
        if !(baseline.is_success() && response.is_success()) {
            return verdict.finish(VulnCategory::Idor, probe.payload);
        }
        if response.body.len() < IDOR_MIN_BODY {
            return verdict.finish(VulnCategory::Idor, probe.payload);
        }
        let lower = response.body.to_lowercase();
        if let Some(marker) = contains_any(&lower, &DENIAL_MARKERS) {
            return TestResult::negative(VulnCategory::Idor, probe.payload)
                .with_context(&format!("denied:{}", marker));
        }
        let ratio = similarity_ratio(&baseline.body, &response.body);
        if ratio < IDOR_MAX_SIMILARITY {
            verdict.indicate(format!(
                "Different object returned for identifier '{}' ({:.0}% similar to baseline)",
                probe.payload,
                ratio * 100.0
            ));
            verdict.at_least(70);
            verdict.context("object_swap");
        }
        verdict.finish(VulnCategory::Idor, probe.payload)
    }
}

fn redirects_to_login(location: &str) -> bool {
    let lower = location.to_lowercase();
    ["login", "signin", "sign-in", "auth"].iter().any(|m| lower.contains(m))
}

pub struct AuthBypassAnalyzer;

impl Analyzer for AuthBypassAnalyzer {
    fn category(&self) -> VulnCategory {
        VulnCategory::AuthBypass
    }

    fn analyze(&self, probe: &Probe<'_>) -> TestResult {
        let response = probe.response;
        let mut verdict = Verdict::default();

        if response.is_redirect() {
            if let Some(location) = response.header("location") {
                if !redirects_to_login(location) {
                    verdict.indicate(format!("Redirected past login to {}", location));
                }
            }
        }

        let baseline_cookies = probe
            .baseline
            .and_then(|b| b.header("set-cookie"))
            .unwrap_or_default();
        if let Some(cookies) = response.header("set-cookie") {
            let new_session = cookies.lines().any(|c| {
                let name = c.split('=').next().unwrap_or_default().trim().to_lowercase();
                let session_like = ["session", "sess", "token", "auth", "sid"]
                    .iter()
                    .any(|m| name.contains(m));
                session_like && !baseline_cookies.contains(c)
            });
            if new_session {
                verdict.indicate("Session cookie issued for bypass payload");
            }
        }

        let body = response.body.to_lowercase();
        let baseline_body = probe
            .baseline
            .map(|b| b.body.to_lowercase())
            .unwrap_or_default();
        let new_markers: Vec<&str> = SUCCESS_MARKERS
            .iter()
            .copied()
            .filter(|m| body.contains(m) && !baseline_body.contains(m))
            .collect();
        if !new_markers.is_empty() {
            verdict.indicate(format!("Authenticated content markers: {}", new_markers.join(", ")));
        }

        match verdict.indicator_count() {
            0 => {}
            1 => verdict.at_least(45),
            _ => {
                verdict.at_least(80);
                verdict.context("login_bypassed");
            }
        }
        verdict.finish(VulnCategory::AuthBypass, probe.payload)
    }
}

pub struct BusinessLogicAnalyzer;

impl Analyzer for BusinessLogicAnalyzer {
    fn category(&self) -> VulnCategory {
        VulnCategory::BusinessLogic
    }

    fn analyze(&self, probe: &Probe<'_>) -> TestResult {
        let response = probe.response;
        let mut verdict = Verdict::default();
        if !response.is_success() || probe.payload.is_empty() {
            return verdict.finish(VulnCategory::BusinessLogic, probe.payload);
        }
        let body = response.body.to_lowercase();
        if let Some(marker) = contains_any(&body, &VALIDATION_MARKERS) {
            return TestResult::negative(VulnCategory::BusinessLogic, probe.payload)
                .with_context(&format!("rejected:{}", marker));
        }
        if !response.body.contains(probe.payload) {
            return verdict.finish(VulnCategory::BusinessLogic, probe.payload);
        }
        if let Some(marker) = contains_any(&body, &ORDER_MARKERS) {
            verdict.indicate(format!(
                "Out-of-range value '{}' accepted and processed ({})",
                probe.payload, marker
            ));
            verdict.at_least(65);
            verdict.context("value_accepted");
        }
        verdict.finish(VulnCategory::BusinessLogic, probe.payload)
    }
}
