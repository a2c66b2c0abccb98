//! Response analysis: one heuristic per category, dispatched exhaustively.

pub mod access;
pub mod injection;
pub mod misconfig;
pub mod xss;

use crate::http::HttpResponse;
use crate::models::{TestResult, VulnCategory};

/// What an analyzer gets to look at for one probe.
#[derive(Debug, Clone, Copy)]
pub struct Probe<'a> {
    pub response: &'a HttpResponse,
    pub payload: &'a str,
    /// Response to an unmodified request, for differential checks.
    pub baseline: Option<&'a HttpResponse>,
}

impl<'a> Probe<'a> {
    pub fn new(response: &'a HttpResponse, payload: &'a str) -> Self {
        Self { response, payload, baseline: None }
    }

    pub fn with_baseline(mut self, baseline: &'a HttpResponse) -> Self {
        self.baseline = Some(baseline);
        self
    }

    /// Body with verbatim payload reflections removed, so echoed input is not mistaken for output.
    pub fn body_without_payload(&self) -> String {
        if self.payload.is_empty() {
            self.response.body.clone()
        } else {
            self.response.body.replace(self.payload, "")
        }
    }
}

pub trait Analyzer: Send + Sync {
    fn category(&self) -> VulnCategory;

    fn analyze(&self, probe: &Probe<'_>) -> TestResult;
}

/// Accumulates indicators and an optional explicit confidence.
#[derive(Debug, Default)]
pub(crate) struct Verdict {
    indicators: Vec<String>,
    confidence: Option<u8>,
    context: Option<String>,
}

impl Verdict {
    pub(crate) fn indicate(&mut self, indicator: impl Into<String>) {
        self.indicators.push(indicator.into());
    }

    /// Raise the explicit confidence to at least `value`.
    pub(crate) fn at_least(&mut self, value: u8) {
        self.confidence = Some(self.confidence.map_or(value, |c| c.max(value)));
    }

    pub(crate) fn context(&mut self, context: &str) {
        self.context = Some(context.to_string());
    }

    pub(crate) fn has_indicators(&self) -> bool {
        !self.indicators.is_empty()
    }

    pub(crate) fn indicator_count(&self) -> usize {
        self.indicators.len()
    }

    /// Unset confidence defaults to 25 per indicator, capped at 100.
    pub(crate) fn finish(self, category: VulnCategory, payload: &str) -> TestResult {
        let confidence = self
            .confidence
            .unwrap_or_else(|| (self.indicators.len() * 25).min(100) as u8);
        TestResult {
            category,
            vulnerable: !self.indicators.is_empty() && confidence > 50,
            confidence,
            evidence: self.indicators,
            payload: payload.to_string(),
            context: self.context,
        }
    }
}

/// Fallback for categories without a dedicated heuristic.
pub struct GenericAnalyzer(pub VulnCategory);

impl Analyzer for GenericAnalyzer {
    fn category(&self) -> VulnCategory {
        self.0
    }

    fn analyze(&self, probe: &Probe<'_>) -> TestResult {
        let mut verdict = Verdict::default();
        let status = probe.response.status;
        if status == 403 {
            verdict.indicate("Gated resource answered 403 instead of 404");
        } else if (200..400).contains(&status) {
            verdict.indicate(format!("Request with payload accepted (HTTP {})", status));
        }
        verdict.finish(self.0, probe.payload)
    }
}

static SQLI: injection::SqliAnalyzer = injection::SqliAnalyzer;
static SSRF: injection::SsrfAnalyzer = injection::SsrfAnalyzer;
static PATH: injection::FileDisclosureAnalyzer = injection::FileDisclosureAnalyzer(VulnCategory::PathTraversal);
static LFI: injection::FileDisclosureAnalyzer = injection::FileDisclosureAnalyzer(VulnCategory::Lfi);
static RCE: injection::RceAnalyzer = injection::RceAnalyzer;
static XXE: injection::XxeAnalyzer = injection::XxeAnalyzer;
static XSS: xss::XssAnalyzer = xss::XssAnalyzer;
static CORS: misconfig::CorsAnalyzer = misconfig::CorsAnalyzer;
static REDIRECT: misconfig::OpenRedirectAnalyzer = misconfig::OpenRedirectAnalyzer;
static INFO: misconfig::InfoDisclosureAnalyzer = misconfig::InfoDisclosureAnalyzer;
static IDOR: access::IdorAnalyzer = access::IdorAnalyzer;
static AUTH: access::AuthBypassAnalyzer = access::AuthBypassAnalyzer;
static LOGIC: access::BusinessLogicAnalyzer = access::BusinessLogicAnalyzer;
static CSRF: GenericAnalyzer = GenericAnalyzer(VulnCategory::Csrf);
static PRIVESC: GenericAnalyzer = GenericAnalyzer(VulnCategory::PrivilegeEscalation);
static DOS: GenericAnalyzer = GenericAnalyzer(VulnCategory::Dos);

/// The analyzer responsible for a category.
pub fn analyzer_for(category: VulnCategory) -> &'static dyn Analyzer {
    match category {
        VulnCategory::Sqli => &SQLI,
        VulnCategory::Xss => &XSS,
        VulnCategory::Ssrf => &SSRF,
        VulnCategory::PathTraversal => &PATH,
        VulnCategory::Rce => &RCE,
        VulnCategory::Xxe => &XXE,
        VulnCategory::Lfi => &LFI,
        VulnCategory::AuthBypass => &AUTH,
        VulnCategory::Csrf => &CSRF,
        VulnCategory::PrivilegeEscalation => &PRIVESC,
        VulnCategory::InfoDisclosure => &INFO,
        VulnCategory::Idor => &IDOR,
        VulnCategory::Cors => &CORS,
        VulnCategory::OpenRedirect => &REDIRECT,
        VulnCategory::BusinessLogic => &LOGIC,
        VulnCategory::Dos => &DOS,
    }
}

/// Analyze one response for one category.
pub fn analyze(response: &HttpResponse, payload: &str, category: VulnCategory) -> TestResult {
    analyzer_for(category).analyze(&Probe::new(response, payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_covers_every_category() {
        for category in VulnCategory::ALL {
            assert_eq!(analyzer_for(category).category(), category);
        }
    }

    #[test]
    fn test_default_confidence_formula() {
        let mut v = Verdict::default();
        v.indicate("a");
        v.indicate("b");
        v.indicate("c");
        let result = v.finish(VulnCategory::Ssrf, "p");
        assert_eq!(result.confidence, 75);
        assert!(result.vulnerable);

        let mut v = Verdict::default();
        for i in 0..6 {
            v.indicate(format!("i{}", i));
        }
        assert_eq!(v.finish(VulnCategory::Ssrf, "p").confidence, 100);
    }

    #[test]
    fn test_generic_weak_indicator_not_vulnerable() {
        let result = analyze(&HttpResponse::new(403, "Forbidden"), "x", VulnCategory::Csrf);
        assert_eq!(result.evidence.len(), 1);
        assert_eq!(result.confidence, 25);
        assert!(!result.vulnerable);
    }

    #[test]
    fn test_body_without_payload() {
        let resp = HttpResponse::new(200, "you searched http://127.0.0.1/ ok");
        let probe = Probe::new(&resp, "http://127.0.0.1/");
        assert_eq!(probe.body_without_payload(), "you searched  ok");
    }
}
