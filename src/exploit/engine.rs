use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::analyzer::{analyzer_for, Probe};
use crate::config::ExploitConfig;
use crate::http::{Fetcher, HttpRequest, HttpResponse};
use crate::models::{PlanLimits, TestResult, VulnCategory, EXPLOIT_ORDER};
use crate::surface::Vector;
use crate::utils::truncation::truncate_chars;
use crate::validator::{cross_validate, HeuristicValidator, Validator};
use super::probes::{self, CategoryPlan};

const SNIPPET_CHARS: usize = 500;

/// A probe that cleared both the analyzer gate and the validator.
#[derive(Debug, Clone)]
pub struct ConfirmedFinding {
    pub category: VulnCategory,
    pub url: String,
    pub method: String,
    pub parameter: String,
    pub payload: String,
    pub result: TestResult,
    /// Validator confidence; replaces the analyzer's own figure on the finding.
    pub confidence: u8,
    pub response_status: u16,
    pub response_snippet: String,
}

/// Progress within one category: vectors done out of vectors selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryProgress {
    pub category: VulnCategory,
    pub completed: usize,
    pub total: usize,
}

pub struct ExploitEngine<V: Validator = HeuristicValidator> {
    config: ExploitConfig,
    concurrency: usize,
    budget: AtomicUsize,
    validator: V,
}

impl ExploitEngine<HeuristicValidator> {
    pub fn new(config: ExploitConfig, limits: &PlanLimits) -> Self {
        Self::with_validator(config, limits, HeuristicValidator)
    }
}

impl<V: Validator> ExploitEngine<V> {
    pub fn with_validator(config: ExploitConfig, limits: &PlanLimits, validator: V) -> Self {
        Self {
            config,
            concurrency: limits.concurrency.max(1),
            budget: AtomicUsize::new(limits.max_payloads),
            validator,
        }
    }

    /// Requests still allowed by the plan budget.
    pub fn remaining_budget(&self) -> usize {
        self.budget.load(Ordering::SeqCst)
    }

    fn take_budget(&self) -> bool {
        self.budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok()
    }

    /// Vectors a category visits: endpoint-level categories see each endpoint once, then the cap applies.
    pub fn select<'a>(&self, category: VulnCategory, vectors: &'a [Vector]) -> Vec<&'a Vector> {
        let mut selected: Vec<&Vector> = if category == VulnCategory::Cors {
            let mut seen = HashSet::new();
            vectors
                .iter()
                .filter(|v| seen.insert(v.url.split(['?', '#']).next().unwrap_or(&v.url).to_string()))
                .collect()
        } else {
            vectors.iter().collect()
        };
        if let Some(cap) = self.config.cap_for(category) {
            selected.truncate(cap);
        }
        selected
    }

    /// Run every category in the fixed order.
    pub async fn run(
        &self,
        vectors: &[Vector],
        fetcher: &dyn Fetcher,
        cancel: &CancellationToken,
        on_progress: &(dyn Fn(CategoryProgress) + Send + Sync),
    ) -> Vec<ConfirmedFinding> {
        let mut findings = Vec::new();
        for category in EXPLOIT_ORDER {
            if cancel.is_cancelled() {
                break;
            }
            findings.extend(self.run_category(category, vectors, fetcher, cancel, on_progress).await);
        }
        findings
    }

    pub async fn run_category(
        &self,
        category: VulnCategory,
        vectors: &[Vector],
        fetcher: &dyn Fetcher,
        cancel: &CancellationToken,
        on_progress: &(dyn Fn(CategoryProgress) + Send + Sync),
    ) -> Vec<ConfirmedFinding> {
        let selected = self.select(category, vectors);
        let total = selected.len();
        let completed = AtomicUsize::new(0);
        info!(category = %category, vectors = total, budget = self.remaining_budget(), "Testing category");

        let completed = &completed;
        let jobs: Vec<BoxFuture<'_, Option<ConfirmedFinding>>> = selected
            .into_iter()
            .map(|vector| {
                async move {
                    let finding = self.test_vector(category, vector, fetcher, cancel).await;
                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    on_progress(CategoryProgress { category, completed: done, total });
                    finding
                }
                .boxed()
            })
            .collect();
        let results: Vec<Option<ConfirmedFinding>> =
            stream::iter(jobs).buffer_unordered(self.concurrency).collect().await;

        let findings: Vec<ConfirmedFinding> = results.into_iter().flatten().collect();
        if !findings.is_empty() {
            info!(category = %category, confirmed = findings.len(), "Category produced findings");
        }
        findings
    }

    async fn send(&self, fetcher: &dyn Fetcher, request: &HttpRequest, cancel: &CancellationToken) -> Option<HttpResponse> {
        if cancel.is_cancelled() || !self.take_budget() {
            return None;
        }
        match fetcher.fetch(request).await {
            Ok(resp) => Some(resp),
            Err(e) => {
                debug!(url = %request.url, error = %e, "Probe failed");
                None
            }
        }
    }

    async fn test_vector(
        &self,
        category: VulnCategory,
        vector: &Vector,
        fetcher: &dyn Fetcher,
        cancel: &CancellationToken,
    ) -> Option<ConfirmedFinding> {
        let plan = probes::plan(vector, category, &self.config)?;
        let baseline = match &plan.baseline {
            Some(request) => Some(self.send(fetcher, request, cancel).await?),
            None => None,
        };
        if plan.cross_validate {
            return self.test_cross_validated(category, vector, &plan, baseline.as_ref(), fetcher, cancel).await;
        }

        let analyzer = analyzer_for(category);
        for case in &plan.probes {
            let Some(response) = self.send(fetcher, &case.request, cancel).await else {
                if cancel.is_cancelled() || self.remaining_budget() == 0 {
                    break;
                }
                continue;
            };
            let mut probe = Probe::new(&response, &case.payload);
            if let Some(b) = baseline.as_ref() {
                probe = probe.with_baseline(b);
            }
            let result = analyzer.analyze(&probe);
            if let Some(finding) = self.confirm(vector, result, &response) {
                return Some(finding);
            }
        }
        None
    }

    async fn test_cross_validated(
        &self,
        category: VulnCategory,
        vector: &Vector,
        plan: &CategoryPlan,
        baseline: Option<&HttpResponse>,
        fetcher: &dyn Fetcher,
        cancel: &CancellationToken,
    ) -> Option<ConfirmedFinding> {
        let analyzer = analyzer_for(category);
        let mut observed: Vec<(TestResult, HttpResponse)> = Vec::new();
        for case in &plan.probes {
            let Some(response) = self.send(fetcher, &case.request, cancel).await else {
                continue;
            };
            let mut probe = Probe::new(&response, &case.payload);
            if let Some(b) = baseline {
                probe = probe.with_baseline(b);
            }
            let result = analyzer.analyze(&probe);
            observed.push((result, response));
        }
        let results: Vec<TestResult> = observed.iter().map(|(r, _)| r.clone()).collect();
        let (agreed, agreement) = cross_validate(&results);
        if !agreed {
            return None;
        }
        let (mut best, response) = observed
            .into_iter()
            .filter(|(r, _)| r.vulnerable)
            .max_by_key(|(r, _)| r.confidence)?;
        best.evidence.push(format!("{} independent probes agree", results.iter().filter(|r| r.vulnerable).count()));
        best.confidence = best.confidence.max(agreement);
        self.confirm(vector, best, &response)
    }

    fn confirm(
        &self,
        vector: &Vector,
        result: TestResult,
        response: &HttpResponse,
    ) -> Option<ConfirmedFinding> {
        if !result.vulnerable || result.confidence < self.config.confidence_threshold {
            return None;
        }
        let validation = self.validator.validate(&result, response, &vector.parameter);
        if !validation.confirmed {
            debug!(
                category = %result.category,
                vector = %vector.id,
                confidence = validation.confidence,
                "Validator rejected probe"
            );
            return None;
        }
        info!(
            category = %result.category,
            url = %vector.url,
            parameter = %vector.parameter.name,
            confidence = validation.confidence,
            "Confirmed finding"
        );
        Some(ConfirmedFinding {
            category: result.category,
            url: vector.url.clone(),
            method: vector.method.clone(),
            parameter: vector.parameter.name.clone(),
            payload: result.payload.clone(),
            confidence: validation.confidence,
            response_status: response.status,
            response_snippet: truncate_chars(&response.body, SNIPPET_CHARS),
            result,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::StubFetcher;
    use crate::models::{ParamLocation, Payload};
    use crate::surface::parameters::parameter;
    use std::sync::Mutex;

    fn sqli_vector() -> Vector {
        Vector {
            id: "https://shop.test/list.php?id::id".into(),
            url: "https://shop.test/list.php?id=1".into(),
            method: "GET".into(),
            parameter: parameter("id", ParamLocation::Query, Some("1".into())),
            siblings: vec![],
            payloads: vec![
                Payload::plain("<script>alert(1)</script>", VulnCategory::Xss, "script_tag"),
                Payload::plain("' OR '1'='1", VulnCategory::Sqli, "boolean_or"),
            ],
        }
    }

    fn limits(max_payloads: usize) -> PlanLimits {
        PlanLimits { max_endpoints: 10, max_payloads, concurrency: 2 }
    }

    fn sql_error_site() -> StubFetcher {
        StubFetcher::new().handle(|req| {
            let decoded = url::Url::parse(&req.url).ok()?;
            let id = decoded.query_pairs().find(|(k, _)| k == "id")?.1.into_owned();
            if id.contains('\'') {
                Some(HttpResponse::new(500, "You have an error in your SQL syntax; check the manual"))
            } else {
                Some(HttpResponse::new(200, format!("<p>item {}</p>", id.len())))
            }
        })
    }

    #[tokio::test]
    async fn test_sqli_confirmed() {
        let engine = ExploitEngine::new(ExploitConfig::default(), &limits(100));
        let fetcher = sql_error_site();
        let findings = engine
            .run_category(VulnCategory::Sqli, &[sqli_vector()], &fetcher, &CancellationToken::new(), &|_| {})
            .await;
        assert_eq!(findings.len(), 1);
        let f = &findings[0];
        assert_eq!(f.parameter, "id");
        assert_eq!(f.payload, "' OR '1'='1");
        assert_eq!(f.result.confidence, 95);
        assert!(f.confidence > 60);
        assert_eq!(fetcher.request_count(), 1);
    }

    #[tokio::test]
    async fn test_budget_stops_probing() {
        let engine = ExploitEngine::new(ExploitConfig::default(), &limits(0));
        let fetcher = sql_error_site();
        let findings = engine.run(&[sqli_vector()], &fetcher, &CancellationToken::new(), &|_| {}).await;
        assert!(findings.is_empty());
        assert_eq!(fetcher.request_count(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let engine = ExploitEngine::new(ExploitConfig::default(), &limits(100));
        let fetcher = sql_error_site();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let findings = engine.run(&[sqli_vector()], &fetcher, &cancel, &|_| {}).await;
        assert!(findings.is_empty());
        assert_eq!(fetcher.request_count(), 0);
    }

    #[tokio::test]
    async fn test_probe_errors_are_non_findings() {
        let engine = ExploitEngine::new(ExploitConfig::default(), &limits(100));
        let fetcher = StubFetcher::new().fail("https://shop.test/list.php");
        let findings = engine
            .run_category(VulnCategory::Sqli, &[sqli_vector()], &fetcher, &CancellationToken::new(), &|_| {})
            .await;
        assert!(findings.is_empty());
    }

    #[tokio::test]
    async fn test_progress_reported_per_vector() {
        let engine = ExploitEngine::new(ExploitConfig::default(), &limits(100));
        let fetcher = StubFetcher::new();
        let mut second = sqli_vector();
        second.id = "https://shop.test/item.php?id::id".into();
        second.url = "https://shop.test/item.php?id=1".into();
        let seen = Mutex::new(Vec::new());
        engine
            .run_category(VulnCategory::Xss, &[sqli_vector(), second], &fetcher, &CancellationToken::new(), &|p| {
                seen.lock().unwrap().push(p.completed)
            })
            .await;
        let mut seen = seen.into_inner().unwrap();
        seen.sort();
        assert_eq!(seen, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_idor_cross_validated() {
        let engine = ExploitEngine::new(ExploitConfig::default(), &limits(100));
        let fetcher = StubFetcher::new().handle(|req| {
            let url = url::Url::parse(&req.url).ok()?;
            let id = url.query_pairs().find(|(k, _)| k == "id")?.1.into_owned();
            Some(HttpResponse::new(
                200,
                format!("{{\"id\": {id}, \"owner\": \"user{id}\", \"email\": \"user{id}@corp.test\"}}\n").repeat(4),
            ))
        });
        let vector = Vector {
            id: "https://shop.test/order?id::id".into(),
            url: "https://shop.test/order?id=10".into(),
            method: "GET".into(),
            parameter: parameter("id", ParamLocation::Query, Some("10".into())),
            siblings: vec![],
            payloads: vec![],
        };
        let findings = engine
            .run_category(VulnCategory::Idor, &[vector], &fetcher, &CancellationToken::new(), &|_| {})
            .await;
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].category, VulnCategory::Idor);
        assert_eq!(fetcher.request_count(), 3);
    }

    #[tokio::test]
    async fn test_idor_at_integer_limit_completes() {
        let engine = ExploitEngine::new(ExploitConfig::default(), &limits(100));
        let fetcher = StubFetcher::new().handle(|_| Some(HttpResponse::new(200, "{\"id\": 1}")));
        let vector = Vector {
            id: "GET https://shop.test/order?id::id".into(),
            url: "https://shop.test/order?id=9223372036854775807".into(),
            method: "GET".into(),
            parameter: parameter("id", ParamLocation::Query, Some("9223372036854775807".into())),
            siblings: vec![],
            payloads: vec![],
        };
        let findings = engine
            .run_category(VulnCategory::Idor, &[vector], &fetcher, &CancellationToken::new(), &|_| {})
            .await;
        assert!(findings.is_empty());
        // baseline plus the single in-range neighbour
        assert_eq!(fetcher.request_count(), 2);
    }
}
