//! Asset discovery: passive and active collectors merged into one endpoint set.

pub mod api_docs;
pub mod crawler;
pub mod fingerprint;
pub mod fuzzer;
pub mod robots;
pub mod scope;
pub mod scripts;
pub mod subdomains;
pub mod wayback;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::DiscoveryConfig;
use crate::http::{Fetcher, HttpRequest};
use crate::models::{DiscoverySource, Endpoint, Technology};

pub use scope::{normalize_domain, Scope};
pub use subdomains::{HickoryResolver, Resolver, StaticResolver};

/// A host to discover, with the scheme it is reached over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub host: String,
    /// `scheme://host`, without a trailing slash.
    pub base_url: String,
}

impl Target {
    pub fn new(host: &str, scheme: &str) -> Self {
        let host = host.trim().trim_end_matches('/').to_ascii_lowercase();
        Self {
            base_url: format!("{}://{}", scheme, host),
            host,
        }
    }

    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Whether `url` points at this target's host.
    pub fn owns(&self, url: &str) -> bool {
        url::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.eq_ignore_ascii_case(&self.host)))
            .unwrap_or(false)
    }
}

/// An independent endpoint source.
#[async_trait]
pub trait Collector: Send + Sync {
    fn name(&self) -> &'static str;

    async fn collect(&self, target: &Target, fetcher: &dyn Fetcher) -> anyhow::Result<Vec<Endpoint>>;
}

#[derive(Debug, Clone, Default)]
pub struct DiscoveryReport {
    pub endpoints: Vec<Endpoint>,
    pub technologies: Vec<Technology>,
    /// `collector@host: error` for every collector that failed.
    pub collector_errors: Vec<String>,
}

/// Merge endpoints by identity, keeping first-seen order and every source tag.
pub fn merge_endpoints<I>(endpoints: I) -> Vec<Endpoint>
where
    I: IntoIterator<Item = Endpoint>,
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut merged: Vec<Endpoint> = Vec::new();
    for endpoint in endpoints {
        let key = endpoint.identity();
        match index.get(&key) {
            Some(&pos) => merged[pos].absorb(endpoint),
            None => {
                index.insert(key, merged.len());
                merged.push(endpoint);
            }
        }
    }
    merged
}

pub struct AssetDiscovery {
    collectors: Vec<Box<dyn Collector>>,
    concurrency: usize,
}

impl AssetDiscovery {
    pub fn new(config: &DiscoveryConfig) -> Self {
        let mut collectors: Vec<Box<dyn Collector>> = Vec::new();
        if config.enable_wayback {
            collectors.push(Box::new(wayback::WaybackCollector { limit: config.wayback_limit }));
        }
        collectors.push(Box::new(robots::RobotsCollector));
        collectors.push(Box::new(scripts::ScriptCollector { max_files: config.max_script_files }));
        collectors.push(Box::new(fuzzer::FuzzCollector {
            limit: config.fuzz_wordlist_limit,
            delay_ms: config.fuzz_delay_ms,
        }));
        collectors.push(Box::new(crawler::CrawlCollector {
            max_depth: config.crawl_max_depth,
            max_pages: config.crawl_max_pages,
        }));
        collectors.push(Box::new(api_docs::ApiDocsCollector));
        Self { collectors, concurrency: 4 }
    }

    pub fn with_collectors(collectors: Vec<Box<dyn Collector>>) -> Self {
        Self { collectors, concurrency: 4 }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn collector_names(&self) -> Vec<&'static str> {
        self.collectors.iter().map(|c| c.name()).collect()
    }

    /// Run every collector against every target. Collector failures are logged
    /// and recorded, never propagated. Once `cancel` fires, pending landing
    /// pages are skipped and running collectors are dropped.
    pub async fn discover(
        &self,
        targets: &[Target],
        fetcher: &dyn Fetcher,
        scope: &Scope,
        cancel: &CancellationToken,
    ) -> DiscoveryReport {
        let mut report = DiscoveryReport::default();
        let mut collected: Vec<Endpoint> = Vec::new();
        info!(targets = targets.len(), collectors = ?self.collector_names(), "Discovery started");

        // Landing pages seed the endpoint set and feed the fingerprint
        let mut detections = Vec::new();
        for target in targets {
            if cancel.is_cancelled() {
                break;
            }
            match fetcher.fetch(&HttpRequest::get(format!("{}/", target.base_url))).await {
                Ok(resp) => {
                    detections.push(fingerprint::detect(&resp));
                    if resp.status < 400 {
                        collected.push(
                            Endpoint::get(format!("{}/", target.base_url), DiscoverySource::Seed)
                                .with_status(resp.status),
                        );
                    }
                }
                Err(e) => debug!(target = %target.host, error = %e, "Landing page unreachable"),
            }
        }
        report.technologies = fingerprint::aggregate(detections);

        let jobs: Vec<BoxFuture<'_, Option<(String, anyhow::Result<Vec<Endpoint>>)>>> = targets
            .iter()
            .flat_map(|t| self.collectors.iter().map(move |c| (t, &**c)))
            .map(|(target, collector)| {
                let label = format!("{}@{}", collector.name(), target.host);
                async move {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => None,
                        result = collector.collect(target, fetcher) => Some((label, result)),
                    }
                }
                .boxed()
            })
            .collect();
        let total = jobs.len();

        let results: Vec<(String, anyhow::Result<Vec<Endpoint>>)> = stream::iter(jobs)
            .buffer_unordered(self.concurrency)
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .flatten()
            .collect();
        if results.len() < total {
            warn!(skipped = total - results.len(), "Discovery cancelled, collectors abandoned");
        }

        for (label, result) in results {
            match result {
                Ok(endpoints) => {
                    debug!(collector = %label, count = endpoints.len(), "Collector finished");
                    collected.extend(endpoints);
                }
                Err(e) => {
                    warn!(collector = %label, error = %e, "Collector failed");
                    report.collector_errors.push(format!("{}: {}", label, e));
                }
            }
        }
        report.collector_errors.sort();

        let before = collected.len();
        report.endpoints = merge_endpoints(
            collected
                .into_iter()
                .filter(|e| e.host().map(|h| scope.is_in_scope(&h)).unwrap_or(false)),
        );
        info!(
            targets = targets.len(),
            raw = before,
            endpoints = report.endpoints.len(),
            failed_collectors = report.collector_errors.len(),
            "Discovery finished"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::StubFetcher;

    struct Fixed(Vec<Endpoint>);
    struct Broken;

    #[async_trait]
    impl Collector for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }
        async fn collect(&self, _: &Target, _: &dyn Fetcher) -> anyhow::Result<Vec<Endpoint>> {
            Ok(self.0.clone())
        }
    }

    #[async_trait]
    impl Collector for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }
        async fn collect(&self, _: &Target, _: &dyn Fetcher) -> anyhow::Result<Vec<Endpoint>> {
            anyhow::bail!("parse error")
        }
    }

    #[test]
    fn test_target_helpers() {
        let t = Target::new("Shop.Test/", "https");
        assert_eq!(t.base_url, "https://shop.test");
        assert_eq!(t.url("/a"), "https://shop.test/a");
        assert_eq!(t.url("a"), "https://shop.test/a");
        assert!(t.owns("https://SHOP.test/x"));
        assert!(!t.owns("https://api.shop.test/x"));
    }

    #[test]
    fn test_merge_preserves_sources() {
        let merged = merge_endpoints(vec![
            Endpoint::get("https://a.test/p?cat=1", DiscoverySource::Historical),
            Endpoint::get("https://a.test/p?cat=2", DiscoverySource::Crawled),
            Endpoint::get("https://a.test/p?id=1", DiscoverySource::Crawled),
        ]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].url, "https://a.test/p?cat=1");
        assert_eq!(merged[0].sources.len(), 2);
    }

    #[tokio::test]
    async fn test_failing_collector_is_swallowed() {
        let discovery = AssetDiscovery::with_collectors(vec![
            Box::new(Broken),
            Box::new(Fixed(vec![
                Endpoint::get("https://shop.test/a", DiscoverySource::Fuzzed),
                Endpoint::get("https://other.test/b", DiscoverySource::Fuzzed),
            ])),
        ]);
        let scope = Scope::parse("shop.test").unwrap();
        let report = discovery
            .discover(&[Target::new("shop.test", "https")], &StubFetcher::new(), &scope, &CancellationToken::new())
            .await;
        assert_eq!(report.endpoints.len(), 1);
        assert_eq!(report.endpoints[0].url, "https://shop.test/a");
        assert_eq!(report.collector_errors, vec!["broken@shop.test: parse error".to_string()]);
    }

    #[tokio::test]
    async fn test_unreachable_target_yields_empty_set() {
        let config = DiscoveryConfig {
            enable_wayback: false,
            fuzz_delay_ms: 0,
            ..Default::default()
        };
        let discovery = AssetDiscovery::new(&config);
        let fetcher = StubFetcher::new();
        let report = discovery
            .discover(&[Target::new("dead.test", "https")], &fetcher, &Scope::default(), &CancellationToken::new())
            .await;
        assert!(report.endpoints.is_empty());
    }

    #[tokio::test]
    async fn test_landing_page_seeds_and_fingerprints() {
        let fetcher = StubFetcher::new().respond(
            "https://shop.test/",
            crate::http::HttpResponse::new(200, "<html><body>hi</body></html>")
                .with_header("Server", "nginx/1.24.0"),
        );
        let discovery = AssetDiscovery::with_collectors(vec![]);
        let report = discovery
            .discover(&[Target::new("shop.test", "https")], &fetcher, &Scope::default(), &CancellationToken::new())
            .await;
        assert_eq!(report.endpoints.len(), 1);
        assert!(report.endpoints[0].sources.contains(&DiscoverySource::Seed));
        assert_eq!(report.technologies[0].name, "nginx");
    }

    struct Stalled;

    #[async_trait]
    impl Collector for Stalled {
        fn name(&self) -> &'static str {
            "stalled"
        }
        async fn collect(&self, _: &Target, _: &dyn Fetcher) -> anyhow::Result<Vec<Endpoint>> {
            std::future::pending::<()>().await;
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_cancelled_discovery_sends_nothing() {
        let fetcher = StubFetcher::new();
        let discovery = AssetDiscovery::with_collectors(vec![Box::new(Fixed(vec![Endpoint::get(
            "https://shop.test/a",
            DiscoverySource::Fuzzed,
        )]))]);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let report = discovery
            .discover(&[Target::new("shop.test", "https")], &fetcher, &Scope::default(), &cancel)
            .await;
        assert!(report.endpoints.is_empty());
        assert_eq!(fetcher.request_count(), 0);
    }

    #[tokio::test]
    async fn test_cancel_interrupts_running_collector() {
        let discovery = AssetDiscovery::with_collectors(vec![Box::new(Stalled)]);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            trigger.cancel();
        });
        let fetcher = StubFetcher::new();
        let report = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            discovery.discover(&[Target::new("shop.test", "https")], &fetcher, &Scope::default(), &cancel),
        )
        .await
        .expect("discovery returned after cancellation");
        assert!(report.collector_errors.is_empty());
    }

    #[test]
    fn test_default_collector_set() {
        let config = DiscoveryConfig { enable_wayback: false, ..Default::default() };
        let names = AssetDiscovery::new(&config).collector_names();
        assert_eq!(names, vec!["robots_sitemap", "scripts", "directory_probe", "crawler", "api_docs"]);
    }
}
