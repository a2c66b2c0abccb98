use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use zeron::config::ZeronConfig;
use zeron::db::{Database, ScanStore};
use zeron::discovery::{AssetDiscovery, Collector, StaticResolver, Target};
use zeron::http::{Fetcher, HttpResponse, StubFetcher};
use zeron::models::{DiscoverySource, Endpoint, Plan, Scan, ScanStatus, Severity, VulnCategory};
use zeron::pipeline::{compute_summary, ScanEvent, ScanOrchestrator};

/// Reports a fixed set of paths on every target.
struct FixedPaths(Vec<&'static str>);

#[async_trait]
impl Collector for FixedPaths {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn collect(&self, target: &Target, _fetcher: &dyn Fetcher) -> anyhow::Result<Vec<Endpoint>> {
        Ok(self
            .0
            .iter()
            .map(|path| Endpoint::get(target.url(path), DiscoverySource::Crawled))
            .collect())
    }
}

fn quiet_config() -> Arc<ZeronConfig> {
    let mut config = ZeronConfig::default();
    config.discovery.enable_subdomains = false;
    config.discovery.enable_wayback = false;
    config.discovery.fuzz_delay_ms = 0;
    Arc::new(config)
}

/// `/list.php` leaks a MySQL error whenever `id` carries a quote.
fn vulnerable_shop() -> StubFetcher {
    StubFetcher::new().handle(|req| {
        let url = url::Url::parse(&req.url).ok()?;
        if url.path() != "/list.php" {
            return None;
        }
        let id = url
            .query_pairs()
            .find(|(k, _)| k == "id")
            .map(|(_, v)| v.into_owned())
            .unwrap_or_default();
        if id.contains('\'') {
            Some(HttpResponse::new(
                500,
                "<b>Warning</b>: You have an error in your SQL syntax; check the manual that corresponds to your MySQL server version",
            ))
        } else {
            Some(HttpResponse::new(200, "<html><body><p>Item listing</p></body></html>"))
        }
    })
}

#[tokio::test]
async fn test_sqli_found_end_to_end() {
    let db = Database::in_memory().unwrap();
    let scan = Scan::new("shop.test", Plan::Basic, Plan::Basic.default_limits(), vec![]);
    let scan_id = scan.id.clone();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let orchestrator = ScanOrchestrator::new(
        scan,
        quiet_config(),
        Arc::new(vulnerable_shop()),
        Arc::new(StaticResolver::new()),
    )
    .with_discovery(AssetDiscovery::with_collectors(vec![Box::new(FixedPaths(vec!["/list.php?id=1"]))]))
    .with_store(Arc::new(db.clone()))
    .with_event_channel(tx);

    let scan = orchestrator.run().await;
    drop(orchestrator);

    assert_eq!(scan.status, ScanStatus::Completed, "error: {:?}", scan.error);
    assert_eq!(scan.progress, 100);
    let sqli = scan
        .vulnerabilities
        .iter()
        .find(|v| v.category == VulnCategory::Sqli)
        .expect("sqli finding");
    assert_eq!(sqli.parameter, "id");
    assert!(sqli.endpoint.starts_with("https://shop.test/list.php"));
    assert!(matches!(sqli.severity, Severity::Critical | Severity::High));
    assert!(sqli.confidence >= 60);

    let summary = compute_summary(&scan);
    assert_eq!(summary.endpoints, 1);
    assert!(summary.vectors >= 1);
    assert!(summary.probes_sent >= 1);
    assert_eq!(summary.phases_completed, 5);

    let stored = db.get(&scan_id).unwrap().expect("persisted scan");
    assert_eq!(stored.status, ScanStatus::Completed);
    assert_eq!(stored.vulnerabilities.len(), scan.vulnerabilities.len());

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    assert!(matches!(events.first(), Some(ScanEvent::ScanStarted { .. })));
    assert!(events.iter().any(|e| matches!(e, ScanEvent::FindingDiscovered { .. })));
    assert!(matches!(events.last(), Some(ScanEvent::ScanCompleted { .. })));

    let mut last = 0;
    for event in &events {
        if let ScanEvent::Progress { progress, .. } = event {
            assert!(*progress >= last, "progress went backwards");
            last = *progress;
        }
    }
}

#[tokio::test]
async fn test_clean_site_completes_without_findings() {
    let fetcher = StubFetcher::new().on("https://quiet.test/about", 200, "<html><body>About us</body></html>");
    let scan = Scan::new("quiet.test", Plan::Basic, Plan::Basic.default_limits(), vec![]);
    let orchestrator = ScanOrchestrator::new(scan, quiet_config(), Arc::new(fetcher), Arc::new(StaticResolver::new()))
        .with_discovery(AssetDiscovery::with_collectors(vec![Box::new(FixedPaths(vec!["/about"]))]));

    let scan = orchestrator.run().await;
    assert_eq!(scan.status, ScanStatus::Completed);
    assert!(scan.vulnerabilities.is_empty());
    assert_eq!(scan.assets.endpoints, 1);
    assert_eq!(scan.assets.vectors, 0);
}
