use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use crate::http::{Fetcher, HttpRequest};
use crate::models::{DiscoverySource, Endpoint};
use super::{Collector, Target};

pub const WORDLIST: [&str; 30] = [
    "admin", "api", "login", "dashboard", "config", "backup", ".git", ".env", "wp-admin",
    "phpmyadmin", "test", "dev", "uploads", "server-status", "robots.txt", "sitemap.xml",
    "swagger.json", "graphql", "console", "debug", "backup.zip", "backup.sql", "database.sql",
    ".htaccess", "web.config", "info.php", "phpinfo.php", "admin.php", "old", "temp",
];

/// 403 counts: the resource exists even if it is gated.
const EXISTS: [u16; 4] = [200, 301, 302, 403];

/// Probes a fixed wordlist of directories and files.
pub struct FuzzCollector {
    pub limit: usize,
    pub delay_ms: u64,
}

#[async_trait]
impl Collector for FuzzCollector {
    fn name(&self) -> &'static str {
        "directory_probe"
    }

    async fn collect(&self, target: &Target, fetcher: &dyn Fetcher) -> anyhow::Result<Vec<Endpoint>> {
        let mut found = Vec::new();
        let mut failures = 0usize;
        let words: Vec<&str> = WORDLIST.iter().copied().take(self.limit).collect();

        for (i, word) in words.iter().enumerate() {
            if i > 0 && self.delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            }
            let url = target.url(&format!("/{}", word));
            match fetcher.fetch(&HttpRequest::get(url.clone()).no_redirects()).await {
                Ok(resp) if EXISTS.contains(&resp.status) => {
                    debug!(url = %url, status = resp.status, "Path exists");
                    found.push(Endpoint::get(url, DiscoverySource::Fuzzed).with_status(resp.status));
                }
                Ok(_) => {}
                Err(e) => {
                    failures += 1;
                    debug!(url = %url, error = %e, "Probe failed");
                }
            }
        }

        if !words.is_empty() && failures == words.len() {
            anyhow::bail!("all {} directory probes failed", failures);
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::StubFetcher;

    #[tokio::test]
    async fn test_status_filter() {
        let fetcher = StubFetcher::new()
            .on("https://shop.test/admin", 403, "Forbidden")
            .on("https://shop.test/login", 200, "<form>")
            .on("https://shop.test/dashboard", 302, "")
            .on("https://shop.test/config", 500, "boom");
        let collector = FuzzCollector { limit: 30, delay_ms: 0 };
        let found = collector
            .collect(&Target::new("shop.test", "https"), &fetcher)
            .await
            .unwrap();
        let urls: Vec<&str> = found.iter().map(|e| e.url.as_str()).collect();
        assert_eq!(
            urls,
            vec!["https://shop.test/admin", "https://shop.test/login", "https://shop.test/dashboard"]
        );
        assert_eq!(found[0].status, Some(403));
        assert!(fetcher.requests().iter().all(|r| !r.follow_redirects));
        assert_eq!(fetcher.request_count(), 30);
    }

    #[tokio::test]
    async fn test_limit_respected() {
        let fetcher = StubFetcher::new();
        let collector = FuzzCollector { limit: 5, delay_ms: 0 };
        collector.collect(&Target::new("shop.test", "https"), &fetcher).await.unwrap();
        assert_eq!(fetcher.request_count(), 5);
    }
}
