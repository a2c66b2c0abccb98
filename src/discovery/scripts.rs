use anyhow::bail;
use async_trait::async_trait;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::BTreeSet;
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

use crate::http::{Fetcher, HttpRequest};
use crate::models::{DiscoverySource, Endpoint};
use super::{Collector, Target};

static API_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"["'`](/(?:api|v\d+|rest|graphql)(?:/[^"'`\s]*)?)["'`]"#).unwrap()
});
static ABSOLUTE_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s"'`<>\\)]+"#).unwrap());
static RELATIVE_FILE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"["'](\./[\w./-]+\.[a-z0-9]{2,5})["']"#).unwrap());
static QUERY_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[?&]([A-Za-z_][\w-]{0,40})="#).unwrap());

static SCRIPT_SRC: LazyLock<Selector> = LazyLock::new(|| Selector::parse("script[src]").unwrap());
static INLINE_SCRIPT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("script:not([src])").unwrap());

/// Endpoint candidates found in JavaScript source.
#[derive(Debug, Default, PartialEq)]
pub struct ScriptFindings {
    pub urls: BTreeSet<String>,
    pub query_names: BTreeSet<String>,
}

/// Apply the four extraction patterns to one script body.
pub fn extract(script: &str, script_url: &Url, target: &Target) -> ScriptFindings {
    let mut found = ScriptFindings::default();

    for caps in API_PATH.captures_iter(script) {
        if let Some(path) = caps.get(1) {
            found.urls.insert(target.url(path.as_str()));
        }
    }
    for m in ABSOLUTE_URL.find_iter(script) {
        let candidate = m.as_str().trim_end_matches([',', ';', '.']);
        if target.owns(candidate) {
            found.urls.insert(candidate.to_string());
        }
    }
    for caps in RELATIVE_FILE.captures_iter(script) {
        if let Some(rel) = caps.get(1) {
            if let Ok(joined) = script_url.join(rel.as_str()) {
                if target.owns(joined.as_str()) {
                    found.urls.insert(joined.to_string());
                }
            }
        }
    }
    for caps in QUERY_NAME.captures_iter(script) {
        if let Some(name) = caps.get(1) {
            found.query_names.insert(name.as_str().to_string());
        }
    }
    found
}

/// Script sources and inline script bodies of an HTML page.
fn scripts_of(body: &str, page: &Url) -> (Vec<Url>, Vec<String>) {
    let document = Html::parse_document(body);
    let external = document
        .select(&SCRIPT_SRC)
        .filter_map(|el| el.value().attr("src"))
        .filter_map(|src| page.join(src).ok())
        .collect();
    let inline = document
        .select(&INLINE_SCRIPT)
        .map(|el| el.text().collect::<String>())
        .filter(|text| !text.trim().is_empty())
        .collect();
    (external, inline)
}

pub struct ScriptCollector {
    pub max_files: usize,
}

#[async_trait]
impl Collector for ScriptCollector {
    fn name(&self) -> &'static str {
        "scripts"
    }

    async fn collect(&self, target: &Target, fetcher: &dyn Fetcher) -> anyhow::Result<Vec<Endpoint>> {
        let page_url = Url::parse(&target.base_url)?;
        let page = fetcher.fetch(&HttpRequest::get(target.base_url.clone())).await?;
        if page.status >= 400 {
            bail!("landing page returned HTTP {}", page.status);
        }

        let (external, inline) = scripts_of(&page.body, &page_url);
        let mut findings = ScriptFindings::default();
        for script in &inline {
            let f = extract(script, &page_url, target);
            findings.urls.extend(f.urls);
            findings.query_names.extend(f.query_names);
        }

        for src in external.iter().filter(|u| target.owns(u.as_str())).take(self.max_files) {
            match fetcher.fetch(&HttpRequest::get(src.to_string())).await {
                Ok(resp) if resp.is_success() => {
                    let f = extract(&resp.body, src, target);
                    findings.urls.extend(f.urls);
                    findings.query_names.extend(f.query_names);
                }
                Ok(resp) => debug!(script = %src, status = resp.status, "Script not fetched"),
                Err(e) => debug!(script = %src, error = %e, "Script fetch failed"),
            }
        }

        let mut endpoints: Vec<Endpoint> = findings
            .urls
            .into_iter()
            .map(|u| Endpoint::get(u, DiscoverySource::ScriptExtracted))
            .collect();
        if !findings.query_names.is_empty() {
            let query: Vec<String> = findings.query_names.iter().map(|n| format!("{}=1", n)).collect();
            endpoints.push(Endpoint::get(
                format!("{}/?{}", target.base_url, query.join("&")),
                DiscoverySource::ScriptExtracted,
            ));
        }
        Ok(endpoints)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::StubFetcher;

    #[test]
    fn test_extract_patterns() {
        let target = Target::new("shop.test", "https");
        let base = Url::parse("https://shop.test/static/app.js").unwrap();
        let js = r#"
            fetch("/api/v1/users");
            const legacy = '/v2/orders/list';
            const cdn = "https://cdn.other.test/lib.js";
            const self_url = "https://shop.test/graphql";
            import('./chunk.min.js');
            location.href = "/search?q=" + term + "&page=" + p;
        "#;
        let found = extract(js, &base, &target);
        assert!(found.urls.contains("https://shop.test/api/v1/users"));
        assert!(found.urls.contains("https://shop.test/v2/orders/list"));
        assert!(found.urls.contains("https://shop.test/graphql"));
        assert!(found.urls.contains("https://shop.test/static/chunk.min.js"));
        assert!(!found.urls.iter().any(|u| u.contains("cdn.other.test")));
        assert!(found.query_names.contains("q"));
        assert!(found.query_names.contains("page"));
    }

    #[tokio::test]
    async fn test_collect_fetches_same_host_scripts() {
        let html = r#"<html><script src="/js/app.js"></script>
            <script src="https://cdn.other.test/x.js"></script>
            <script>var u = "/api/cart";</script></html>"#;
        let fetcher = StubFetcher::new()
            .on("https://shop.test/", 200, html)
            .on("https://shop.test/js/app.js", 200, r#"fetch('/rest/items?sort=asc')"#);
        let collector = ScriptCollector { max_files: 10 };
        let found = collector
            .collect(&Target::new("shop.test", "https"), &fetcher)
            .await
            .unwrap();
        let urls: Vec<&str> = found.iter().map(|e| e.url.as_str()).collect();
        assert!(urls.contains(&"https://shop.test/api/cart"));
        assert!(urls.contains(&"https://shop.test/rest/items?sort=asc"));
        assert!(urls.contains(&"https://shop.test/?sort=1"));
        assert!(!fetcher.requests().iter().any(|r| r.url.contains("cdn.other.test")));
    }
}
