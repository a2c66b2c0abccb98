use anyhow::bail;
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::collections::{HashSet, VecDeque};
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

use crate::http::{Fetcher, HttpRequest};
use crate::models::{DiscoverySource, Endpoint};
use crate::scoring::simhash::simhash;
use super::scripts;
use super::{Collector, Target};

static LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());
static FORM: LazyLock<Selector> = LazyLock::new(|| Selector::parse("form").unwrap());
static FIELD: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("input[name], textarea[name], select[name]").unwrap());
static DATA_URL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("[data-url], [data-api]").unwrap());
static INLINE_SCRIPT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("script:not([src])").unwrap());
static BODY_TEXT: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").unwrap());

const STATIC_EXTENSIONS: [&str; 20] = [
    "png", "jpg", "jpeg", "gif", "svg", "ico", "webp", "css", "woff", "woff2", "ttf", "eot",
    "otf", "mp4", "mp3", "zip", "gz", "tar", "pdf", "js",
];

#[derive(Debug, Clone, PartialEq)]
pub struct FormInfo {
    pub action: String,
    pub method: String,
    pub inputs: Vec<String>,
}

#[derive(Debug, Default)]
struct PageLinks {
    links: Vec<Url>,
    forms: Vec<FormInfo>,
    data_urls: Vec<Url>,
    inline_scripts: Vec<String>,
    text: String,
}

fn is_static_asset(url: &Url) -> bool {
    url.path()
        .rsplit('/')
        .next()
        .and_then(|last| last.rsplit_once('.'))
        .map(|(_, ext)| STATIC_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Form actions, methods and named inputs of a page.
pub fn extract_forms(body: &str, page: &Url) -> Vec<FormInfo> {
    let document = Html::parse_document(body);
    forms_of(&document, page)
}

fn forms_of(document: &Html, page: &Url) -> Vec<FormInfo> {
    document
        .select(&FORM)
        .map(|form| {
            let action = form
                .value()
                .attr("action")
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .and_then(|a| page.join(a).ok())
                .unwrap_or_else(|| page.clone());
            let method = form
                .value()
                .attr("method")
                .map(|m| m.trim().to_ascii_uppercase())
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| "GET".into());
            let mut inputs: Vec<String> = Vec::new();
            for field in form.select(&FIELD) {
                if let Some(name) = field.value().attr("name") {
                    if !name.is_empty() && !inputs.iter().any(|i| i == name) {
                        inputs.push(name.to_string());
                    }
                }
            }
            let mut action = action;
            action.set_fragment(None);
            FormInfo { action: action.to_string(), method, inputs }
        })
        .collect()
}

fn parse_page(body: &str, page: &Url) -> PageLinks {
    let document = Html::parse_document(body);
    let resolve = |raw: &str| -> Option<Url> {
        let raw = raw.trim();
        if raw.is_empty() || raw.starts_with('#') {
            return None;
        }
        let mut joined = page.join(raw).ok()?;
        if !matches!(joined.scheme(), "http" | "https") {
            return None;
        }
        joined.set_fragment(None);
        Some(joined)
    };

    PageLinks {
        links: document
            .select(&LINK)
            .filter_map(|a| a.value().attr("href"))
            .filter_map(resolve)
            .collect(),
        forms: forms_of(&document, page),
        data_urls: document
            .select(&DATA_URL)
            .filter_map(|el| el.value().attr("data-url").or_else(|| el.value().attr("data-api")))
            .filter_map(resolve)
            .collect(),
        inline_scripts: document
            .select(&INLINE_SCRIPT)
            .map(|s| s.text().collect::<String>())
            .collect(),
        text: document
            .select(&BODY_TEXT)
            .next()
            .map(|b| b.text().collect::<Vec<_>>().join(" "))
            .unwrap_or_default(),
    }
}

/// Breadth-first, same-host link follower with depth and page ceilings.
pub struct CrawlCollector {
    pub max_depth: usize,
    pub max_pages: usize,
}

#[async_trait]
impl Collector for CrawlCollector {
    fn name(&self) -> &'static str {
        "crawler"
    }

    async fn collect(&self, target: &Target, fetcher: &dyn Fetcher) -> anyhow::Result<Vec<Endpoint>> {
        let start = Url::parse(&format!("{}/", target.base_url))?;
        let mut queue: VecDeque<(Url, usize)> = VecDeque::from([(start.clone(), 0)]);
        let mut visited: HashSet<String> = HashSet::from([start.to_string()]);
        let mut endpoints = Vec::new();
        let mut fetched = 0usize;
        let mut reached_any = false;

        while let Some((page, depth)) = queue.pop_front() {
            if fetched >= self.max_pages {
                break;
            }
            fetched += 1;

            let resp = match fetcher.fetch(&HttpRequest::get(page.to_string())).await {
                Ok(r) => r,
                Err(e) => {
                    debug!(url = %page, error = %e, "Crawl fetch failed");
                    continue;
                }
            };
            reached_any = true;
            if resp.status >= 400 {
                continue;
            }

            let parsed = parse_page(&resp.body, &page);
            let mut endpoint = Endpoint::get(page.to_string(), DiscoverySource::Crawled)
                .with_status(resp.status);
            if !parsed.text.trim().is_empty() {
                endpoint.fingerprint = Some(simhash(&parsed.text));
            }
            endpoints.push(endpoint);

            for form in &parsed.forms {
                if target.owns(&form.action) {
                    endpoints.push(
                        Endpoint::new(form.action.clone(), &form.method, DiscoverySource::Crawled)
                            .with_inputs(form.inputs.clone()),
                    );
                }
            }
            for url in parsed.data_urls.iter().filter(|u| target.owns(u.as_str())) {
                endpoints.push(Endpoint::get(url.to_string(), DiscoverySource::Crawled));
            }
            for script in &parsed.inline_scripts {
                let found = scripts::extract(script, &page, target);
                endpoints.extend(
                    found
                        .urls
                        .into_iter()
                        .map(|u| Endpoint::get(u, DiscoverySource::Crawled)),
                );
            }

            if depth >= self.max_depth {
                continue;
            }
            for link in parsed.links {
                if !target.owns(link.as_str()) || is_static_asset(&link) {
                    continue;
                }
                if visited.insert(link.to_string()) {
                    queue.push_back((link, depth + 1));
                }
            }
        }

        if !reached_any {
            bail!("no page of {} could be fetched", target.base_url);
        }
        Ok(endpoints)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::StubFetcher;

    const HOME: &str = r##"<html><body>
        <a href="/products?cat=1">Products</a>
        <a href="/about#team">About</a>
        <a href="https://other.test/">Elsewhere</a>
        <a href="mailto:x@shop.test">Mail</a>
        <a href="/logo.png">Logo</a>
        <form action="/login" method="post">
            <input name="username"><input name="password" type="password">
            <input type="submit">
        </form>
        <div data-api="/api/cart"></div>
        <script>fetch("/api/session")</script>
    </body></html>"##;

    #[test]
    fn test_extract_forms() {
        let page = Url::parse("https://shop.test/").unwrap();
        let forms = extract_forms(HOME, &page);
        assert_eq!(forms.len(), 1);
        assert_eq!(forms[0].action, "https://shop.test/login");
        assert_eq!(forms[0].method, "POST");
        assert_eq!(forms[0].inputs, vec!["username".to_string(), "password".into()]);
    }

    #[test]
    fn test_form_without_action_targets_page() {
        let page = Url::parse("https://shop.test/search").unwrap();
        let forms = extract_forms(r#"<form><input name="q"></form>"#, &page);
        assert_eq!(forms[0].action, "https://shop.test/search");
        assert_eq!(forms[0].method, "GET");
    }

    #[tokio::test]
    async fn test_crawl_harvests_links_forms_and_api_paths() {
        let fetcher = StubFetcher::new()
            .on("https://shop.test/", 200, HOME)
            .on("https://shop.test/products", 200, "<html><body><a href='/deep'>d</a></body></html>")
            .on("https://shop.test/about", 200, "<html><body>About us</body></html>");
        let collector = CrawlCollector { max_depth: 1, max_pages: 100 };
        let found = collector
            .collect(&Target::new("shop.test", "https"), &fetcher)
            .await
            .unwrap();
        let urls: Vec<&str> = found.iter().map(|e| e.url.as_str()).collect();
        assert!(urls.contains(&"https://shop.test/products?cat=1"));
        assert!(urls.contains(&"https://shop.test/about"));
        assert!(urls.contains(&"https://shop.test/api/cart"));
        assert!(urls.contains(&"https://shop.test/api/session"));
        let login = found.iter().find(|e| e.url == "https://shop.test/login").unwrap();
        assert_eq!(login.method, "POST");
        assert_eq!(login.inputs.len(), 2);

        let requested: Vec<String> = fetcher.requests().into_iter().map(|r| r.url).collect();
        assert!(!requested.iter().any(|u| u.contains("other.test") || u.ends_with(".png")));
        // depth 1 stops before /deep
        assert!(!requested.iter().any(|u| u.ends_with("/deep")));
    }

    #[tokio::test]
    async fn test_page_ceiling() {
        let fetcher = StubFetcher::new().on("https://shop.test/", 200, HOME);
        let collector = CrawlCollector { max_depth: 3, max_pages: 1 };
        collector
            .collect(&Target::new("shop.test", "https"), &fetcher)
            .await
            .unwrap();
        assert_eq!(fetcher.request_count(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_site_is_error() {
        let fetcher = StubFetcher::new().fail("https://shop.test/");
        let collector = CrawlCollector { max_depth: 2, max_pages: 10 };
        assert!(collector
            .collect(&Target::new("shop.test", "https"), &fetcher)
            .await
            .is_err());
    }
}
