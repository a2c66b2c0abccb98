use anyhow::bail;
use async_trait::async_trait;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::debug;

use crate::http::{Fetcher, HttpRequest};
use crate::models::{DiscoverySource, Endpoint};
use super::{Collector, Target};

const MAX_NESTED_SITEMAPS: usize = 5;

static LOC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<loc>\s*([^<\s]+)\s*</loc>").unwrap());

/// `Disallow:` paths and `Sitemap:` URLs from robots.txt.
fn parse_robots(body: &str) -> (Vec<String>, Vec<String>) {
    let mut paths = Vec::new();
    let mut sitemaps = Vec::new();
    for line in body.lines() {
        let line = line.split('#').next().unwrap_or("").trim();
        let Some((key, value)) = line.split_once(':') else { continue };
        let value = value.trim();
        match key.trim().to_ascii_lowercase().as_str() {
            "disallow" if value.len() > 1 && value.starts_with('/') && !value.contains('*') => {
                paths.push(value.trim_end_matches('$').to_string());
            }
            "sitemap" if !value.is_empty() => sitemaps.push(value.to_string()),
            _ => {}
        }
    }
    (paths, sitemaps)
}

fn parse_locs(body: &str) -> Vec<String> {
    LOC.captures_iter(body)
        .filter_map(|c| c.get(1).map(|m| m.as_str().replace("&amp;", "&")))
        .collect()
}

pub struct RobotsCollector;

#[async_trait]
impl Collector for RobotsCollector {
    fn name(&self) -> &'static str {
        "robots_sitemap"
    }

    async fn collect(&self, target: &Target, fetcher: &dyn Fetcher) -> anyhow::Result<Vec<Endpoint>> {
        let mut endpoints = Vec::new();
        let mut sitemaps = vec![target.url("/sitemap.xml")];
        let mut reachable = false;

        let robots = fetcher.fetch(&HttpRequest::get(target.url("/robots.txt"))).await?;
        if robots.is_success() {
            reachable = true;
            let (paths, declared) = parse_robots(&robots.body);
            endpoints.extend(
                paths
                    .iter()
                    .map(|p| Endpoint::get(target.url(p), DiscoverySource::Sitemap)),
            );
            sitemaps.extend(declared.into_iter().filter(|s| target.owns(s)));
        }

        let mut seen: HashSet<String> = HashSet::new();
        let mut nested = 0;
        while let Some(sitemap) = sitemaps.pop() {
            if !seen.insert(sitemap.clone()) {
                continue;
            }
            let resp = match fetcher.fetch(&HttpRequest::get(sitemap.clone())).await {
                Ok(r) if r.is_success() => r,
                Ok(r) => {
                    debug!(sitemap = %sitemap, status = r.status, "Sitemap not available");
                    continue;
                }
                Err(e) => {
                    debug!(sitemap = %sitemap, error = %e, "Sitemap fetch failed");
                    continue;
                }
            };
            reachable = true;
            let is_index = resp.body.contains("<sitemapindex");
            for loc in parse_locs(&resp.body).into_iter().filter(|l| target.owns(l)) {
                if is_index {
                    if nested < MAX_NESTED_SITEMAPS {
                        nested += 1;
                        sitemaps.push(loc);
                    }
                } else {
                    endpoints.push(Endpoint::get(loc, DiscoverySource::Sitemap));
                }
            }
        }

        if !reachable {
            bail!("neither robots.txt nor a sitemap is available");
        }
        Ok(endpoints)
    }
}
