use anyhow::{bail, Context};
use async_trait::async_trait;
use url::Url;

use crate::http::{Fetcher, HttpRequest};
use crate::models::{DiscoverySource, Endpoint};
use super::{Collector, Target};

/// Historical URLs from the Wayback Machine CDX index.
pub struct WaybackCollector {
    pub limit: usize,
}

#[async_trait]
impl Collector for WaybackCollector {
    fn name(&self) -> &'static str {
        "wayback"
    }

    async fn collect(&self, target: &Target, fetcher: &dyn Fetcher) -> anyhow::Result<Vec<Endpoint>> {
        let url = format!(
            "http://web.archive.org/cdx/search/cdx?url={}/*&output=json&fl=original&collapse=urlkey&limit={}",
            target.host, self.limit
        );
        let response = fetcher.fetch(&HttpRequest::get(url)).await?;
        if !response.is_success() {
            bail!("archive index returned HTTP {}", response.status);
        }
        if response.body.trim().is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<Vec<String>> =
            serde_json::from_str(&response.body).context("archive index is not a JSON row list")?;

        // First row is the field header
        let endpoints = rows
            .iter()
            .skip(1)
            .filter_map(|row| row.first())
            .filter_map(|original| Url::parse(original).ok())
            .filter(|u| u.host_str().map(|h| h.eq_ignore_ascii_case(&target.host)).unwrap_or(false))
            .filter(|u| u.path() != "/" || u.query().is_some())
            .map(|u| {
                let mut rebuilt = format!("{}{}", target.base_url, u.path());
                if let Some(q) = u.query() {
                    rebuilt.push('?');
                    rebuilt.push_str(q);
                }
                Endpoint::get(rebuilt, DiscoverySource::Historical)
            })
            .collect();
        Ok(endpoints)
    }
}
