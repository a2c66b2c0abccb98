use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use url::Url;

/// Where an endpoint was first (or additionally) seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoverySource {
    Seed,
    Historical,
    Sitemap,
    ScriptExtracted,
    Fuzzed,
    Crawled,
    ApiDocs,
}

impl DiscoverySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscoverySource::Seed => "seed",
            DiscoverySource::Historical => "historical",
            DiscoverySource::Sitemap => "sitemap",
            DiscoverySource::ScriptExtracted => "script_extracted",
            DiscoverySource::Fuzzed => "fuzzed",
            DiscoverySource::Crawled => "crawled",
            DiscoverySource::ApiDocs => "api_docs",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub url: String,
    pub method: String,
    pub sources: BTreeSet<DiscoverySource>,
    /// Form input names captured alongside the endpoint.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// SimHash of the page body when the endpoint was fetched during discovery.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<u64>,
}

impl Endpoint {
    pub fn new(url: impl Into<String>, method: &str, source: DiscoverySource) -> Self {
        Self {
            url: url.into(),
            method: method.to_ascii_uppercase(),
            sources: BTreeSet::from([source]),
            inputs: Vec::new(),
            status: None,
            fingerprint: None,
        }
    }

    pub fn get(url: impl Into<String>, source: DiscoverySource) -> Self {
        Self::new(url, "GET", source)
    }

    pub fn with_inputs(mut self, inputs: Vec<String>) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Dedup identity: method plus the value-stripped URL.
    pub fn identity(&self) -> String {
        format!("{} {}", self.method, normalize_url(&self.url))
    }

    /// Fold another sighting of the same endpoint into this one.
    pub fn absorb(&mut self, other: Endpoint) {
        self.sources.extend(other.sources);
        for input in other.inputs {
            if !self.inputs.contains(&input) {
                self.inputs.push(input);
            }
        }
        if self.status.is_none() {
            self.status = other.status;
        }
        if self.fingerprint.is_none() {
            self.fingerprint = other.fingerprint;
        }
    }

    pub fn host(&self) -> Option<String> {
        Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
    }
}

/// Canonical form of a URL with parameter values removed.
///
/// `origin + path`, followed by `?` and the sorted, de-duplicated parameter
/// names joined with `&` when the URL has a query. Fragments are dropped.
pub fn normalize_url(raw: &str) -> String {
    let Ok(parsed) = Url::parse(raw.trim()) else {
        return raw.trim().to_string();
    };

    let mut names: Vec<String> = parsed
        .query_pairs()
        .map(|(k, _)| k.into_owned())
        .filter(|k| !k.is_empty())
        .collect();
    names.sort();
    names.dedup();

    let base = format!("{}{}", parsed.origin().ascii_serialization(), parsed.path());
    if names.is_empty() {
        base
    } else {
        format!("{}?{}", base, names.join("&"))
    }
}
