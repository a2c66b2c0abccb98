use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, StreamExt};
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::net::IpAddr;
use tracing::{debug, info, warn};

use crate::errors::ZeronError;
use crate::http::{Fetcher, HttpRequest};
use super::scope::Scope;

const PREFIXES: [&str; 20] = [
    "www", "api", "dev", "staging", "admin", "mail", "app", "test", "beta", "portal",
    "m", "mobile", "shop", "blog", "cdn", "static", "vpn", "secure", "login", "auth",
];

const RESOLVE_CONCURRENCY: usize = 10;

/// Hostname to address lookup.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, ZeronError>;
}

pub struct HickoryResolver {
    inner: TokioAsyncResolver,
}

impl HickoryResolver {
    pub fn new() -> Self {
        Self {
            inner: TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default()),
        }
    }
}

impl Default for HickoryResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Resolver for HickoryResolver {
    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, ZeronError> {
        let lookup = self
            .inner
            .lookup_ip(host)
            .await
            .map_err(|e| ZeronError::Network(format!("DNS lookup for {} failed: {}", host, e)))?;
        Ok(lookup.iter().collect())
    }
}

/// Fixed host table, for tests and offline runs. Unknown hosts fail to resolve.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    hosts: HashMap<String, Vec<IpAddr>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(mut self, host: &str, addr: IpAddr) -> Self {
        self.hosts.entry(host.to_ascii_lowercase()).or_default().push(addr);
        self
    }
}

#[async_trait]
impl Resolver for StaticResolver {
    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, ZeronError> {
        self.hosts
            .get(&host.to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| ZeronError::Network(format!("NXDOMAIN: {}", host)))
    }
}

#[derive(Debug, Deserialize)]
struct CertEntry {
    name_value: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubdomainReport {
    /// Every in-scope host found, apex included.
    pub discovered: Vec<String>,
    /// Hosts that answered an HTTP request.
    pub live: Vec<String>,
}

async fn from_dns(domain: &str, resolver: &dyn Resolver) -> Vec<String> {
    let lookups: Vec<BoxFuture<'_, Option<String>>> = PREFIXES
        .iter()
        .map(|prefix| {
            let host = format!("{}.{}", prefix, domain);
            async move {
                match resolver.resolve(&host).await {
                    Ok(addrs) if !addrs.is_empty() => Some(host),
                    _ => None,
                }
            }
            .boxed()
        })
        .collect();
    let resolved: Vec<Option<String>> =
        stream::iter(lookups).buffer_unordered(RESOLVE_CONCURRENCY).collect().await;
    resolved.into_iter().flatten().collect()
}

async fn from_cert_transparency(domain: &str, fetcher: &dyn Fetcher) -> Result<Vec<String>, ZeronError> {
    let url = format!("https://crt.sh/?q=%25.{}&output=json", domain);
    let response = fetcher.fetch(&HttpRequest::get(url)).await?;
    if !response.is_success() {
        return Err(ZeronError::Network(format!("crt.sh returned {}", response.status)));
    }
    let entries: Vec<CertEntry> = serde_json::from_str(&response.body)
        .map_err(|e| ZeronError::Parse(format!("crt.sh response: {}", e)))?;

    let suffix = format!(".{}", domain);
    Ok(entries
        .iter()
        .flat_map(|e| e.name_value.lines())
        .map(|name| name.trim().trim_start_matches("*.").to_ascii_lowercase())
        .filter(|name| name == domain || name.ends_with(&suffix))
        .collect())
}

/// Merge DNS brute force, certificate transparency and the apex, then verify liveness.
pub async fn enumerate(
    domain: &str,
    scope: &Scope,
    resolver: &dyn Resolver,
    fetcher: &dyn Fetcher,
    verify_limit: usize,
    scheme: &str,
) -> SubdomainReport {
    let mut hosts: BTreeSet<String> = BTreeSet::new();
    hosts.insert(domain.to_string());
    hosts.extend(from_dns(domain, resolver).await);

    match from_cert_transparency(domain, fetcher).await {
        Ok(names) => hosts.extend(names),
        Err(e) => warn!(domain = %domain, error = %e, "Certificate transparency lookup failed"),
    }

    let discovered: Vec<String> = hosts.into_iter().filter(|h| scope.is_in_scope(h)).collect();
    debug!(domain = %domain, count = discovered.len(), "Subdomains collected");

    let mut live = Vec::new();
    for host in discovered.iter().filter(|h| h.as_str() != domain).take(verify_limit) {
        let url = format!("{}://{}/", scheme, host);
        match fetcher.fetch(&HttpRequest::get(url)).await {
            Ok(resp) if resp.status < 500 => live.push(host.clone()),
            Ok(resp) => debug!(host = %host, status = resp.status, "Subdomain not serving"),
            Err(e) => debug!(host = %host, error = %e, "Subdomain unreachable"),
        }
    }

    info!(domain = %domain, discovered = discovered.len(), live = live.len(), "Subdomain enumeration finished");
    SubdomainReport { discovered, live }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::StubFetcher;
    use std::net::Ipv4Addr;

    fn addr() -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))
    }

    #[tokio::test]
    async fn test_enumerate_merges_sources_and_filters_scope() {
        let resolver = StaticResolver::new()
            .with_host("www.shop.test", addr())
            .with_host("admin.shop.test", addr());
        let crt = r#"[{"name_value":"*.shop.test\nmail.shop.test"},{"name_value":"evil.other.test"}]"#;
        let fetcher = StubFetcher::new()
            .on("https://crt.sh/", 200, crt)
            .on("https://www.shop.test/", 200, "home")
            .on("https://mail.shop.test/", 503, "down");
        let scope = Scope::parse("shop.test\n-admin.shop.test").unwrap();

        let report = enumerate("shop.test", &scope, &resolver, &fetcher, 5, "https").await;
        assert_eq!(
            report.discovered,
            vec!["mail.shop.test".to_string(), "shop.test".into(), "www.shop.test".into()]
        );
        assert_eq!(report.live, vec!["www.shop.test".to_string()]);
    }

    #[tokio::test]
    async fn test_ct_failure_keeps_apex() {
        let resolver = StaticResolver::new();
        let fetcher = StubFetcher::new().fail("https://crt.sh/");
        let report = enumerate("lonely.test", &Scope::default(), &resolver, &fetcher, 5, "https").await;
        assert_eq!(report.discovered, vec!["lonely.test".to_string()]);
        assert!(report.live.is_empty());
    }
}
