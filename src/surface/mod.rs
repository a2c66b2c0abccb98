//! Attack surface: parameters per endpoint, classified, with ranked payloads.

pub mod parameters;
pub mod payloads;

use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info};

use crate::config::SurfaceConfig;
use crate::http::{Fetcher, HttpRequest};
use crate::models::{Endpoint, ParamLocation, Parameter, Payload};

/// An (endpoint, parameter) pair eligible for payload testing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vector {
    /// `METHOD normalized-url::parameter`
    pub id: String,
    pub url: String,
    pub method: String,
    pub parameter: Parameter,
    /// Other parameters sent alongside, with their sample (or placeholder) values.
    pub siblings: Vec<(String, String)>,
    pub payloads: Vec<Payload>,
}

impl Vector {
    pub fn sends_in_query(&self) -> bool {
        self.method == "GET" || self.parameter.location == ParamLocation::Query
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttackSurface {
    pub vectors: Vec<Vector>,
    /// Parameters seen but excluded from testing.
    pub excluded: Vec<(String, Parameter)>,
    pub endpoints_considered: usize,
}

/// Rank endpoints so the cap keeps the most promising ones.
pub fn priority_score(endpoint: &Endpoint) -> u32 {
    let lower = endpoint.url.to_ascii_lowercase();
    let params = parameters::from_endpoint(endpoint).len() as u32;
    let mut score = params.min(5) * 10;
    if lower.contains("/api/") || lower.contains("graphql") {
        score += 10;
    }
    if endpoint.method != "GET" {
        score += 8;
    }
    if ["login", "signin", "auth", "account", "admin"].iter().any(|k| lower.contains(k)) {
        score += 10;
    }
    if lower.contains("upload") {
        score += 8;
    }
    score
}

pub struct AttackSurfaceBuilder {
    config: SurfaceConfig,
    concurrency: usize,
}

impl AttackSurfaceBuilder {
    pub fn new(config: SurfaceConfig, concurrency: usize) -> Self {
        Self { config, concurrency: concurrency.max(1) }
    }

    /// Build the vector set for at most `endpoint_cap` endpoints. Response
    /// sampling stops once `cancel` fires; the vectors from URLs and forms are
    /// still returned.
    pub async fn build(
        &self,
        endpoints: &[Endpoint],
        endpoint_cap: usize,
        fetcher: &dyn Fetcher,
        cancel: &CancellationToken,
    ) -> AttackSurface {
        let cap = endpoint_cap.min(self.config.max_endpoints);
        let mut ranked: Vec<&Endpoint> = endpoints.iter().collect();
        ranked.sort_by_key(|e| std::cmp::Reverse(priority_score(e)));
        ranked.truncate(cap);

        // Structured responses contribute field names
        let samples: Vec<BoxFuture<'_, (usize, Vec<Parameter>)>> = ranked
            .iter()
            .enumerate()
            .filter(|(_, e)| e.method == "GET")
            .map(|(idx, e)| {
                let url = e.url.clone();
                async move {
                    if cancel.is_cancelled() {
                        return (idx, Vec::new());
                    }
                    match fetcher.fetch(&HttpRequest::get(url.clone())).await {
                        Ok(resp) if resp.is_success() && resp.is_json() => {
                            (idx, parameters::from_json_body(&resp.body))
                        }
                        Ok(_) => (idx, Vec::new()),
                        Err(e) => {
                            debug!(url = %url, error = %e, "Response sampling failed");
                            (idx, Vec::new())
                        }
                    }
                }
                .boxed()
            })
            .collect();
        let derived: Vec<(usize, Vec<Parameter>)> =
            stream::iter(samples).buffer_unordered(self.concurrency).collect().await;

        let mut surface = AttackSurface { endpoints_considered: ranked.len(), ..Default::default() };
        let mut seen: HashSet<String> = HashSet::new();

        for (idx, endpoint) in ranked.iter().enumerate() {
            let mut params = parameters::from_endpoint(endpoint);
            if let Some((_, extra)) = derived.iter().find(|(i, _)| *i == idx) {
                for p in extra {
                    if !params.iter().any(|existing| existing.name == p.name) {
                        params.push(p.clone());
                    }
                }
            }

            let base_url = strip_query(&endpoint.url);
            for param in &params {
                if !param.is_injectable() {
                    surface.excluded.push((endpoint.url.clone(), param.clone()));
                    continue;
                }
                let id = format!("{}::{}", endpoint.identity(), param.name);
                if !seen.insert(id.clone()) {
                    continue;
                }
                let siblings = params
                    .iter()
                    .filter(|p| p.name != param.name && p.location != ParamLocation::ResponseDerived)
                    .map(|p| (p.name.clone(), placeholder(p)))
                    .collect();
                surface.vectors.push(Vector {
                    id,
                    url: if endpoint.method == "GET" { endpoint.url.clone() } else { base_url.clone() },
                    method: endpoint.method.clone(),
                    parameter: param.clone(),
                    siblings,
                    payloads: payloads::generate(param, &self.config),
                });
            }
        }

        info!(
            endpoints = surface.endpoints_considered,
            vectors = surface.vectors.len(),
            excluded = surface.excluded.len(),
            "Attack surface built"
        );
        surface
    }
}

fn strip_query(url: &str) -> String {
    url.split(['?', '#']).next().unwrap_or(url).to_string()
}

/// Benign value for a parameter that is not under test.
fn placeholder(param: &Parameter) -> String {
    if let Some(sample) = param.sample_value.as_ref().filter(|s| !s.is_empty()) {
        return sample.clone();
    }
    match param.classification {
        crate::models::ParamClass::SensitiveAuth => "Zeron-Probe-1!".into(),
        crate::models::ParamClass::UserIdentifier => "zeron-probe".into(),
        crate::models::ParamClass::Identifier => "1".into(),
        _ => "test".into(),
    }
}
