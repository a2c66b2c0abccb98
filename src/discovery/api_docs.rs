use async_trait::async_trait;
use serde_json::Value;

use crate::http::{Fetcher, HttpRequest};
use crate::models::{DiscoverySource, Endpoint};
use super::{Collector, Target};

const DOC_PATHS: [&str; 10] = [
    "/swagger.json",
    "/openapi.json",
    "/api-docs",
    "/v1/openapi.json",
    "/v2/api-docs",
    "/api/swagger.json",
    "/swagger-ui.html",
    "/docs",
    "/api/docs",
    "/swagger/v1/swagger.json",
];

const GRAPHQL_PATHS: [&str; 4] = ["/graphql", "/api/graphql", "/v1/graphql", "/graph"];

const METHODS: [&str; 5] = ["get", "post", "put", "patch", "delete"];

/// Endpoints declared by an OpenAPI/Swagger document.
fn openapi_endpoints(doc: &Value, target: &Target) -> Vec<Endpoint> {
    let Some(paths) = doc.get("paths").and_then(Value::as_object) else {
        return Vec::new();
    };
    let base = doc
        .get("basePath")
        .and_then(Value::as_str)
        .unwrap_or("")
        .trim_end_matches('/');

    let mut endpoints = Vec::new();
    for (path, item) in paths {
        // Template segments get a concrete numeric value
        let concrete: String = path
            .split('/')
            .map(|seg| if seg.starts_with('{') && seg.ends_with('}') { "1" } else { seg })
            .collect::<Vec<_>>()
            .join("/");
        for method in METHODS {
            let Some(op) = item.get(method) else { continue };
            let query: Vec<String> = op
                .get("parameters")
                .and_then(Value::as_array)
                .map(|params| {
                    params
                        .iter()
                        .filter(|p| p.get("in").and_then(Value::as_str) == Some("query"))
                        .filter_map(|p| p.get("name").and_then(Value::as_str))
                        .map(|name| format!("{}=1", name))
                        .collect()
                })
                .unwrap_or_default();
            let mut url = target.url(&format!("{}{}", base, concrete));
            if !query.is_empty() {
                url.push('?');
                url.push_str(&query.join("&"));
            }
            endpoints.push(Endpoint::new(url, method, DiscoverySource::ApiDocs));
        }
    }
    endpoints
}

/// Probes well-known API documentation and GraphQL locations.
pub struct ApiDocsCollector;

#[async_trait]
impl Collector for ApiDocsCollector {
    fn name(&self) -> &'static str {
        "api_docs"
    }

    async fn collect(&self, target: &Target, fetcher: &dyn Fetcher) -> anyhow::Result<Vec<Endpoint>> {
        let mut endpoints = Vec::new();
        for path in DOC_PATHS.iter().chain(GRAPHQL_PATHS.iter()) {
            let url = target.url(path);
            let Ok(resp) = fetcher.fetch(&HttpRequest::get(url.clone())).await else { continue };
            if resp.status != 200 {
                continue;
            }
            endpoints.push(Endpoint::get(url, DiscoverySource::ApiDocs).with_status(200));
            if let Ok(doc) = serde_json::from_str::<Value>(&resp.body) {
                endpoints.extend(openapi_endpoints(&doc, target));
            }
        }
        Ok(endpoints)
    }
}
