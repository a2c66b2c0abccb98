//! Per-category probe construction for one attack vector.

use url::Url;

use crate::analyzer::misconfig::{PROBE_ORIGIN, PROBE_REDIRECT_HOST};
use crate::config::ExploitConfig;
use crate::http::HttpRequest;
use crate::models::{ParamClass, VulnCategory};
use crate::surface::{payloads, Vector};

const REDIRECT_NAMES: [&str; 6] = ["next", "url", "redirect", "return", "dest", "continue"];
const NUMERIC_NAMES: [&str; 9] = [
    "price", "amount", "qty", "quantity", "total", "discount", "count", "balance", "cost",
];
const LOGIN_MARKERS: [&str; 4] = ["login", "signin", "auth", "session"];
const AUTH_BYPASS_PAYLOADS: [&str; 3] = ["admin' OR '1'='1", "admin'--", "' OR 1=1--"];
const BUSINESS_VALUES: [&str; 4] = ["-1", "0", "0.01", "99999999"];
const INVALID_USER: &str = "zeron-invalid-user";

#[derive(Debug, Clone)]
pub struct ProbeCase {
    pub request: HttpRequest,
    pub payload: String,
}

/// Everything the engine sends for one (vector, category) pair.
#[derive(Debug, Clone)]
pub struct CategoryPlan {
    /// Unmodified request for differential analysis.
    pub baseline: Option<HttpRequest>,
    pub probes: Vec<ProbeCase>,
    /// Confirmation needs independent agreement between probes.
    pub cross_validate: bool,
}

impl CategoryPlan {
    fn simple(probes: Vec<ProbeCase>) -> Self {
        Self { baseline: None, probes, cross_validate: false }
    }
}

/// Request for `vector` with its parameter set to `value`.
pub fn inject(vector: &Vector, value: &str) -> HttpRequest {
    if vector.sends_in_query() {
        let url = with_query_value(&vector.url, &vector.parameter.name, value);
        if vector.method == "GET" || vector.siblings.is_empty() {
            return HttpRequest::new(&vector.method, url);
        }
        return HttpRequest::form(&vector.method, url, &vector.siblings);
    }
    let mut fields = vector.siblings.clone();
    fields.push((vector.parameter.name.clone(), value.to_string()));
    HttpRequest::form(&vector.method, vector.url.clone(), &fields)
}

/// Replace (or append) one query parameter, leaving the others in place.
pub fn with_query_value(url: &str, name: &str, value: &str) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        let sep = if url.contains('?') { '&' } else { '?' };
        return format!("{}{}{}={}", url, sep, name, value);
    };
    let mut pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    match pairs.iter_mut().find(|(k, _)| k == name) {
        Some(pair) => pair.1 = value.to_string(),
        None => pairs.push((name.to_string(), value.to_string())),
    }
    parsed.query_pairs_mut().clear().extend_pairs(pairs);
    parsed.to_string()
}

fn payload_probes(vector: &Vector, category: VulnCategory, limit: usize) -> Vec<ProbeCase> {
    let mut texts: Vec<String> = vector
        .payloads
        .iter()
        .filter(|p| p.category == category)
        .map(|p| p.text.clone())
        .collect();
    if texts.is_empty() {
        texts = payloads::plain_set(category).into_iter().map(|p| p.text).collect();
    }
    texts.truncate(limit);
    texts
        .into_iter()
        .map(|text| ProbeCase { request: inject(vector, &text), payload: text })
        .collect()
}

fn is_login_like(vector: &Vector) -> bool {
    let lower = vector.url.to_lowercase();
    LOGIN_MARKERS.iter().any(|m| lower.contains(m))
        || vector
            .siblings
            .iter()
            .any(|(name, _)| crate::surface::parameters::classify(name).0 == ParamClass::SensitiveAuth)
}

fn is_redirect_param(vector: &Vector) -> bool {
    let name = vector.parameter.name.to_lowercase();
    matches!(vector.parameter.classification, ParamClass::RedirectLike | ParamClass::PathLike)
        || REDIRECT_NAMES.iter().any(|n| name == *n)
}

fn is_numeric_param(vector: &Vector) -> bool {
    let name = vector.parameter.name.to_lowercase();
    NUMERIC_NAMES.iter().any(|n| name.contains(n))
        || vector
            .parameter
            .sample_value
            .as_deref()
            .map(|v| v.trim().parse::<f64>().is_ok())
            .unwrap_or(false)
}

/// Probe plan for a category, or `None` when the category does not apply to the vector.
pub fn plan(vector: &Vector, category: VulnCategory, config: &ExploitConfig) -> Option<CategoryPlan> {
    match category {
        VulnCategory::InfoDisclosure => {
            let long = "A".repeat(1024);
            let probes = ["'", "\"", "%00", "[]", long.as_str(), "{{7*7}}"]
                .into_iter()
                .map(|v| ProbeCase { request: inject(vector, v), payload: v.to_string() })
                .collect();
            Some(CategoryPlan::simple(probes))
        }
        VulnCategory::Idor => {
            if vector.parameter.classification != ParamClass::Identifier {
                return None;
            }
            let original = vector.parameter.numeric_sample()?;
            let probes: Vec<ProbeCase> = [original.checked_add(1), original.checked_sub(1)]
                .into_iter()
                .flatten()
                .map(|v| {
                    let value = v.to_string();
                    ProbeCase { request: inject(vector, &value), payload: value }
                })
                .collect();
            Some(CategoryPlan {
                baseline: Some(inject(vector, &original.to_string())),
                probes,
                cross_validate: true,
            })
        }
        VulnCategory::Cors => {
            let base = vector.url.split(['?', '#']).next().unwrap_or(&vector.url);
            let request = HttpRequest::get(base).header("Origin", PROBE_ORIGIN);
            Some(CategoryPlan::simple(vec![ProbeCase {
                request,
                payload: PROBE_ORIGIN.to_string(),
            }]))
        }
        VulnCategory::OpenRedirect => {
            if !is_redirect_param(vector) {
                return None;
            }
            let probes = [
                format!("https://{}/", PROBE_REDIRECT_HOST),
                format!("//{}", PROBE_REDIRECT_HOST),
                format!("https://{}%2f%2e%2e", PROBE_REDIRECT_HOST),
            ]
            .into_iter()
            .map(|p| ProbeCase { request: inject(vector, &p).no_redirects(), payload: p })
            .collect();
            Some(CategoryPlan::simple(probes))
        }
        VulnCategory::AuthBypass => {
            if vector.parameter.classification != ParamClass::UserIdentifier || !is_login_like(vector) {
                return None;
            }
            let probes = AUTH_BYPASS_PAYLOADS
                .into_iter()
                .map(|p| ProbeCase { request: inject(vector, p).no_redirects(), payload: p.to_string() })
                .collect();
            Some(CategoryPlan {
                baseline: Some(inject(vector, INVALID_USER).no_redirects()),
                probes,
                cross_validate: false,
            })
        }
        VulnCategory::BusinessLogic => {
            if !is_numeric_param(vector) {
                return None;
            }
            let probes = BUSINESS_VALUES
                .into_iter()
                .map(|v| ProbeCase { request: inject(vector, v), payload: v.to_string() })
                .collect();
            Some(CategoryPlan::simple(probes))
        }
        other => {
            let probes = payload_probes(vector, other, config.payloads_per_vector);
            if probes.is_empty() {
                None
            } else {
                Some(CategoryPlan::simple(probes))
            }
        }
    }
}
