use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use url::Url;

use crate::models::{Endpoint, ParamClass, ParamLocation, Parameter, Sensitivity};

/// Classification rules, evaluated in order; the first match wins.
static RULES: LazyLock<Vec<(Regex, ParamClass, Sensitivity)>> = LazyLock::new(|| {
    [
        (r"password|pwd|pass", ParamClass::SensitiveAuth, Sensitivity::Critical),
        (r"email|user|username|login", ParamClass::UserIdentifier, Sensitivity::High),
        (r"token|api[_-]?key|secret|auth", ParamClass::Authentication, Sensitivity::Critical),
        (r"url|uri|path|file|directory", ParamClass::PathLike, Sensitivity::High),
        (r"id|_id|userid|user_id", ParamClass::Identifier, Sensitivity::Medium),
        (r"search|query|q", ParamClass::Search, Sensitivity::Medium),
        (r"filter|sort|order", ParamClass::Filter, Sensitivity::Low),
        (r"callback|redirect|return", ParamClass::RedirectLike, Sensitivity::High),
    ]
    .into_iter()
    .map(|(re, class, sens)| (Regex::new(re).unwrap(), class, sens))
    .collect()
});

const MAX_JSON_DEPTH: usize = 4;

pub fn classify(name: &str) -> (ParamClass, Sensitivity) {
    let lower = name.to_lowercase();
    RULES
        .iter()
        .find(|(re, _, _)| re.is_match(&lower))
        .map(|(_, class, sens)| (*class, *sens))
        .unwrap_or((ParamClass::Generic, Sensitivity::Low))
}

pub fn parameter(name: &str, location: ParamLocation, sample: Option<String>) -> Parameter {
    let (classification, sensitivity) = classify(name);
    Parameter {
        name: name.to_string(),
        location,
        classification,
        sensitivity,
        sample_value: sample,
    }
}

/// Query-string and form parameters of an endpoint, first occurrence of each name.
pub fn from_endpoint(endpoint: &Endpoint) -> Vec<Parameter> {
    let mut params: Vec<Parameter> = Vec::new();
    if let Ok(url) = Url::parse(&endpoint.url) {
        for (name, value) in url.query_pairs() {
            if name.is_empty() || params.iter().any(|p| p.name == name) {
                continue;
            }
            params.push(parameter(&name, ParamLocation::Query, Some(value.into_owned())));
        }
    }
    for input in &endpoint.inputs {
        if !params.iter().any(|p| &p.name == input) {
            params.push(parameter(input, ParamLocation::Form, None));
        }
    }
    params
}

/// Field names of a JSON body, nested keys joined with `.`; arrays are sampled by their first element.
pub fn json_keys(body: &Value) -> Vec<String> {
    let mut keys = Vec::new();
    walk(body, "", 0, &mut keys);
    keys
}

fn walk(value: &Value, prefix: &str, depth: usize, out: &mut Vec<String>) {
    if depth > MAX_JSON_DEPTH {
        return;
    }
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let name = if prefix.is_empty() { key.clone() } else { format!("{}.{}", prefix, key) };
                if !out.contains(&name) {
                    out.push(name.clone());
                }
                walk(child, &name, depth + 1, out);
            }
        }
        Value::Array(items) => {
            if let Some(first) = items.first() {
                walk(first, prefix, depth + 1, out);
            }
        }
        _ => {}
    }
}

pub fn from_json_body(body: &str) -> Vec<Parameter> {
    serde_json::from_str::<Value>(body)
        .map(|v| {
            json_keys(&v)
                .iter()
                .map(|k| parameter(k, ParamLocation::ResponseDerived, None))
                .collect()
        })
        .unwrap_or_default()
}
