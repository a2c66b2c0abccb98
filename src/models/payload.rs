use serde::{Deserialize, Serialize};
use super::category::VulnCategory;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    Plain,
    UrlEncoded,
    Base64,
    DoubleUrl,
    /// Classification-specific mutation (wildcard suffix, boolean suffix, script scheme).
    ContextMutation,
}

/// Sleep-style payloads are the only ones whose latency is meaningful.
pub fn is_time_based(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    ["sleep(", "waitfor delay", "pg_sleep", "benchmark("]
        .iter()
        .any(|marker| lower.contains(marker))
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Payload {
    pub text: String,
    pub category: VulnCategory,
    pub encoding: Encoding,
    /// Name of the template the payload was derived from.
    pub template: String,
}

impl Payload {
    pub fn plain(text: impl Into<String>, category: VulnCategory, template: &str) -> Self {
        Self {
            text: text.into(),
            category,
            encoding: Encoding::Plain,
            template: template.to_string(),
        }
    }

    pub fn is_time_based(&self) -> bool {
        is_time_based(&self.text)
    }
}
