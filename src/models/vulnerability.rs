use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::category::VulnCategory;
use super::report::ProofOfConcept;
use super::severity::Severity;

/// A confirmed, severity-rated finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vulnerability {
    pub id: String,
    pub category: VulnCategory,
    pub severity: Severity,
    pub score: u8,
    pub endpoint: String,
    pub method: String,
    pub parameter: String,
    pub description: String,
    pub payload: String,
    pub confidence: u8,
    pub evidence: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_snippet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poc: Option<ProofOfConcept>,
    pub discovered_at: DateTime<Utc>,
    /// Number of raw findings merged into this record.
    #[serde(default = "default_occurrences")]
    pub occurrences: u32,
    /// Every endpoint the merged findings were observed on.
    #[serde(default)]
    pub endpoints: Vec<String>,
}

fn default_occurrences() -> u32 {
    1
}

impl Vulnerability {
    pub fn generate_id() -> String {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(6)
            .map(|c| char::from(c).to_ascii_lowercase())
            .collect();
        format!("VULN-{}-{}", Utc::now().timestamp_millis(), suffix)
    }

    /// Exact-key identity used by dedup.
    pub fn dedup_key(&self) -> (VulnCategory, String) {
        (self.category, self.parameter.clone())
    }

    pub fn title(&self) -> String {
        if self.parameter.is_empty() {
            format!("{} on {}", self.category.display_name(), self.endpoint)
        } else {
            format!(
                "{} in '{}' parameter",
                self.category.display_name(),
                self.parameter
            )
        }
    }
}
