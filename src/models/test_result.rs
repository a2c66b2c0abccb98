use serde::{Deserialize, Serialize};
use super::category::VulnCategory;

/// Analyzer verdict for a single probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub category: VulnCategory,
    pub vulnerable: bool,
    pub confidence: u8,
    pub evidence: Vec<String>,
    pub payload: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl TestResult {
    pub fn negative(category: VulnCategory, payload: &str) -> Self {
        Self {
            category,
            vulnerable: false,
            confidence: 0,
            evidence: Vec::new(),
            payload: payload.to_string(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: &str) -> Self {
        self.context = Some(context.to_string());
        self
    }
}
