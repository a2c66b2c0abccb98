use serde::{Deserialize, Serialize};

use crate::models::{Severity, VulnCategory};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthRequired {
    None,
    Low,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Low,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityModifiers {
    pub impact: Impact,
    pub auth: AuthRequired,
    pub complexity: Complexity,
}

impl SeverityModifiers {
    /// Modifiers assumed for an unauthenticated finding of `category`.
    pub fn for_category(category: VulnCategory) -> Self {
        use VulnCategory::*;
        let impact = match category {
            Rce | Sqli | AuthBypass | PrivilegeEscalation | Xxe | Ssrf | Idor | PathTraversal | Lfi => {
                Impact::High
            }
            Xss | Cors | OpenRedirect | Csrf | BusinessLogic | Dos => Impact::Medium,
            InfoDisclosure => Impact::Low,
        };
        let complexity = match category {
            Cors | Csrf | BusinessLogic => Complexity::High,
            _ => Complexity::Low,
        };
        Self { impact, auth: AuthRequired::None, complexity }
    }

    fn adjustment(&self) -> i32 {
        let impact = match self.impact {
            Impact::High => 15,
            Impact::Medium => 5,
            Impact::Low => -5,
        };
        let auth = match self.auth {
            AuthRequired::None => 10,
            AuthRequired::Low => 5,
            AuthRequired::High => -5,
        };
        let complexity = match self.complexity {
            Complexity::Low => 10,
            Complexity::High => -15,
        };
        impact + auth + complexity
    }
}

pub fn base_score(category: VulnCategory) -> u8 {
    use VulnCategory::*;
    match category {
        Rce => 90,
        AuthBypass => 85,
        PrivilegeEscalation | Sqli => 80,
        Idor | Xxe | Ssrf => 75,
        BusinessLogic | PathTraversal | Lfi => 70,
        Cors => 65,
        Xss => 60,
        OpenRedirect | Csrf => 50,
        Dos => 40,
        InfoDisclosure => 30,
    }
}

/// Score clamped to 0..=100 and its severity bucket.
pub fn score_with(category: VulnCategory, modifiers: &SeverityModifiers) -> (u8, Severity) {
    let score = (base_score(category) as i32 + modifiers.adjustment()).clamp(0, 100) as u8;
    (score, Severity::from_score(score))
}

pub fn rate(category: VulnCategory) -> (u8, Severity) {
    score_with(category, &SeverityModifiers::for_category(category))
}
