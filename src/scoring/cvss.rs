//! CVSS 3.1 base metrics: vector parsing, formatting and the base-score formula.

use std::fmt;
use std::str::FromStr;

use crate::errors::ZeronError;
use crate::models::VulnCategory;

const PREFIX: &str = "CVSS:3.1/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackVector {
    Network,
    Adjacent,
    Local,
    Physical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    None,
    Low,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserInteraction {
    None,
    Required,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Unchanged,
    Changed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CvssVector {
    pub attack_vector: AttackVector,
    /// Only Low and High are valid.
    pub attack_complexity: Level,
    pub privileges_required: Level,
    pub user_interaction: UserInteraction,
    pub scope: Scope,
    pub confidentiality: Level,
    pub integrity: Level,
    pub availability: Level,
}

impl CvssVector {
    /// `AV:N/AC:L/PR:N/UI:N/S:U/C:L/I:L/A:N`
    pub const LOW_IMPACT: CvssVector = CvssVector {
        attack_vector: AttackVector::Network,
        attack_complexity: Level::Low,
        privileges_required: Level::None,
        user_interaction: UserInteraction::None,
        scope: Scope::Unchanged,
        confidentiality: Level::Low,
        integrity: Level::Low,
        availability: Level::None,
    };

    pub fn for_category(category: VulnCategory) -> Self {
        let vector = match category {
            VulnCategory::Sqli | VulnCategory::Rce => "AV:N/AC:L/PR:N/UI:N/S:C/C:H/I:H/A:H",
            VulnCategory::Xss => "AV:N/AC:L/PR:N/UI:R/S:C/C:L/I:L/A:N",
            VulnCategory::Ssrf => "AV:N/AC:L/PR:N/UI:N/S:C/C:H/I:L/A:L",
            VulnCategory::PathTraversal | VulnCategory::Lfi | VulnCategory::Xxe => {
                "AV:N/AC:L/PR:N/UI:N/S:U/C:H/I:N/A:N"
            }
            VulnCategory::AuthBypass | VulnCategory::PrivilegeEscalation => {
                "AV:N/AC:L/PR:N/UI:N/S:U/C:H/I:H/A:N"
            }
            VulnCategory::Idor => "AV:N/AC:L/PR:L/UI:N/S:U/C:H/I:L/A:N",
            VulnCategory::OpenRedirect => "AV:N/AC:L/PR:N/UI:R/S:C/C:L/I:L/A:N",
            VulnCategory::Cors | VulnCategory::Csrf => "AV:N/AC:H/PR:N/UI:R/S:U/C:H/I:L/A:N",
            VulnCategory::Dos => "AV:N/AC:L/PR:N/UI:N/S:U/C:N/I:N/A:H",
            VulnCategory::InfoDisclosure | VulnCategory::BusinessLogic => {
                "AV:N/AC:L/PR:N/UI:N/S:U/C:L/I:L/A:N"
            }
        };
        vector.parse().unwrap_or(Self::LOW_IMPACT)
    }

    fn exploitability(&self) -> f64 {
        let av = match self.attack_vector {
            AttackVector::Network => 0.85,
            AttackVector::Adjacent => 0.62,
            AttackVector::Local => 0.55,
            AttackVector::Physical => 0.2,
        };
        let ac = match self.attack_complexity {
            Level::High => 0.44,
            _ => 0.77,
        };
        let changed = self.scope == Scope::Changed;
        let pr = match self.privileges_required {
            Level::None => 0.85,
            Level::Low if changed => 0.68,
            Level::Low => 0.62,
            Level::High if changed => 0.5,
            Level::High => 0.27,
        };
        let ui = match self.user_interaction {
            UserInteraction::None => 0.85,
            UserInteraction::Required => 0.62,
        };
        8.22 * av * ac * pr * ui
    }

    fn impact(&self) -> f64 {
        let cia = |level: Level| match level {
            Level::High => 0.56,
            Level::Low => 0.22,
            Level::None => 0.0,
        };
        let iss = 1.0
            - (1.0 - cia(self.confidentiality))
                * (1.0 - cia(self.integrity))
                * (1.0 - cia(self.availability));
        match self.scope {
            Scope::Unchanged => 6.42 * iss,
            Scope::Changed => 7.52 * (iss - 0.029) - 3.25 * (iss - 0.02).powi(15),
        }
    }

    pub fn base_score(&self) -> f64 {
        let impact = self.impact();
        if impact <= 0.0 {
            return 0.0;
        }
        let raw = match self.scope {
            Scope::Unchanged => impact + self.exploitability(),
            Scope::Changed => 1.08 * (impact + self.exploitability()),
        };
        roundup(raw.min(10.0))
    }
}

/// Smallest one-decimal number not less than `value`, robust to float noise.
fn roundup(value: f64) -> f64 {
    let scaled = (value * 100_000.0).round() as i64;
    if scaled % 10_000 == 0 {
        scaled as f64 / 100_000.0
    } else {
        ((scaled / 10_000) + 1) as f64 / 10.0
    }
}

fn level(metric: &str, value: &str) -> Result<Level, ZeronError> {
    match value {
        "N" => Ok(Level::None),
        "L" => Ok(Level::Low),
        "H" => Ok(Level::High),
        other => Err(ZeronError::Parse(format!("invalid CVSS value {}:{}", metric, other))),
    }
}

impl FromStr for CvssVector {
    type Err = ZeronError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s.trim().strip_prefix(PREFIX).unwrap_or(s.trim());
        let mut fields = std::collections::HashMap::new();
        for part in body.split('/') {
            let (metric, value) = part
                .split_once(':')
                .ok_or_else(|| ZeronError::Parse(format!("malformed CVSS component '{}'", part)))?;
            fields.insert(metric, value);
        }
        let get = |metric: &str| {
            fields
                .get(metric)
                .copied()
                .ok_or_else(|| ZeronError::Parse(format!("CVSS vector missing {}", metric)))
        };
        let attack_vector = match get("AV")? {
            "N" => AttackVector::Network,
            "A" => AttackVector::Adjacent,
            "L" => AttackVector::Local,
            "P" => AttackVector::Physical,
            other => return Err(ZeronError::Parse(format!("invalid CVSS value AV:{}", other))),
        };
        let attack_complexity = match get("AC")? {
            "L" => Level::Low,
            "H" => Level::High,
            other => return Err(ZeronError::Parse(format!("invalid CVSS value AC:{}", other))),
        };
        let user_interaction = match get("UI")? {
            "N" => UserInteraction::None,
            "R" => UserInteraction::Required,
            other => return Err(ZeronError::Parse(format!("invalid CVSS value UI:{}", other))),
        };
        let scope = match get("S")? {
            "U" => Scope::Unchanged,
            "C" => Scope::Changed,
            other => return Err(ZeronError::Parse(format!("invalid CVSS value S:{}", other))),
        };
        Ok(Self {
            attack_vector,
            attack_complexity,
            privileges_required: level("PR", get("PR")?)?,
            user_interaction,
            scope,
            confidentiality: level("C", get("C")?)?,
            integrity: level("I", get("I")?)?,
            availability: level("A", get("A")?)?,
        })
    }
}

impl fmt::Display for CvssVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lvl = |l: Level| match l {
            Level::None => 'N',
            Level::Low => 'L',
            Level::High => 'H',
        };
        let av = match self.attack_vector {
            AttackVector::Network => 'N',
            AttackVector::Adjacent => 'A',
            AttackVector::Local => 'L',
            AttackVector::Physical => 'P',
        };
        let ui = match self.user_interaction {
            UserInteraction::None => 'N',
            UserInteraction::Required => 'R',
        };
        let scope = match self.scope {
            Scope::Unchanged => 'U',
            Scope::Changed => 'C',
        };
        write!(
            f,
            "{}AV:{}/AC:{}/PR:{}/UI:{}/S:{}/C:{}/I:{}/A:{}",
            PREFIX,
            av,
            lvl(self.attack_complexity),
            lvl(self.privileges_required),
            ui,
            scope,
            lvl(self.confidentiality),
            lvl(self.integrity),
            lvl(self.availability)
        )
    }
}
