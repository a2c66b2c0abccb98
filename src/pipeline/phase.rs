use serde::{Deserialize, Serialize};

use crate::models::{PhaseRecord, PhaseStatus};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PhaseName {
    ScopeIngestion,
    Discovery,
    AttackSurface,
    Exploitation,
    Reporting,
}

impl PhaseName {
    pub fn index(&self) -> u8 {
        match self {
            Self::ScopeIngestion => 0,
            Self::Discovery => 1,
            Self::AttackSurface => 2,
            Self::Exploitation => 3,
            Self::Reporting => 4,
        }
    }

    pub fn definition(&self) -> &'static PhaseDefinition {
        &PHASES[self.index() as usize]
    }
}

impl std::fmt::Display for PhaseName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ScopeIngestion => write!(f, "scope-ingestion"),
            Self::Discovery => write!(f, "discovery"),
            Self::AttackSurface => write!(f, "attack-surface"),
            Self::Exploitation => write!(f, "exploitation"),
            Self::Reporting => write!(f, "reporting"),
        }
    }
}

pub struct PhaseDefinition {
    pub name: PhaseName,
    pub display_name: &'static str,
    pub description: &'static str,
    /// Overall progress range this phase covers, start and end inclusive.
    pub band: (u8, u8),
}

pub static PHASES: &[PhaseDefinition] = &[
    PhaseDefinition {
        name: PhaseName::ScopeIngestion,
        display_name: "Scope Ingestion",
        description: "Scope parsing and subdomain enumeration",
        band: (0, 10),
    },
    PhaseDefinition {
        name: PhaseName::Discovery,
        display_name: "Discovery",
        description: "Endpoint collection from passive and active sources",
        band: (10, 35),
    },
    PhaseDefinition {
        name: PhaseName::AttackSurface,
        display_name: "Attack Surface",
        description: "Parameter extraction, classification and payload generation",
        band: (35, 50),
    },
    PhaseDefinition {
        name: PhaseName::Exploitation,
        display_name: "Exploitation",
        description: "Category-ordered probing with analysis and validation",
        band: (50, 95),
    },
    PhaseDefinition {
        name: PhaseName::Reporting,
        display_name: "Reporting",
        description: "Deduplication, proof-of-concept and executive report assembly",
        band: (95, 100),
    },
];

/// Fresh phase records for a new scan, all pending.
pub fn initial_records() -> Vec<PhaseRecord> {
    PHASES
        .iter()
        .map(|p| PhaseRecord {
            id: p.name.index(),
            name: p.display_name.to_string(),
            status: PhaseStatus::Pending,
            progress: 0,
            started_at: None,
            completed_at: None,
        })
        .collect()
}
