use serde::Serialize;

use crate::models::{Severity, VulnCategory};
use super::phase::PhaseName;

/// Progress events streamed to the CLI renderer and API subscribers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScanEvent {
    ScanStarted {
        scan_id: String,
        domain: String,
    },
    PhaseStarted {
        scan_id: String,
        phase: PhaseName,
        display_name: String,
    },
    PhaseCompleted {
        scan_id: String,
        phase: PhaseName,
        display_name: String,
    },
    Progress {
        scan_id: String,
        phase: String,
        message: String,
        progress: u8,
        findings: usize,
    },
    FindingDiscovered {
        scan_id: String,
        vulnerability_id: String,
        category: VulnCategory,
        severity: Severity,
        endpoint: String,
        parameter: String,
    },
    ScanCompleted {
        scan_id: String,
        findings: usize,
        duration_ms: u64,
    },
    ScanFailed {
        scan_id: String,
        error: String,
    },
}

impl ScanEvent {
    pub fn scan_id(&self) -> &str {
        match self {
            Self::ScanStarted { scan_id, .. }
            | Self::PhaseStarted { scan_id, .. }
            | Self::PhaseCompleted { scan_id, .. }
            | Self::Progress { scan_id, .. }
            | Self::FindingDiscovered { scan_id, .. }
            | Self::ScanCompleted { scan_id, .. }
            | Self::ScanFailed { scan_id, .. } => scan_id,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::ScanCompleted { .. } | Self::ScanFailed { .. })
    }

    /// SSE event name.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ScanStarted { .. } => "scan_started",
            Self::PhaseStarted { .. } => "phase_started",
            Self::PhaseCompleted { .. } => "phase_completed",
            Self::Progress { .. } => "progress",
            Self::FindingDiscovered { .. } => "finding_discovered",
            Self::ScanCompleted { .. } => "scan_completed",
            Self::ScanFailed { .. } => "scan_failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_tag() {
        let event = ScanEvent::PhaseStarted {
            scan_id: "s1".into(),
            phase: PhaseName::AttackSurface,
            display_name: "Attack Surface".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "phase_started");
        assert_eq!(json["phase"], "attack_surface");
        assert_eq!(event.scan_id(), "s1");
        assert_eq!(event.kind(), "phase_started");
        assert!(!event.is_terminal());
    }
}
