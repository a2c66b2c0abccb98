use chrono::Utc;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::models::{PhaseStatus, Scan, ScanStatus, Vulnerability};
use super::phase::PhaseName;
use super::progress::band_progress;

/// Shared handle on the one mutable Scan record. Every write goes through here.
#[derive(Clone)]
pub struct ScanState {
    inner: Arc<RwLock<Scan>>,
}

impl ScanState {
    pub fn new(scan: Scan) -> Self {
        Self { inner: Arc::new(RwLock::new(scan)) }
    }

    // A panic while the lock is held must not cost the record, so poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, Scan> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Scan> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> Scan {
        self.read().clone()
    }

    pub fn id(&self) -> String {
        self.read().id.clone()
    }

    pub fn progress(&self) -> u8 {
        self.read().progress
    }

    pub fn finding_count(&self) -> usize {
        self.read().vulnerabilities.len()
    }

    /// Apply an arbitrary mutation, e.g. recording discovered assets.
    pub fn update<F: FnOnce(&mut Scan)>(&self, f: F) {
        let mut scan = self.write();
        f(&mut scan);
    }

    pub fn start(&self) {
        let mut scan = self.write();
        scan.status = ScanStatus::Running;
        scan.started_at = Some(Utc::now());
        scan.error = None;
    }

    pub fn start_phase(&self, phase: PhaseName) {
        let definition = phase.definition();
        let mut scan = self.write();
        scan.current_phase = Some(definition.display_name.to_string());
        scan.progress = scan.progress.max(definition.band.0);
        if let Some(record) = scan.phases.get_mut(phase.index() as usize) {
            record.status = PhaseStatus::InProgress;
            record.started_at = Some(Utc::now());
        }
    }

    /// Record sub-progress (0.0-1.0) inside a phase and raise overall progress to match.
    pub fn phase_progress(&self, phase: PhaseName, fraction: f64) -> u8 {
        let overall = band_progress(phase, fraction);
        let mut scan = self.write();
        if let Some(record) = scan.phases.get_mut(phase.index() as usize) {
            let sub = (fraction.clamp(0.0, 1.0) * 100.0).floor() as u8;
            record.progress = record.progress.max(sub);
        }
        scan.progress = scan.progress.max(overall);
        scan.progress
    }

    pub fn complete_phase(&self, phase: PhaseName) {
        let end = phase.definition().band.1;
        let mut scan = self.write();
        if let Some(record) = scan.phases.get_mut(phase.index() as usize) {
            record.status = PhaseStatus::Completed;
            record.progress = 100;
            record.completed_at = Some(Utc::now());
        }
        scan.progress = scan.progress.max(end);
    }

    /// Append a vulnerability and return the running total.
    pub fn add_vulnerability(&self, vulnerability: Vulnerability) -> usize {
        let mut scan = self.write();
        scan.vulnerabilities.push(vulnerability);
        scan.vulnerabilities.len()
    }

    pub fn complete(&self) {
        let mut scan = self.write();
        scan.status = ScanStatus::Completed;
        scan.progress = 100;
        scan.current_phase = None;
        scan.completed_at = Some(Utc::now());
    }

    /// Mark the scan failed. Vulnerabilities and progress are left untouched.
    pub fn fail(&self, error: &str) {
        let mut scan = self.write();
        scan.status = ScanStatus::Failed;
        scan.error = Some(error.to_string());
        scan.completed_at = Some(Utc::now());
    }
}
