use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use chrono::Utc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::ZeronConfig;
use crate::db::ScanStore;
use crate::discovery::{subdomains, AssetDiscovery, Resolver, Scope, Target};
use crate::errors::ZeronError;
use crate::exploit::{CategoryProgress, ConfirmedFinding, ExploitEngine};
use crate::http::Fetcher;
use crate::models::{Scan, ScanStatus, Vulnerability, EXPLOIT_ORDER};
use crate::reporting;
use crate::scoring;
use crate::surface::AttackSurfaceBuilder;
use super::events::ScanEvent;
use super::persist::Persister;
use super::phase::PhaseName;
use super::progress;
use super::state::ScanState;

/// Runs one scan through every phase, owning its Scan record for the duration.
pub struct ScanOrchestrator {
    state: ScanState,
    config: Arc<ZeronConfig>,
    fetcher: Arc<dyn Fetcher>,
    resolver: Arc<dyn Resolver>,
    store: Option<Arc<dyn ScanStore>>,
    discovery: AssetDiscovery,
    cancel_token: CancellationToken,
    event_tx: Option<mpsc::UnboundedSender<ScanEvent>>,
}

impl ScanOrchestrator {
    pub fn new(
        scan: Scan,
        config: Arc<ZeronConfig>,
        fetcher: Arc<dyn Fetcher>,
        resolver: Arc<dyn Resolver>,
    ) -> Self {
        let discovery = AssetDiscovery::new(&config.discovery).with_concurrency(scan.limits.concurrency);
        Self {
            state: ScanState::new(scan),
            config,
            fetcher,
            resolver,
            store: None,
            discovery,
            cancel_token: CancellationToken::new(),
            event_tx: None,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn ScanStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Replace the collector set, e.g. with offline collectors in tests.
    pub fn with_discovery(mut self, discovery: AssetDiscovery) -> Self {
        self.discovery = discovery;
        self
    }

    /// Use an external token so that cancelling it stops this scan.
    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    pub fn with_event_channel(mut self, tx: mpsc::UnboundedSender<ScanEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    pub fn state(&self) -> ScanState {
        self.state.clone()
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    fn emit(&self, event: ScanEvent) {
        if let Some(ref tx) = self.event_tx {
            let _ = tx.send(event);
        }
    }

    fn emit_progress(&self, phase: PhaseName, message: String) {
        self.emit(ScanEvent::Progress {
            scan_id: self.state.id(),
            phase: phase.definition().display_name.to_string(),
            message,
            progress: self.state.progress(),
            findings: self.state.finding_count(),
        });
    }

    fn begin(&self, phase: PhaseName, persister: &Persister) -> Result<(), ZeronError> {
        self.check_cancelled()?;
        self.state.start_phase(phase);
        persister.save(self.state.snapshot());
        info!(scan_id = %self.state.id(), phase = %phase, "Phase started");
        self.emit(ScanEvent::PhaseStarted {
            scan_id: self.state.id(),
            phase,
            display_name: phase.definition().display_name.to_string(),
        });
        Ok(())
    }

    fn finish(&self, phase: PhaseName, persister: &Persister) {
        self.state.complete_phase(phase);
        persister.save(self.state.snapshot());
        info!(scan_id = %self.state.id(), phase = %phase, progress = self.state.progress(), "Phase complete");
        self.emit(ScanEvent::PhaseCompleted {
            scan_id: self.state.id(),
            phase,
            display_name: phase.definition().display_name.to_string(),
        });
    }

    fn check_cancelled(&self) -> Result<(), ZeronError> {
        if self.cancel_token.is_cancelled() {
            Err(ZeronError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Run every phase. Never returns an error: failures end up in the scan's
    /// `status` and `error`, with findings confirmed so far retained.
    pub async fn run(&self) -> Scan {
        let persister = Persister::spawn(self.store.clone());
        let scan_id = self.state.id();

        self.state.start();
        persister.save(self.state.snapshot());
        let domain = self.state.snapshot().domain;
        info!(scan_id = %scan_id, domain = %domain, "Scan started");
        self.emit(ScanEvent::ScanStarted { scan_id: scan_id.clone(), domain });

        let outcome = AssertUnwindSafe(self.run_phases(&persister))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(ZeronError::Internal(panic_message(panic.as_ref()))));

        match outcome {
            Ok(()) => {
                self.state.complete();
                let scan = self.state.snapshot();
                info!(scan_id = %scan_id, findings = scan.vulnerabilities.len(), "Scan completed");
                self.emit(ScanEvent::ScanCompleted {
                    scan_id: scan_id.clone(),
                    findings: scan.vulnerabilities.len(),
                    duration_ms: scan.duration_ms(),
                });
            }
            Err(ZeronError::Cancelled) => {
                self.state.fail("cancelled");
                warn!(scan_id = %scan_id, findings = self.state.finding_count(), "Scan cancelled");
                self.emit(ScanEvent::ScanFailed { scan_id: scan_id.clone(), error: "cancelled".into() });
            }
            Err(e) => {
                self.state.fail(&e.to_string());
                error!(scan_id = %scan_id, error = %e, "Scan failed");
                self.emit(ScanEvent::ScanFailed { scan_id: scan_id.clone(), error: e.to_string() });
            }
        }

        persister.save(self.state.snapshot());
        persister.flush().await;
        self.state.snapshot()
    }

    async fn run_phases(&self, persister: &Persister) -> Result<(), ZeronError> {
        let (scope, targets) = self.ingest_scope(persister).await?;
        let endpoints = self.discover(&targets, &scope, persister).await?;
        let vectors = self.build_surface(&endpoints, persister).await?;
        self.exploit(&vectors, persister).await?;
        self.report(persister)
    }

    async fn ingest_scope(&self, persister: &Persister) -> Result<(Scope, Vec<Target>), ZeronError> {
        self.begin(PhaseName::ScopeIngestion, persister)?;
        let scan = self.state.snapshot();
        let scope = Scope::from_lines(&scan.scope)?;
        let scheme = self.config.http.default_scheme.as_str();
        let mut targets = vec![Target::new(&scan.domain, scheme)];

        if self.config.discovery.enable_subdomains {
            let report = subdomains::enumerate(
                &scan.domain,
                &scope,
                self.resolver.as_ref(),
                self.fetcher.as_ref(),
                self.config.discovery.subdomain_verify_limit,
                scheme,
            )
            .await;
            targets.extend(report.live.iter().map(|h| Target::new(h, scheme)));
            self.state.update(|s| s.assets.subdomains = report.discovered.clone());
            self.emit_progress(
                PhaseName::ScopeIngestion,
                format!("{} subdomains found, {} live", report.discovered.len(), report.live.len()),
            );
        } else {
            self.state.update(|s| s.assets.subdomains = vec![scan.domain.clone()]);
        }

        self.finish(PhaseName::ScopeIngestion, persister);
        Ok((scope, targets))
    }

    async fn discover(
        &self,
        targets: &[Target],
        scope: &Scope,
        persister: &Persister,
    ) -> Result<Vec<crate::models::Endpoint>, ZeronError> {
        self.begin(PhaseName::Discovery, persister)?;
        let report = self.discovery.discover(targets, self.fetcher.as_ref(), scope, &self.cancel_token).await;

        let fingerprints: Vec<(String, u64)> = report
            .endpoints
            .iter()
            .filter_map(|e| e.fingerprint.map(|f| (e.url.clone(), f)))
            .collect();
        self.state.update(|s| {
            s.assets.endpoints = report.endpoints.len();
            s.assets.technologies = report.technologies.clone();
            s.assets.collector_errors = report.collector_errors.clone();
            s.assets.fingerprints = fingerprints;
        });
        self.emit_progress(
            PhaseName::Discovery,
            format!("{} endpoints from {} targets", report.endpoints.len(), targets.len()),
        );
        self.finish(PhaseName::Discovery, persister);
        Ok(report.endpoints)
    }

    async fn build_surface(
        &self,
        endpoints: &[crate::models::Endpoint],
        persister: &Persister,
    ) -> Result<Vec<crate::surface::Vector>, ZeronError> {
        self.begin(PhaseName::AttackSurface, persister)?;
        let limits = self.state.snapshot().limits;
        let builder = AttackSurfaceBuilder::new(self.config.surface.clone(), limits.concurrency);
        let surface = builder
            .build(endpoints, limits.max_endpoints, self.fetcher.as_ref(), &self.cancel_token)
            .await;

        self.state.update(|s| s.assets.vectors = surface.vectors.len());
        self.emit_progress(
            PhaseName::AttackSurface,
            format!(
                "{} vectors across {} endpoints, {} parameters excluded",
                surface.vectors.len(),
                surface.endpoints_considered,
                surface.excluded.len()
            ),
        );
        self.finish(PhaseName::AttackSurface, persister);
        Ok(surface.vectors)
    }

    async fn exploit(&self, vectors: &[crate::surface::Vector], persister: &Persister) -> Result<(), ZeronError> {
        self.begin(PhaseName::Exploitation, persister)?;
        let limits = self.state.snapshot().limits;
        let engine = ExploitEngine::new(self.config.exploit.clone(), &limits);

        let on_progress = |p: CategoryProgress| {
            self.state.phase_progress(PhaseName::Exploitation, progress::exploitation_fraction(p));
            self.emit_progress(
                PhaseName::Exploitation,
                format!("{}: {}/{} vectors", p.category.display_name(), p.completed, p.total),
            );
        };

        for category in EXPLOIT_ORDER {
            if self.cancel_token.is_cancelled() {
                break;
            }
            let findings = engine
                .run_category(category, vectors, self.fetcher.as_ref(), &self.cancel_token, &on_progress)
                .await;
            for finding in findings {
                self.record_finding(finding, persister);
            }
            // A category with no vectors still moves the bar
            on_progress(CategoryProgress { category, completed: 0, total: 0 });
            persister.save(self.state.snapshot());
        }

        let sent = limits.max_payloads.saturating_sub(engine.remaining_budget());
        self.state.update(|s| s.assets.probes_sent = sent);
        self.check_cancelled()?;
        self.finish(PhaseName::Exploitation, persister);
        Ok(())
    }

    fn record_finding(&self, finding: ConfirmedFinding, persister: &Persister) {
        let vulnerability = vulnerability_from(finding);
        info!(
            scan_id = %self.state.id(),
            category = %vulnerability.category,
            severity = %vulnerability.severity,
            endpoint = %vulnerability.endpoint,
            parameter = %vulnerability.parameter,
            "Vulnerability confirmed"
        );
        self.emit(ScanEvent::FindingDiscovered {
            scan_id: self.state.id(),
            vulnerability_id: vulnerability.id.clone(),
            category: vulnerability.category,
            severity: vulnerability.severity,
            endpoint: vulnerability.endpoint.clone(),
            parameter: vulnerability.parameter.clone(),
        });
        self.state.add_vulnerability(vulnerability);
        persister.save(self.state.snapshot());
    }

    fn report(&self, persister: &Persister) -> Result<(), ZeronError> {
        self.begin(PhaseName::Reporting, persister)?;
        let report = reporting::build_report(&self.state.snapshot());
        for warning in &report.warnings {
            warn!(scan_id = %self.state.id(), warning = %warning, "Report degraded");
        }
        self.state.update(|s| s.vulnerabilities = report.vulnerabilities.clone());
        self.emit_progress(
            PhaseName::Reporting,
            format!(
                "{} vulnerabilities after dedup ({} merged)",
                report.vulnerabilities.len(),
                report.dedup.removed
            ),
        );
        self.finish(PhaseName::Reporting, persister);
        Ok(())
    }
}

/// Turn a confirmed probe into a severity-rated vulnerability record.
fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("scan task panicked: {}", detail)
}

pub fn vulnerability_from(finding: ConfirmedFinding) -> Vulnerability {
    let (score, severity) = scoring::rate(finding.category);
    let mut description = format!(
        "{} in the '{}' parameter of {} {}",
        finding.category.display_name(),
        finding.parameter,
        finding.method,
        finding.url
    );
    if let Some(context) = &finding.result.context {
        description.push_str(&format!(" ({})", context.replace('_', " ")));
    }
    Vulnerability {
        id: Vulnerability::generate_id(),
        category: finding.category,
        severity,
        score,
        endpoint: finding.url,
        method: finding.method,
        parameter: finding.parameter,
        description,
        payload: finding.payload,
        confidence: finding.confidence,
        evidence: finding.result.evidence,
        response_status: Some(finding.response_status),
        response_snippet: Some(finding.response_snippet).filter(|s| !s.is_empty()),
        poc: None,
        discovered_at: Utc::now(),
        occurrences: 1,
        endpoints: Vec::new(),
    }
}

/// Mark scans a previous process left running as failed, keeping their findings.
pub fn recover_interrupted(db: &crate::db::Database) -> Result<usize, ZeronError> {
    let count = db.mark_interrupted()?;
    if count > 0 {
        warn!(count, "Marked interrupted scans as failed");
    }
    Ok(count)
}

/// Status of a finished run, for callers that only need the outcome.
pub fn outcome(scan: &Scan) -> Result<(), ZeronError> {
    match scan.status {
        ScanStatus::Completed => Ok(()),
        ScanStatus::Failed if scan.error.as_deref() == Some("cancelled") => Err(ZeronError::Cancelled),
        _ => Err(ZeronError::Internal(
            scan.error.clone().unwrap_or_else(|| format!("scan ended {}", scan.status)),
        )),
    }
}
