use std::path::Path;
use std::sync::Arc;
use console::style;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::cli::commands::ScanArgs;
use crate::db::{Database, ScanStore};
use crate::discovery::{normalize_domain, HickoryResolver, Scope};
use crate::errors::ZeronError;
use crate::http::ReqwestFetcher;
use crate::models::{Plan, Scan};
use crate::pipeline::{compute_summary, outcome, ScanOrchestrator, ScanSummary};
use crate::reporting::{self, ReportFormat};
use crate::utils::formatting::format_duration;
use super::progress::ScanProgress;

pub async fn handle_scan(args: ScanArgs, quiet: bool) -> Result<(), ZeronError> {
    let config = super::load_config(args.config.as_deref()).await?;
    let domain = normalize_domain(&args.domain)?;
    let plan: Plan = args.plan.parse().map_err(ZeronError::Config)?;

    let scope_lines: Vec<String> = match &args.scope_file {
        Some(path) => tokio::fs::read_to_string(path).await?.lines().map(str::to_string).collect(),
        None => Vec::new(),
    };
    Scope::from_lines(&scope_lines)?;
    let output_format = args.output.as_deref().map(format_for_path).transpose()?;

    let limits = config.limits_for(plan);
    let scan = Scan::new(&domain, plan, limits, scope_lines);
    info!(scan_id = %scan.id, domain = %domain, plan = %plan, "Starting scan");

    let fetcher = Arc::new(ReqwestFetcher::new(&config.http)?);
    let resolver = Arc::new(HickoryResolver::new());
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut orchestrator = ScanOrchestrator::new(scan, Arc::new(config), fetcher, resolver)
        .with_event_channel(tx);
    if let Some(db_path) = &args.db {
        let store: Arc<dyn ScanStore> = Arc::new(Database::new(db_path)?);
        orchestrator = orchestrator.with_store(store);
    }

    let renderer = tokio::spawn(async move {
        let mut progress = (!quiet).then(ScanProgress::new);
        while let Some(event) = rx.recv().await {
            if let Some(p) = progress.as_mut() {
                p.handle_event(&event);
            }
        }
    });

    let cancel = orchestrator.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after in-flight probes");
            cancel.cancel();
        }
    });

    let scan = orchestrator.run().await;
    drop(orchestrator);
    let _ = renderer.await;

    if let (Some(path), Some(format)) = (&args.output, output_format) {
        let report = reporting::build_report(&scan);
        tokio::fs::write(path, reporting::render(&report, format)?).await?;
        info!(path = %path, "Report written");
    }
    if !quiet {
        print_summary(&compute_summary(&scan));
    }
    outcome(&scan)
}

fn format_for_path(path: &str) -> Result<ReportFormat, ZeronError> {
    match Path::new(path).extension().and_then(|e| e.to_str()) {
        Some("json") => Ok(ReportFormat::Json),
        Some("md") | Some("markdown") => Ok(ReportFormat::Markdown),
        Some("html") | Some("htm") => Ok(ReportFormat::Html),
        _ => Err(ZeronError::Config(format!(
            "cannot infer report format from '{}'; use .json, .md or .html",
            path
        ))),
    }
}

fn print_summary(summary: &ScanSummary) {
    println!();
    println!("{}", style(format!("Scan {}", summary.scan_id)).bold());
    println!("  Domain:      {}", summary.domain);
    println!("  Status:      {}", summary.status);
    println!("  Duration:    {}", format_duration(summary.duration_ms));
    println!(
        "  Surface:     {} subdomains, {} endpoints, {} vectors, {} probes",
        summary.subdomains, summary.endpoints, summary.vectors, summary.probes_sent
    );
    let f = &summary.findings;
    println!(
        "  Findings:    {} total ({} critical, {} high, {} medium, {} low, {} info)",
        f.total, f.critical, f.high, f.medium, f.low, f.info
    );
    if summary.collector_errors > 0 {
        println!("  {} {} discovery collectors failed", style("!").yellow(), summary.collector_errors);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_for_path() {
        assert_eq!(format_for_path("out/report.md").unwrap(), ReportFormat::Markdown);
        assert!(format_for_path("r.HTML").is_err());
        assert_eq!(format_for_path("r.json").unwrap(), ReportFormat::Json);
        assert!(matches!(format_for_path("report"), Err(ZeronError::Config(_))));
    }
}
