use crate::cli::commands::{ExportArgs, ReportArgs};
use crate::db::Database;
use crate::errors::ZeronError;
use crate::models::Scan;
use crate::reporting::{self, Platform, ReportFormat};
use tracing::info;

fn load(db_path: &str, scan_id: &str) -> Result<Scan, ZeronError> {
    let db = Database::new(db_path)?;
    db.get_scan(scan_id)?
        .ok_or_else(|| ZeronError::NotFound(format!("scan {}", scan_id)))
}

/// Render a stored scan's report.
pub fn render_report(db_path: &str, scan_id: &str, format: ReportFormat) -> Result<String, ZeronError> {
    let scan = load(db_path, scan_id)?;
    let report = reporting::build_report(&scan);
    reporting::render(&report, format)
}

/// Platform submission payload for a stored scan.
pub fn export_report(db_path: &str, scan_id: &str, platform: Platform, program: Option<&str>) -> Result<String, ZeronError> {
    let scan = load(db_path, scan_id)?;
    let report = reporting::build_report(&scan);
    Ok(serde_json::to_string_pretty(&reporting::export(&report, platform, program))?)
}

pub async fn handle_report(args: ReportArgs) -> Result<(), ZeronError> {
    let format: ReportFormat = args.format.parse().map_err(ZeronError::Config)?;
    let rendered = render_report(&args.db, &args.scan_id, format)?;
    match &args.output {
        Some(path) => {
            tokio::fs::write(path, rendered).await?;
            info!(path = %path, scan_id = %args.scan_id, "Report written");
        }
        None => println!("{}", rendered),
    }
    Ok(())
}

pub async fn handle_export(args: ExportArgs) -> Result<(), ZeronError> {
    let platform: Platform = args.platform.parse().map_err(ZeronError::Config)?;
    println!("{}", export_report(&args.db, &args.scan_id, platform, args.program.as_deref())?);
    Ok(())
}
