//! Report assembly and rendering: PoCs, executive summary, markdown/HTML, platform exports.

pub mod executive;
pub mod export;
pub mod html;
pub mod markdown;
pub mod poc;
pub mod remediation;

pub use executive::build_report;
pub use export::{export, Platform};
pub use html::format_report_html;
pub use markdown::format_report_markdown;

use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Json,
    Markdown,
    Html,
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ReportFormat::Json),
            "markdown" | "md" => Ok(ReportFormat::Markdown),
            "html" => Ok(ReportFormat::Html),
            other => Err(format!("unknown report format '{}'", other)),
        }
    }
}

/// Render a report in the requested format.
pub fn render(report: &crate::models::Report, format: ReportFormat) -> Result<String, crate::errors::ZeronError> {
    Ok(match format {
        ReportFormat::Json => serde_json::to_string_pretty(report)?,
        ReportFormat::Markdown => format_report_markdown(report),
        ReportFormat::Html => format_report_html(report),
    })
}
