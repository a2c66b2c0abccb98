use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::models::Severity;
use crate::pipeline::ScanEvent;
use crate::utils::formatting::format_duration;

/// Terminal rendering of a scan's event stream.
pub struct ScanProgress {
    multi: MultiProgress,
    bar: ProgressBar,
    status_bar: ProgressBar,
    findings_count: usize,
    start_time: std::time::Instant,
}

impl ScanProgress {
    pub fn new() -> Self {
        let multi = MultiProgress::new();

        let bar = multi.add(ProgressBar::new(100));
        bar.set_style(
            ProgressStyle::default_bar()
                .template("  {bar:30.cyan/dark_gray} {pos:>3}% | {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );

        let status_bar = multi.add(ProgressBar::new_spinner());
        status_bar.set_style(
            ProgressStyle::default_spinner()
                .template("  {spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        status_bar.set_message("Initializing scan...");
        status_bar.enable_steady_tick(std::time::Duration::from_millis(120));

        Self {
            multi,
            bar,
            status_bar,
            findings_count: 0,
            start_time: std::time::Instant::now(),
        }
    }

    pub fn handle_event(&mut self, event: &ScanEvent) {
        match event {
            ScanEvent::ScanStarted { domain, .. } => {
                self.bar.set_message(format!("Scanning {}", domain));
                self.update_status();
            }
            ScanEvent::PhaseStarted { display_name, .. } => {
                self.bar.set_message(display_name.clone());
                self.update_status();
            }
            ScanEvent::PhaseCompleted { display_name, .. } => {
                self.println(&format!("  {} {}", style("✓").green(), display_name));
            }
            ScanEvent::Progress { message, progress, findings, .. } => {
                self.bar.set_position(u64::from(*progress));
                self.findings_count = *findings;
                self.status_bar.set_message(message.clone());
            }
            ScanEvent::FindingDiscovered { category, severity, endpoint, parameter, .. } => {
                self.findings_count += 1;
                let label = match severity {
                    Severity::Critical => style(severity.as_str()).red().bold(),
                    Severity::High => style(severity.as_str()).red(),
                    Severity::Medium => style(severity.as_str()).yellow(),
                    _ => style(severity.as_str()).dim(),
                };
                self.println(&format!(
                    "  {} [{}] {} via '{}' on {}",
                    style("!").red().bold(),
                    label,
                    category.display_name(),
                    parameter,
                    endpoint
                ));
                self.update_status();
            }
            ScanEvent::ScanCompleted { findings, duration_ms, .. } => {
                self.bar.finish_with_message("All phases complete");
                self.status_bar.finish_with_message(format!(
                    "Scan complete: {} findings | {}",
                    findings,
                    format_duration(*duration_ms),
                ));
            }
            ScanEvent::ScanFailed { error, .. } => {
                self.bar.abandon_with_message("Failed");
                self.status_bar.finish_with_message(format!("Scan failed: {}", error));
            }
        }
    }

    fn update_status(&self) {
        let elapsed = format_duration(self.start_time.elapsed().as_millis() as u64);
        self.status_bar.set_message(format!("{} | {} findings", elapsed, self.findings_count));
    }

    /// Print a line above the bars without tearing them.
    pub fn println(&self, msg: &str) {
        let _ = self.multi.println(msg);
    }
}

impl Default for ScanProgress {
    fn default() -> Self {
        Self::new()
    }
}
