use clap::{Parser, Subcommand, Args};

#[derive(Parser)]
#[command(name = "zeron", version, about = "Automated web-application vulnerability scanner")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a scan in-process and print the summary
    Scan(ScanArgs),
    /// Start the HTTP REST API server
    Serve(ServeArgs),
    /// Query a scan's progress on a running server
    Query(QueryArgs),
    /// Stop a running scan on a server
    Stop(StopArgs),
    /// Render the report of a stored scan
    Report(ReportArgs),
    /// Print a bug bounty submission payload for a stored scan
    Export(ExportArgs),
    /// Validate a configuration file
    Validate(ValidateArgs),
}

#[derive(Args, Clone)]
pub struct ScanArgs {
    /// Target domain, e.g. example.com
    pub domain: String,

    /// Plan: basic, pro, enterprise
    #[arg(long, default_value = "basic")]
    pub plan: String,

    /// Newline-delimited scope file (`-` prefix excludes)
    #[arg(long)]
    pub scope_file: Option<String>,

    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// SQLite database to persist the scan into
    #[arg(long)]
    pub db: Option<String>,

    /// Write the report here; format follows the extension (.json, .md, .html)
    #[arg(short, long)]
    pub output: Option<String>,
}

#[derive(Args, Clone)]
pub struct ServeArgs {
    /// Listen port
    #[arg(long, default_value = "8080")]
    pub port: u16,

    /// Listen address
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// SQLite database path
    #[arg(long, default_value = "./data/zeron.db")]
    pub db: String,

    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<String>,
}

#[derive(Args, Clone)]
pub struct QueryArgs {
    /// Scan ID to query
    pub scan_id: String,

    /// Server base URL
    #[arg(long, default_value = "http://localhost:8080")]
    pub server: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Continuously poll until completion
    #[arg(long)]
    pub follow: bool,

    /// Poll interval in seconds
    #[arg(long, default_value = "5")]
    pub interval: u64,
}

#[derive(Args, Clone)]
pub struct StopArgs {
    /// Scan ID to stop
    pub scan_id: String,

    /// Server base URL
    #[arg(long, default_value = "http://localhost:8080")]
    pub server: String,
}

#[derive(Args, Clone)]
pub struct ReportArgs {
    /// Scan ID
    pub scan_id: String,

    /// SQLite database path
    #[arg(long, default_value = "./data/zeron.db")]
    pub db: String,

    /// Output format: markdown, json, html
    #[arg(short, long, default_value = "markdown")]
    pub format: String,

    /// Write to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<String>,
}

#[derive(Args, Clone)]
pub struct ExportArgs {
    /// Scan ID
    pub scan_id: String,

    /// Platform: hackerone, bugcrowd, intigriti, synack
    #[arg(short, long)]
    pub platform: String,

    /// SQLite database path
    #[arg(long, default_value = "./data/zeron.db")]
    pub db: String,

    /// Program handle on the platform
    #[arg(long)]
    pub program: Option<String>,
}

#[derive(Args, Clone)]
pub struct ValidateArgs {
    /// Config file to validate
    pub config: String,
}
