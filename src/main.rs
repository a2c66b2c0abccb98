use clap::Parser;
use tracing_subscriber::EnvFilter;
use zeron::{cli, config, errors};

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    // Initialize logging
    let log_level = match (cli.quiet, cli.verbose) {
        (true, 0) => "warn",
        (_, 0) => "info",
        (_, 1) => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_ansi(!cli.no_color)
            .with_writer(std::io::stderr)
            .init();
    }
    if cli.no_color {
        console::set_colors_enabled(false);
    }

    let result = match cli.command {
        cli::Commands::Scan(args) => cli::scan::handle_scan(args, cli.quiet).await,
        cli::Commands::Serve(args) => cli::serve::handle_serve(args).await,
        cli::Commands::Query(args) => cli::query::handle_query(args).await,
        cli::Commands::Stop(args) => cli::stop::handle_stop(args).await,
        cli::Commands::Report(args) => cli::report::handle_report(args).await,
        cli::Commands::Export(args) => cli::report::handle_export(args).await,
        cli::Commands::Validate(args) => handle_validate(args).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn handle_validate(args: cli::commands::ValidateArgs) -> Result<(), errors::ZeronError> {
    let path = std::path::PathBuf::from(&args.config);
    let config = config::parse_config(&path).await?;
    println!("Configuration is valid: {}", args.config);
    for plan in zeron::models::Plan::ALL {
        let limits = config.limits_for(plan);
        println!(
            "  {:<10} endpoints {:>5}  payloads {:>5}  concurrency {:>3}",
            plan.as_str(),
            limits.max_endpoints,
            limits.max_payloads,
            limits.concurrency
        );
    }
    Ok(())
}
