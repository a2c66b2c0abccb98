use console::style;
use crate::cli::commands::QueryArgs;
use crate::errors::ZeronError;
use tracing::info;

pub async fn handle_query(args: QueryArgs) -> Result<(), ZeronError> {
    info!(scan_id = %args.scan_id, "Querying scan status");

    let client = reqwest::Client::new();
    let url = format!("{}/api/scans/{}/status", args.server.trim_end_matches('/'), args.scan_id);

    loop {
        let resp = super::api_request(&client, reqwest::Method::GET, &url).send().await
            .map_err(|e| ZeronError::Network(format!("Failed to query scan: {}", e)))?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ZeronError::NotFound(format!("scan {}", args.scan_id)));
        }

        let status: serde_json::Value = resp.json().await
            .map_err(|e| ZeronError::Parse(format!("Invalid response: {}", e)))?;

        if args.json {
            println!("{}", serde_json::to_string_pretty(&status)?);
        } else {
            print_status(&status);
        }

        let scan_status = status["status"].as_str().unwrap_or("");
        if !args.follow || scan_status == "completed" || scan_status == "failed" {
            break;
        }

        tokio::time::sleep(std::time::Duration::from_secs(args.interval.max(1))).await;
    }

    Ok(())
}

fn print_status(status: &serde_json::Value) {
    let state = status["status"].as_str().unwrap_or("unknown");
    let styled = match state {
        "completed" => style(state).green(),
        "failed" => style(state).red(),
        _ => style(state).yellow(),
    };
    println!("Status:   {} ({}%)", styled, status["progress"].as_u64().unwrap_or(0));
    if let Some(phase) = status["current_phase"].as_str() {
        println!("Phase:    {}", phase);
    }
    let counts = &status["findings_count"];
    println!(
        "Findings: {} (critical {}, high {}, medium {}, low {})",
        counts["total"].as_u64().unwrap_or(0),
        counts["critical"].as_u64().unwrap_or(0),
        counts["high"].as_u64().unwrap_or(0),
        counts["medium"].as_u64().unwrap_or(0),
        counts["low"].as_u64().unwrap_or(0),
    );
    if let Some(error) = status["error"].as_str() {
        println!("Error:    {}", style(error).red());
    }
}
