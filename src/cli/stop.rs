use crate::cli::commands::StopArgs;
use crate::errors::ZeronError;
use tracing::info;

pub async fn handle_stop(args: StopArgs) -> Result<(), ZeronError> {
    info!(scan_id = %args.scan_id, "Stopping scan");
    let client = reqwest::Client::new();
    let url = format!("{}/api/scans/{}/stop", args.server.trim_end_matches('/'), args.scan_id);
    let resp = super::api_request(&client, reqwest::Method::POST, &url)
        .send().await
        .map_err(|e| ZeronError::Network(format!("Failed to stop scan: {}", e)))?;

    match resp.status() {
        s if s.is_success() => {
            println!("Stop signal sent for scan {}", args.scan_id);
            Ok(())
        }
        reqwest::StatusCode::NOT_FOUND => Err(ZeronError::NotFound(format!("no active scan {}", args.scan_id))),
        s => Err(ZeronError::Network(format!("Server answered {}", s))),
    }
}
