use crate::cli::commands::ServeArgs;
use crate::errors::ZeronError;
use crate::api;
use tracing::info;

pub async fn handle_serve(args: ServeArgs) -> Result<(), ZeronError> {
    let config = super::load_config(args.config.as_deref()).await?;
    info!(
        host = %args.host,
        port = args.port,
        max_concurrent_scans = config.server.max_concurrent_scans,
        "Starting API server"
    );

    let state = api::create_app_state(&args.db, config).await?;
    if state.api_token.is_some() {
        info!("Bearer token authentication enabled");
    }
    let app = api::build_router(state);

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
        .map_err(|e| ZeronError::Internal(format!("Server error: {}", e)))?;

    Ok(())
}
