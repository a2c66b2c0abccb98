pub mod commands;
pub mod progress;
pub mod query;
pub mod report;
pub mod scan;
pub mod serve;
pub mod stop;

pub use commands::{Cli, Commands};

use std::path::PathBuf;
use crate::config::{self, ZeronConfig};
use crate::errors::ZeronError;

/// The configuration file when given, the defaults otherwise.
pub async fn load_config(path: Option<&str>) -> Result<ZeronConfig, ZeronError> {
    match path {
        Some(p) => config::parse_config(&PathBuf::from(p)).await,
        None => Ok(ZeronConfig::default()),
    }
}

/// HTTP client for talking to a `zeron serve` instance, with the API token when set.
pub(crate) fn api_request(client: &reqwest::Client, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
    let builder = client.request(method, url);
    match std::env::var("ZERON_API_TOKEN") {
        Ok(token) if !token.is_empty() => builder.bearer_auth(token),
        _ => builder,
    }
}
