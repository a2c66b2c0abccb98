use async_trait::async_trait;
use reqwest::{Client, Method};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::config::HttpConfig;
use crate::errors::ZeronError;
use super::{Fetcher, HttpRequest, HttpResponse};

const MAX_REDIRECTS: usize = 5;

/// Production fetcher backed by two reqwest clients, one per redirect policy.
pub struct ReqwestFetcher {
    following: Client,
    direct: Client,
    max_body_bytes: usize,
}

impl ReqwestFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self, ZeronError> {
        if config.accept_invalid_certs {
            warn!("TLS certificate validation is disabled for outbound requests");
        }
        let build = |policy: reqwest::redirect::Policy| {
            Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .user_agent(config.user_agent.clone())
                .danger_accept_invalid_certs(config.accept_invalid_certs)
                .redirect(policy)
                .cookie_store(false)
                .build()
                .map_err(|e| ZeronError::Config(format!("Failed to build HTTP client: {}", e)))
        };

        Ok(Self {
            following: build(reqwest::redirect::Policy::limited(MAX_REDIRECTS))?,
            direct: build(reqwest::redirect::Policy::none())?,
            max_body_bytes: config.max_body_bytes,
        })
    }
}

#[async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, request: &HttpRequest) -> Result<HttpResponse, ZeronError> {
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|_| ZeronError::Parse(format!("invalid HTTP method '{}'", request.method)))?;
        let client = if request.follow_redirects { &self.following } else { &self.direct };

        let mut builder = client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let started = Instant::now();
        let response = builder.send().await?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let mut out = HttpResponse {
            status,
            url: final_url,
            ..Default::default()
        };
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                out = out.with_header(name.as_str(), value);
            }
        }

        let bytes = response.bytes().await?;
        let cut = bytes.len().min(self.max_body_bytes);
        if cut < bytes.len() {
            debug!(url = %request.url, size = bytes.len(), "Response body truncated");
        }
        out.body = String::from_utf8_lossy(&bytes[..cut]).into_owned();
        out.elapsed_ms = started.elapsed().as_millis() as u64;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builds_from_default_config() {
        assert!(ReqwestFetcher::new(&HttpConfig::default()).is_ok());
    }

    #[tokio::test]
    async fn test_invalid_method_is_parse_error() {
        let fetcher = ReqwestFetcher::new(&HttpConfig::default()).unwrap();
        let err = fetcher
            .fetch(&HttpRequest::new("BAD METHOD", "http://127.0.0.1:9/"))
            .await
            .unwrap_err();
        assert!(matches!(err, ZeronError::Parse(_)));
    }
}
