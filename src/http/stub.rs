use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::errors::ZeronError;
use super::{Fetcher, HttpRequest, HttpResponse};

type Handler = Arc<dyn Fn(&HttpRequest) -> Option<Result<HttpResponse, ZeronError>> + Send + Sync>;

/// Canned-response fetcher for offline runs and tests.
///
/// Routes are checked in registration order; unmatched requests get a 404.
#[derive(Clone, Default)]
pub struct StubFetcher {
    handlers: Vec<Handler>,
    log: Arc<Mutex<Vec<HttpRequest>>>,
}

/// Exact match when the pattern has a query, otherwise match the URL without its query.
fn url_matches(pattern: &str, url: &str) -> bool {
    if pattern.contains('?') {
        return pattern == url;
    }
    let base = url.split(['?', '#']).next().unwrap_or(url);
    base == pattern || base.trim_end_matches('/') == pattern.trim_end_matches('/')
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, url: &str, status: u16, body: &str) -> Self {
        let response = HttpResponse::new(status, body);
        self.respond(url, response)
    }

    pub fn respond(mut self, url: &str, response: HttpResponse) -> Self {
        let pattern = url.to_string();
        self.handlers.push(Arc::new(move |req: &HttpRequest| {
            url_matches(&pattern, &req.url).then(|| {
                let mut resp = response.clone();
                resp.url = req.url.clone();
                Ok(resp)
            })
        }));
        self
    }

    /// Dynamic route; the handler returns `None` to fall through.
    pub fn handle<F>(mut self, handler: F) -> Self
    where
        F: Fn(&HttpRequest) -> Option<HttpResponse> + Send + Sync + 'static,
    {
        self.handlers.push(Arc::new(move |req: &HttpRequest| handler(req).map(Ok)));
        self
    }

    /// Requests to this URL fail with a network error.
    pub fn fail(mut self, url: &str) -> Self {
        let pattern = url.to_string();
        self.handlers.push(Arc::new(move |req: &HttpRequest| {
            url_matches(&pattern, &req.url)
                .then(|| Err(ZeronError::Network(format!("connection refused: {}", req.url))))
        }));
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.log.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.log.lock().unwrap().len()
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(&self, request: &HttpRequest) -> Result<HttpResponse, ZeronError> {
        self.log.lock().unwrap().push(request.clone());
        for handler in &self.handlers {
            if let Some(result) = handler(request) {
                return result;
            }
        }
        let mut not_found = HttpResponse::new(404, "Not Found");
        not_found.url = request.url.clone();
        Ok(not_found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_route_ignores_query() {
        let stub = StubFetcher::new().on("https://a.test/list.php", 200, "ok");
        let resp = stub
            .fetch(&HttpRequest::get("https://a.test/list.php?id=1"))
            .await
            .unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, "ok");
        assert_eq!(stub.request_count(), 1);
    }

    #[tokio::test]
    async fn test_unmatched_is_404() {
        let stub = StubFetcher::new();
        let resp = stub.fetch(&HttpRequest::get("https://a.test/x")).await.unwrap();
        assert_eq!(resp.status, 404);
    }

    #[tokio::test]
    async fn test_failure_route() {
        let stub = StubFetcher::new().fail("https://down.test/");
        let err = stub.fetch(&HttpRequest::get("https://down.test/")).await.unwrap_err();
        assert!(err.is_probe_local());
    }

    #[tokio::test]
    async fn test_dynamic_handler() {
        let stub = StubFetcher::new().handle(|req| {
            req.url
                .contains("echo=")
                .then(|| HttpResponse::new(200, req.url.clone()))
        });
        let resp = stub.fetch(&HttpRequest::get("https://a.test/?echo=hi")).await.unwrap();
        assert!(resp.body.contains("echo=hi"));
    }
}
