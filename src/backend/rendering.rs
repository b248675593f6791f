use std::time::Duration;

use super::{Backend, BackendId, FetchOutcome};
use crate::error::BackendFailureKind;

/// Delegates to a configurable hosted rendering endpoint that evaluates page
/// scripts before returning content. The rendering service itself is out of
/// scope here — this is a thin HTTP client against its contract, modeled on
/// how this codebase talks to a hosted headless-render service elsewhere.
pub struct RenderingBackend {
    client: reqwest::Client,
    endpoint: Option<String>,
    api_key: Option<String>,
}

impl RenderingBackend {
    pub fn new(client: reqwest::Client, endpoint: Option<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            endpoint,
            api_key,
        }
    }
}

#[async_trait::async_trait]
impl Backend for RenderingBackend {
    fn id(&self) -> BackendId {
        BackendId::Rendering
    }

    fn is_available(&self) -> bool {
        self.endpoint.is_some() && self.api_key.is_some()
    }

    async fn fetch(&self, url: &str, timeout_ms: u64) -> FetchOutcome {
        let (Some(endpoint), Some(api_key)) = (&self.endpoint, &self.api_key) else {
            return FetchOutcome::fail(BackendId::Rendering, BackendFailureKind::Unavailable);
        };

        let request = self
            .client
            .post(format!("{endpoint}?token={api_key}"))
            .json(&serde_json::json!({
                "url": url,
                "gotoOptions": { "waitUntil": "networkidle2" },
            }))
            .send();

        let response = match tokio::time::timeout(Duration::from_millis(timeout_ms), request).await
        {
            Ok(Ok(resp)) => resp,
            Ok(Err(e)) => {
                return FetchOutcome::fail(
                    BackendId::Rendering,
                    BackendFailureKind::Transport(e.to_string()),
                )
            }
            Err(_) => return FetchOutcome::fail(BackendId::Rendering, BackendFailureKind::Timeout),
        };

        let status = response.status();
        if status.as_u16() >= 400 {
            return FetchOutcome::fail(
                BackendId::Rendering,
                BackendFailureKind::Http(status.as_u16()),
            );
        }

        let media_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .or_else(|| Some("text/html".to_string()));

        let bytes = match tokio::time::timeout(
            Duration::from_millis(timeout_ms),
            response.bytes(),
        )
        .await
        {
            Ok(Ok(b)) => b,
            Ok(Err(e)) => {
                return FetchOutcome::fail(
                    BackendId::Rendering,
                    BackendFailureKind::Transport(e.to_string()),
                )
            }
            Err(_) => return FetchOutcome::fail(BackendId::Rendering, BackendFailureKind::Timeout),
        };

        FetchOutcome::ok(BackendId::Rendering, bytes.to_vec(), media_type)
    }
}
