use std::time::Duration;

use super::{Backend, BackendId, FetchOutcome};
use crate::error::BackendFailureKind;

/// Delegates to a configurable hosted anti-bot-bypass endpoint. Slowest and
/// most expensive of the three backends, reserved for heavily protected
/// sites. The bypass service itself is out of scope; this is a thin HTTP
/// client against its contract.
pub struct BypassBackend {
    client: reqwest::Client,
    endpoint: Option<String>,
    api_key: Option<String>,
}

impl BypassBackend {
    pub fn new(client: reqwest::Client, endpoint: Option<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            endpoint,
            api_key,
        }
    }
}

#[async_trait::async_trait]
impl Backend for BypassBackend {
    fn id(&self) -> BackendId {
        BackendId::Bypass
    }

    fn is_available(&self) -> bool {
        self.endpoint.is_some() && self.api_key.is_some()
    }

    async fn fetch(&self, url: &str, timeout_ms: u64) -> FetchOutcome {
        let (Some(endpoint), Some(api_key)) = (&self.endpoint, &self.api_key) else {
            return FetchOutcome::fail(BackendId::Bypass, BackendFailureKind::Unavailable);
        };

        let request = self
            .client
            .post(endpoint)
            .bearer_auth(api_key)
            .json(&serde_json::json!({ "url": url }))
            .send();

        let response = match tokio::time::timeout(Duration::from_millis(timeout_ms), request).await
        {
            Ok(Ok(resp)) => resp,
            Ok(Err(e)) => {
                return FetchOutcome::fail(
                    BackendId::Bypass,
                    BackendFailureKind::Transport(e.to_string()),
                )
            }
            Err(_) => return FetchOutcome::fail(BackendId::Bypass, BackendFailureKind::Timeout),
        };

        let status = response.status();
        if status.as_u16() >= 400 {
            return FetchOutcome::fail(
                BackendId::Bypass,
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
                    BackendId::Bypass,
                    BackendFailureKind::Transport(e.to_string()),
                )
            }
            Err(_) => return FetchOutcome::fail(BackendId::Bypass, BackendFailureKind::Timeout),
        };

        FetchOutcome::ok(BackendId::Bypass, bytes.to_vec(), media_type)
    }
}
