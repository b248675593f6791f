use std::time::Duration;

use super::{Backend, BackendId, FetchOutcome};
use crate::error::BackendFailureKind;

/// Plain request/response over a shared `reqwest` client. No scripting, no
/// credentials required — always available. Cheap and fast, but commonly
/// fails against anti-bot protections and script-driven pages.
pub struct DirectBackend {
    client: reqwest::Client,
}

impl DirectBackend {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl Backend for DirectBackend {
    fn id(&self) -> BackendId {
        BackendId::Direct
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn fetch(&self, url: &str, timeout_ms: u64) -> FetchOutcome {
        let request = self.client.get(url).send();
        let response = match tokio::time::timeout(Duration::from_millis(timeout_ms), request).await
        {
            Ok(Ok(resp)) => resp,
            Ok(Err(e)) => {
                return FetchOutcome::fail(
                    BackendId::Direct,
                    BackendFailureKind::Transport(e.to_string()),
                )
            }
            Err(_) => return FetchOutcome::fail(BackendId::Direct, BackendFailureKind::Timeout),
        };

        let status = response.status();
        if status.as_u16() >= 400 {
            return FetchOutcome::fail(
                BackendId::Direct,
                BackendFailureKind::Http(status.as_u16()),
            );
        }

        let media_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let bytes = match tokio::time::timeout(
            Duration::from_millis(timeout_ms),
            response.bytes(),
        )
        .await
        {
            Ok(Ok(b)) => b,
            Ok(Err(e)) => {
                return FetchOutcome::fail(
                    BackendId::Direct,
                    BackendFailureKind::Transport(e.to_string()),
                )
            }
            Err(_) => return FetchOutcome::fail(BackendId::Direct, BackendFailureKind::Timeout),
        };

        FetchOutcome::ok(BackendId::Direct, bytes.to_vec(), media_type)
    }
}
