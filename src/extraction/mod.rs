use tracing::warn;

/// Fixed system instruction sent ahead of every extraction request. The
/// adapter never improvises a prompt beyond this.
const SYSTEM_PROMPT: &str =
    "extract only what is asked for from the supplied document; respond with the extracted content only";

/// A guard against blowing the provider's context window, not a core
/// windowing concern — this is independent of `max_chars`/`start_index`.
const DEFAULT_TEXT_BUDGET: usize = 20_000;

/// Result of a single extraction attempt. Never panics; failures are
/// represented here rather than via `Result`, since the orchestrator
/// downgrades them to an in-content diagnostic rather than propagating them.
pub struct ExtractionOutcome {
    pub success: bool,
    pub content: Option<String>,
    pub error: Option<String>,
}

/// Thin client against an OpenAI-compatible chat-completions endpoint.
/// Treated as a black box by the rest of the engine: its value equals the
/// text payload it emits. No retries, no partial parsing.
pub struct ExtractionAdapter {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    text_budget: usize,
}

impl ExtractionAdapter {
    pub fn new(client: reqwest::Client, base_url: String, api_key: String, model: String) -> Self {
        Self {
            client,
            base_url,
            api_key,
            model,
            text_budget: DEFAULT_TEXT_BUDGET,
        }
    }

    /// Build an adapter only if an API key is configured; otherwise the
    /// extraction feature is absent from the tool surface entirely, so
    /// callers never get a handle they can't use.
    pub fn from_config(client: reqwest::Client, config: &crate::core::config::EngineConfig) -> Option<Self> {
        let api_key = config.extract_llm_api_key.clone()?;
        Some(Self::new(
            client,
            config.extract_llm_base_url.clone(),
            api_key,
            config.extract_llm_model.clone(),
        ))
    }

    pub async fn extract(&self, text: &str, query: &str) -> ExtractionOutcome {
        let truncated: String = text.chars().take(self.text_budget).collect();
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));

        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": format!("Query: {query}\n\nDocument:\n{truncated}")},
            ],
        });

        let response = match self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                warn!(error = %e, "extraction provider transport error");
                return ExtractionOutcome {
                    success: false,
                    content: None,
                    error: Some(format!("extraction provider transport error: {e}")),
                };
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            warn!(status = %status, "extraction provider returned non-2xx");
            return ExtractionOutcome {
                success: false,
                content: None,
                error: Some(format!("extraction provider returned {status}: {body_text}")),
            };
        }

        let parsed: serde_json::Value = match response.json().await {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "extraction provider returned a malformed response body");
                return ExtractionOutcome {
                    success: false,
                    content: None,
                    error: Some(format!("malformed extraction response: {e}")),
                };
            }
        };

        let content = parsed
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .map(|s| s.to_string());

        match content {
            Some(content) => ExtractionOutcome {
                success: true,
                content: Some(content),
                error: None,
            },
            None => {
                warn!("extraction provider response had no choices[0].message.content");
                ExtractionOutcome {
                    success: false,
                    content: None,
                    error: Some("extraction provider response had no content".to_string()),
                }
            }
        }
    }
}
