//! Scrape Orchestrator: cache lookup -> strategy -> parse -> extract -> window -> persist.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::core::AppState;
use crate::error::ScrapeError;
use crate::parser;
use crate::store::ResourceMetadata;
use crate::strategy;

/// One invocation of `scrape`. Immutable for the lifetime of the call.
#[derive(Debug, Clone)]
pub struct ScrapeRequest {
    pub url: String,
    pub timeout_ms: u64,
    pub max_chars: usize,
    pub start_index: usize,
    pub save_result: bool,
    pub force_rescrape: bool,
    pub extract_query: Option<String>,
}

impl Default for ScrapeRequest {
    fn default() -> Self {
        Self {
            url: String::new(),
            timeout_ms: 60_000,
            max_chars: 100_000,
            start_index: 0,
            save_result: true,
            force_rescrape: false,
            extract_query: None,
        }
    }
}

/// Outcome of a successful scrape: the windowed, annotated text plus an
/// optional resource handle and whether the window truncated the raw text.
#[derive(Debug, Clone)]
pub struct ScrapeResult {
    pub inline_text: String,
    pub resource_handle: Option<ResourceHandle>,
    pub truncated: bool,
}

#[derive(Debug, Clone)]
pub struct ResourceHandle {
    pub uri: String,
    pub name: String,
    pub mime_type: String,
    pub description: String,
}

/// `scrape(request)` per the orchestrator algorithm:
/// 1. cache check (unless `force_rescrape`)
/// 2. strategy engine on miss
/// 3. parse
/// 4. optional extraction
/// 5. optional persistence
/// 6. windowing + annotation
pub async fn scrape(state: &AppState, request: &ScrapeRequest) -> Result<ScrapeResult, ScrapeError> {
    validate(request)?;

    if !request.force_rescrape {
        let cached = state.resource_store.find_by_url(&request.url).await;
        if let Some(newest) = cached.into_iter().next() {
            info!(url = %request.url, "cache hit");
            let label = format!(
                "cache (originally: {})",
                newest.metadata.backend
            );
            let (sliced, truncated) = window(&newest.text, request.start_index, request.max_chars);
            let inline_text = annotate_cache(
                &sliced,
                truncated,
                request.start_index,
                request.max_chars,
                &newest.metadata.backend,
                newest.metadata.timestamp,
            );
            return Ok(ScrapeResult {
                inline_text,
                resource_handle: Some(ResourceHandle {
                    uri: newest.uri,
                    name: newest.name,
                    mime_type: newest.mime_type,
                    description: newest.description,
                }),
                truncated,
            });
        }
        info!(url = %request.url, "cache miss");
    } else {
        info!(url = %request.url, "force_rescrape set, bypassing cache read");
    }

    let host = strategy::host_key(&request.url)
        .ok_or_else(|| ScrapeError::InvalidArgument(format!("not an absolute URL: {}", request.url)))?;

    let strategy_outcome = strategy::attempt(
        &state.backends,
        &state.strategy_registry,
        &host,
        &request.url,
        request.timeout_ms,
    )
    .await?;

    let bytes = strategy_outcome
        .outcome
        .bytes
        .clone()
        .unwrap_or_default();
    let parsed = parser::parse(&bytes, strategy_outcome.outcome.media_type.as_deref())?;

    let mut raw_text = parsed.text;
    let backend_label = strategy_outcome.backend.to_string();

    if let Some(query) = &request.extract_query {
        if let Some(adapter) = &state.extraction {
            info!(url = %request.url, "running extraction");
            let outcome = adapter.extract(&raw_text, query).await;
            if outcome.success {
                raw_text = outcome.content.unwrap_or_default();
            } else {
                let err = outcome.error.unwrap_or_else(|| "unknown extraction failure".to_string());
                warn!(url = %request.url, error = %err, "extraction failed, keeping raw text");
                raw_text = format!("[extraction failed: {err}]\n\n{raw_text}");
            }
        }
    }

    let (sliced, truncated) = window(&raw_text, request.start_index, request.max_chars);

    let mut resource_handle = None;
    if request.save_result {
        let metadata = ResourceMetadata {
            url: request.url.clone(),
            backend: backend_label.clone(),
            timestamp: Utc::now(),
            content_length: raw_text.len(),
            was_truncated: truncated,
            extract_query: request.extract_query.clone(),
        };
        match state
            .resource_store
            .write(&request.url, &raw_text, metadata)
            .await
        {
            Ok(uri) => {
                if let Ok(resource) = state.resource_store.read(&uri).await {
                    resource_handle = Some(ResourceHandle {
                        uri: resource.uri,
                        name: resource.name,
                        mime_type: resource.mime_type,
                        description: resource.description,
                    });
                }
            }
            Err(e) => {
                // Non-fatal on write: log and continue per the error taxonomy.
                warn!(url = %request.url, error = %e, "resource store write failed");
            }
        }
    }

    let inline_text = annotate_live(&sliced, truncated, request.start_index, request.max_chars, &backend_label);

    Ok(ScrapeResult {
        inline_text,
        resource_handle,
        truncated,
    })
}

fn validate(request: &ScrapeRequest) -> Result<(), ScrapeError> {
    if url::Url::parse(&request.url).is_err() {
        return Err(ScrapeError::InvalidArgument(format!(
            "not an absolute URL: {}",
            request.url
        )));
    }
    if request.max_chars == 0 {
        return Err(ScrapeError::InvalidArgument(
            "max_chars must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

/// `sliced = raw_text[start_index..]`, truncated to `max_chars` with
/// `truncated` set iff the slice was longer than the window. A start index
/// past the end of the text yields the empty string with `truncated=false`.
fn window(raw_text: &str, start_index: usize, max_chars: usize) -> (String, bool) {
    let chars: Vec<char> = raw_text.chars().collect();
    if start_index >= chars.len() {
        return (String::new(), false);
    }
    let remaining = &chars[start_index..];
    if remaining.len() > max_chars {
        (remaining[..max_chars].iter().collect(), true)
    } else {
        (remaining.iter().collect(), false)
    }
}

fn annotate_live(body: &str, truncated: bool, start_index: usize, max_chars: usize, backend: &str) -> String {
    let mut out = body.to_string();
    out.push_str("\n\n---\nScraped using: ");
    out.push_str(backend);
    if truncated {
        out.push_str(&format!(
            "\n(truncated; continue with start_index={})",
            start_index + max_chars
        ));
    }
    out
}

fn annotate_cache(
    body: &str,
    truncated: bool,
    start_index: usize,
    max_chars: usize,
    original_backend: &str,
    timestamp: DateTime<Utc>,
) -> String {
    let mut out = body.to_string();
    out.push_str(&format!(
        "\n\n---\nServed from cache (originally scraped using: {original_backend}); Cached at: {}",
        timestamp.to_rfc3339()
    ));
    if truncated {
        out.push_str(&format!(
            "\n(truncated; continue with start_index={})",
            start_index + max_chars
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windowing_law_slice_within_bounds() {
        let text = "a".repeat(250_000);
        let (sliced, truncated) = window(&text, 50_000, 100_000);
        assert_eq!(sliced.chars().count(), 100_000);
        assert!(truncated);
    }

    #[test]
    fn windowing_law_short_text_not_truncated() {
        let (sliced, truncated) = window("hello", 0, 100_000);
        assert_eq!(sliced, "hello");
        assert!(!truncated);
    }

    #[test]
    fn start_index_past_end_yields_empty_untruncated() {
        let (sliced, truncated) = window("hello", 10, 100_000);
        assert_eq!(sliced, "");
        assert!(!truncated);
    }

    #[test]
    fn validate_rejects_malformed_url() {
        let request = ScrapeRequest {
            url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(validate(&request).is_err());
    }

    #[test]
    fn validate_rejects_zero_max_chars() {
        let request = ScrapeRequest {
            url: "http://example.com/".to_string(),
            max_chars: 0,
            ..Default::default()
        };
        assert!(validate(&request).is_err());
    }
}
