//! End-to-end tests driving the orchestrator against fake backends, per the
//! scrape engine's literal input/output scenarios.

use async_trait::async_trait;
use scrape_engine::backend::{Backend, BackendId, FetchOutcome};
use scrape_engine::core::config::EngineConfig;
use scrape_engine::core::AppState;
use scrape_engine::error::BackendFailureKind;
use scrape_engine::orchestrator::{self, ScrapeRequest};
use scrape_engine::store::ResourceStore;
use scrape_engine::strategy::StrategyRegistry;

struct ScriptedBackend {
    backend_id: BackendId,
    outcome: FetchOutcome,
}

#[async_trait]
impl Backend for ScriptedBackend {
    fn id(&self) -> BackendId {
        self.backend_id
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn fetch(&self, _url: &str, _timeout_ms: u64) -> FetchOutcome {
        self.outcome.clone()
    }
}

fn test_config() -> EngineConfig {
    EngineConfig {
        state_dir: std::env::temp_dir(),
        default_timeout_ms: 60_000,
        default_max_chars: 100_000,
        rendering_endpoint: None,
        rendering_api_key: None,
        bypass_endpoint: None,
        bypass_api_key: None,
        extract_llm_base_url: "https://api.openai.com/v1".to_string(),
        extract_llm_api_key: None,
        extract_llm_model: "gpt-4o-mini".to_string(),
        http_timeout_secs: 30,
    }
}

async fn state_with_backends(backends: Vec<Box<dyn Backend>>) -> AppState {
    let dir = std::env::temp_dir().join(format!("scrape-engine-e2e-{}", uuid::Uuid::new_v4()));
    AppState {
        config: test_config(),
        http_client: reqwest::Client::new(),
        backends,
        strategy_registry: StrategyRegistry::load(dir.join("strategy_preferences.json")).await,
        resource_store: ResourceStore::load(dir.join("resources.jsonl")).await,
        extraction: None,
    }
}

fn request(url: &str) -> ScrapeRequest {
    ScrapeRequest {
        url: url.to_string(),
        ..Default::default()
    }
}

// Scenario 1: no cache, Direct succeeds -> annotation names Direct, preference learned.
#[tokio::test]
async fn scenario_direct_success_records_preference() {
    let state = state_with_backends(vec![Box::new(ScriptedBackend {
        backend_id: BackendId::Direct,
        outcome: FetchOutcome::ok(BackendId::Direct, b"hello".to_vec(), Some("text/plain".to_string())),
    })])
    .await;

    let result = orchestrator::scrape(&state, &request("http://a/")).await.unwrap();
    assert!(result.inline_text.ends_with("\n\n---\nScraped using: Direct"));
    assert!(result.resource_handle.is_some());
    assert_eq!(
        state.strategy_registry.preferred("a").await,
        Some(BackendId::Direct)
    );
}

// Scenario 2: Direct times out, Rendering succeeds -> fallback + preference update.
#[tokio::test]
async fn scenario_timeout_falls_back_to_rendering() {
    let state = state_with_backends(vec![
        Box::new(ScriptedBackend {
            backend_id: BackendId::Direct,
            outcome: FetchOutcome::fail(BackendId::Direct, BackendFailureKind::Timeout),
        }),
        Box::new(ScriptedBackend {
            backend_id: BackendId::Rendering,
            outcome: FetchOutcome::ok(
                BackendId::Rendering,
                b"<p>ok</p>".to_vec(),
                Some("text/html".to_string()),
            ),
        }),
    ])
    .await;

    let mut req = request("http://b/");
    req.timeout_ms = 500;
    let result = orchestrator::scrape(&state, &req).await.unwrap();
    assert!(result.inline_text.contains("<p>ok</p>"));
    assert!(result.inline_text.contains("Scraped using: Rendering"));
    assert_eq!(
        state.strategy_registry.preferred("b").await,
        Some(BackendId::Rendering)
    );
}

// Scenario 3 + 4: cache hit serves without a new strategy attempt; force_rescrape bypasses it.
#[tokio::test]
async fn scenario_cache_hit_then_force_rescrape() {
    let state = state_with_backends(vec![Box::new(ScriptedBackend {
        backend_id: BackendId::Bypass,
        outcome: FetchOutcome::ok(BackendId::Bypass, b"cached".to_vec(), Some("text/plain".to_string())),
    })])
    .await;

    // First call populates the cache via Bypass.
    let first = orchestrator::scrape(&state, &request("http://c/")).await.unwrap();
    assert!(first.inline_text.contains("Scraped using: Bypass"));
    assert_eq!(state.resource_store.find_by_url("http://c/").await.len(), 1);

    // Second call should be served entirely from cache.
    let cached = orchestrator::scrape(&state, &request("http://c/")).await.unwrap();
    assert!(cached
        .inline_text
        .contains("Served from cache (originally scraped using: Bypass)"));
    assert_eq!(state.resource_store.find_by_url("http://c/").await.len(), 1);

    // force_rescrape bypasses the cache and appends a new entry.
    let mut forced = request("http://c/");
    forced.force_rescrape = true;
    orchestrator::scrape(&state, &forced).await.unwrap();
    assert_eq!(state.resource_store.find_by_url("http://c/").await.len(), 2);
}

// Scenario 5: windowing law over a large document.
#[tokio::test]
async fn scenario_windowing_law() {
    let raw = "x".repeat(250_000);
    let state = state_with_backends(vec![Box::new(ScriptedBackend {
        backend_id: BackendId::Direct,
        outcome: FetchOutcome::ok(BackendId::Direct, raw.into_bytes(), Some("text/plain".to_string())),
    })])
    .await;

    let mut req = request("http://d/");
    req.start_index = 50_000;
    req.max_chars = 100_000;
    let result = orchestrator::scrape(&state, &req).await.unwrap();
    assert!(result.truncated);
    assert!(result.inline_text.contains("start_index=150000"));

    let body_len = result
        .inline_text
        .split("\n\n---\n")
        .next()
        .unwrap()
        .chars()
        .count();
    assert_eq!(body_len, 100_000);
}

// Scenario 6: a 404 is authoritative and short-circuits the fallback loop.
#[tokio::test]
async fn scenario_404_short_circuits_and_surfaces_one_backend() {
    let state = state_with_backends(vec![Box::new(ScriptedBackend {
        backend_id: BackendId::Direct,
        outcome: FetchOutcome::fail(BackendId::Direct, BackendFailureKind::Http(404)),
    })])
    .await;

    let err = orchestrator::scrape(&state, &request("http://e/")).await.unwrap_err();
    let message = err.user_message();
    assert!(message.contains("Direct"));
    assert!(!message.contains("Rendering"));
    assert!(!message.contains("Bypass"));
}

#[tokio::test]
async fn invalid_url_is_rejected_before_any_backend_attempt() {
    let state = state_with_backends(vec![]).await;
    let err = orchestrator::scrape(&state, &request("not a url")).await.unwrap_err();
    assert!(matches!(err, scrape_engine::ScrapeError::InvalidArgument(_)));
}
