use std::sync::Arc;
use std::time::Duration;

use crate::backend::{Backend, BypassBackend, DirectBackend, RenderingBackend};
use crate::core::config::EngineConfig;
use crate::extraction::ExtractionAdapter;
use crate::store::ResourceStore;
use crate::strategy::StrategyRegistry;

/// Process-wide shared state: the resolved config, the shared `reqwest`
/// client (and its connection pool), the three backends, and the two
/// persistent stores. Held behind `Arc` so both the stdio JSON-RPC loop and
/// the axum HTTP mirror can share one instance across concurrent scrapes.
pub struct AppState {
    pub config: EngineConfig,
    pub http_client: reqwest::Client,
    pub backends: Vec<Box<dyn Backend>>,
    pub strategy_registry: StrategyRegistry,
    pub resource_store: ResourceStore,
    pub extraction: Option<ExtractionAdapter>,
}

impl AppState {
    /// Resolve configuration, build the shared HTTP client, construct the
    /// three backends (unavailable ones are simply excluded from the
    /// strategy order later, never attempted), and load both stores from
    /// their backing files. Never fails the process: a missing/corrupt
    /// state file degrades to an empty store with a logged warning.
    pub async fn init() -> anyhow::Result<Self> {
        let config = EngineConfig::resolve();

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()?;

        let backends: Vec<Box<dyn Backend>> = vec![
            Box::new(DirectBackend::new(http_client.clone())),
            Box::new(RenderingBackend::new(
                http_client.clone(),
                config.rendering_endpoint.clone(),
                config.rendering_api_key.clone(),
            )),
            Box::new(BypassBackend::new(
                http_client.clone(),
                config.bypass_endpoint.clone(),
                config.bypass_api_key.clone(),
            )),
        ];

        let strategy_registry = StrategyRegistry::load(config.strategy_preferences_path()).await;
        let resource_store = ResourceStore::load(config.resources_path()).await;
        let extraction = ExtractionAdapter::from_config(http_client.clone(), &config);

        Ok(Self {
            config,
            http_client,
            backends,
            strategy_registry,
            resource_store,
            extraction,
        })
    }
}

/// Shared alias used by the tool surfaces; every scrape sees the same
/// `Arc<AppState>`.
pub type SharedState = Arc<AppState>;
