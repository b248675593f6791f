use std::path::PathBuf;

/// Process-wide configuration, resolved once at startup from the environment.
///
/// Every field has a hard-coded default; resolution never panics and never
/// fails the process even when the environment is empty (mirrors the
/// env-var-first, file-optional pattern this server family already uses).
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub state_dir: PathBuf,
    pub default_timeout_ms: u64,
    pub default_max_chars: usize,
    pub rendering_endpoint: Option<String>,
    pub rendering_api_key: Option<String>,
    pub bypass_endpoint: Option<String>,
    pub bypass_api_key: Option<String>,
    pub extract_llm_base_url: String,
    pub extract_llm_api_key: Option<String>,
    pub extract_llm_model: String,
    pub http_timeout_secs: u64,
}

const ENV_STATE_DIR: &str = "SCRAPE_STATE_DIR";
const ENV_DEFAULT_TIMEOUT_MS: &str = "SCRAPE_DEFAULT_TIMEOUT_MS";
const ENV_DEFAULT_MAX_CHARS: &str = "SCRAPE_DEFAULT_MAX_CHARS";
const ENV_RENDERING_ENDPOINT: &str = "RENDERING_ENDPOINT";
const ENV_RENDERING_API_KEY: &str = "RENDERING_API_KEY";
const ENV_BYPASS_ENDPOINT: &str = "BYPASS_ENDPOINT";
const ENV_BYPASS_API_KEY: &str = "BYPASS_API_KEY";
const ENV_EXTRACT_LLM_BASE_URL: &str = "EXTRACT_LLM_BASE_URL";
const ENV_EXTRACT_LLM_API_KEY: &str = "EXTRACT_LLM_API_KEY";
const ENV_EXTRACT_LLM_MODEL: &str = "EXTRACT_LLM_MODEL";
const ENV_HTTP_TIMEOUT_SECS: &str = "SCRAPE_HTTP_TIMEOUT_SECS";

impl EngineConfig {
    /// Resolve configuration from the process environment. Total: always
    /// returns a value, falling back to documented defaults with a logged
    /// warning on anything missing or unparseable.
    pub fn resolve() -> Self {
        Self {
            state_dir: resolve_state_dir(),
            default_timeout_ms: resolve_u64(ENV_DEFAULT_TIMEOUT_MS, 60_000),
            default_max_chars: resolve_u64(ENV_DEFAULT_MAX_CHARS, 100_000) as usize,
            rendering_endpoint: non_empty_env(ENV_RENDERING_ENDPOINT),
            rendering_api_key: non_empty_env(ENV_RENDERING_API_KEY),
            bypass_endpoint: non_empty_env(ENV_BYPASS_ENDPOINT),
            bypass_api_key: non_empty_env(ENV_BYPASS_API_KEY),
            extract_llm_base_url: non_empty_env(ENV_EXTRACT_LLM_BASE_URL)
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            extract_llm_api_key: non_empty_env(ENV_EXTRACT_LLM_API_KEY),
            extract_llm_model: non_empty_env(ENV_EXTRACT_LLM_MODEL)
                .unwrap_or_else(|| "gpt-4o-mini".to_string()),
            http_timeout_secs: resolve_u64(ENV_HTTP_TIMEOUT_SECS, 30),
        }
    }

    pub fn rendering_available(&self) -> bool {
        self.rendering_endpoint.is_some() && self.rendering_api_key.is_some()
    }

    pub fn bypass_available(&self) -> bool {
        self.bypass_endpoint.is_some() && self.bypass_api_key.is_some()
    }

    pub fn extraction_available(&self) -> bool {
        self.extract_llm_api_key.is_some()
    }

    pub fn strategy_preferences_path(&self) -> PathBuf {
        self.state_dir.join("strategy_preferences.json")
    }

    pub fn resources_path(&self) -> PathBuf {
        self.state_dir.join("resources.jsonl")
    }
}

fn resolve_state_dir() -> PathBuf {
    if let Some(dir) = non_empty_env(ENV_STATE_DIR) {
        return PathBuf::from(dir);
    }
    match dirs::home_dir() {
        Some(home) => home.join(".scrape-engine"),
        None => {
            tracing::warn!("no home directory detected, falling back to ./.scrape-engine");
            PathBuf::from("./.scrape-engine")
        }
    }
}

fn resolve_u64(var: &str, default: u64) -> u64 {
    match std::env::var(var) {
        Ok(v) if !v.trim().is_empty() => v.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("{var}={v:?} is not a valid integer, using default {default}");
            default
        }),
        _ => default,
    }
}

fn non_empty_env(var: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_is_total_on_empty_environment() {
        // No env vars set for any of our keys in this process by default.
        let cfg = EngineConfig::resolve();
        assert_eq!(cfg.default_timeout_ms, 60_000);
        assert_eq!(cfg.default_max_chars, 100_000);
        assert_eq!(cfg.extract_llm_base_url, "https://api.openai.com/v1");
        assert_eq!(cfg.extract_llm_model, "gpt-4o-mini");
        assert_eq!(cfg.http_timeout_secs, 30);
        assert!(!cfg.rendering_available());
        assert!(!cfg.bypass_available());
        assert!(!cfg.extraction_available());
    }

    #[test]
    fn unparseable_integer_falls_back_to_default() {
        std::env::set_var(ENV_DEFAULT_TIMEOUT_MS, "not-a-number");
        let cfg = EngineConfig::resolve();
        assert_eq!(cfg.default_timeout_ms, 60_000);
        std::env::remove_var(ENV_DEFAULT_TIMEOUT_MS);
    }
}
