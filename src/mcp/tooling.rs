use serde_json::Value;

use crate::core::AppState;

/// Static description of the `scrape` tool's JSON input schema, computed at
/// startup from which features are actually available — `extract_query` is
/// only listed when an extraction provider is configured, so a client never
/// sees a parameter the engine has no way to fulfill.
pub struct ToolSpec {
    pub name: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

pub fn tool_catalog(state: &AppState) -> Vec<ToolSpec> {
    vec![scrape_tool_spec(state)]
}

fn scrape_tool_spec(state: &AppState) -> ToolSpec {
    let mut properties = serde_json::json!({
        "url": {
            "type": "string",
            "description": "Absolute URL to scrape."
        },
        "timeout_ms": {
            "type": "integer",
            "minimum": 1,
            "default": state.config.default_timeout_ms,
            "description": "Per-backend wall-clock timeout ceiling."
        },
        "max_chars": {
            "type": "integer",
            "minimum": 1,
            "default": state.config.default_max_chars,
            "description": "Maximum number of characters to return inline."
        },
        "start_index": {
            "type": "integer",
            "minimum": 0,
            "default": 0,
            "description": "Character offset to start the returned window at."
        },
        "save_result": {
            "type": "boolean",
            "default": true,
            "description": "Whether to persist the scraped content to the resource cache."
        },
        "force_rescrape": {
            "type": "boolean",
            "default": false,
            "description": "Bypass the cache and re-fetch even if a cached result exists."
        }
    });

    if state.extraction.is_some() {
        properties.as_object_mut().unwrap().insert(
            "extract_query".to_string(),
            serde_json::json!({
                "type": "string",
                "description": "Natural-language query; if set, the raw content is run through LLM-driven extraction before windowing."
            }),
        );
    }

    ToolSpec {
        name: "scrape",
        title: "Scrape",
        description: "Fetch a URL's content, negotiating among fetch backends and an append-only cache, with optional LLM-driven extraction and character-range windowing.",
        input_schema: serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": ["url"]
        }),
    }
}
