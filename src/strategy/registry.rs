use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::backend::BackendId;

/// Per-host learned backend preference, persisted as a JSON file under the
/// engine's state directory and mirrored by an in-memory map guarded by a
/// single `RwLock`. Every mutation serializes the whole map to a temp file
/// and renames it over the target path — an atomic replace on POSIX — so a
/// crash mid-write never corrupts the existing file and readers never
/// observe a torn write.
pub struct StrategyRegistry {
    path: PathBuf,
    preferences: RwLock<HashMap<String, BackendId>>,
}

impl StrategyRegistry {
    /// Load the registry from its backing file. A missing or corrupt file
    /// degrades to an empty map with a warning — never a hard failure.
    pub async fn load(path: PathBuf) -> Self {
        let preferences = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(map) => map,
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "strategy_preferences.json is corrupt, starting from an empty map"
                    );
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };

        Self {
            path,
            preferences: RwLock::new(preferences),
        }
    }

    pub async fn preferred(&self, host: &str) -> Option<BackendId> {
        self.preferences.read().await.get(host).copied()
    }

    /// Idempotent: overwrites any existing preference for `host`. Converges
    /// correctly under concurrent calls for the same host — the last write
    /// under the lock wins, and the persisted file always matches whichever
    /// in-memory state was current when it was serialized.
    pub async fn record_success(&self, host: &str, backend: BackendId) {
        let snapshot = {
            let mut map = self.preferences.write().await;
            map.insert(host.to_string(), backend);
            map.clone()
        };

        if let Err(e) = persist(&self.path, &snapshot).await {
            warn!(
                path = %self.path.display(),
                error = %e,
                "failed to persist strategy_preferences.json"
            );
        } else {
            info!(host, backend = %backend, "recorded strategy preference");
        }
    }
}

async fn persist(path: &Path, map: &HashMap<String, BackendId>) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let serialized = serde_json::to_vec_pretty(map).unwrap_or_default();
    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, serialized).await?;
    tokio::fs::rename(&tmp_path, path).await?;
    Ok(())
}
