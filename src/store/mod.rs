use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::warn;

use crate::error::ScrapeError;

/// A single cached scrape result, keyed by an opaque `res://<uuid>` URI and
/// indexable by the URL it was scraped from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedResource {
    pub uri: String,
    pub name: String,
    pub description: String,
    pub mime_type: String,
    pub text: String,
    pub metadata: ResourceMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceMetadata {
    pub url: String,
    pub backend: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub content_length: usize,
    pub was_truncated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extract_query: Option<String>,
}

/// URL-indexed, append-only content cache. Backed by a JSON-lines file
/// (`resources.jsonl`) under the engine's state directory, plus an in-memory
/// index rebuilt from the file at startup and updated in-process on every
/// write. A single `RwLock` guards the index; the write path holds it only
/// long enough to append the line and update the in-memory maps.
pub struct ResourceStore {
    path: PathBuf,
    records: RwLock<HashMap<String, CachedResource>>,
    by_url: RwLock<HashMap<String, Vec<String>>>,
}

impl ResourceStore {
    /// Load the store from its backing file, rebuilding the in-memory index.
    /// A trailing incomplete line (process killed mid-append) is detected
    /// and silently ignored rather than treated as corruption.
    pub async fn load(path: PathBuf) -> Self {
        let mut records = HashMap::new();
        let mut by_url: HashMap<String, Vec<String>> = HashMap::new();

        if let Ok(contents) = tokio::fs::read_to_string(&path).await {
            let lines: Vec<&str> = contents.lines().collect();
            for (idx, line) in lines.iter().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<CachedResource>(line) {
                    Ok(resource) => {
                        by_url
                            .entry(resource.metadata.url.clone())
                            .or_default()
                            .push(resource.uri.clone());
                        records.insert(resource.uri.clone(), resource);
                    }
                    Err(e) => {
                        let is_last = idx == lines.len() - 1;
                        if is_last {
                            warn!(
                                path = %path.display(),
                                "ignoring trailing incomplete line in resources.jsonl"
                            );
                        } else {
                            warn!(
                                path = %path.display(),
                                error = %e,
                                line = idx,
                                "skipping corrupt resources.jsonl line"
                            );
                        }
                    }
                }
            }
        }

        // Most-recent first within each URL bucket.
        for uris in by_url.values_mut() {
            uris.reverse();
        }

        Self {
            path,
            records: RwLock::new(records),
            by_url: RwLock::new(by_url),
        }
    }

    /// Ordered by timestamp descending (insertion order within a URL bucket
    /// is maintained as most-recent-first at write time, so no extra sort
    /// is needed on the read path).
    pub async fn find_by_url(&self, url: &str) -> Vec<CachedResource> {
        let by_url = self.by_url.read().await;
        let Some(uris) = by_url.get(url) else {
            return Vec::new();
        };
        let records = self.records.read().await;
        uris.iter()
            .filter_map(|uri| records.get(uri).cloned())
            .collect()
    }

    pub async fn read(&self, uri: &str) -> Result<CachedResource, ScrapeError> {
        self.records
            .read()
            .await
            .get(uri)
            .cloned()
            .ok_or_else(|| ScrapeError::StoreError(format!("no such resource: {uri}")))
    }

    /// Appends one line to `resources.jsonl` and flushes before returning the
    /// new `uri`, so a process kill mid-append leaves at most a trailing
    /// incomplete line (never a record that half-parses as something else).
    pub async fn write(
        &self,
        url: &str,
        text: &str,
        mut metadata: ResourceMetadata,
    ) -> Result<String, ScrapeError> {
        let uri = format!("res://{}", uuid::Uuid::new_v4());
        metadata.url = url.to_string();
        metadata.content_length = text.len();

        let resource = CachedResource {
            uri: uri.clone(),
            name: derive_name(url),
            description: format!("Cached content scraped from {url}"),
            mime_type: "text/plain".to_string(),
            text: text.to_string(),
            metadata,
        };

        append_line(&self.path, &resource)
            .await
            .map_err(|e| ScrapeError::StoreError(format!("failed to persist resource: {e}")))?;

        {
            let mut records = self.records.write().await;
            records.insert(uri.clone(), resource);
        }
        {
            let mut by_url = self.by_url.write().await;
            by_url.entry(url.to_string()).or_default().insert(0, uri.clone());
        }

        Ok(uri)
    }

    /// Operator helper: remove cached resources older than `cutoff`. Never
    /// invoked by the orchestrator itself — the store is authoritative until
    /// `force_rescrape` is set; this exists purely for manual maintenance.
    pub async fn prune_older_than(
        &self,
        cutoff: chrono::DateTime<chrono::Utc>,
    ) -> Result<usize, ScrapeError> {
        let mut records = self.records.write().await;
        let mut by_url = self.by_url.write().await;

        let to_remove: Vec<String> = records
            .values()
            .filter(|r| r.metadata.timestamp < cutoff)
            .map(|r| r.uri.clone())
            .collect();

        for uri in &to_remove {
            if let Some(removed) = records.remove(uri) {
                if let Some(uris) = by_url.get_mut(&removed.metadata.url) {
                    uris.retain(|u| u != uri);
                }
            }
        }

        rewrite_file(&self.path, records.values()).await.map_err(|e| {
            ScrapeError::StoreError(format!("failed to rewrite resources.jsonl: {e}"))
        })?;

        Ok(to_remove.len())
    }
}

fn derive_name(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_string()))
        .unwrap_or_else(|| url.to_string())
}

async fn append_line(path: &Path, resource: &CachedResource) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut line = serde_json::to_string(resource).unwrap_or_default();
    line.push('\n');

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(line.as_bytes()).await?;
    file.flush().await?;
    Ok(())
}

async fn rewrite_file<'a>(
    path: &Path,
    resources: impl Iterator<Item = &'a CachedResource>,
) -> std::io::Result<()> {
    let mut body = String::new();
    for resource in resources {
        body.push_str(&serde_json::to_string(resource).unwrap_or_default());
        body.push('\n');
    }
    let tmp_path = path.with_extension("jsonl.tmp");
    tokio::fs::write(&tmp_path, body).await?;
    tokio::fs::rename(&tmp_path, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(backend: &str) -> ResourceMetadata {
        ResourceMetadata {
            url: String::new(),
            backend: backend.to_string(),
            timestamp: chrono::Utc::now(),
            content_length: 0,
            was_truncated: false,
            extract_query: None,
        }
    }

    fn temp_path(label: &str) -> PathBuf {
        std::env::temp_dir().join(format!("scrape-engine-store-{label}-{}.jsonl", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn write_then_read_round_trips_text_and_metadata() {
        let path = temp_path("roundtrip");
        let store = ResourceStore::load(path.clone()).await;

        let uri = store
            .write("http://a.example/", "hello world", meta("Direct"))
            .await
            .unwrap();
        let found = store.find_by_url("http://a.example/").await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].uri, uri);

        let read_back = store.read(&uri).await.unwrap();
        assert_eq!(read_back.text, "hello world");

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn find_by_url_orders_newest_first() {
        let path = temp_path("ordering");
        let store = ResourceStore::load(path.clone()).await;

        store.write("http://b.example/", "first", meta("Direct")).await.unwrap();
        let second_uri = store
            .write("http://b.example/", "second", meta("Rendering"))
            .await
            .unwrap();

        let found = store.find_by_url("http://b.example/").await;
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].uri, second_uri);
        assert_eq!(found[0].text, "second");

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn reload_from_disk_preserves_results() {
        let path = temp_path("durability");
        {
            let store = ResourceStore::load(path.clone()).await;
            store.write("http://c.example/", "persisted", meta("Bypass")).await.unwrap();
        }

        let reloaded = ResourceStore::load(path.clone()).await;
        let found = reloaded.find_by_url("http://c.example/").await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].text, "persisted");

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn trailing_incomplete_line_is_ignored() {
        let path = temp_path("truncated");
        {
            let store = ResourceStore::load(path.clone()).await;
            store.write("http://d.example/", "ok", meta("Direct")).await.unwrap();
        }
        // Simulate a process kill mid-append: append a half-written JSON line.
        {
            let mut file = tokio::fs::OpenOptions::new()
                .append(true)
                .open(&path)
                .await
                .unwrap();
            file.write_all(b"{\"uri\":\"res://broke").await.unwrap();
        }

        let reloaded = ResourceStore::load(path.clone()).await;
        let found = reloaded.find_by_url("http://d.example/").await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].text, "ok");

        let _ = std::fs::remove_file(&path);
    }
}
