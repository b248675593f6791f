use tracing::{info, warn};

use super::StrategyRegistry;
use crate::backend::{Backend, BackendId, FetchOutcome};
use crate::error::{BackendFailureKind, ScrapeError};

/// Successful result of the attempt loop: the winning outcome plus the
/// backend that produced it, for the orchestrator's annotation line.
pub struct StrategyOutcome {
    pub outcome: FetchOutcome,
    pub backend: BackendId,
}

/// Order available backends, attempt each in sequence, and record the first
/// winner against the host's learned preference.
///
/// Ordering rule: if a learned preference `P` is among the available
/// backends, the attempt order is `[P, ..default order excluding P]`;
/// otherwise it is the default `[Direct, Rendering, Bypass]` restricted to
/// the available set.
///
/// A `404` is treated as authoritative: it short-circuits to failure without
/// attempting any further backend, since a nonexistent URL is not cured by a
/// stronger backend.
pub async fn attempt(
    backends: &[Box<dyn Backend>],
    registry: &StrategyRegistry,
    host: &str,
    url: &str,
    timeout_ms: u64,
) -> Result<StrategyOutcome, ScrapeError> {
    let available: Vec<&Box<dyn Backend>> = backends.iter().filter(|b| b.is_available()).collect();
    let preference = registry.preferred(host).await;
    let order = attempt_order(&available, preference);

    let mut attempts: Vec<(BackendId, BackendFailureKind)> = Vec::new();

    for backend in order {
        info!(host, backend = %backend.id(), "attempting backend");
        let outcome = backend.fetch(url, timeout_ms).await;

        if outcome.success {
            registry.record_success(host, backend.id()).await;
            return Ok(StrategyOutcome {
                backend: backend.id(),
                outcome,
            });
        }

        let kind = outcome
            .error
            .clone()
            .unwrap_or(BackendFailureKind::Other("unknown failure".to_string()));
        warn!(host, backend = %backend.id(), error = %kind, "backend failed");
        let short_circuit = !kind.triggers_fallback();
        attempts.push((backend.id(), kind));

        if short_circuit {
            break;
        }
    }

    Err(ScrapeError::AllBackendsFailed {
        attempts,
        timeout_ms,
    })
}

fn attempt_order<'a>(
    available: &[&'a Box<dyn Backend>],
    preference: Option<BackendId>,
) -> Vec<&'a Box<dyn Backend>> {
    let mut order = Vec::with_capacity(available.len());

    if let Some(preferred_id) = preference {
        if let Some(preferred) = available.iter().find(|b| b.id() == preferred_id) {
            order.push(*preferred);
        }
    }

    for default_id in BackendId::DEFAULT_ORDER {
        if order.iter().any(|b| b.id() == default_id) {
            continue;
        }
        if let Some(backend) = available.iter().find(|b| b.id() == default_id) {
            order.push(*backend);
        }
    }

    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeBackend {
        backend_id: BackendId,
        result: FetchOutcome,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Backend for FakeBackend {
        fn id(&self) -> BackendId {
            self.backend_id
        }

        fn is_available(&self) -> bool {
            true
        }

        async fn fetch(&self, _url: &str, _timeout_ms: u64) -> FetchOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    fn success(backend: BackendId) -> FetchOutcome {
        FetchOutcome::ok(backend, b"ok".to_vec(), Some("text/plain".to_string()))
    }

    fn not_found(backend: BackendId) -> FetchOutcome {
        FetchOutcome::fail(backend, BackendFailureKind::Http(404))
    }

    async fn fresh_registry() -> StrategyRegistry {
        let path = std::env::temp_dir().join(format!(
            "scrape-engine-engine-test-{}.json",
            uuid::Uuid::new_v4()
        ));
        StrategyRegistry::load(path).await
    }

    #[tokio::test]
    async fn default_order_is_direct_rendering_bypass() {
        let calls = Arc::new(AtomicUsize::new(0));
        let backends: Vec<Box<dyn Backend>> = vec![
            Box::new(FakeBackend {
                backend_id: BackendId::Direct,
                result: not_found(BackendId::Direct),
                calls: calls.clone(),
            }),
        ];
        // Only one backend present, but this exercises the default-order path.
        let registry = fresh_registry().await;
        let result = attempt(&backends, &registry, "e.com", "http://e/", 1000).await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn short_circuits_on_404_without_further_attempts() {
        let direct_calls = Arc::new(AtomicUsize::new(0));
        let rendering_calls = Arc::new(AtomicUsize::new(0));
        let backends: Vec<Box<dyn Backend>> = vec![
            Box::new(FakeBackend {
                backend_id: BackendId::Direct,
                result: not_found(BackendId::Direct),
                calls: direct_calls.clone(),
            }),
            Box::new(FakeBackend {
                backend_id: BackendId::Rendering,
                result: success(BackendId::Rendering),
                calls: rendering_calls.clone(),
            }),
        ];
        let registry = fresh_registry().await;
        let result = attempt(&backends, &registry, "e.com", "http://e/", 1000).await;
        assert!(result.is_err());
        assert_eq!(direct_calls.load(Ordering::SeqCst), 1);
        assert_eq!(rendering_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn falls_back_on_timeout_then_succeeds() {
        let direct_calls = Arc::new(AtomicUsize::new(0));
        let rendering_calls = Arc::new(AtomicUsize::new(0));
        let backends: Vec<Box<dyn Backend>> = vec![
            Box::new(FakeBackend {
                backend_id: BackendId::Direct,
                result: FetchOutcome::fail(BackendId::Direct, BackendFailureKind::Timeout),
                calls: direct_calls.clone(),
            }),
            Box::new(FakeBackend {
                backend_id: BackendId::Rendering,
                result: success(BackendId::Rendering),
                calls: rendering_calls.clone(),
            }),
        ];
        let registry = fresh_registry().await;
        let result = attempt(&backends, &registry, "e.com", "http://e/", 1000)
            .await
            .unwrap();
        assert_eq!(result.backend, BackendId::Rendering);
        assert_eq!(
            registry.preferred("e.com").await,
            Some(BackendId::Rendering)
        );
    }

    #[tokio::test]
    async fn learned_preference_is_attempted_first() {
        let direct_calls = Arc::new(AtomicUsize::new(0));
        let bypass_calls = Arc::new(AtomicUsize::new(0));
        let backends: Vec<Box<dyn Backend>> = vec![
            Box::new(FakeBackend {
                backend_id: BackendId::Direct,
                result: success(BackendId::Direct),
                calls: direct_calls.clone(),
            }),
            Box::new(FakeBackend {
                backend_id: BackendId::Bypass,
                result: success(BackendId::Bypass),
                calls: bypass_calls.clone(),
            }),
        ];
        let registry = fresh_registry().await;
        registry.record_success("e.com", BackendId::Bypass).await;

        let result = attempt(&backends, &registry, "e.com", "http://e/", 1000)
            .await
            .unwrap();
        assert_eq!(result.backend, BackendId::Bypass);
        assert_eq!(direct_calls.load(Ordering::SeqCst), 0);
        assert_eq!(bypass_calls.load(Ordering::SeqCst), 1);
    }
}
