mod bypass;
mod direct;
mod rendering;

pub use bypass::BypassBackend;
pub use direct::DirectBackend;
pub use rendering::RenderingBackend;

use crate::error::BackendFailureKind;

/// The fixed, closed set of fetch backends. Ordering is total: `Direct < Rendering < Bypass`
/// is the default attempt order when no learned preference exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum BackendId {
    Direct,
    Rendering,
    Bypass,
}

impl BackendId {
    pub const DEFAULT_ORDER: [BackendId; 3] =
        [BackendId::Direct, BackendId::Rendering, BackendId::Bypass];
}

impl std::fmt::Display for BackendId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendId::Direct => write!(f, "Direct"),
            BackendId::Rendering => write!(f, "Rendering"),
            BackendId::Bypass => write!(f, "Bypass"),
        }
    }
}

/// Result of a single backend fetch attempt.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub success: bool,
    pub bytes: Option<Vec<u8>>,
    pub media_type: Option<String>,
    pub backend: BackendId,
    pub error: Option<BackendFailureKind>,
    pub http_status: Option<u16>,
}

impl FetchOutcome {
    pub fn ok(backend: BackendId, bytes: Vec<u8>, media_type: Option<String>) -> Self {
        Self {
            success: true,
            bytes: Some(bytes),
            media_type,
            backend,
            error: None,
            http_status: Some(200),
        }
    }

    pub fn fail(backend: BackendId, error: BackendFailureKind) -> Self {
        let http_status = match &error {
            BackendFailureKind::Http(status) => Some(*status),
            _ => None,
        };
        Self {
            success: false,
            bytes: None,
            media_type: None,
            backend,
            error: Some(error),
            http_status,
        }
    }
}

/// Uniform contract every fetch backend implements. Never panics; all failure
/// modes are represented as `FetchOutcome { success: false, .. }`.
#[async_trait::async_trait]
pub trait Backend: Send + Sync {
    fn id(&self) -> BackendId;

    /// Whether this backend can be attempted at all (e.g. credentials configured).
    /// An unavailable backend is excluded from the strategy order entirely and
    /// never makes a network call.
    fn is_available(&self) -> bool;

    async fn fetch(&self, url: &str, timeout_ms: u64) -> FetchOutcome;
}
