use crate::backend::BackendId;

/// The engine's complete error taxonomy. Only a subset of these ever reach the
/// tool-call boundary as a hard failure — see `is_fatal`.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("all backends failed: {}", format_attempts(.attempts))]
    AllBackendsFailed {
        attempts: Vec<(BackendId, BackendFailureKind)>,
        timeout_ms: u64,
    },

    #[error("parse error: {0}")]
    ParseError(String),

    #[error("resource store error: {0}")]
    StoreError(String),
}

#[derive(Debug, Clone)]
pub enum BackendFailureKind {
    Timeout,
    Transport(String),
    Http(u16),
    Unavailable,
    Other(String),
}

impl std::fmt::Display for BackendFailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendFailureKind::Timeout => write!(f, "timeout"),
            BackendFailureKind::Transport(e) => write!(f, "transport error: {e}"),
            BackendFailureKind::Http(status) => write!(f, "http {status}"),
            BackendFailureKind::Unavailable => write!(f, "unavailable"),
            BackendFailureKind::Other(e) => write!(f, "{e}"),
        }
    }
}

impl BackendFailureKind {
    /// Whether this failure should be retried against the next backend in the
    /// strategy order, or treated as authoritative and short-circuited.
    pub fn triggers_fallback(&self) -> bool {
        match self {
            BackendFailureKind::Timeout | BackendFailureKind::Transport(_) => true,
            BackendFailureKind::Http(status) => {
                matches!(*status, 401 | 403 | 429) || (500..600).contains(status)
            }
            BackendFailureKind::Unavailable => false,
            BackendFailureKind::Other(_) => true,
        }
    }
}

fn format_attempts(attempts: &[(BackendId, BackendFailureKind)]) -> String {
    attempts
        .iter()
        .map(|(b, k)| format!("{b:?} ({k})"))
        .collect::<Vec<_>>()
        .join(", ")
}

impl ScrapeError {
    /// Whether this error must surface as a tool-level failure rather than
    /// being downgraded to an in-content diagnostic.
    ///
    /// `StoreError` is NOT covered here: a write failure is always downgraded,
    /// a read failure is only fatal when it happens mid cache-hit, which the
    /// orchestrator decides for itself rather than asking this method.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ScrapeError::InvalidArgument(_) | ScrapeError::AllBackendsFailed { .. }
        )
    }

    pub fn user_message(&self) -> String {
        match self {
            ScrapeError::AllBackendsFailed {
                attempts,
                timeout_ms,
            } => {
                let mut msg = format!(
                    "all backends failed after attempting: {}",
                    format_attempts(attempts)
                );
                if attempts
                    .iter()
                    .any(|(_, k)| matches!(k, BackendFailureKind::Timeout))
                {
                    msg.push_str(&format!(
                        "; at least one attempt timed out at {timeout_ms}ms, consider increasing timeout_ms"
                    ));
                }
                msg
            }
            other => other.to_string(),
        }
    }
}
