// src/error.rs
use std::fmt;
use std::time::Duration;

use thiserror::Error;

pub type Result<T, E = ScrapeError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ScrapeError {
    /* ---------- session level: fatal, nothing can proceed ---------- */
    #[error("no browser is listening on {endpoint}: {reason}")]
    ConnectionUnavailable { endpoint: String, reason: String },

    #[error("browser on {endpoint} exposes no attachable page")]
    NoActivePage { endpoint: String },

    #[error("page profile: {0}")]
    Profile(String),

    /* ---------- per activity ---------- */
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("activity {id} not ready after {waited:?}")]
    NavigationTimeout { id: String, waited: Duration },

    #[error("activity {id} does not resolve to a workout")]
    ActivityNotFound { id: String },

    #[error("activity {id}: field '{field}' not found on the rendered page")]
    ExtractionIncomplete { id: String, field: String },

    #[error("browser session is no longer logged in (now at {url})")]
    LoggedOut { url: String },

    #[error("devtools connection lost: {0}")]
    Disconnected(String),

    #[error("devtools protocol: {0}")]
    Protocol(String),

    /* ---------- plumbing ---------- */
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl ScrapeError {
    /// Classify an error raised while processing one activity.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            ScrapeError::InvalidRequest(_) => FailureKind::InvalidRequest,
            ScrapeError::NavigationTimeout { .. } => FailureKind::NavigationTimeout,
            ScrapeError::ActivityNotFound { .. } => FailureKind::ActivityNotFound,
            ScrapeError::ExtractionIncomplete { .. } => FailureKind::ExtractionIncomplete,
            ScrapeError::LoggedOut { .. } => FailureKind::LoggedOut,
            ScrapeError::Disconnected(_) | ScrapeError::ConnectionUnavailable { .. } => {
                FailureKind::Disconnected
            }
            ScrapeError::NoActivePage { .. } => FailureKind::Disconnected,
            ScrapeError::Protocol(_)
            | ScrapeError::Http(_)
            | ScrapeError::Json(_)
            | ScrapeError::Io(_)
            | ScrapeError::Profile(_) => FailureKind::Protocol,
        }
    }

    /// Errors that make the whole run pointless (raised before any activity).
    pub fn is_session_level(&self) -> bool {
        matches!(
            self,
            ScrapeError::ConnectionUnavailable { .. }
                | ScrapeError::NoActivePage { .. }
                | ScrapeError::Profile(_)
        )
    }
}

/// Why a single activity ended up `Failed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureKind {
    InvalidRequest,
    NavigationTimeout,
    ActivityNotFound,
    ExtractionIncomplete,
    LoggedOut,
    Disconnected,
    Protocol,
    Cancelled,
}

impl FailureKind {
    /// May succeed on an immediate retry.
    pub fn is_transient(self) -> bool {
        matches!(self, FailureKind::NavigationTimeout | FailureKind::Protocol)
    }

    /// Nothing after this can succeed on the same session.
    pub fn halts_batch(self) -> bool {
        matches!(self, FailureKind::LoggedOut | FailureKind::Disconnected)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::InvalidRequest => "InvalidRequest",
            FailureKind::NavigationTimeout => "NavigationTimeout",
            FailureKind::ActivityNotFound => "ActivityNotFound",
            FailureKind::ExtractionIncomplete => "ExtractionIncomplete",
            FailureKind::LoggedOut => "LoggedOut",
            FailureKind::Disconnected => "Disconnected",
            FailureKind::Protocol => "Protocol",
            FailureKind::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_timing_kinds_are_transient() {
        assert!(FailureKind::NavigationTimeout.is_transient());
        assert!(FailureKind::Protocol.is_transient());
        assert!(!FailureKind::ActivityNotFound.is_transient());
        assert!(!FailureKind::InvalidRequest.is_transient());
        assert!(!FailureKind::ExtractionIncomplete.is_transient());
    }

    #[test]
    fn session_loss_halts() {
        assert!(FailureKind::LoggedOut.halts_batch());
        assert!(FailureKind::Disconnected.halts_batch());
        assert!(!FailureKind::NavigationTimeout.halts_batch());
    }

    #[test]
    fn errors_classify_into_kinds() {
        let e = ScrapeError::NavigationTimeout { id: s!("1"), waited: Duration::from_secs(1) };
        assert_eq!(e.failure_kind(), FailureKind::NavigationTimeout);
        let e = ScrapeError::ActivityNotFound { id: s!("1") };
        assert_eq!(e.failure_kind(), FailureKind::ActivityNotFound);
        assert!(ScrapeError::NoActivePage { endpoint: s!("x") }.is_session_level());
        assert!(!ScrapeError::InvalidRequest(s!()).is_session_level());
    }
}
