//! Error Handling Module
//!
//! One crate-wide error split along the recoverability axis of spec §7:
//! [`PerformError`] is what the failure-policy layer is allowed to see and
//! react to (fetch + map-interpreter + profile-parameter errors); everything
//! else is fatal to the call and surfaces as [`UnexpectedError`].

use std::fmt;

/// Source location attached to interpreter errors (spec §7: "with source location").
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
    pub node: Option<String>,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.node {
            Some(node) => write!(f, "{}:{} ({node})", self.line, self.column),
            None => write!(f, "{}:{}", self.line, self.column),
        }
    }
}

/// Errors observable by the failure-policy layer (spec §7 table, row 1-3).
#[derive(Debug, Clone, thiserror::Error)]
pub enum PerformError {
    #[error("network error while fetching {url}: {message}")]
    FetchNetwork { url: String, message: String },

    #[error("request aborted")]
    FetchAbort,

    #[error("request timed out after {0:?}")]
    FetchTimeout(std::time::Duration),

    #[error("map interpreter error at {location}: {message}")]
    MapInterpreter {
        message: String,
        location: SourceLocation,
    },

    #[error("profile parameter error: {0}")]
    ProfileParameter(String),
}

impl PerformError {
    pub fn fetch_network(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FetchNetwork {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn interpreter(message: impl Into<String>, location: SourceLocation) -> Self {
        Self::MapInterpreter {
            message: message.into(),
            location,
        }
    }

    /// Whether a failure policy should ever consider retrying this kind of error.
    /// Map-interpreter and profile-parameter errors are fatal to the current
    /// `perform` (spec §7) even though they pass through the policy's
    /// `afterRequest` hook for bookkeeping.
    pub fn is_retryable_kind(&self) -> bool {
        matches!(
            self,
            Self::FetchNetwork { .. } | Self::FetchAbort | Self::FetchTimeout(_)
        )
    }
}

/// Fatal errors: config/binary/digest-local/unexpected (spec §7 rows 4-7).
#[derive(Debug, Clone, thiserror::Error)]
pub enum UnexpectedError {
    #[error("digest challenge header not found")]
    DigestHeaderNotFound,

    #[error("digest challenge missing part: {0}")]
    DigestMissingPart(String),

    #[error("digest challenge has unexpected value for {part}: {value}")]
    DigestUnexpectedValue { part: String, value: String },

    #[error("binary data error: {0}")]
    Binary(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("{0}")]
    Unexpected(String),
}

/// Top-level error returned to callers of `perform` (spec §6).
#[derive(Debug, Clone, thiserror::Error)]
pub enum MapRuntimeError {
    #[error(transparent)]
    Perform(#[from] PerformError),
    #[error(transparent)]
    Unexpected(#[from] UnexpectedError),
}

impl MapRuntimeError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Perform(e) if e.is_retryable_kind())
    }
}

impl From<std::io::Error> for MapRuntimeError {
    fn from(e: std::io::Error) -> Self {
        Self::Unexpected(UnexpectedError::Binary(e.to_string()))
    }
}

impl From<serde_json::Error> for MapRuntimeError {
    fn from(e: serde_json::Error) -> Self {
        Self::Unexpected(UnexpectedError::Config(format!("invalid JSON: {e}")))
    }
}

impl From<reqwest::Error> for MapRuntimeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Perform(PerformError::FetchTimeout(std::time::Duration::from_secs(0)))
        } else {
            Self::Perform(PerformError::fetch_network(
                e.url().map(|u| u.to_string()).unwrap_or_default(),
                e.to_string(),
            ))
        }
    }
}

pub type Result<T> = std::result::Result<T, MapRuntimeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_errors_are_retryable_kinds() {
        let e = PerformError::fetch_network("http://x", "dns failure");
        assert!(e.is_retryable_kind());
    }

    #[test]
    fn interpreter_errors_are_not_retryable_kinds() {
        let e = PerformError::interpreter("undefined variable", SourceLocation::default());
        assert!(!e.is_retryable_kind());
    }

    #[test]
    fn unexpected_errors_do_not_retry() {
        let e: MapRuntimeError = UnexpectedError::Config("missing profile".into()).into();
        assert!(!e.is_retryable());
    }
}
