//! Error types produced by the deferlink crate.
//!
//! Every failure a match attempt can produce is one of the variants below.
//! A structurally valid response that fails the confidence or TTL policy is
//! *not* an error: it comes back as [`MatchOutcome::NoMatch`](crate::MatchOutcome::NoMatch).
//!
//! # Error Categories
//!
//! | Error | Category | Description |
//! |-------|----------|-------------|
//! | [`InvalidUrl`](DeferlinkError::InvalidUrl) | Configuration | Endpoint could not be built from config |
//! | [`ServerError`](DeferlinkError::ServerError) | Protocol | Non-2xx status or undecodable body |
//! | [`NotInitialized`](DeferlinkError::NotInitialized) | Precondition | No API key configured |
//! | [`Transport`](DeferlinkError::Transport) | Network | Failure raised by the transport, passed through |
//! | [`Config`](DeferlinkError::Config) | Configuration | Config failed to load or validate |
//!
//! # Examples
//!
//! ```rust
//! use deferlink::DeferlinkError;
//!
//! fn describe(err: &DeferlinkError) -> &'static str {
//!     match err {
//!         DeferlinkError::NotInitialized => "configure an API key first",
//!         DeferlinkError::InvalidUrl(_) => "check base_url",
//!         _ if err.is_retryable() => "try again later",
//!         _ => "giving up",
//!     }
//! }
//!
//! assert_eq!(describe(&DeferlinkError::NotInitialized), "configure an API key first");
//! ```
use thiserror::Error;

use crate::config::ConfigError;
use crate::transport::TransportError;

/// Errors surfaced by [`MatchClient`](crate::MatchClient) operations.
///
/// Each variant is fatal to the single call that produced it and never to the
/// client instance; callers may retry after fixing the cause.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DeferlinkError {
    /// The match endpoint could not be constructed from configuration.
    #[error("invalid endpoint url: {0}")]
    InvalidUrl(String),

    /// A response arrived but carried a failure status or could not be
    /// decoded as any recognized shape.
    ///
    /// `status` is `None` when the status was successful and the body was
    /// the problem.
    #[error("server error{}: {message}", status_suffix(.status))]
    ServerError {
        status: Option<u16>,
        message: String,
    },

    /// A call was attempted before an API key was configured.
    #[error("client not initialized: no API key configured")]
    NotInitialized,

    /// The transport collaborator failed; the original cause is preserved.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Configuration could not be loaded or is inconsistent.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" (HTTP {code})"),
        None => String::new(),
    }
}

impl DeferlinkError {
    pub(crate) fn server(status: Option<u16>, message: impl Into<String>) -> Self {
        DeferlinkError::ServerError {
            status,
            message: message.into(),
        }
    }

    /// HTTP status reported by the server, when the failure carried one.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            DeferlinkError::ServerError { status, .. } => *status,
            _ => None,
        }
    }

    /// Whether a caller-side retry has a chance of succeeding.
    ///
    /// This is advisory only; the crate itself never retries.
    pub fn is_retryable(&self) -> bool {
        match self {
            DeferlinkError::Transport(_) => true,
            DeferlinkError::ServerError {
                status: Some(status),
                ..
            } => *status == 429 || (500..600).contains(status),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;
    use std::io;

    #[test]
    fn server_error_display_includes_status() {
        let err = DeferlinkError::server(Some(503), "upstream unavailable");
        assert_eq!(
            err.to_string(),
            "server error (HTTP 503): upstream unavailable"
        );
        assert_eq!(err.http_status(), Some(503));
    }

    #[test]
    fn server_error_display_without_status() {
        let err = DeferlinkError::server(None, "expected value at line 1");
        assert_eq!(err.to_string(), "server error: expected value at line 1");
        assert_eq!(err.http_status(), None);
    }

    #[test]
    fn not_initialized_message() {
        let err = DeferlinkError::NotInitialized;
        assert!(err.to_string().contains("no API key"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn retryable_classification() {
        assert!(DeferlinkError::server(Some(500), "x").is_retryable());
        assert!(DeferlinkError::server(Some(429), "x").is_retryable());
        assert!(!DeferlinkError::server(Some(400), "x").is_retryable());
        assert!(!DeferlinkError::server(None, "bad json").is_retryable());
        assert!(!DeferlinkError::InvalidUrl("x".into()).is_retryable());

        let transport = TransportError::new(io::Error::new(io::ErrorKind::TimedOut, "timed out"));
        assert!(DeferlinkError::from(transport).is_retryable());
    }

    #[test]
    fn transport_error_keeps_original_cause() {
        let io_err = io::Error::new(io::ErrorKind::ConnectionReset, "connection reset by peer");
        let err = DeferlinkError::from(TransportError::new(io_err));

        assert_eq!(err.to_string(), "connection reset by peer");
        let source = err.source().expect("transport error exposes its cause");
        let io = source
            .downcast_ref::<io::Error>()
            .expect("cause is the original io::Error");
        assert_eq!(io.kind(), io::ErrorKind::ConnectionReset);
    }
}
