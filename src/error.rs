use std::{sync::Arc, time::Duration};

use thiserror::Error;

/// Result type used throughout the Flagsmith SDK.
pub type Result<T> = std::result::Result<T, Error>;

/// Enum representing possible errors that can occur in the Flagsmith SDK.
///
/// A flag or trait that does not exist is not an error. Lookups return `Ok(None)` in that case.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// The client is misconfigured (missing environment key, analytics enabled without a store,
    /// etc.). This indicates a programming error and should not be retried.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Invalid base URL configuration.
    #[error("invalid base_url configuration")]
    InvalidBaseUrl(#[source] url::ParseError),

    /// Connectivity failure while talking to the server.
    #[error(transparent)]
    // reqwest::Error is not clonable, so we're wrapping it in an Arc.
    Network(Arc<reqwest::Error>),

    /// The server did not respond within the configured timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The server responded with a non-2xx status code.
    #[error("server responded with HTTP {status}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Raw response body, kept for diagnostics.
        body: String,
    },

    /// Response body does not match the expected shape.
    #[error("unable to decode response body")]
    Decode(#[source] Arc<serde_json::Error>),
}

impl Error {
    /// Returns `true` if the request failed to reach the server or timed out.
    pub fn is_network(&self) -> bool {
        matches!(self, Error::Network(_) | Error::Timeout(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        // Strip URL so that query parameters never end up in error messages.
        Error::Network(Arc::new(value.without_url()))
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::Decode(Arc::new(value))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::Error;

    #[test]
    fn timeout_is_a_network_error() {
        assert!(Error::Timeout(Duration::from_secs(1)).is_network());
        assert!(!Error::HttpStatus {
            status: 500,
            body: String::new()
        }
        .is_network());
    }

    #[test]
    fn decode_error_keeps_source() {
        let err: Error = serde_json::from_str::<bool>("nope").unwrap_err().into();
        assert!(matches!(err, Error::Decode(_)));
        assert!(std::error::Error::source(&err).is_some());
    }
}
