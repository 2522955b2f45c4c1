//! HTTP Client error types.

use http::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Result type for HTTP client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Message used when an empty cookie collection is configured.
pub const COOKIES_ERROR_MESSAGE: &str = "Should be at least one cookie in Cookies.";
/// Message used when an empty header collection is configured.
pub const HEADERS_ERROR_MESSAGE: &str = "Should be at least one header in Headers.";
/// Message used when the default base address does not parse as an absolute URL.
pub const BASE_ADDRESS_ERROR_MESSAGE: &str = "Base address is not a valid url.";
/// Message used when an upload is attempted with no bytes.
pub const BYTES_ERROR_MESSAGE: &str = "You passed nothing to upload.";

/// HTTP client errors.
///
/// Caller-side errors (`InvalidArgument`, `InvalidConfiguration`, `Encode`,
/// `MissingUri`) are returned to the caller. Everything else only ever shows
/// up inside [`CallbackArgs`](crate::CallbackArgs) handed to an `on_error`
/// hook; dispatch itself reports those as an unsuccessful response.
#[derive(Debug, Error)]
pub enum ClientError {
    /// A required setter input was empty or blank.
    #[error("Value cannot be null or empty. (Parameter '{param}')")]
    InvalidArgument {
        /// Name of the offending parameter.
        param: &'static str,
    },

    /// A structurally present but semantically invalid configuration.
    #[error("{0}")]
    InvalidConfiguration(&'static str),

    /// A request body could not be encoded.
    #[error("Encode error: {0}")]
    Encode(String),

    /// No URI could be resolved for the request.
    #[error("No URI configured for the request (Parameter 'uri')")]
    MissingUri,

    /// Request timed out.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The request was cancelled through its cancellation token.
    #[error("Request was cancelled")]
    Cancelled,

    /// Any other send-time failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The response body could not be decoded into the requested type.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Underlying HTTP client error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl ClientError {
    pub(crate) fn invalid_argument(param: &'static str) -> Self {
        Self::InvalidArgument { param }
    }

    /// Check if this is a timeout error.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_)) || matches!(self, Self::Http(e) if e.is_timeout())
    }

    /// Check if this error comes from caller-side configuration.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument { .. }
                | Self::InvalidConfiguration(_)
                | Self::Encode(_)
                | Self::MissingUri
        )
    }

    /// Classify a dispatch failure.
    ///
    /// Returns `None` for configuration errors, which never reach the
    /// dispatcher.
    pub fn kind(&self) -> Option<FailureKind> {
        if self.is_configuration() {
            None
        } else if self.is_timeout() {
            Some(FailureKind::Timeout)
        } else {
            Some(FailureKind::Transport)
        }
    }
}

/// Classification of a failed dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The transport gave up waiting for the server.
    Timeout,
    /// Connectivity, protocol, decoding or cancellation failure.
    Transport,
}

impl FailureKind {
    /// Status code reported on the response for this kind of failure.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Timeout => StatusCode::REQUEST_TIMEOUT,
            Self::Transport => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short name of the failure kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Transport => "transport",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
