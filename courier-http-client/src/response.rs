//! HTTP response wrapper.

use bytes::Bytes;
use http::StatusCode;

use crate::FailureKind;

/// Result of a dispatch.
///
/// `T` is the decoded body type of typed calls; untyped calls use `()`.
/// Transport failures never surface as errors: they produce an unsuccessful
/// response whose status is 408 for timeouts and 500 for everything else.
#[derive(Debug, Clone, PartialEq)]
pub struct Response<T = ()> {
    successful: bool,
    status: StatusCode,
    raw_body: Option<String>,
    body: Option<T>,
    bytes: Option<Bytes>,
}

impl<T> Response<T> {
    /// A response received from the server.
    pub(crate) fn received(status: StatusCode, raw_body: Option<String>) -> Self {
        Self {
            successful: status.is_success(),
            status,
            raw_body,
            body: None,
            bytes: None,
        }
    }

    /// A response standing in for a failed dispatch.
    pub(crate) fn failed(kind: FailureKind) -> Self {
        Self {
            successful: false,
            status: kind.status(),
            raw_body: None,
            body: None,
            bytes: None,
        }
    }

    pub(crate) fn with_body(mut self, body: Option<T>) -> Self {
        self.body = body;
        self
    }

    pub(crate) fn with_bytes(mut self, bytes: Bytes) -> Self {
        self.bytes = Some(bytes);
        self
    }

    /// Get the status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Whether the server answered with a 2xx status.
    pub fn is_successful(&self) -> bool {
        self.successful
    }

    /// Raw response text. Absent for downloads and failed dispatches.
    pub fn raw_body(&self) -> Option<&str> {
        self.raw_body.as_deref()
    }

    /// Decoded body. Only present on successful typed calls.
    pub fn body(&self) -> Option<&T> {
        self.body.as_ref()
    }

    /// Consume the response and return the decoded body.
    pub fn into_body(self) -> Option<T> {
        self.body
    }

    /// Downloaded bytes. Only present for downloads.
    pub fn bytes(&self) -> Option<&Bytes> {
        self.bytes.as_ref()
    }

    /// Consume the response and return the downloaded bytes.
    pub fn into_bytes(self) -> Option<Bytes> {
        self.bytes
    }
}
