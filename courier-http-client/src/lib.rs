//! # Courier HTTP Client
//!
//! A fluent HTTP client that merges per-request overrides over process-wide
//! default settings, validates configuration eagerly, and reports transport
//! failures as ordinary responses.
//!
//! ## Features
//!
//! - **Fluent configuration**: URI, auth, headers, cookies, timeout and hooks
//!   are set through chained, validating setters
//! - **Process-wide defaults**: base address, URI prefix and fallbacks for
//!   every per-request setting
//! - **Lifecycle hooks**: `before_call`, `after_call` and `on_error`
//! - **Soft failures**: timeouts and transport errors come back as
//!   unsuccessful responses (408 / 500) instead of errors
//! - **Verbs**: GET, JSON/XML/form POST, multipart upload, raw download
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use courier_http_client::Client;
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Answer {
//!     answer: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::instance()?;
//!     client.set_default(|s| s.base_address = Some("https://api.example.com".into()))?;
//!
//!     let response = client
//!         .with_uri("questions/music")?
//!         .with_bearer_token("token")?
//!         .get_as::<Answer>()
//!         .await?;
//!
//!     if let Some(body) = response.body() {
//!         println!("Answer: {}", body.answer);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Hooks
//!
//! ```rust,no_run
//! use courier_http_client::Client;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::instance()?;
//!
//!     let response = client
//!         .with_uri("https://api.example.com/orders")?
//!         .with_timeout(Duration::from_secs(5))?
//!         .after_call(|args| println!("took {:?}", args.elapsed()))
//!         .on_error(|args| eprintln!("failed: {:?}", args.error))
//!         .post(&serde_json::json!({"item": "widget", "quantity": 5}))
//!         .await?;
//!
//!     println!("Status: {}", response.status());
//!     Ok(())
//! }
//! ```

mod client;
mod codec;
mod config;
mod error;
mod request;
mod response;
mod settings;
pub mod wire;

pub use client::Client;
pub use codec::{FORM_CONTENT_TYPE, JSON_CONTENT_TYPE, XML_CONTENT_TYPE};
pub use config::{ClientConfig, ClientConfigBuilder, ENV_PREFIX, ProxyConfig};
pub use error::{
    BASE_ADDRESS_ERROR_MESSAGE, BYTES_ERROR_MESSAGE, COOKIES_ERROR_MESSAGE, ClientError,
    FailureKind, HEADERS_ERROR_MESSAGE, Result,
};
pub use request::RequestBuilder;
pub use response::Response;
pub use settings::{
    AfterCallFn, Auth, BeforeCallFn, CallbackArgs, Cookie, OnErrorFn, Settings, resolve,
};

// Re-export common types
pub use bytes::Bytes;
pub use http::{Method, StatusCode};
pub use tokio_util::sync::CancellationToken;

/// Prelude for common imports.
///
/// ```
/// use courier_http_client::prelude::*;
/// ```
pub mod prelude {
    pub use crate::client::Client;
    pub use crate::config::{ClientConfig, ClientConfigBuilder, ProxyConfig};
    pub use crate::error::{ClientError, FailureKind, Result};
    pub use crate::request::RequestBuilder;
    pub use crate::response::Response;
    pub use crate::settings::{Auth, CallbackArgs, Cookie, Settings};
    pub use http::StatusCode;
    pub use tokio_util::sync::CancellationToken;
}
