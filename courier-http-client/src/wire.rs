//! Wire request construction.
//!
//! Turns effective [`Settings`] into a [`WireRequest`]: the composed target,
//! the header list (including cookies and authorization) and the body. The
//! result is plain data; handing it to the transport happens in the client.

use base64::Engine;
use bytes::Bytes;
use http::Method;
use url::Url;

use crate::codec::{
    FORM_CONTENT_TYPE, JSON_CONTENT_TYPE, OCTET_STREAM_CONTENT_TYPE, XML_CONTENT_TYPE,
};
use crate::{Auth, ClientError, Result, Settings};

/// Header name skipped when copying configured headers; the body decides it.
pub const CONTENT_TYPE_HEADER: &str = "Content-Type";
/// Header carrying the configured cookies.
pub const COOKIE_HEADER: &str = "Cookie";
/// Header carrying the configured credentials.
pub const AUTHORIZATION_HEADER: &str = "Authorization";

/// A file upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    /// File contents.
    pub bytes: Bytes,
    /// File name reported in the `file` part.
    pub file_name: String,
    /// JSON metadata sent as the `data` part.
    pub metadata: Option<String>,
}

impl Upload {
    /// Base64 text sent in the `file` part.
    pub fn encoded(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }

    pub(crate) fn into_form(self) -> Result<reqwest::multipart::Form> {
        let file = reqwest::multipart::Part::text(self.encoded())
            .file_name(self.file_name)
            .mime_str(OCTET_STREAM_CONTENT_TYPE)?;
        let mut form = reqwest::multipart::Form::new().part("file", file);
        if let Some(metadata) = self.metadata {
            let data = reqwest::multipart::Part::text(metadata).mime_str(JSON_CONTENT_TYPE)?;
            form = form.part("data", data);
        }
        Ok(form)
    }
}

/// Request body.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Body {
    /// No body.
    #[default]
    Empty,
    /// Serialized JSON.
    Json(String),
    /// Raw XML text.
    Xml(String),
    /// URL-encoded form.
    Form(String),
    /// Multipart file upload.
    Upload(Upload),
}

impl Body {
    /// Content type of the body, if it has a single one.
    pub fn content_type(&self) -> Option<&'static str> {
        match self {
            Self::Empty | Self::Upload(_) => None,
            Self::Json(_) => Some(JSON_CONTENT_TYPE),
            Self::Xml(_) => Some(XML_CONTENT_TYPE),
            Self::Form(_) => Some(FORM_CONTENT_TYPE),
        }
    }
}

/// A fully formed request, ready for the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireRequest {
    /// HTTP method.
    pub method: Method,
    /// Request target. Absolute once a base address or absolute URI applies.
    pub target: String,
    /// Headers, in the order they are sent.
    pub headers: Vec<(String, String)>,
    /// Body.
    pub body: Body,
}

impl WireRequest {
    /// First header with the given name, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Build a wire request from effective settings.
///
/// Fails with [`ClientError::MissingUri`] when no URI was resolved.
pub fn build(method: Method, settings: &Settings, body: Body) -> Result<WireRequest> {
    let uri = settings.uri.as_deref().ok_or(ClientError::MissingUri)?;

    Ok(WireRequest {
        method,
        target: compose_target(settings, uri),
        headers: collect_headers(settings),
        body,
    })
}

fn compose_target(settings: &Settings, uri: &str) -> String {
    // absolute targets ignore prefix and base address
    if Url::parse(uri).is_ok() {
        return uri.to_string();
    }

    let mut path = format!("{}{}", settings.uri_prefix.as_deref().unwrap_or(""), uri);

    let Some(base) = settings
        .base_address
        .as_deref()
        .filter(|b| !b.trim().is_empty())
    else {
        return path;
    };

    if path.starts_with('/') {
        path.remove(0);
    }

    match Url::parse(base).and_then(|b| b.join(&path)) {
        Ok(url) => url.to_string(),
        Err(_) => path,
    }
}

fn collect_headers(settings: &Settings) -> Vec<(String, String)> {
    let mut headers: Vec<(String, String)> = settings
        .headers
        .iter()
        .flatten()
        .filter(|(name, _)| !name.eq_ignore_ascii_case(CONTENT_TYPE_HEADER))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();

    if let Some(cookies) = settings.cookies.as_ref().filter(|c| !c.is_empty()) {
        let value = cookies
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join(";");
        headers.push((COOKIE_HEADER.to_string(), value));
    }

    if let Some(auth) = &settings.auth {
        headers.push((AUTHORIZATION_HEADER.to_string(), authorization(auth)));
    }

    headers
}

/// Authorization header value for the given credentials.
pub fn authorization(auth: &Auth) -> String {
    match auth {
        Auth::Basic { username, password } => {
            let credentials = base64::engine::general_purpose::STANDARD
                .encode(format!("{}:{}", username, password));
            format!("Basic {}", credentials)
        }
        Auth::Bearer { token } => format!("Bearer {}", token),
    }
}
