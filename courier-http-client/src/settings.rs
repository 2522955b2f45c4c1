//! Request settings and their resolution.
//!
//! A [`Settings`] value is used twice: once as the process-wide defaults kept
//! by a [`Client`](crate::Client), and once as the pending overrides carried
//! by a [`RequestBuilder`](crate::RequestBuilder). [`resolve`] merges the two
//! into the effective settings of a single dispatch.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{BASE_ADDRESS_ERROR_MESSAGE, ClientError, FailureKind, Result};

/// Hook invoked right before a request is sent.
pub type BeforeCallFn = Arc<dyn Fn() + Send + Sync>;

/// Hook invoked once the transport answered.
pub type AfterCallFn = Arc<dyn Fn(&CallbackArgs) + Send + Sync>;

/// Hook invoked when a dispatch fails.
pub type OnErrorFn = Arc<dyn Fn(&CallbackArgs) + Send + Sync>;

/// Request authentication.
#[derive(Clone, PartialEq, Eq)]
pub enum Auth {
    /// HTTP basic authentication.
    Basic {
        /// User name.
        username: String,
        /// Password.
        password: String,
    },
    /// Bearer token authentication.
    Bearer {
        /// Raw token, sent without further encoding.
        token: String,
    },
}

impl Auth {
    /// Create basic credentials.
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Create a bearer token.
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer {
            token: token.into(),
        }
    }
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Self::Bearer { .. } => f
                .debug_struct("Bearer")
                .field("token", &"<redacted>")
                .finish(),
        }
    }
}

/// A cookie sent with a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    /// Cookie name.
    pub name: String,
    /// Cookie value.
    pub value: String,
}

impl Cookie {
    /// Create a cookie.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Request settings.
///
/// All fields are public so defaults can be edited in place through
/// [`Client::set_default`](crate::Client::set_default) and
/// [`RequestBuilder::configure`](crate::RequestBuilder::configure).
#[derive(Clone, Default)]
pub struct Settings {
    /// Absolute address relative URIs are resolved against. Only honoured on
    /// the default settings.
    pub base_address: Option<String>,
    /// Prefix prepended to relative URIs. Only honoured on the default
    /// settings.
    pub uri_prefix: Option<String>,
    /// Request target, absolute or relative.
    pub uri: Option<String>,
    /// Per-request timeout. `Duration::ZERO` means unset.
    pub timeout: Duration,
    /// Request headers. Names are kept exactly as given.
    pub headers: Option<BTreeMap<String, String>>,
    /// Cookies, sent in order.
    pub cookies: Option<Vec<Cookie>>,
    /// Authentication.
    pub auth: Option<Auth>,
    /// Hook invoked before sending.
    pub before_call: Option<BeforeCallFn>,
    /// Hook invoked after the transport answered.
    pub after_call: Option<AfterCallFn>,
    /// Hook invoked when the dispatch fails.
    pub on_error: Option<OnErrorFn>,
}

impl Settings {
    /// Create empty settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a strictly positive timeout is set.
    pub fn has_timeout(&self) -> bool {
        !self.timeout.is_zero()
    }

    /// Whether at least one header is set.
    pub fn has_headers(&self) -> bool {
        self.headers.as_ref().is_some_and(|h| !h.is_empty())
    }

    /// Whether at least one cookie is set.
    pub fn has_cookies(&self) -> bool {
        self.cookies.as_ref().is_some_and(|c| !c.is_empty())
    }

    /// Validate and normalize `base_address`.
    ///
    /// A blank address is cleared. Anything else must parse as an absolute
    /// URL and gets a trailing `/` so relative URIs append to its path.
    pub(crate) fn normalize_base_address(&mut self) -> Result<()> {
        let Some(base) = self.base_address.take() else {
            return Ok(());
        };
        if base.trim().is_empty() {
            return Ok(());
        }
        if url::Url::parse(&base).is_err() {
            return Err(ClientError::InvalidConfiguration(BASE_ADDRESS_ERROR_MESSAGE));
        }
        self.base_address = Some(if base.ends_with('/') {
            base
        } else {
            format!("{base}/")
        });
        Ok(())
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("base_address", &self.base_address)
            .field("uri_prefix", &self.uri_prefix)
            .field("uri", &self.uri)
            .field("timeout", &self.timeout)
            .field("headers", &self.headers)
            .field("cookies", &self.cookies)
            .field("auth", &self.auth)
            .field("before_call", &self.before_call.is_some())
            .field("after_call", &self.after_call.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

/// Merge pending request settings over the defaults.
///
/// Routing fields (`base_address`, `uri_prefix`) always come from the
/// defaults. Scalars and hooks take the pending value when set. Headers and
/// cookies are taken wholesale from whichever side has at least one entry,
/// pending first; they are never merged element by element.
pub fn resolve(defaults: Option<&Settings>, pending: Option<&Settings>) -> Settings {
    let pick = |has: fn(&Settings) -> bool| prefer(pending, defaults, has);

    Settings {
        base_address: defaults.and_then(|d| d.base_address.clone()),
        uri_prefix: defaults.and_then(|d| d.uri_prefix.clone()),
        uri: pending
            .and_then(|p| p.uri.clone())
            .or_else(|| defaults.and_then(|d| d.uri.clone())),
        timeout: pick(Settings::has_timeout)
            .map(|s| s.timeout)
            .unwrap_or_default(),
        headers: pick(Settings::has_headers).and_then(|s| s.headers.clone()),
        cookies: pick(Settings::has_cookies).and_then(|s| s.cookies.clone()),
        auth: pending
            .and_then(|p| p.auth.clone())
            .or_else(|| defaults.and_then(|d| d.auth.clone())),
        before_call: pending
            .and_then(|p| p.before_call.clone())
            .or_else(|| defaults.and_then(|d| d.before_call.clone())),
        after_call: pending
            .and_then(|p| p.after_call.clone())
            .or_else(|| defaults.and_then(|d| d.after_call.clone())),
        on_error: pending
            .and_then(|p| p.on_error.clone())
            .or_else(|| defaults.and_then(|d| d.on_error.clone())),
    }
}

fn prefer<'a>(
    pending: Option<&'a Settings>,
    defaults: Option<&'a Settings>,
    has: fn(&Settings) -> bool,
) -> Option<&'a Settings> {
    pending.filter(|p| has(p)).or(defaults)
}

/// Arguments handed to `after_call` and `on_error` hooks.
#[derive(Debug)]
pub struct CallbackArgs {
    /// Effective settings of the dispatch.
    pub settings: Settings,
    /// When the request was handed to the transport.
    pub start_at: DateTime<Utc>,
    /// When the transport answered or failed.
    pub end_at: DateTime<Utc>,
    /// The failure, for `on_error`.
    pub error: Option<ClientError>,
    /// Classification of the failure, for `on_error`.
    pub error_kind: Option<FailureKind>,
}

impl CallbackArgs {
    pub(crate) fn completed(settings: Settings, start_at: DateTime<Utc>, end_at: DateTime<Utc>) -> Self {
        Self {
            settings,
            start_at,
            end_at,
            error: None,
            error_kind: None,
        }
    }

    pub(crate) fn failed(
        settings: Settings,
        start_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
        error: ClientError,
    ) -> Self {
        let error_kind = error.kind();
        Self {
            settings,
            start_at,
            end_at,
            error: Some(error),
            error_kind,
        }
    }

    /// Wall-clock time between start and end.
    pub fn elapsed(&self) -> Duration {
        (self.end_at - self.start_at).to_std().unwrap_or_default()
    }
}
