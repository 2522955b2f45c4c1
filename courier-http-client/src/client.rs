//! HTTP client implementation.

use bytes::Bytes;
use chrono::Utc;
use http::StatusCode;
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::codec::{self, FORM_CONTENT_TYPE, JSON_CONTENT_TYPE, XML_CONTENT_TYPE};
use crate::wire::{Body, CONTENT_TYPE_HEADER, WireRequest};
use crate::{
    CallbackArgs, ClientConfig, ClientError, Cookie, FailureKind, RequestBuilder, Response, Result,
    Settings,
};

static INSTANCE: OnceCell<Client> = OnceCell::new();

/// How the response body is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReadMode {
    /// Keep the raw text only.
    Text,
    /// Keep the raw text and decode it on success.
    Typed,
    /// Keep the raw bytes.
    Bytes,
}

/// Fluent HTTP client.
///
/// A `Client` owns one transport handle and one set of default [`Settings`].
/// Clones share both. Requests are configured through a [`RequestBuilder`],
/// which carries the per-request overrides and is consumed by the verb that
/// sends it, so nothing leaks from one request into the next.
#[derive(Clone)]
pub struct Client {
    inner: reqwest::Client,
    config: Arc<ClientConfig>,
    defaults: Arc<RwLock<Settings>>,
}

impl Client {
    /// Create an independent client with the given configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .user_agent(&config.user_agent)
            .gzip(config.gzip)
            .brotli(config.brotli);

        if config.follow_redirects {
            builder = builder.redirect(reqwest::redirect::Policy::limited(config.max_redirects));
        } else {
            builder = builder.redirect(reqwest::redirect::Policy::none());
        }

        if let Some(proxy) = &config.proxy {
            let mut transport_proxy = reqwest::Proxy::all(proxy.url())?;
            if let Some(username) = &proxy.username {
                transport_proxy =
                    transport_proxy.basic_auth(username, proxy.password.as_deref().unwrap_or(""));
            }
            builder = builder.proxy(transport_proxy);
        }

        let inner = builder.build()?;

        Ok(Self {
            inner,
            config: Arc::new(config),
            defaults: Arc::new(RwLock::new(Settings::default())),
        })
    }

    /// Initialize the process-wide client.
    ///
    /// Only the first call has an effect; later calls return the existing
    /// instance and ignore `config`.
    pub fn init(config: ClientConfig) -> Result<&'static Client> {
        if let Some(client) = INSTANCE.get() {
            debug!("Process-wide HTTP client already initialized, ignoring configuration");
            return Ok(client);
        }
        INSTANCE.get_or_try_init(|| Self::new(config))
    }

    /// The process-wide client, initialized with the default configuration
    /// if [`init`](Self::init) was never called.
    pub fn instance() -> Result<&'static Client> {
        INSTANCE.get_or_try_init(|| Self::new(ClientConfig::default()))
    }

    /// Get the underlying reqwest client.
    pub fn inner(&self) -> &reqwest::Client {
        &self.inner
    }

    /// Get the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Snapshot of the current default settings.
    pub fn defaults(&self) -> Settings {
        self.defaults.read().clone()
    }

    /// Replace the default settings.
    ///
    /// The current defaults are passed to `configure` with their headers and
    /// cookies reset to empty collections. Afterwards a non-blank
    /// `base_address` must parse as an absolute URL and is given a trailing
    /// `/`. On error the previous defaults stay in place.
    ///
    /// The defaults stay write-locked while `configure` runs, so concurrent
    /// calls apply one after the other. `configure` must not call back into
    /// this client.
    pub fn set_default(&self, configure: impl FnOnce(&mut Settings)) -> Result<()> {
        let mut defaults = self.defaults.write();
        let mut next = defaults.clone();
        next.headers = Some(BTreeMap::new());
        next.cookies = Some(Vec::new());

        configure(&mut next);
        next.normalize_base_address()?;

        debug!(base_address = ?next.base_address, "Updated default request settings");
        *defaults = next;
        Ok(())
    }

    /// Start configuring a request.
    pub fn request(&self) -> RequestBuilder<'_> {
        RequestBuilder::new(self)
    }

    /// Start a request with the given URI.
    pub fn with_uri(&self, uri: impl Into<String>) -> Result<RequestBuilder<'_>> {
        self.request().with_uri(uri)
    }

    /// Start a request with basic authentication.
    pub fn with_basic_auth(
        &self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<RequestBuilder<'_>> {
        self.request().with_basic_auth(username, password)
    }

    /// Start a request with a bearer token.
    pub fn with_bearer_token(&self, token: impl Into<String>) -> Result<RequestBuilder<'_>> {
        self.request().with_bearer_token(token)
    }

    /// Start a request with a timeout.
    pub fn with_timeout(&self, timeout: Duration) -> Result<RequestBuilder<'_>> {
        self.request().with_timeout(timeout)
    }

    /// Start a request with a cookie.
    pub fn with_cookie(
        &self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<RequestBuilder<'_>> {
        self.request().with_cookie(name, value)
    }

    /// Start a request with a set of cookies.
    pub fn with_cookies(
        &self,
        cookies: impl Into<Option<Vec<Cookie>>>,
    ) -> Result<RequestBuilder<'_>> {
        self.request().with_cookies(cookies)
    }

    /// Start a request with a header.
    pub fn with_header(
        &self,
        key: impl Into<String>,
        value: impl fmt::Display,
    ) -> Result<RequestBuilder<'_>> {
        self.request().with_header(key, value)
    }

    /// Start a request with a set of headers.
    pub fn with_headers(
        &self,
        headers: impl Into<Option<BTreeMap<String, String>>>,
    ) -> Result<RequestBuilder<'_>> {
        self.request().with_headers(headers)
    }

    /// Start a request with a `before_call` hook.
    pub fn before_call<F>(&self, hook: F) -> RequestBuilder<'_>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.request().before_call(hook)
    }

    /// Start a request with an `after_call` hook.
    pub fn after_call<F>(&self, hook: F) -> RequestBuilder<'_>
    where
        F: Fn(&CallbackArgs) + Send + Sync + 'static,
    {
        self.request().after_call(hook)
    }

    /// Start a request with an `on_error` hook.
    pub fn on_error<F>(&self, hook: F) -> RequestBuilder<'_>
    where
        F: Fn(&CallbackArgs) + Send + Sync + 'static,
    {
        self.request().on_error(hook)
    }

    /// Start a request from settings edited in place.
    pub fn configure(&self, configure: impl FnOnce(&mut Settings)) -> RequestBuilder<'_> {
        self.request().configure(configure)
    }

    /// Send a built request and turn the outcome into a response.
    ///
    /// Hooks run on the calling task and are not guarded: a panicking hook
    /// unwinds through the caller.
    pub(crate) async fn dispatch<T: DeserializeOwned>(
        &self,
        settings: Settings,
        request: WireRequest,
        read: ReadMode,
        cancellation: Option<CancellationToken>,
    ) -> Response<T> {
        if let Some(hook) = &settings.before_call {
            hook();
        }

        let method = request.method.clone();
        let target = request.target.clone();
        let start_at = Utc::now();
        let started = Instant::now();

        debug!(method = %method, target = %target, "Sending HTTP request");

        let result: Result<Response<T>> = async {
            let (status, payload) = match &cancellation {
                Some(token) => tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(ClientError::Cancelled),
                    exchanged = self.exchange(request, settings.timeout) => exchanged,
                },
                None => self.exchange(request, settings.timeout).await,
            }?;

            if let Some(hook) = &settings.after_call {
                hook(&CallbackArgs::completed(settings.clone(), start_at, Utc::now()));
            }

            debug!(
                method = %method,
                target = %target,
                status = %status,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Received HTTP response"
            );

            read_response(status, payload, read)
        }
        .await;

        match result {
            Ok(response) => response,
            Err(error) => self.fail(settings, start_at, error),
        }
    }

    fn fail<T>(
        &self,
        settings: Settings,
        start_at: chrono::DateTime<Utc>,
        error: ClientError,
    ) -> Response<T> {
        let args = CallbackArgs::failed(settings, start_at, Utc::now(), error);
        let kind = args.error_kind.unwrap_or(FailureKind::Transport);

        if let Some(error) = &args.error {
            warn!(kind = %kind, error = %error, "HTTP request failed");
        }
        if let Some(hook) = &args.settings.on_error {
            hook(&args);
        }

        Response::failed(kind)
    }

    /// One round trip over the transport, body included.
    async fn exchange(
        &self,
        request: WireRequest,
        timeout: Duration,
    ) -> Result<(StatusCode, Bytes)> {
        let url = Url::parse(&request.target)?;
        let mut builder = self.inner.request(request.method, url);

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder = match request.body {
            Body::Empty => builder,
            Body::Json(text) => builder.header(CONTENT_TYPE_HEADER, JSON_CONTENT_TYPE).body(text),
            Body::Xml(text) => builder.header(CONTENT_TYPE_HEADER, XML_CONTENT_TYPE).body(text),
            Body::Form(text) => builder.header(CONTENT_TYPE_HEADER, FORM_CONTENT_TYPE).body(text),
            Body::Upload(upload) => builder.multipart(upload.into_form()?),
        };

        if !timeout.is_zero() {
            builder = builder.timeout(timeout);
        }

        let limit = if timeout.is_zero() {
            self.config.timeout
        } else {
            timeout
        };
        let classify = |e: reqwest::Error| {
            if e.is_timeout() {
                ClientError::Timeout(limit)
            } else {
                ClientError::Http(e)
            }
        };

        let response = builder.send().await.map_err(classify)?;
        let status = response.status();
        let payload = response.bytes().await.map_err(classify)?;
        Ok((status, payload))
    }
}

fn read_response<T: DeserializeOwned>(
    status: StatusCode,
    payload: Bytes,
    read: ReadMode,
) -> Result<Response<T>> {
    if read == ReadMode::Bytes {
        return Ok(Response::received(status, None).with_bytes(payload));
    }

    let text = String::from_utf8_lossy(&payload).into_owned();
    let decoded = if read == ReadMode::Typed && status.is_success() {
        codec::decode(&text)?
    } else {
        None
    };

    Ok(Response::received(status, Some(text)).with_body(decoded))
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .field("defaults", &*self.defaults.read())
            .finish()
    }
}
