//! Request builder.
//!
//! Every setter validates its input on the spot and either returns the
//! builder for further chaining or a configuration error. The verbs consume
//! the builder, resolve its pending settings over the client defaults, build
//! the wire request and dispatch it.

use bytes::Bytes;
use http::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::client::ReadMode;
use crate::codec;
use crate::error::{BYTES_ERROR_MESSAGE, COOKIES_ERROR_MESSAGE, HEADERS_ERROR_MESSAGE};
use crate::settings::resolve;
use crate::wire::{self, Body, Upload};
use crate::{Auth, CallbackArgs, Client, ClientError, Cookie, Response, Result, Settings};

fn require(value: &str, param: &'static str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ClientError::invalid_argument(param));
    }
    Ok(())
}

/// HTTP request builder.
#[must_use = "a request builder does nothing until a verb is called"]
pub struct RequestBuilder<'a> {
    client: &'a Client,
    settings: Option<Settings>,
    cancellation: Option<CancellationToken>,
}

impl fmt::Debug for RequestBuilder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestBuilder")
            .field("settings", &self.settings)
            .field("cancellable", &self.cancellation.is_some())
            .finish()
    }
}

impl<'a> RequestBuilder<'a> {
    /// Create a new request builder.
    pub(crate) fn new(client: &'a Client) -> Self {
        Self {
            client,
            settings: None,
            cancellation: None,
        }
    }

    fn pending(&mut self) -> &mut Settings {
        self.settings.get_or_insert_with(Settings::default)
    }

    /// Pending overrides, if any setter was called.
    pub fn settings(&self) -> Option<&Settings> {
        self.settings.as_ref()
    }

    /// Settings the request would be sent with right now.
    pub fn effective_settings(&self) -> Settings {
        let defaults = self.client.defaults();
        resolve(Some(&defaults), self.settings.as_ref())
    }

    /// Set the request URI, absolute or relative to the base address.
    pub fn with_uri(mut self, uri: impl Into<String>) -> Result<Self> {
        let uri = uri.into();
        require(&uri, "uri")?;
        self.pending().uri = Some(uri);
        Ok(self)
    }

    /// Set basic authentication.
    pub fn with_basic_auth(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self> {
        let (username, password) = (username.into(), password.into());
        require(&username, "username")?;
        require(&password, "password")?;
        self.pending().auth = Some(Auth::Basic { username, password });
        Ok(self)
    }

    /// Set bearer authentication.
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        require(&token, "bearer_token")?;
        self.pending().auth = Some(Auth::Bearer { token });
        Ok(self)
    }

    /// Set a custom timeout for this request.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        if timeout.is_zero() {
            return Err(ClientError::invalid_argument("timeout"));
        }
        self.pending().timeout = timeout;
        Ok(self)
    }

    /// Append a cookie.
    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Result<Self> {
        let (name, value) = (name.into(), value.into());
        require(&name, "name")?;
        require(&value, "value")?;
        self.pending()
            .cookies
            .get_or_insert_with(Vec::new)
            .push(Cookie { name, value });
        Ok(self)
    }

    /// Replace the cookies.
    ///
    /// `None` is an invalid argument; an empty collection is an invalid
    /// configuration.
    pub fn with_cookies(mut self, cookies: impl Into<Option<Vec<Cookie>>>) -> Result<Self> {
        let cookies = cookies
            .into()
            .ok_or(ClientError::invalid_argument("cookies"))?;
        if cookies.is_empty() {
            return Err(ClientError::InvalidConfiguration(COOKIES_ERROR_MESSAGE));
        }
        self.pending().cookies = Some(cookies);
        Ok(self)
    }

    /// Add a header. The value is sent in its `Display` form.
    ///
    /// Adding a key that is already pending replaces its value; the last call
    /// wins.
    pub fn with_header(mut self, key: impl Into<String>, value: impl fmt::Display) -> Result<Self> {
        let key = key.into();
        require(&key, "key")?;
        self.pending()
            .headers
            .get_or_insert_with(BTreeMap::new)
            .insert(key, value.to_string());
        Ok(self)
    }

    /// Replace the headers.
    ///
    /// `None` is an invalid argument; an empty collection is an invalid
    /// configuration.
    pub fn with_headers(
        mut self,
        headers: impl Into<Option<BTreeMap<String, String>>>,
    ) -> Result<Self> {
        let headers = headers
            .into()
            .ok_or(ClientError::invalid_argument("headers"))?;
        if headers.is_empty() {
            return Err(ClientError::InvalidConfiguration(HEADERS_ERROR_MESSAGE));
        }
        self.pending().headers = Some(headers);
        Ok(self)
    }

    /// Run `hook` right before the request is sent.
    pub fn before_call<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.pending().before_call = Some(Arc::new(hook));
        self
    }

    /// Run `hook` once the server answered.
    pub fn after_call<F>(mut self, hook: F) -> Self
    where
        F: Fn(&CallbackArgs) + Send + Sync + 'static,
    {
        self.pending().after_call = Some(Arc::new(hook));
        self
    }

    /// Run `hook` when the dispatch fails.
    pub fn on_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&CallbackArgs) + Send + Sync + 'static,
    {
        self.pending().on_error = Some(Arc::new(hook));
        self
    }

    /// Replace the pending settings with fresh ones edited by `configure`.
    ///
    /// Values set this way skip setter validation; a missing URI is still
    /// reported when the request is sent.
    pub fn configure(mut self, configure: impl FnOnce(&mut Settings)) -> Self {
        let mut settings = Settings {
            headers: Some(BTreeMap::new()),
            cookies: Some(Vec::new()),
            ..Settings::default()
        };
        configure(&mut settings);
        self.settings = Some(settings);
        self
    }

    /// Abort the request when `token` is cancelled.
    ///
    /// A cancelled request is reported like any other transport failure.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Send a GET request.
    pub async fn get(self) -> Result<Response> {
        self.send(Method::GET, Body::Empty, ReadMode::Text).await
    }

    /// Send a GET request and decode the body.
    pub async fn get_as<T: DeserializeOwned>(self) -> Result<Response<T>> {
        self.send(Method::GET, Body::Empty, ReadMode::Typed).await
    }

    /// POST a JSON body.
    pub async fn post<B: Serialize + ?Sized>(self, body: &B) -> Result<Response> {
        let body = Body::Json(codec::encode_json(body)?);
        self.send(Method::POST, body, ReadMode::Text).await
    }

    /// POST a JSON body and decode the response.
    pub async fn post_as<T, B>(self, body: &B) -> Result<Response<T>>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = Body::Json(codec::encode_json(body)?);
        self.send(Method::POST, body, ReadMode::Typed).await
    }

    /// POST raw XML text.
    pub async fn post_xml(self, xml: impl Into<String>) -> Result<Response> {
        let body = xml_body(xml.into())?;
        self.send(Method::POST, body, ReadMode::Text).await
    }

    /// POST raw XML text and decode the response.
    pub async fn post_xml_as<T: DeserializeOwned>(
        self,
        xml: impl Into<String>,
    ) -> Result<Response<T>> {
        let body = xml_body(xml.into())?;
        self.send(Method::POST, body, ReadMode::Typed).await
    }

    /// POST an URL-encoded form.
    pub async fn post_form<K, V>(self, pairs: &[(K, V)]) -> Result<Response>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let body = Body::Form(codec::encode_form(pairs)?);
        self.send(Method::POST, body, ReadMode::Text).await
    }

    /// POST an URL-encoded form and decode the response.
    pub async fn post_form_as<T, K, V>(self, pairs: &[(K, V)]) -> Result<Response<T>>
    where
        T: DeserializeOwned,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let body = Body::Form(codec::encode_form(pairs)?);
        self.send(Method::POST, body, ReadMode::Typed).await
    }

    /// Upload a file.
    ///
    /// Without a file name the local timestamp (`yyyyMMdd-HHmmss`) is used.
    pub async fn upload(self, bytes: impl Into<Bytes>, file_name: Option<&str>) -> Result<Response> {
        let body = upload_body(bytes.into(), file_name, None)?;
        self.send(Method::POST, body, ReadMode::Text).await
    }

    /// Upload a file and decode the response.
    pub async fn upload_as<T: DeserializeOwned>(
        self,
        bytes: impl Into<Bytes>,
        file_name: Option<&str>,
    ) -> Result<Response<T>> {
        let body = upload_body(bytes.into(), file_name, None)?;
        self.send(Method::POST, body, ReadMode::Typed).await
    }

    /// Upload a file with JSON metadata and decode the response.
    pub async fn upload_with_metadata_as<T, M>(
        self,
        bytes: impl Into<Bytes>,
        file_name: Option<&str>,
        metadata: &M,
    ) -> Result<Response<T>>
    where
        T: DeserializeOwned,
        M: Serialize + ?Sized,
    {
        let metadata = codec::encode_json(metadata)?;
        let body = upload_body(bytes.into(), file_name, Some(metadata))?;
        self.send(Method::POST, body, ReadMode::Typed).await
    }

    /// Download the target as raw bytes.
    pub async fn download(self) -> Result<Response> {
        self.send(Method::GET, Body::Empty, ReadMode::Bytes).await
    }

    async fn send<T: DeserializeOwned>(
        self,
        method: Method,
        body: Body,
        read: ReadMode,
    ) -> Result<Response<T>> {
        let settings = self.effective_settings();
        let request = wire::build(method, &settings, body)?;
        Ok(self
            .client
            .dispatch(settings, request, read, self.cancellation)
            .await)
    }
}

fn xml_body(xml: String) -> Result<Body> {
    require(&xml, "xml")?;
    Ok(Body::Xml(xml))
}

fn upload_body(bytes: Bytes, file_name: Option<&str>, metadata: Option<String>) -> Result<Body> {
    if bytes.is_empty() {
        return Err(ClientError::InvalidConfiguration(BYTES_ERROR_MESSAGE));
    }
    let file_name = match file_name.filter(|name| !name.trim().is_empty()) {
        Some(name) => name.to_string(),
        None => chrono::Local::now().format("%Y%m%d-%H%M%S").to_string(),
    };
    Ok(Body::Upload(Upload {
        bytes,
        file_name,
        metadata,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ClientConfig, wire::AUTHORIZATION_HEADER};
    use base64::Engine;

    fn client() -> Client {
        Client::new(ClientConfig::default()).unwrap()
    }

    fn param(err: ClientError) -> &'static str {
        match err {
            ClientError::InvalidArgument { param } => param,
            other => panic!("expected invalid argument, got {other:?}"),
        }
    }

    #[test]
    fn test_uri_must_not_be_blank() {
        let client = client();
        assert_eq!(param(client.with_uri("").unwrap_err()), "uri");
        assert_eq!(param(client.with_uri("   ").unwrap_err()), "uri");
        assert!(client.with_uri("a/b").is_ok());
    }

    #[test]
    fn test_basic_auth_checks_username_first() {
        let client = client();
        assert_eq!(param(client.with_basic_auth("", "").unwrap_err()), "username");
        assert_eq!(param(client.with_basic_auth("user", "").unwrap_err()), "password");
    }

    #[test]
    fn test_bearer_token_must_not_be_empty() {
        let client = client();
        assert_eq!(param(client.with_bearer_token("").unwrap_err()), "bearer_token");
    }

    #[test]
    fn test_timeout_must_be_positive() {
        let client = client();
        assert_eq!(param(client.with_timeout(Duration::ZERO).unwrap_err()), "timeout");
        assert!(client.with_timeout(Duration::from_nanos(1)).is_ok());
        assert!(client.with_timeout(Duration::from_secs(3600)).is_ok());
    }

    #[test]
    fn test_cookie_checks_name_first() {
        let client = client();
        assert_eq!(param(client.with_cookie("", "").unwrap_err()), "name");
        assert_eq!(param(client.with_cookie("name", "").unwrap_err()), "value");
    }

    #[test]
    fn test_cookies_absent_and_empty_are_distinct() {
        let client = client();
        assert_eq!(
            param(client.with_cookies(None::<Vec<Cookie>>).unwrap_err()),
            "cookies"
        );
        let err = client.with_cookies(Vec::<Cookie>::new()).unwrap_err();
        assert!(matches!(
            err,
            ClientError::InvalidConfiguration(COOKIES_ERROR_MESSAGE)
        ));
    }

    #[test]
    fn test_headers_absent_and_empty_are_distinct() {
        let client = client();
        assert_eq!(
            param(client.with_headers(None::<BTreeMap<String, String>>).unwrap_err()),
            "headers"
        );
        let err = client.with_headers(BTreeMap::<String, String>::new()).unwrap_err();
        assert!(matches!(
            err,
            ClientError::InvalidConfiguration(HEADERS_ERROR_MESSAGE)
        ));
    }

    #[test]
    fn test_header_key_must_not_be_empty() {
        let client = client();
        assert_eq!(param(client.with_header("", 1).unwrap_err()), "key");
    }

    #[test]
    fn test_repeated_header_key_keeps_last_value() {
        let client = client();
        let builder = client
            .with_header("X-Mode", "a")
            .unwrap()
            .with_header("X-Mode", "b")
            .unwrap();

        let headers = builder.settings().unwrap().headers.as_ref().unwrap();
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("X-Mode").map(String::as_str), Some("b"));
    }

    #[test]
    fn test_builder_debug_shows_pending_state() {
        let client = client();
        let builder = client
            .with_uri("a/b")
            .unwrap()
            .with_cancellation(CancellationToken::new());

        let debug = format!("{builder:?}");
        assert!(debug.contains("RequestBuilder"));
        assert!(debug.contains("a/b"));
        assert!(debug.contains("cancellable: true"));
    }

    #[test]
    fn test_setters_accumulate_on_one_pending_settings() {
        let client = client();
        let builder = client
            .with_uri("a")
            .unwrap()
            .with_header("X-Count", 3)
            .unwrap()
            .with_cookie("a", "1")
            .unwrap()
            .with_cookie("b", "2")
            .unwrap()
            .with_timeout(Duration::from_secs(2))
            .unwrap()
            .before_call(|| {});

        let pending = builder.settings().unwrap();
        assert_eq!(pending.uri.as_deref(), Some("a"));
        assert_eq!(
            pending.headers.as_ref().unwrap().get("X-Count").map(String::as_str),
            Some("3")
        );
        assert_eq!(pending.cookies.as_ref().map(Vec::len), Some(2));
        assert_eq!(pending.timeout, Duration::from_secs(2));
        assert!(pending.before_call.is_some());
    }

    #[test]
    fn test_builder_starts_without_pending_settings() {
        let client = client();
        assert!(client.request().settings().is_none());
    }

    #[test]
    fn test_basic_auth_round_trips_into_header() {
        let client = client();
        for (username, password) in [("alice", "secret"), ("ü", "p:ss"), ("a b", "c")] {
            let builder = client
                .with_uri("https://example.test/")
                .unwrap()
                .with_basic_auth(username, password)
                .unwrap();
            let request =
                wire::build(Method::GET, &builder.effective_settings(), Body::Empty).unwrap();
            let expected = format!(
                "Basic {}",
                base64::engine::general_purpose::STANDARD.encode(format!("{username}:{password}"))
            );
            assert_eq!(request.header(AUTHORIZATION_HEADER), Some(expected.as_str()));
        }
    }

    #[test]
    fn test_bearer_token_into_header() {
        let client = client();
        let builder = client
            .with_uri("https://example.test/")
            .unwrap()
            .with_bearer_token("t0ken")
            .unwrap();
        let request = wire::build(Method::GET, &builder.effective_settings(), Body::Empty).unwrap();
        assert_eq!(request.header(AUTHORIZATION_HEADER), Some("Bearer t0ken"));
    }

    #[test]
    fn test_configure_replaces_pending_settings() {
        let client = client();
        let builder = client
            .with_uri("old")
            .unwrap()
            .configure(|s| s.timeout = Duration::from_secs(9));

        let pending = builder.settings().unwrap();
        assert!(pending.uri.is_none());
        assert_eq!(pending.timeout, Duration::from_secs(9));
        assert_eq!(pending.headers, Some(BTreeMap::new()));
    }

    #[test]
    fn test_effective_settings_merge_defaults() {
        let client = client();
        client
            .set_default(|s| {
                s.base_address = Some("https://example.test".into());
                s.auth = Some(Auth::bearer("default"));
            })
            .unwrap();

        let effective = client.with_uri("a/b").unwrap().effective_settings();
        assert_eq!(effective.base_address.as_deref(), Some("https://example.test/"));
        assert_eq!(effective.uri.as_deref(), Some("a/b"));
        assert_eq!(effective.auth, Some(Auth::bearer("default")));
    }

    #[tokio::test]
    async fn test_missing_uri_is_returned() {
        let client = client();
        let err = client.request().get().await.unwrap_err();
        assert!(matches!(err, ClientError::MissingUri));
    }

    #[tokio::test]
    async fn test_blank_xml_is_rejected() {
        let client = client();
        let err = client.with_uri("a").unwrap().post_xml(" ").await.unwrap_err();
        assert_eq!(param(err), "xml");
    }

    #[tokio::test]
    async fn test_empty_upload_is_rejected() {
        let client = client();
        let err = client
            .with_uri("a")
            .unwrap()
            .upload(Vec::<u8>::new(), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::InvalidConfiguration(BYTES_ERROR_MESSAGE)
        ));
    }

    #[test]
    fn test_upload_default_file_name() {
        let Body::Upload(upload) = upload_body(Bytes::from_static(b"x"), None, None).unwrap() else {
            panic!("expected upload body");
        };
        assert_eq!(upload.file_name.len(), "yyyyMMdd-HHmmss".len());
        assert_eq!(upload.file_name.as_bytes()[8], b'-');

        let Body::Upload(upload) =
            upload_body(Bytes::from_static(b"x"), Some("report.pdf"), None).unwrap()
        else {
            panic!("expected upload body");
        };
        assert_eq!(upload.file_name, "report.pdf");
    }
}
