//! Fluent request API.
//!
//! # Design
//! `Client` turns a method, an endpoint and `RequestOptions` into an
//! `HttpRequest` (`build_request`), hands it to the resolved handler stack,
//! and casts the `HttpResponse` into the configured `ResponseType`.
//! `build_request` is the only place that composes URIs, so the blocking,
//! async and raw entry points all agree on the final URL.
//!
//! Defaults and middlewares are fixed when the client is built and are
//! read-only afterwards; a `Client` can be shared across threads.
//!
//! Option precedence, lowest first: client default options, then the
//! transport settings from `Config` (`timeout`, `connect_timeout`, `proxy`),
//! then the options passed to the call.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

use crate::cast::{cast_response_to_type, CastResponse};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, IpResolve, TransportSettings};
use crate::log::LogMiddleware;
use crate::middleware::{HandlerStack, Middleware};
use crate::multipart::{self, FileInput, MultipartField};
use crate::transport::{PendingResponse, Transport, UreqTransport};

/// Request payload.
#[derive(Debug)]
pub enum Body {
    /// `application/x-www-form-urlencoded`, nested values flattened with brackets.
    FormParams(Map<String, Value>),
    Json(Value),
    Multipart(Vec<MultipartField>),
    Raw(Vec<u8>),
}

impl Body {
    /// Multipart bodies holding streams cannot be duplicated.
    fn try_clone(&self) -> Option<Body> {
        match self {
            Body::FormParams(form) => Some(Body::FormParams(form.clone())),
            Body::Json(value) => Some(Body::Json(value.clone())),
            Body::Raw(bytes) => Some(Body::Raw(bytes.clone())),
            Body::Multipart(fields) => fields
                .iter()
                .map(|field| {
                    field.bytes().map(|bytes| MultipartField {
                        name: field.name.clone(),
                        contents: bytes.to_vec().into(),
                        filename: field.filename.clone(),
                    })
                })
                .collect::<Option<Vec<_>>>()
                .map(Body::Multipart),
        }
    }
}

/// Per-call options. Unset fields fall back to the client defaults.
#[derive(Debug, Default)]
pub struct RequestOptions {
    pub base_uri: Option<String>,
    pub query: Map<String, Value>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Body>,
    pub timeout: Option<Duration>,
    pub connect_timeout: Option<Duration>,
    pub proxy: Option<String>,
    pub ip_resolve: Option<IpResolve>,
    /// Keys the facade does not interpret, forwarded to the transport.
    pub extra: Map<String, Value>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults every client starts with: resolve host names to IPv4.
    pub fn client_defaults() -> Self {
        Self {
            ip_resolve: Some(IpResolve::V4),
            ..Self::default()
        }
    }

    pub fn base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.base_uri = Some(base_uri.into());
        self
    }

    pub fn query(mut self, query: Map<String, Value>) -> Self {
        self.query = query;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn form_params(mut self, form: Map<String, Value>) -> Self {
        self.body = Some(Body::FormParams(form));
        self
    }

    pub fn json(mut self, value: Value) -> Self {
        self.body = Some(Body::Json(value));
        self
    }

    pub fn multipart(mut self, fields: Vec<MultipartField>) -> Self {
        self.body = Some(Body::Multipart(fields));
        self
    }

    pub fn body(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.body = Some(Body::Raw(bytes.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    pub fn ip_resolve(mut self, ip_resolve: IpResolve) -> Self {
        self.ip_resolve = Some(ip_resolve);
        self
    }

    pub fn extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Fill everything this call left unset from `defaults`. Values set on
    /// the call win on collision, including same-named headers.
    pub fn merge_defaults(mut self, defaults: &RequestOptions) -> Self {
        self.base_uri = self.base_uri.or_else(|| defaults.base_uri.clone());
        self.timeout = self.timeout.or(defaults.timeout);
        self.connect_timeout = self.connect_timeout.or(defaults.connect_timeout);
        self.proxy = self.proxy.or_else(|| defaults.proxy.clone());
        self.ip_resolve = self.ip_resolve.or(defaults.ip_resolve);
        if self.body.is_none() {
            self.body = defaults.body.as_ref().and_then(Body::try_clone);
        }

        let mut headers: Vec<(String, String)> = defaults
            .headers
            .iter()
            .filter(|(name, _)| !self.headers.iter().any(|(own, _)| own.eq_ignore_ascii_case(name)))
            .cloned()
            .collect();
        headers.append(&mut self.headers);
        self.headers = headers;

        self.query = merge_maps(&defaults.query, self.query);
        self.extra = merge_maps(&defaults.extra, self.extra);
        self
    }
}

fn merge_maps(defaults: &Map<String, Value>, own: Map<String, Value>) -> Map<String, Value> {
    let mut merged = defaults.clone();
    merged.extend(own);
    merged
}

/// Builds a `Client`.
pub struct ClientBuilder {
    config: Config,
    defaults: RequestOptions,
    transport: Option<Arc<dyn Transport>>,
    middlewares: Vec<(Option<String>, Arc<dyn Middleware>)>,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::new(),
            defaults: RequestOptions::client_defaults(),
            transport: None,
            middlewares: Vec::new(),
        }
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Replace the default options applied under every call.
    pub fn default_options(mut self, defaults: RequestOptions) -> Self {
        self.defaults = defaults;
        self
    }

    /// Use `transport` instead of `UreqTransport`.
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        let transport: Arc<dyn Transport> = Arc::new(transport);
        self.transport = Some(transport);
        self
    }

    /// Add a named middleware. The first one added sees requests first.
    pub fn middleware(mut self, name: &str, middleware: impl Middleware + 'static) -> Self {
        let middleware: Arc<dyn Middleware> = Arc::new(middleware);
        self.middlewares.push((Some(name.to_string()), middleware));
        self
    }

    pub fn push_middleware(mut self, middleware: impl Middleware + 'static) -> Self {
        let middleware: Arc<dyn Middleware> = Arc::new(middleware);
        self.middlewares.push((None, middleware));
        self
    }

    /// Resolve the handler stack. A client configured without middlewares
    /// gets the request log middleware under the name `log`.
    pub fn build(self) -> Client {
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(UreqTransport::new()),
        };
        let mut stack = HandlerStack::new(transport);
        if self.middlewares.is_empty() {
            stack.push(Arc::new(LogMiddleware::from_config(&self.config)), Some("log"));
        }
        for (name, middleware) in self.middlewares {
            stack.push(middleware, name.as_deref());
        }
        Client {
            middleware_names: stack.names(),
            handler: stack.resolve(),
            config: self.config,
            defaults: self.defaults,
        }
    }
}

/// Fluent HTTP client over a pluggable transport.
pub struct Client {
    config: Config,
    defaults: RequestOptions,
    handler: Arc<dyn Transport>,
    middleware_names: Vec<Option<String>>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .field("defaults", &self.defaults)
            .field("middlewares", &self.middleware_names)
            .finish_non_exhaustive()
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new(Config::new())
    }
}

impl Client {
    /// Client with the default transport and middlewares.
    pub fn new(config: Config) -> Self {
        ClientBuilder::new().config(config).build()
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn default_options(&self) -> &RequestOptions {
        &self.defaults
    }

    pub fn middleware_names(&self) -> &[Option<String>] {
        &self.middleware_names
    }

    pub fn get(&self, url: &str, query: Map<String, Value>) -> Result<CastResponse> {
        self.request(url, HttpMethod::Get, RequestOptions::new().query(query))
    }

    pub fn post(&self, url: &str, form: Map<String, Value>) -> Result<CastResponse> {
        self.request(url, HttpMethod::Post, RequestOptions::new().form_params(form))
    }

    pub fn put(&self, url: &str, form: Map<String, Value>) -> Result<CastResponse> {
        self.request(url, HttpMethod::Put, RequestOptions::new().form_params(form))
    }

    pub fn patch(&self, url: &str, form: Map<String, Value>) -> Result<CastResponse> {
        self.request(url, HttpMethod::Patch, RequestOptions::new().form_params(form))
    }

    pub fn delete(&self, url: &str, query: Map<String, Value>) -> Result<CastResponse> {
        self.request(url, HttpMethod::Delete, RequestOptions::new().query(query))
    }

    pub fn head(&self, url: &str, query: Map<String, Value>) -> Result<CastResponse> {
        self.request(url, HttpMethod::Head, RequestOptions::new().query(query))
    }

    pub fn options(&self, url: &str, query: Map<String, Value>) -> Result<CastResponse> {
        self.request(url, HttpMethod::Options, RequestOptions::new().query(query))
    }

    pub fn post_json(&self, url: &str, data: Value, query: Map<String, Value>) -> Result<CastResponse> {
        self.request(url, HttpMethod::Post, RequestOptions::new().query(query).json(data))
    }

    /// Multipart POST. Each file becomes one part named after its key; form
    /// values are flattened with bracket names.
    pub fn upload(
        &self,
        url: &str,
        files: Vec<(String, FileInput)>,
        form: Map<String, Value>,
        query: Map<String, Value>,
    ) -> Result<CastResponse> {
        let mut fields = Vec::with_capacity(files.len() + form.len());
        for (name, input) in files {
            fields.push(MultipartField::from_file(name, input)?);
        }
        for (name, contents) in &form {
            fields.extend(multipart::normalize(name, contents));
        }
        self.request(url, HttpMethod::Post, RequestOptions::new().query(query).multipart(fields))
    }

    /// Send a request and cast the response to the configured shape.
    pub fn request(&self, uri: &str, method: HttpMethod, options: RequestOptions) -> Result<CastResponse> {
        let response_type = self.config.response_type()?;
        let response = self.request_raw(uri, method, options)?;
        Ok(cast_response_to_type(response, response_type))
    }

    /// Send a request and return the response untouched.
    pub fn request_raw(&self, uri: &str, method: HttpMethod, options: RequestOptions) -> Result<HttpResponse> {
        let request = self.build_request(uri, method, options)?;
        self.handler.execute(request)
    }

    /// Like `request`, but returns a pending result. Configuration and
    /// argument errors are reported before anything is sent; the cast runs
    /// when the response arrives.
    pub fn request_async(
        &self,
        uri: &str,
        method: HttpMethod,
        options: RequestOptions,
    ) -> Result<BoxFuture<'static, Result<CastResponse>>> {
        let response_type = self.config.response_type()?;
        let pending = self.request_raw_async(uri, method, options)?;
        Ok(pending
            .map(move |result| result.map(|response| cast_response_to_type(response, response_type)))
            .boxed())
    }

    pub fn request_raw_async(
        &self,
        uri: &str,
        method: HttpMethod,
        options: RequestOptions,
    ) -> Result<PendingResponse> {
        let request = self.build_request(uri, method, options)?;
        Ok(self.handler.execute_async(request))
    }

    /// Compose the final request: base URI, defaults, transport settings,
    /// query string and encoded body.
    pub fn build_request(&self, uri: &str, method: HttpMethod, options: RequestOptions) -> Result<HttpRequest> {
        let mut options = options;
        if options.base_uri.is_none() && !self.config.base_uri().is_empty() {
            options.base_uri = Some(self.config.base_uri().to_string());
        }
        let has_base = options.base_uri.as_deref().is_some_and(|base| !base.is_empty());
        let uri = if has_base && self.config.need_auto_trim_endpoint_slash() {
            uri.trim_start_matches('/')
        } else {
            uri
        };

        let mut options = options.merge_defaults(&self.defaults);
        let mut url = resolve_url(options.base_uri.as_deref(), uri)?;
        let query = multipart::flatten_pairs(&options.query);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        let settings = TransportSettings {
            timeout: options
                .timeout
                .or(Some(Duration::from_millis(self.config.timeout()))),
            connect_timeout: options
                .connect_timeout
                .or(Some(Duration::from_millis(self.config.connect_timeout()))),
            proxy: options
                .proxy
                .take()
                .or_else(|| self.config_proxy(url.scheme())),
            ip_resolve: options.ip_resolve.unwrap_or_default(),
        };

        let mut headers = options.headers;
        let body = match options.body {
            None => None,
            Some(Body::Raw(bytes)) => Some(bytes),
            Some(Body::FormParams(form)) => {
                set_default_header(&mut headers, "content-type", "application/x-www-form-urlencoded");
                let encoded = url::form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(multipart::flatten_pairs(&form))
                    .finish();
                Some(encoded.into_bytes())
            }
            Some(Body::Json(value)) => {
                set_default_header(&mut headers, "content-type", "application/json");
                Some(serde_json::to_vec(&value).map_err(|e| Error::Serialization(e.to_string()))?)
            }
            Some(Body::Multipart(fields)) => {
                let (content_type, bytes) = multipart::encode(fields)?;
                set_default_header(&mut headers, "content-type", &content_type);
                Some(bytes)
            }
        };

        debug!(%method, url = %url, "request built");
        Ok(HttpRequest {
            method,
            url: url.into(),
            headers,
            body,
            settings,
            extensions: options.extra,
        })
    }

    /// Proxy from config: a plain string, or a map keyed by URL scheme.
    fn config_proxy(&self, scheme: &str) -> Option<String> {
        match self.config.option("proxy")? {
            Value::String(proxy) if !proxy.is_empty() => Some(proxy.clone()),
            Value::Object(by_scheme) => by_scheme.get(scheme).and_then(Value::as_str).map(str::to_string),
            _ => None,
        }
    }
}

/// Absolute URIs are used as-is; relative ones are resolved against the
/// base per RFC 3986.
fn resolve_url(base: Option<&str>, uri: &str) -> Result<Url> {
    match Url::parse(uri) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let base = base
                .filter(|base| !base.is_empty())
                .ok_or_else(|| Error::InvalidUrl(format!("relative uri '{uri}' without a base_uri")))?;
            let base = Url::parse(base).map_err(|e| Error::InvalidUrl(format!("{base}: {e}")))?;
            base.join(uri).map_err(|e| Error::InvalidUrl(format!("{uri}: {e}")))
        }
        Err(e) => Err(Error::InvalidUrl(format!("{uri}: {e}"))),
    }
}

fn set_default_header(headers: &mut Vec<(String, String)>, name: &str, value: &str) {
    if !headers.iter().any(|(k, _)| k.eq_ignore_ascii_case(name)) {
        headers.push((name.to_string(), value.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cast::ResponseType;
    use serde_json::json;
    use std::io::Cursor;
    use std::sync::Mutex;

    /// Records every request and answers with a canned response.
    #[derive(Clone)]
    struct Recorder {
        seen: Arc<Mutex<Vec<HttpRequest>>>,
        response: HttpResponse,
    }

    impl Recorder {
        fn new(body: &str) -> Self {
            Self {
                seen: Arc::new(Mutex::new(Vec::new())),
                response: HttpResponse::new(
                    200,
                    vec![("content-type".to_string(), "application/json".to_string())],
                    body.as_bytes().to_vec(),
                ),
            }
        }

        fn last(&self) -> HttpRequest {
            self.seen.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl Transport for Recorder {
        fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
            self.seen.lock().unwrap().push(request);
            Ok(self.response.clone())
        }

        fn execute_async(&self, request: HttpRequest) -> PendingResponse {
            let result = self.execute(request);
            async move { result }.boxed()
        }
    }

    struct Refuse;

    impl Transport for Refuse {
        fn execute(&self, _request: HttpRequest) -> Result<HttpResponse> {
            Err(Error::request_failed(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "refused",
            )))
        }

        fn execute_async(&self, request: HttpRequest) -> PendingResponse {
            let result = self.execute(request);
            async move { result }.boxed()
        }
    }

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    fn client_with(config: Config, recorder: &Recorder) -> Client {
        Client::builder().config(config).transport(recorder.clone()).build()
    }

    fn based(base: &str) -> Config {
        let mut config = Config::new();
        config.set_base_uri(base);
        config
    }

    #[test]
    fn base_uri_and_leading_slash_trim() {
        let recorder = Recorder::new("{}");
        let client = client_with(based("http://localhost:3000/api/"), &recorder);
        client.get("/users", Map::new()).unwrap();
        assert_eq!(recorder.last().url, "http://localhost:3000/api/users");
    }

    #[test]
    fn without_trim_the_slash_resets_the_path() {
        let recorder = Recorder::new("{}");
        let mut config = based("http://localhost:3000/api/");
        config.disable_auto_trim_endpoint_slash();
        let client = client_with(config, &recorder);
        client.get("/users", Map::new()).unwrap();
        assert_eq!(recorder.last().url, "http://localhost:3000/users");
    }

    #[test]
    fn call_base_uri_wins_over_config() {
        let recorder = Recorder::new("{}");
        let client = client_with(based("http://config.test/"), &recorder);
        let options = RequestOptions::new().base_uri("http://call.test/v2/");
        client.request_raw("items", HttpMethod::Get, options).unwrap();
        assert_eq!(recorder.last().url, "http://call.test/v2/items");
    }

    #[test]
    fn absolute_uri_ignores_base() {
        let recorder = Recorder::new("{}");
        let client = client_with(based("http://config.test/"), &recorder);
        client.get("https://other.test/x", Map::new()).unwrap();
        assert_eq!(recorder.last().url, "https://other.test/x");
    }

    #[test]
    fn relative_uri_without_base_is_invalid() {
        let recorder = Recorder::new("{}");
        let client = client_with(Config::new(), &recorder);
        let err = client.get("users", Map::new()).unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)));
        assert!(recorder.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn query_is_flattened_and_appended() {
        let recorder = Recorder::new("{}");
        let client = client_with(based("http://q.test/"), &recorder);
        client
            .get("search?lang=en", map(json!({"q": "rust lang", "filter": {"year": 2024}})))
            .unwrap();
        assert_eq!(
            recorder.last().url,
            "http://q.test/search?lang=en&q=rust+lang&filter%5Byear%5D=2024"
        );
    }

    #[test]
    fn form_params_are_urlencoded() {
        let recorder = Recorder::new("{}");
        let client = client_with(based("http://f.test/"), &recorder);
        client
            .post("form", map(json!({"name": "a b", "tags": ["x", "y"]})))
            .unwrap();
        let request = recorder.last();
        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(request.header("content-type"), Some("application/x-www-form-urlencoded"));
        assert_eq!(
            request.body.unwrap(),
            b"name=a+b&tags%5B0%5D=x&tags%5B1%5D=y".to_vec()
        );
    }

    #[test]
    fn verb_helpers_use_their_methods() {
        let recorder = Recorder::new("{}");
        let client = client_with(based("http://v.test/"), &recorder);
        client.put("a", Map::new()).unwrap();
        assert_eq!(recorder.last().method, HttpMethod::Put);
        client.patch("a", Map::new()).unwrap();
        assert_eq!(recorder.last().method, HttpMethod::Patch);
        client.delete("a", Map::new()).unwrap();
        assert_eq!(recorder.last().method, HttpMethod::Delete);
        client.head("a", Map::new()).unwrap();
        assert_eq!(recorder.last().method, HttpMethod::Head);
        client.options("a", Map::new()).unwrap();
        assert_eq!(recorder.last().method, HttpMethod::Options);
    }

    #[test]
    fn post_json_body() {
        let recorder = Recorder::new("{}");
        let client = client_with(based("http://j.test/"), &recorder);
        client
            .post_json("items", json!({"title": "Buy milk"}), map(json!({"v": 1})))
            .unwrap();
        let request = recorder.last();
        assert_eq!(request.url, "http://j.test/items?v=1");
        assert_eq!(request.header("content-type"), Some("application/json"));
        let body: Value = serde_json::from_slice(&request.body.unwrap()).unwrap();
        assert_eq!(body, json!({"title": "Buy milk"}));
    }

    #[test]
    fn upload_builds_multipart() {
        let recorder = Recorder::new("{}");
        let client = client_with(based("http://u.test/"), &recorder);
        let files = vec![(
            "media".to_string(),
            FileInput::reader(Cursor::new(b"PIXELS".to_vec()), Some("p.raw")),
        )];
        client
            .upload("upload", files, map(json!({"meta": {"title": "t"}})), Map::new())
            .unwrap();
        let request = recorder.last();
        let content_type = request.header("content-type").unwrap().to_string();
        assert!(content_type.starts_with("multipart/form-data; boundary="));
        let body = String::from_utf8(request.body.unwrap()).unwrap();
        assert!(body.contains("name=\"media\"; filename=\"p.raw\""));
        assert!(body.contains("PIXELS"));
        assert!(body.contains("name=\"meta[title]\"\r\n\r\nt\r\n"));
    }

    #[test]
    fn upload_missing_file_fails_before_sending() {
        let recorder = Recorder::new("{}");
        let client = client_with(based("http://u.test/"), &recorder);
        let files = vec![("f".to_string(), FileInput::from("/no/such/file.bin"))];
        let err = client.upload("upload", files, Map::new(), Map::new()).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert!(recorder.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn settings_layering() {
        let recorder = Recorder::new("{}");
        let mut config = based("http://s.test/");
        config
            .set_timeout(1500)
            .set_proxy(map(json!({"http": "http://proxy.local:8080"})));
        let client = client_with(config, &recorder);

        client.get("a", Map::new()).unwrap();
        let settings = recorder.last().settings;
        assert_eq!(settings.timeout, Some(Duration::from_millis(1500)));
        assert_eq!(settings.connect_timeout, Some(Duration::from_millis(3000)));
        assert_eq!(settings.proxy.as_deref(), Some("http://proxy.local:8080"));
        assert_eq!(settings.ip_resolve, IpResolve::V4);

        let options = RequestOptions::new()
            .timeout(Duration::from_secs(9))
            .ip_resolve(IpResolve::Any);
        client.request_raw("a", HttpMethod::Get, options).unwrap();
        let settings = recorder.last().settings;
        assert_eq!(settings.timeout, Some(Duration::from_secs(9)));
        assert_eq!(settings.ip_resolve, IpResolve::Any);
    }

    #[test]
    fn call_options_win_over_defaults() {
        let recorder = Recorder::new("{}");
        let defaults = RequestOptions::client_defaults()
            .header("User-Agent", "default")
            .header("X-Env", "test")
            .extra("verify", json!(false))
            .query(map(json!({"appid": "1", "lang": "en"})));
        let client = Client::builder()
            .config(based("http://d.test/"))
            .default_options(defaults)
            .transport(recorder.clone())
            .build();

        let options = RequestOptions::new()
            .header("user-agent", "call")
            .query(map(json!({"lang": "zh"})));
        client.request_raw("a", HttpMethod::Get, options).unwrap();
        let request = recorder.last();
        assert_eq!(request.header("user-agent"), Some("call"));
        assert_eq!(request.header("x-env"), Some("test"));
        assert_eq!(request.extensions.get("verify"), Some(&json!(false)));
        assert_eq!(request.url, "http://d.test/a?appid=1&lang=zh");
    }

    #[test]
    fn response_is_cast_to_configured_type() {
        let recorder = Recorder::new(r#"{"user":{"name":"n"}}"#);
        let mut config = based("http://c.test/");
        let client = client_with(config.clone(), &recorder);
        let cast = client.get("me", Map::new()).unwrap();
        assert_eq!(cast.into_array().unwrap()["user"]["name"], "n");

        config.set_response_type(ResponseType::Collection);
        let client = client_with(config.clone(), &recorder);
        let collection = client.get("me", Map::new()).unwrap().into_collection().unwrap();
        assert_eq!(collection.get("user.name"), Some(&json!("n")));

        config.set_response_type(ResponseType::Raw);
        let client = client_with(config, &recorder);
        let raw = client.get("me", Map::new()).unwrap().into_raw().unwrap();
        assert_eq!(raw.status, 200);
    }

    #[test]
    fn invalid_response_type_fails_before_sending() {
        let recorder = Recorder::new("{}");
        let mut config = based("http://c.test/");
        config.set_option("response_type", "yaml");
        let client = client_with(config, &recorder);
        assert!(matches!(client.get("x", Map::new()), Err(Error::InvalidConfig(_))));
        assert!(client.request_async("x", HttpMethod::Get, RequestOptions::new()).is_err());
        assert!(recorder.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn async_request_casts_on_completion() {
        let recorder = Recorder::new(r#"{"a":1}"#);
        let mut config = based("http://a.test/");
        config.set_response_type(ResponseType::Collection);
        let client = client_with(config, &recorder);
        let pending = client
            .request_async("x", HttpMethod::Get, RequestOptions::new())
            .unwrap();
        let collection = futures::executor::block_on(pending).unwrap().into_collection().unwrap();
        assert_eq!(collection.get("a"), Some(&json!(1)));
    }

    #[test]
    fn transport_failure_propagates() {
        let client = Client::builder()
            .config(based("http://down.test/"))
            .transport(Refuse)
            .build();
        let err = client.get("x", Map::new()).unwrap_err();
        match err {
            Error::RequestFailed(cause) => {
                let io = cause.downcast_ref::<std::io::Error>().unwrap();
                assert_eq!(io.kind(), std::io::ErrorKind::ConnectionRefused);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn log_middleware_is_installed_by_default() {
        let recorder = Recorder::new("{}");
        let client = client_with(Config::new(), &recorder);
        assert_eq!(client.middleware_names(), &[Some("log".to_string())]);

        let custom = Client::builder()
            .transport(recorder.clone())
            .middleware("noop", |next: Arc<dyn Transport>| next)
            .build();
        assert_eq!(custom.middleware_names(), &[Some("noop".to_string())]);
    }

    #[test]
    fn multipart_defaults_are_cloned_only_without_streams() {
        let bytes_only = Body::Multipart(vec![MultipartField::new("a", "1")]);
        assert!(bytes_only.try_clone().is_some());
        let with_stream = Body::Multipart(vec![MultipartField::from_file(
            "f",
            FileInput::reader(Cursor::new(Vec::new()), None),
        )
        .unwrap()]);
        assert!(with_stream.try_clone().is_none());
    }
}
