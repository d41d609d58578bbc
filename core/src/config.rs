//! Client configuration.
//!
//! # Design
//! `Config` is an options bag on top of `Collection`, so nested options such
//! as `http.log_template` are addressed with dotted keys. Typed accessors
//! cover the keys the facade understands; everything else is passed through
//! untouched.

use serde_json::{json, Map, Value};

use crate::cast::ResponseType;
use crate::collection::Collection;
use crate::error::{Error, Result};

/// Default request timeout, in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 3000;

/// Default connect timeout, in milliseconds.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 3000;

/// Options used by `Client` when building requests.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    options: Collection,
    auto_trim_endpoint_slash: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        let mut options = Collection::new();
        options.set("base_uri", Value::Null);
        options.set("timeout", DEFAULT_TIMEOUT_MS);
        options.set("connect_timeout", DEFAULT_CONNECT_TIMEOUT_MS);
        options.set("proxy", json!({}));
        Self {
            options,
            auto_trim_endpoint_slash: true,
        }
    }

    /// Defaults overridden by `options`.
    pub fn with_options(options: Map<String, Value>) -> Self {
        let mut config = Self::new();
        config.merge_options(options);
        config
    }

    /// Build from an untyped value. `null` yields the defaults; anything
    /// other than an object is rejected.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(options) => Ok(Self::with_options(options)),
            Value::Null => Ok(Self::new()),
            other => Err(Error::InvalidConfig(format!(
                "expected an object of options, got {}",
                value_kind(&other)
            ))),
        }
    }

    /// Configured base URI, or an empty string when unset.
    pub fn base_uri(&self) -> &str {
        self.options.get("base_uri").and_then(Value::as_str).unwrap_or("")
    }

    pub fn set_base_uri(&mut self, base_uri: impl Into<String>) -> &mut Self {
        self.options.set("base_uri", base_uri.into());
        self
    }

    /// Request timeout in milliseconds.
    pub fn timeout(&self) -> u64 {
        self.options
            .get("timeout")
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_TIMEOUT_MS)
    }

    pub fn set_timeout(&mut self, timeout_ms: u64) -> &mut Self {
        self.options.set("timeout", timeout_ms);
        self
    }

    /// Connect timeout in milliseconds.
    pub fn connect_timeout(&self) -> u64 {
        self.options
            .get("connect_timeout")
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_CONNECT_TIMEOUT_MS)
    }

    pub fn set_connect_timeout(&mut self, connect_timeout_ms: u64) -> &mut Self {
        self.options.set("connect_timeout", connect_timeout_ms);
        self
    }

    /// Proxy settings keyed by scheme (`http`, `https`).
    pub fn proxy(&self) -> Map<String, Value> {
        self.options
            .get("proxy")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default()
    }

    pub fn set_proxy(&mut self, proxy: Map<String, Value>) -> &mut Self {
        self.options.set("proxy", Value::Object(proxy));
        self
    }

    /// Shape responses are cast to. Missing means `array`.
    pub fn response_type(&self) -> Result<ResponseType> {
        match self.options.get("response_type") {
            None | Some(Value::Null) => Ok(ResponseType::default()),
            Some(Value::String(s)) => s.parse(),
            Some(other) => Err(Error::InvalidConfig(format!(
                "response_type must be a string, got {}",
                value_kind(other)
            ))),
        }
    }

    pub fn set_response_type(&mut self, response_type: ResponseType) -> &mut Self {
        self.options.set("response_type", response_type.as_str());
        self
    }

    /// Template for the request log middleware.
    pub fn log_template(&self) -> Option<&str> {
        self.options.get("http.log_template").and_then(Value::as_str)
    }

    pub fn option(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }

    pub fn option_or(&self, key: &str, default: Value) -> Value {
        self.options.get_or(key, default)
    }

    pub fn set_option(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        self.options.set(key, value);
        self
    }

    pub fn merge_options(&mut self, options: Map<String, Value>) -> &mut Self {
        self.options.merge(options);
        self
    }

    /// Replace every option, defaults included.
    pub fn set_options(&mut self, options: Map<String, Value>) -> &mut Self {
        self.options = Collection::from_map(options);
        self
    }

    pub fn options(&self) -> &Collection {
        &self.options
    }

    pub fn to_map(&self) -> Map<String, Value> {
        self.options.to_map()
    }

    pub fn need_auto_trim_endpoint_slash(&self) -> bool {
        self.auto_trim_endpoint_slash
    }

    pub fn disable_auto_trim_endpoint_slash(&mut self) -> &mut Self {
        self.auto_trim_endpoint_slash = false;
        self
    }
}

pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
