//! Body decoding helpers on `HttpResponse`.
//!
//! # Design
//! Decoding is lenient for map-shaped results: a body that is neither XML
//! nor valid JSON decodes to an empty map instead of an error. Callers that
//! want a strict decode use `json::<T>()`.

use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::trace;

use crate::collection::Collection;
use crate::error::{Error, Result};
use crate::http::HttpResponse;
use crate::xml;

impl HttpResponse {
    /// True when the content type mentions XML or the body opens with `<xml`.
    pub fn is_xml(&self) -> bool {
        if self.header_line("content-type").to_ascii_lowercase().contains("xml") {
            return true;
        }
        self.body.len() >= 4 && self.body[..4].eq_ignore_ascii_case(b"<xml")
    }

    /// Body decoded into a map, from XML or JSON. Never fails.
    pub fn to_array(&self) -> Map<String, Value> {
        if self.is_xml() {
            return xml::parse(&self.text());
        }
        match serde_json::from_slice::<Value>(&self.body) {
            Ok(value) => into_map(value),
            Err(e) => {
                trace!(error = %e, "body is not json, using an empty map");
                Map::new()
            }
        }
    }

    pub fn to_collection(&self) -> Collection {
        Collection::from_map(self.to_array())
    }

    /// Body decoded straight from JSON; invalid JSON yields `Value::Null`.
    pub fn to_object(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }

    /// Strict typed decode of a JSON body.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| Error::Deserialization(e.to_string()))
    }

    /// `to_array()` re-encoded as JSON.
    pub fn to_json(&self) -> String {
        Value::Object(self.to_array()).to_string()
    }

    /// Turn a non-2xx response into `Error::Http`, keeping the response and
    /// its decoded body.
    pub fn error_for_status(self) -> Result<HttpResponse> {
        if self.is_success() {
            return Ok(self);
        }
        let formatted = Value::Object(self.to_array());
        Err(Error::Http {
            status: self.status,
            response: Box::new(self),
            formatted: Some(formatted),
        })
    }
}

impl fmt::Display for HttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

/// Coerce any decoded value into a map: lists are keyed by index, scalars
/// sit under `"0"`, and `null` is empty.
fn into_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| (i.to_string(), item))
            .collect(),
        scalar => {
            let mut map = Map::new();
            map.insert("0".to_string(), scalar);
            map
        }
    }
}
