//! Casting responses into the shape the caller asked for.
//!
//! # Design
//! `raw` returns the envelope untouched. `array` and `collection` decode XML
//! or JSON leniently. `object` decodes JSON only: an XML body requested as
//! `object` is not routed through the XML decoder and comes back as
//! `Value::Null`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::collection::Collection;
use crate::error::{Error, Result};
use crate::http::HttpResponse;

/// Requested output representation for a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    Raw,
    #[default]
    Array,
    Object,
    Collection,
}

impl ResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseType::Raw => "raw",
            ResponseType::Array => "array",
            ResponseType::Object => "object",
            ResponseType::Collection => "collection",
        }
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResponseType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "raw" => Ok(ResponseType::Raw),
            "array" => Ok(ResponseType::Array),
            "object" => Ok(ResponseType::Object),
            "collection" => Ok(ResponseType::Collection),
            other => Err(Error::InvalidConfig(format!("unsupported response_type: {other}"))),
        }
    }
}

/// A response after casting.
#[derive(Debug, Clone, PartialEq)]
pub enum CastResponse {
    Raw(HttpResponse),
    Array(Map<String, Value>),
    Object(Value),
    Collection(Collection),
}

impl CastResponse {
    pub fn response_type(&self) -> ResponseType {
        match self {
            CastResponse::Raw(_) => ResponseType::Raw,
            CastResponse::Array(_) => ResponseType::Array,
            CastResponse::Object(_) => ResponseType::Object,
            CastResponse::Collection(_) => ResponseType::Collection,
        }
    }

    pub fn into_raw(self) -> Option<HttpResponse> {
        match self {
            CastResponse::Raw(response) => Some(response),
            _ => None,
        }
    }

    pub fn into_array(self) -> Option<Map<String, Value>> {
        match self {
            CastResponse::Array(map) => Some(map),
            _ => None,
        }
    }

    pub fn into_object(self) -> Option<Value> {
        match self {
            CastResponse::Object(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_collection(self) -> Option<Collection> {
        match self {
            CastResponse::Collection(collection) => Some(collection),
            _ => None,
        }
    }
}

/// Anything `detect_and_cast_response_to_type` accepts.
#[derive(Debug, Clone)]
pub enum Castable {
    Response(HttpResponse),
    Collection(Collection),
    Value(Value),
}

impl From<HttpResponse> for Castable {
    fn from(response: HttpResponse) -> Self {
        Castable::Response(response)
    }
}

impl From<Collection> for Castable {
    fn from(collection: Collection) -> Self {
        Castable::Collection(collection)
    }
}

impl From<Value> for Castable {
    fn from(value: Value) -> Self {
        Castable::Value(value)
    }
}

impl From<Map<String, Value>> for Castable {
    fn from(map: Map<String, Value>) -> Self {
        Castable::Value(Value::Object(map))
    }
}

/// Cast `response` into `response_type`. Body-parse failures never error.
pub fn cast_response_to_type(response: HttpResponse, response_type: ResponseType) -> CastResponse {
    match response_type {
        ResponseType::Raw => CastResponse::Raw(response),
        ResponseType::Array => CastResponse::Array(response.to_array()),
        ResponseType::Object => CastResponse::Object(response.to_object()),
        ResponseType::Collection => CastResponse::Collection(response.to_collection()),
    }
}

/// Wrap an arbitrary value in a synthetic 200 response and cast it.
///
/// Containers are JSON-encoded, scalars become the body verbatim (`true`
/// as `1`, `false` as an empty body); `null` is rejected.
pub fn detect_and_cast_response_to_type(
    input: impl Into<Castable>,
    response_type: ResponseType,
) -> Result<CastResponse> {
    let response = match input.into() {
        Castable::Response(response) => response,
        Castable::Collection(collection) => synthetic(collection.to_json().into_bytes()),
        Castable::Value(Value::Null) => {
            return Err(Error::UnsupportedResponseType("null".to_string()));
        }
        Castable::Value(Value::String(text)) => synthetic(text.into_bytes()),
        Castable::Value(Value::Bool(flag)) => synthetic(if flag { b"1".to_vec() } else { Vec::new() }),
        Castable::Value(value) => synthetic(value.to_string().into_bytes()),
    };
    Ok(cast_response_to_type(response, response_type))
}

fn synthetic(body: Vec<u8>) -> HttpResponse {
    HttpResponse::new(200, Vec::new(), body)
}
