//! Error types for the HTTP facade.
//!
//! # Design
//! Configuration and argument errors are raised where they are detected.
//! Transport failures are carried unchanged inside `RequestFailed` so callers
//! can downcast to the transport's own error type. Body-parse failures are
//! not errors at all for the array/collection shapes; they degrade to an
//! empty map inside the caster.

use std::io;

use serde_json::Value;

use crate::http::HttpResponse;

/// Boxed cause attached to transport failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors returned by the client, the caster and the response helpers.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A config value has the wrong type or an unknown value.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// A caller-supplied argument cannot be used (e.g. a read-only directory).
    #[error("{0}")]
    InvalidArgument(String),

    /// The transport could not complete the round-trip.
    #[error("request failed: {0}")]
    RequestFailed(#[source] BoxError),

    /// A value handed to the caster is neither a response, a container nor a scalar.
    #[error("Unsupported response type \"{0}\"")]
    UnsupportedResponseType(String),

    /// The server answered with a non-2xx status.
    #[error("HTTP {status}")]
    Http {
        status: u16,
        response: Box<HttpResponse>,
        formatted: Option<Value>,
    },

    /// The request payload could not be serialized.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The response body could not be decoded into the requested type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The endpoint or base URI could not be parsed.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Wrap any transport error as `RequestFailed`.
    pub fn request_failed<E>(cause: E) -> Self
    where
        E: Into<BoxError>,
    {
        Error::RequestFailed(cause.into())
    }

    /// The response attached to an `Http` error, if any.
    pub fn response(&self) -> Option<&HttpResponse> {
        match self {
            Error::Http { response, .. } => Some(response),
            _ => None,
        }
    }
}
