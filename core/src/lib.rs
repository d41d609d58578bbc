//! Fluent HTTP convenience layer over a pluggable transport.
//!
//! # Overview
//! Builds `HttpRequest` values from a method, an endpoint and options,
//! hands them to a `Transport` (host-does-IO), and casts the `HttpResponse`
//! into the shape the caller configured: raw, array (map), object (JSON
//! value) or a dotted-path `Collection`.
//!
//! # Design
//! - `Client` owns its `Config`, default options and resolved middleware
//!   stack; all three are fixed at build time.
//! - Blocking and async dispatch are separate entry points
//!   (`request` / `request_async`), both routed through `build_request`.
//! - Body decoding is lenient: unparseable bodies cast to empty maps.
//! - `UreqTransport` is the default transport; tests substitute their own.

pub mod cast;
pub mod client;
pub mod collection;
pub mod config;
pub mod error;
pub mod http;
pub mod log;
pub mod middleware;
pub mod multipart;
mod response;
pub mod stream;
pub mod transport;
mod xml;

pub use cast::{cast_response_to_type, detect_and_cast_response_to_type, CastResponse, Castable, ResponseType};
pub use client::{Body, Client, ClientBuilder, RequestOptions};
pub use collection::Collection;
pub use config::Config;
pub use error::{Error, Result};
pub use http::{HttpMethod, HttpRequest, HttpResponse, IpResolve, TransportSettings};
pub use log::{LogMiddleware, MessageFormatter};
pub use middleware::{HandlerStack, Middleware};
pub use multipart::{Contents, FileInput, MultipartField};
pub use stream::StreamResponse;
pub use transport::{PendingResponse, Transport, UreqTransport};
