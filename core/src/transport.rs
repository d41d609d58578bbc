//! The I/O boundary.
//!
//! # Design
//! A `Transport` executes one `HttpRequest` and hands back the
//! `HttpResponse`, either blocking or as a pending result. Status codes are
//! data here: a 404 is a successful round-trip. Anything that prevents a
//! response from arriving (DNS, connect, TLS, timeouts) is reported as
//! `Error::RequestFailed` with the transport's own error as the cause.

use std::sync::Arc;

use futures::future::BoxFuture;

use crate::error::{Error, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, IpResolve};

/// A response that has not arrived yet.
pub type PendingResponse = BoxFuture<'static, Result<HttpResponse>>;

/// Executes requests on behalf of the client.
pub trait Transport: Send + Sync {
    /// Block the calling thread until the response arrives.
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;

    /// Start the request and return a handle that resolves to the response.
    fn execute_async(&self, request: HttpRequest) -> PendingResponse;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        (**self).execute(request)
    }

    fn execute_async(&self, request: HttpRequest) -> PendingResponse {
        (**self).execute_async(request)
    }
}

/// Default transport backed by `ureq`.
///
/// An agent is configured per request from `HttpRequest::settings`. Bodies
/// are read in full, with no size cap.
/// `execute_async` runs the blocking call on tokio's blocking pool, so it
/// must be awaited inside a tokio runtime.
#[derive(Debug, Clone, Default)]
pub struct UreqTransport;

impl UreqTransport {
    pub fn new() -> Self {
        Self
    }

    fn agent(&self, request: &HttpRequest) -> Result<ureq::Agent> {
        let settings = &request.settings;
        let proxy = match settings.proxy.as_deref() {
            Some(proxy) => Some(ureq::Proxy::new(proxy).map_err(Error::request_failed)?),
            None => None,
        };
        let ip_family = match settings.ip_resolve {
            IpResolve::Any => ureq::config::IpFamily::Any,
            IpResolve::V4 => ureq::config::IpFamily::Ipv4Only,
            IpResolve::V6 => ureq::config::IpFamily::Ipv6Only,
        };
        Ok(ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(settings.timeout)
            .timeout_connect(settings.connect_timeout)
            .proxy(proxy)
            .ip_family(ip_family)
            .build()
            .new_agent())
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let agent = self.agent(&request)?;
        let url = request.url.as_str();
        let headers = request.headers.as_slice();
        let body = request.body.as_deref().unwrap_or_default();

        let result = match request.method {
            HttpMethod::Get => with_headers(agent.get(url), headers).call(),
            HttpMethod::Head => with_headers(agent.head(url), headers).call(),
            HttpMethod::Delete => with_headers(agent.delete(url), headers).call(),
            HttpMethod::Options => with_headers(agent.options(url), headers).call(),
            HttpMethod::Post => with_headers(agent.post(url), headers).send(body),
            HttpMethod::Put => with_headers(agent.put(url), headers).send(body),
            HttpMethod::Patch => with_headers(agent.patch(url), headers).send(body),
        };
        let mut response = result.map_err(Error::request_failed)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
                (name.as_str().to_string(), value)
            })
            .collect();
        let body = if request.method == HttpMethod::Head {
            Vec::new()
        } else {
            response
                .body_mut()
                .with_config()
                .limit(u64::MAX)
                .read_to_vec()
                .map_err(Error::request_failed)?
        };

        Ok(HttpResponse::new(status, headers, body))
    }

    fn execute_async(&self, request: HttpRequest) -> PendingResponse {
        let transport = self.clone();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || transport.execute(request))
                .await
                .map_err(Error::request_failed)?
        })
    }
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}
