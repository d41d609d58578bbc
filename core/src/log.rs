//! Request/response logging middleware.
//!
//! Each round-trip is rendered through a `MessageFormatter` template and
//! emitted with `tracing`: responses at `debug`, transport failures at
//! `warn`. Templates use `{placeholder}` tokens; unknown tokens render empty.
//!
//! | token | value |
//! |-------|-------|
//! | `{method}` `{uri}` `{target}` `{host}` | request line parts |
//! | `{code}` | response status |
//! | `{req_body}` `{res_body}` | bodies, lossy UTF-8 |
//! | `{req_headers}` `{res_headers}` | header blocks |
//! | `{req_header_<name>}` `{res_header_<name>}` | one header |
//! | `{request}` `{response}` | full messages |
//! | `{error}` | transport error, or `NULL` |

use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::http::{HttpRequest, HttpResponse};
use crate::middleware::Middleware;
use crate::transport::{PendingResponse, Transport};

/// Renders log lines from a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageFormatter {
    template: String,
}

impl MessageFormatter {
    /// Common-log-like one-liner.
    pub const CLF: &'static str = "{host} \"{method} {target} HTTP/1.1\" {code} {res_header_Content-Length}";
    /// Full request and response dumps.
    pub const DEBUG: &'static str = ">>>>>>>>\n{request}\n<<<<<<<<\n{response}\n--------\n{error}";
    pub const SHORT: &'static str = "\"{method} {target} HTTP/1.1\" {code}";

    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn format(&self, request: &HttpRequest, response: Option<&HttpResponse>, error: Option<&Error>) -> String {
        let mut out = String::with_capacity(self.template.len());
        let mut rest = self.template.as_str();
        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            let Some(end) = after.find('}') else {
                out.push_str(&rest[start..]);
                rest = "";
                break;
            };
            out.push_str(&token(&after[..end], request, response, error));
            rest = &after[end + 1..];
        }
        out.push_str(rest);
        out
    }
}

impl Default for MessageFormatter {
    fn default() -> Self {
        Self::new(Self::CLF)
    }
}

fn token(name: &str, request: &HttpRequest, response: Option<&HttpResponse>, error: Option<&Error>) -> String {
    if let Some(header) = name.strip_prefix("req_header_") {
        return request.header(header).unwrap_or_default().to_string();
    }
    if let Some(header) = name.strip_prefix("res_header_") {
        return response
            .map(|r| r.header_line(header))
            .unwrap_or_default();
    }
    match name {
        "method" => request.method.to_string(),
        "uri" | "url" => request.url.clone(),
        "target" => url::Url::parse(&request.url)
            .map(|url| match url.query() {
                Some(query) => format!("{}?{query}", url.path()),
                None => url.path().to_string(),
            })
            .unwrap_or_default(),
        "host" => url::Url::parse(&request.url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
            .unwrap_or_default(),
        "code" => response.map(|r| r.status.to_string()).unwrap_or_else(|| "NULL".to_string()),
        "req_body" => request
            .body
            .as_deref()
            .map(|body| String::from_utf8_lossy(body).into_owned())
            .unwrap_or_default(),
        "res_body" => response.map(HttpResponse::text).unwrap_or_default(),
        "req_headers" => header_block(&request.headers),
        "res_headers" => response.map(|r| header_block(&r.headers)).unwrap_or_default(),
        "request" => {
            let body = request.body.as_deref().unwrap_or_default();
            format!(
                "{} {} HTTP/1.1\r\n{}\r\n\r\n{}",
                request.method,
                request.url,
                header_block(&request.headers),
                String::from_utf8_lossy(body)
            )
        }
        "response" => response
            .map(|r| format!("HTTP/1.1 {}\r\n{}\r\n\r\n{}", r.status, header_block(&r.headers), r.text()))
            .unwrap_or_else(|| "NULL".to_string()),
        "error" => error.map(ToString::to_string).unwrap_or_else(|| "NULL".to_string()),
        _ => String::new(),
    }
}

fn header_block(headers: &[(String, String)]) -> String {
    headers
        .iter()
        .map(|(name, value)| format!("{name}: {value}"))
        .collect::<Vec<_>>()
        .join("\r\n")
}

/// Logs every round-trip that passes through it.
#[derive(Debug, Clone, Default)]
pub struct LogMiddleware {
    formatter: MessageFormatter,
}

impl LogMiddleware {
    pub fn new(formatter: MessageFormatter) -> Self {
        Self { formatter }
    }

    /// Uses `http.log_template` when configured, the DEBUG template otherwise.
    pub fn from_config(config: &Config) -> Self {
        let template = config.log_template().unwrap_or(MessageFormatter::DEBUG);
        Self::new(MessageFormatter::new(template))
    }
}

impl Middleware for LogMiddleware {
    fn wrap(&self, next: Arc<dyn Transport>) -> Arc<dyn Transport> {
        Arc::new(Logged {
            next,
            formatter: self.formatter.clone(),
        })
    }
}

struct Logged {
    next: Arc<dyn Transport>,
    formatter: MessageFormatter,
}

impl Transport for Logged {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let logged = request.clone();
        let result = self.next.execute(request);
        emit(&self.formatter, &logged, &result);
        result
    }

    fn execute_async(&self, request: HttpRequest) -> PendingResponse {
        let logged = request.clone();
        let formatter = self.formatter.clone();
        self.next
            .execute_async(request)
            .map(move |result| {
                emit(&formatter, &logged, &result);
                result
            })
            .boxed()
    }
}

fn emit(formatter: &MessageFormatter, request: &HttpRequest, result: &Result<HttpResponse>) {
    match result {
        Ok(response) => {
            let message = formatter.format(request, Some(response), None);
            debug!(method = %request.method, url = %request.url, status = response.status, "{message}");
        }
        Err(error) => {
            let message = formatter.format(request, None, Some(error));
            warn!(method = %request.method, url = %request.url, %error, "{message}");
        }
    }
}
