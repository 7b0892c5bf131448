use crate::dispatcher::HeaderVec;
use may_minihttp::Request;
use std::sync::Arc;
use tracing::debug;

/// Parsed HTTP request data used by `AppService`.
#[derive(Debug, PartialEq)]
pub struct ParsedRequest {
    pub method: String,
    /// Request path without the query string
    pub path: String,
    /// HTTP headers (lowercase names)
    pub headers: HeaderVec,
}

/// Strip the query string; routing is on the path alone.
fn route_path(raw_path: &str) -> &str {
    match raw_path.split_once('?') {
        Some((path, _)) if !path.is_empty() => path,
        Some(_) => "/",
        None => raw_path,
    }
}

/// Extract method, path and headers from the raw request.
///
/// The body is not read. Dropping the body reader drains the declared
/// `Content-Length` so a pipelined request on the same connection starts at
/// its request line.
pub fn parse_request(req: Request) -> ParsedRequest {
    let method = req.method().to_string();
    let path = route_path(req.path()).to_string();

    let headers: HeaderVec = req
        .headers()
        .iter()
        .map(|h| {
            (
                Arc::from(h.name.to_ascii_lowercase().as_str()),
                String::from_utf8_lossy(h.value).into_owned(),
            )
        })
        .collect();
    drop(req.body());

    debug!(
        method = %method,
        path = %path,
        headers_count = headers.len(),
        "HTTP request parsed"
    );

    ParsedRequest {
        method,
        path,
        headers,
    }
}
