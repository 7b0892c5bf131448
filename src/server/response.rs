use crate::dispatcher::HandlerResponse;
use may_minihttp::Response;
use serde_json::Value;
use tracing::error;

fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "OK",
    }
}

/// `may_minihttp` only takes `&'static str` headers; types outside this set
/// go out as `application/octet-stream`.
fn content_type_header(content_type: &str) -> &'static str {
    match content_type {
        "application/json" => "Content-Type: application/json",
        "application/problem+json" => "Content-Type: application/problem+json",
        "text/plain" => "Content-Type: text/plain",
        "text/plain; version=0.0.4" => "Content-Type: text/plain; version=0.0.4",
        "text/html" => "Content-Type: text/html",
        "text/csv" => "Content-Type: text/csv",
        _ => "Content-Type: application/octet-stream",
    }
}

/// Write a handler response. String bodies go out verbatim, everything else
/// as JSON; an explicit `content-type` header on the response wins.
pub fn write_handler_response(res: &mut Response, hr: HandlerResponse) {
    let explicit = hr.get_header("content-type").map(str::to_string);
    res.status_code(hr.status as usize, status_reason(hr.status));
    match hr.body {
        Value::String(s) => {
            res.header(content_type_header(explicit.as_deref().unwrap_or("text/plain")));
            res.body_vec(s.into_bytes());
        }
        other => match serde_json::to_vec(&other) {
            Ok(bytes) => {
                res.header(content_type_header(
                    explicit.as_deref().unwrap_or("application/json"),
                ));
                res.body_vec(bytes);
            }
            Err(err) => {
                error!(error = %err, "Failed to serialize response body");
                write_json_error(
                    res,
                    500,
                    serde_json::json!({ "error": "Response serialization failed" }),
                );
            }
        },
    }
}

pub fn write_json_error(res: &mut Response, status: u16, body: Value) {
    res.status_code(status as usize, status_reason(status));
    res.header(content_type_header("application/json"));
    res.body_vec(body.to_string().into_bytes());
}

/// Write a plain-text body with the given content type.
pub fn write_text(res: &mut Response, status: u16, content_type: &str, body: String) {
    res.status_code(status as usize, status_reason(status));
    res.header(content_type_header(content_type));
    res.body_vec(body.into_bytes());
}
