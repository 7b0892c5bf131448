use std::time::Duration;

use chrono::Utc;
use reqwest::blocking::Client;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::sigv4::{sign_post, SigningParams};
use super::{EmitError, Emitter};

const SERVICE: &str = "logs";
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";
const TARGET_PUT_LOG_EVENTS: &str = "Logs_20140328.PutLogEvents";
const TARGET_FILTER_LOG_EVENTS: &str = "Logs_20140328.FilterLogEvents";
/// Upper bound on pages followed by [`CloudWatchLogsClient::filter_log_events`].
const MAX_FILTER_PAGES: usize = 100;

/// Static AWS credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl Credentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
        }
    }

    /// Read `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY` and `AWS_SESSION_TOKEN`.
    pub fn from_env() -> Option<Self> {
        let access_key_id = std::env::var("AWS_ACCESS_KEY_ID").ok()?;
        let secret_access_key = std::env::var("AWS_SECRET_ACCESS_KEY").ok()?;
        Some(Self {
            access_key_id,
            secret_access_key,
            session_token: std::env::var("AWS_SESSION_TOKEN").ok(),
        })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InputLogEvent<'a> {
    timestamp: i64,
    message: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PutLogEventsRequest<'a> {
    log_group_name: &'a str,
    log_stream_name: &'a str,
    log_events: Vec<InputLogEvent<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FilterLogEventsRequest<'a> {
    log_group_name: &'a str,
    #[serde(skip_serializing_if = "no_streams")]
    log_stream_names: &'a [String],
    start_time: i64,
    end_time: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_token: Option<String>,
}

fn no_streams(streams: &&[String]) -> bool {
    streams.is_empty()
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct FilterLogEventsResponse {
    events: Vec<LogEventRecord>,
    next_token: Option<String>,
}

/// An event returned by `FilterLogEvents`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct LogEventRecord {
    pub log_stream_name: Option<String>,
    pub timestamp: Option<i64>,
    pub message: String,
}

/// Long-lived CloudWatch Logs client.
///
/// Holds one pooled blocking HTTP client and the resolved credentials, so the
/// process pays for connection setup and credential lookup once.
pub struct CloudWatchLogsClient {
    http: Client,
    endpoint: Url,
    region: String,
    credentials: Credentials,
}

impl CloudWatchLogsClient {
    /// Build a client for `region`.
    ///
    /// `endpoint` overrides the default `https://logs.<region>.amazonaws.com/`
    /// (local stacks, tests).
    ///
    /// # Errors
    ///
    /// Returns [`EmitError::Transport`] for an unparsable endpoint or when the
    /// HTTP client cannot be built.
    pub fn new(
        region: impl Into<String>,
        credentials: Credentials,
        endpoint: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, EmitError> {
        let region = region.into();
        let endpoint = match endpoint {
            Some(e) => e.to_string(),
            None => format!("https://logs.{region}.amazonaws.com/"),
        };
        let endpoint = Url::parse(&endpoint)
            .map_err(|e| EmitError::Transport(format!("invalid endpoint {endpoint}: {e}")))?;
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EmitError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            endpoint,
            region,
            credentials,
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Append events (timestamp millis, message) to a log stream.
    pub fn put_log_events(
        &self,
        log_group: &str,
        log_stream: &str,
        events: &[(i64, &str)],
    ) -> Result<(), EmitError> {
        let body = PutLogEventsRequest {
            log_group_name: log_group,
            log_stream_name: log_stream,
            log_events: events
                .iter()
                .map(|(timestamp, message)| InputLogEvent {
                    timestamp: *timestamp,
                    message,
                })
                .collect(),
        };
        let response: serde_json::Value = self.call(TARGET_PUT_LOG_EVENTS, &body)?;
        if let Some(rejected) = response.get("rejectedLogEventsInfo") {
            warn!(
                log_group = %log_group,
                log_stream = %log_stream,
                rejected = %rejected,
                "CloudWatch rejected some log events"
            );
        }
        Ok(())
    }

    /// Send one plain text line stamped with the current time.
    pub fn put_message(
        &self,
        log_group: &str,
        log_stream: &str,
        message: &str,
    ) -> Result<(), EmitError> {
        self.put_log_events(
            log_group,
            log_stream,
            &[(Utc::now().timestamp_millis(), message)],
        )
    }

    /// Fetch events between `start_millis` and `end_millis`, following
    /// pagination tokens. An empty `log_streams` searches the whole group.
    pub fn filter_log_events(
        &self,
        log_group: &str,
        log_streams: &[String],
        start_millis: i64,
        end_millis: i64,
    ) -> Result<Vec<LogEventRecord>, EmitError> {
        let mut events = Vec::new();
        let mut next_token: Option<String> = None;
        for _ in 0..MAX_FILTER_PAGES {
            let body = FilterLogEventsRequest {
                log_group_name: log_group,
                log_stream_names: log_streams,
                start_time: start_millis,
                end_time: end_millis,
                next_token: next_token.take(),
            };
            let page: FilterLogEventsResponse = self.call(TARGET_FILTER_LOG_EVENTS, &body)?;
            events.extend(page.events);
            match page.next_token {
                Some(token) if !token.is_empty() => next_token = Some(token),
                _ => break,
            }
        }
        Ok(events)
    }

    fn call<B, R>(&self, target: &str, body: &B) -> Result<R, EmitError>
    where
        B: Serialize,
        R: DeserializeOwned + Default,
    {
        let payload = serde_json::to_vec(body)?;
        let host = match (self.endpoint.host_str(), self.endpoint.port()) {
            (Some(h), Some(p)) => format!("{h}:{p}"),
            (Some(h), None) => h.to_string(),
            (None, _) => {
                return Err(EmitError::Transport(format!(
                    "endpoint {} has no host",
                    self.endpoint
                )))
            }
        };
        let params = SigningParams {
            access_key_id: &self.credentials.access_key_id,
            secret_access_key: &self.credentials.secret_access_key,
            session_token: self.credentials.session_token.as_deref(),
            region: &self.region,
            service: SERVICE,
            time: Utc::now(),
        };
        let auth = sign_post(
            &params,
            &host,
            &[("content-type", CONTENT_TYPE), ("x-amz-target", target)],
            &payload,
        )?;

        let mut request = self
            .http
            .post(self.endpoint.clone())
            .header("content-type", CONTENT_TYPE)
            .header("x-amz-target", target);
        for (name, value) in auth {
            request = request.header(name, value);
        }

        debug!(target_op = %target, endpoint = %self.endpoint, bytes = payload.len(), "CloudWatch request");
        let response = request
            .body(payload)
            .send()
            .map_err(|e| EmitError::Transport(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .map_err(|e| EmitError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(EmitError::Rejected {
                status: status.as_u16(),
                body: text,
            });
        }
        if text.trim().is_empty() {
            return Ok(R::default());
        }
        Ok(serde_json::from_str(&text)?)
    }
}

impl Emitter for CloudWatchLogsClient {
    fn submit(
        &self,
        log_group: &str,
        log_stream: &str,
        event: &[u8],
        timestamp_millis: i64,
    ) -> Result<(), EmitError> {
        let message = String::from_utf8_lossy(event);
        self.put_log_events(log_group, log_stream, &[(timestamp_millis, message.as_ref())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_endpoint_follows_region() {
        let client = CloudWatchLogsClient::new(
            "eu-west-1",
            Credentials::new("AKID", "secret"),
            None,
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(
            client.endpoint().as_str(),
            "https://logs.eu-west-1.amazonaws.com/"
        );
    }

    #[test]
    fn rejects_unparsable_endpoint() {
        let result = CloudWatchLogsClient::new(
            "eu-west-1",
            Credentials::new("AKID", "secret"),
            Some("not a url"),
            Duration::from_secs(1),
        );
        assert!(matches!(result, Err(EmitError::Transport(_))));
    }

    #[test]
    fn debug_output_hides_secret() {
        let creds = Credentials::new("AKID", "super-secret");
        let rendered = format!("{creds:?}");
        assert!(rendered.contains("AKID"));
        assert!(!rendered.contains("super-secret"));
    }

    #[test]
    fn put_request_uses_cloudwatch_field_names() {
        let body = PutLogEventsRequest {
            log_group_name: "ubclogs",
            log_stream_name: "ubc",
            log_events: vec![InputLogEvent {
                timestamp: 42,
                message: "hello",
            }],
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "logGroupName": "ubclogs",
                "logStreamName": "ubc",
                "logEvents": [{"timestamp": 42, "message": "hello"}]
            })
        );
    }
}
