//! # Configuration
//!
//! [`AppConfig`] is read from an optional YAML file and then overridden by
//! `COURSEAPM_*` environment variables:
//!
//! ```yaml
//! http:
//!   addr: "0.0.0.0:8000"
//! apm:
//!   log_group: ubclogs
//!   log_stream: ubc
//!   detail_type: TransactionEvent
//!   source: ubc-local
//!   emission: background     # or blocking
//!   queue_bound: 1024
//! sink:
//!   kind: cloudwatch         # or log / memory
//!   region: eu-west-1
//!   endpoint: http://localhost:4566/   # optional
//! ```
//!
//! | Variable | Field |
//! |---|---|
//! | `COURSEAPM_HTTP_ADDR` | `http.addr` |
//! | `COURSEAPM_LOG_GROUP` / `COURSEAPM_LOG_STREAM` | `apm.log_group` / `apm.log_stream` |
//! | `COURSEAPM_DETAIL_TYPE` / `COURSEAPM_SOURCE` | `apm.detail_type` / `apm.source` |
//! | `COURSEAPM_EMISSION` | `apm.emission` |
//! | `COURSEAPM_QUEUE_BOUND` | `apm.queue_bound` |
//! | `COURSEAPM_SINK` | `sink.kind` |
//! | `COURSEAPM_SINK_REGION` (then `AWS_REGION`) | `sink.region` |
//! | `COURSEAPM_SINK_ENDPOINT` | `sink.endpoint` |
//!
//! Credentials come from `sink.access_key_id` / `sink.secret_access_key` or the
//! standard `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` / `AWS_SESSION_TOKEN`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::apm::RecorderSettings;
use crate::emitter::{
    BackgroundEmitter, CloudWatchLogsClient, Credentials, EmitError, Emitter, LogEmitter,
    MemoryEmitter,
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid value {value:?} for {var}")]
    InvalidEnv { var: &'static str, value: String },
    #[error("invalid value {value:?} for {field}")]
    InvalidValue { field: &'static str, value: String },
    #[error("sink.kind memory keeps every record in process; use log or cloudwatch for serve")]
    MemorySinkNotServable,
    #[error("cloudwatch sink needs a region (sink.region, COURSEAPM_SINK_REGION or AWS_REGION)")]
    MissingRegion,
    #[error("cloudwatch sink needs credentials (sink.* or AWS_ACCESS_KEY_ID/AWS_SECRET_ACCESS_KEY)")]
    MissingCredentials,
    #[error("failed to build log sink: {0}")]
    Sink(#[from] EmitError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub addr: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:8000".to_string(),
        }
    }
}

/// Whether `finalize` waits for the sink or hands the event to a queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmissionMode {
    #[default]
    Blocking,
    Background,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApmConfig {
    #[serde(flatten)]
    pub recorder: RecorderSettings,
    pub emission: EmissionMode,
    /// Maximum queued events in background mode
    pub queue_bound: usize,
}

impl Default for ApmConfig {
    fn default() -> Self {
        Self {
            recorder: RecorderSettings::default(),
            emission: EmissionMode::default(),
            queue_bound: 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    Cloudwatch,
    #[default]
    Log,
    Memory,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    pub kind: SinkKind,
    pub region: Option<String>,
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub timeout_ms: u64,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            kind: SinkKind::default(),
            region: None,
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            timeout_ms: 5_000,
        }
    }
}

impl std::fmt::Debug for SinkConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkConfig")
            .field("kind", &self.kind)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "<redacted>"),
            )
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

impl SinkConfig {
    /// Resolve credentials: explicit config first, then the AWS environment.
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        match (&self.access_key_id, &self.secret_access_key) {
            (Some(id), Some(secret)) => Ok(Credentials::new(id.as_str(), secret.as_str())),
            _ => Credentials::from_env().ok_or(ConfigError::MissingCredentials),
        }
    }

    /// One long-lived CloudWatch client for the whole process.
    pub fn cloudwatch_client(&self) -> Result<CloudWatchLogsClient, ConfigError> {
        let region = self.region.clone().ok_or(ConfigError::MissingRegion)?;
        let client = CloudWatchLogsClient::new(
            region,
            self.credentials()?,
            self.endpoint.as_deref(),
            Duration::from_millis(self.timeout_ms),
        )?;
        Ok(client)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub apm: ApmConfig,
    pub sink: SinkConfig,
}

/// The emitter chain built from [`AppConfig`].
pub struct EmitterStack {
    /// What the recorder submits to
    pub emitter: Arc<dyn Emitter>,
    /// Present in background mode; call `shutdown` before exit to drain it
    pub background: Option<Arc<BackgroundEmitter>>,
    /// Present for `sink.kind: memory`
    pub memory: Option<Arc<MemoryEmitter>>,
}

impl EmitterStack {
    /// Drain the background queue, if any.
    pub fn shutdown(&self) {
        if let Some(bg) = &self.background {
            bg.shutdown();
        }
    }
}

impl AppConfig {
    /// Read `path` (if given), then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|var| std::env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that parse but cannot work.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.apm.queue_bound == 0 {
            return Err(ConfigError::InvalidValue {
                field: "apm.queue_bound",
                value: self.apm.queue_bound.to_string(),
            });
        }
        Ok(())
    }

    /// Checks for a long-running server on top of [`AppConfig::validate`].
    /// The memory sink is never drained, so it is only for tests.
    pub fn validate_for_serve(&self) -> Result<(), ConfigError> {
        self.validate()?;
        if self.sink.kind == SinkKind::Memory {
            return Err(ConfigError::MemorySinkNotServable);
        }
        Ok(())
    }

    /// Apply `COURSEAPM_*` overrides read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("COURSEAPM_HTTP_ADDR") {
            self.http.addr = v;
        }
        if let Some(v) = lookup("COURSEAPM_LOG_GROUP") {
            self.apm.recorder.log_group = v;
        }
        if let Some(v) = lookup("COURSEAPM_LOG_STREAM") {
            self.apm.recorder.log_stream = v;
        }
        if let Some(v) = lookup("COURSEAPM_DETAIL_TYPE") {
            self.apm.recorder.detail_type = v;
        }
        if let Some(v) = lookup("COURSEAPM_SOURCE") {
            self.apm.recorder.source = v;
        }
        if let Some(v) = lookup("COURSEAPM_EMISSION") {
            self.apm.emission = match v.to_lowercase().as_str() {
                "blocking" => EmissionMode::Blocking,
                "background" => EmissionMode::Background,
                _ => {
                    return Err(ConfigError::InvalidEnv {
                        var: "COURSEAPM_EMISSION",
                        value: v,
                    })
                }
            };
        }
        if let Some(v) = lookup("COURSEAPM_QUEUE_BOUND") {
            self.apm.queue_bound = match v.parse() {
                Ok(bound) if bound > 0 => bound,
                _ => {
                    return Err(ConfigError::InvalidEnv {
                        var: "COURSEAPM_QUEUE_BOUND",
                        value: v,
                    })
                }
            };
        }
        if let Some(v) = lookup("COURSEAPM_SINK") {
            self.sink.kind = match v.to_lowercase().as_str() {
                "cloudwatch" => SinkKind::Cloudwatch,
                "log" => SinkKind::Log,
                "memory" => SinkKind::Memory,
                _ => {
                    return Err(ConfigError::InvalidEnv {
                        var: "COURSEAPM_SINK",
                        value: v,
                    })
                }
            };
        }
        if let Some(v) = lookup("COURSEAPM_SINK_REGION").or_else(|| {
            if self.sink.region.is_none() {
                lookup("AWS_REGION")
            } else {
                None
            }
        }) {
            self.sink.region = Some(v);
        }
        if let Some(v) = lookup("COURSEAPM_SINK_ENDPOINT") {
            self.sink.endpoint = Some(v);
        }
        Ok(())
    }

    /// Build the sink and, in background mode, the queue in front of it.
    pub fn build_emitter(&self) -> Result<EmitterStack, ConfigError> {
        self.validate()?;
        let mut memory = None;
        let base: Arc<dyn Emitter> = match self.sink.kind {
            SinkKind::Cloudwatch => {
                let client = self.sink.cloudwatch_client()?;
                info!(endpoint = %client.endpoint(), "CloudWatch Logs sink configured");
                Arc::new(client)
            }
            SinkKind::Log => Arc::new(LogEmitter),
            SinkKind::Memory => {
                let sink = Arc::new(MemoryEmitter::new());
                memory = Some(Arc::clone(&sink));
                sink
            }
        };

        let (emitter, background) = match self.apm.emission {
            EmissionMode::Blocking => (base, None),
            EmissionMode::Background => {
                let bg = Arc::new(BackgroundEmitter::spawn(base, self.apm.queue_bound)?);
                (Arc::clone(&bg) as Arc<dyn Emitter>, Some(bg))
            }
        };

        Ok(EmitterStack {
            emitter,
            background,
            memory,
        })
    }
}
