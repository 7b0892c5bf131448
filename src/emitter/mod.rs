//! # Emitter Module
//!
//! Out-of-process sinks for serialized transaction events.
//!
//! The instrumentation core only knows the [`Emitter`] trait. Implementations:
//!
//! - [`CloudWatchLogsClient`] - `PutLogEvents` over HTTPS, signed with AWS SigV4
//! - [`BackgroundEmitter`] - hands submissions to a worker thread so the request
//!   path never waits on the network
//! - [`LogEmitter`] - writes events through `tracing` (local development)
//! - [`MemoryEmitter`] - keeps submissions in memory (tests, dry runs)
//!
//! Every implementation must tolerate concurrent `submit` calls from many
//! requests. Errors are reported to the caller, which logs and drops them.

mod background;
mod cloudwatch;
mod log;
mod memory;
mod sigv4;

pub use background::BackgroundEmitter;
pub use cloudwatch::{CloudWatchLogsClient, Credentials, LogEventRecord};
pub use log::LogEmitter;
pub use memory::{EmittedRecord, MemoryEmitter};
pub use sigv4::SigningParams;

/// Failure modes of a log submission. None of them are fatal to a request.
#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("log sink rejected the request with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("missing credentials: {0}")]
    Credentials(String),
    #[error("failed to encode request: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("emission queue is full ({0} pending)")]
    QueueFull(usize),
    #[error("emitter has been shut down")]
    Closed,
}

/// Sink for serialized events.
pub trait Emitter: Send + Sync {
    /// Submit one log event.
    ///
    /// # Arguments
    ///
    /// * `log_group` / `log_stream` - destination of the event
    /// * `event` - serialized payload (JSON for transaction events)
    /// * `timestamp_millis` - event time in milliseconds since the Unix epoch
    fn submit(
        &self,
        log_group: &str,
        log_stream: &str,
        event: &[u8],
        timestamp_millis: i64,
    ) -> Result<(), EmitError>;
}
