use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::{Event, Transaction};
use crate::emitter::Emitter;

/// Where and how finished transactions are labelled when they are emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderSettings {
    /// CloudWatch log group receiving the events
    pub log_group: String,
    /// Log stream inside `log_group`
    pub log_stream: String,
    /// `DetailType` tag of every event
    pub detail_type: String,
    /// `Source` tag of every event
    pub source: String,
}

impl Default for RecorderSettings {
    fn default() -> Self {
        Self {
            log_group: "ubclogs".to_string(),
            log_stream: "ubc".to_string(),
            detail_type: "TransactionEvent".to_string(),
            source: "ubc-local".to_string(),
        }
    }
}

/// Result of [`TransactionRecorder::finalize`]. Never an error for the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeOutcome {
    /// Event accepted by the emitter
    Emitted,
    /// Transaction finished but the event could not be delivered
    EmissionFailed,
    /// Transaction had already been finished; nothing was emitted
    AlreadyFinished,
}

/// Counter snapshot exposed on `/metrics`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecorderStats {
    pub started: u64,
    pub finalized: u64,
    pub emission_failures: u64,
    pub double_finishes: u64,
}

/// Creates transactions and ships finished ones to the emitter.
///
/// One recorder is shared by every request; its emitter is the single
/// long-lived log client of the process.
pub struct TransactionRecorder {
    emitter: Arc<dyn Emitter>,
    settings: RecorderSettings,
    started: AtomicU64,
    finalized: AtomicU64,
    emission_failures: AtomicU64,
    double_finishes: AtomicU64,
}

impl TransactionRecorder {
    pub fn new(emitter: Arc<dyn Emitter>, settings: RecorderSettings) -> Self {
        Self {
            emitter,
            settings,
            started: AtomicU64::new(0),
            finalized: AtomicU64::new(0),
            emission_failures: AtomicU64::new(0),
            double_finishes: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &RecorderSettings {
        &self.settings
    }

    /// Begin a transaction for a new request.
    #[must_use]
    pub fn start(&self) -> Arc<Transaction> {
        let tx = Transaction::start();
        self.started.fetch_add(1, Ordering::Relaxed);
        debug!(transaction_id = %tx.id(), "Transaction started");
        Arc::new(tx)
    }

    /// Finish `tx`, wrap it in an [`Event`] and submit it.
    ///
    /// Emission failures are logged and counted here and never reach the
    /// request path. Finishing a transaction twice is a lifecycle bug: it is
    /// logged at error level and emits nothing.
    pub fn finalize(&self, tx: &Transaction) -> FinalizeOutcome {
        let snapshot = match tx.finish() {
            Ok(snapshot) => snapshot,
            Err(err) => {
                self.double_finishes.fetch_add(1, Ordering::Relaxed);
                error!(transaction_id = %tx.id(), error = %err, "Transaction finalize called twice");
                return FinalizeOutcome::AlreadyFinished;
            }
        };
        self.finalized.fetch_add(1, Ordering::Relaxed);

        let segment_count = snapshot.segments.len();
        let event = Event::new(
            snapshot,
            self.settings.detail_type.as_str(),
            self.settings.source.as_str(),
        );
        let payload = match event.to_json_bytes() {
            Ok(bytes) => bytes,
            Err(err) => {
                self.emission_failures.fetch_add(1, Ordering::Relaxed);
                error!(transaction_id = %tx.id(), error = %err, "Failed to serialize transaction event");
                return FinalizeOutcome::EmissionFailed;
            }
        };

        match self.submit(&payload) {
            Ok(()) => {
                debug!(
                    transaction_id = %tx.id(),
                    segment_count = segment_count,
                    log_group = %self.settings.log_group,
                    "Transaction event emitted"
                );
                FinalizeOutcome::Emitted
            }
            Err(err) => {
                self.emission_failures.fetch_add(1, Ordering::Relaxed);
                error!(
                    transaction_id = %tx.id(),
                    log_group = %self.settings.log_group,
                    log_stream = %self.settings.log_stream,
                    error = %err,
                    "Failed to send transaction event to log sink"
                );
                FinalizeOutcome::EmissionFailed
            }
        }
    }

    /// Ship a plain text line to the same log stream. Best effort.
    pub fn log_message(&self, message: &str) -> bool {
        match self.submit(message.as_bytes()) {
            Ok(()) => true,
            Err(err) => {
                self.emission_failures.fetch_add(1, Ordering::Relaxed);
                error!(error = %err, "Failed to send log message to log sink");
                false
            }
        }
    }

    fn submit(&self, payload: &[u8]) -> Result<(), crate::emitter::EmitError> {
        self.emitter.submit(
            &self.settings.log_group,
            &self.settings.log_stream,
            payload,
            Utc::now().timestamp_millis(),
        )
    }

    #[must_use]
    pub fn stats(&self) -> RecorderStats {
        RecorderStats {
            started: self.started.load(Ordering::Relaxed),
            finalized: self.finalized.load(Ordering::Relaxed),
            emission_failures: self.emission_failures.load(Ordering::Relaxed),
            double_finishes: self.double_finishes.load(Ordering::Relaxed),
        }
    }
}
