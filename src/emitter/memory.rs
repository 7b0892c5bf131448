use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use super::{EmitError, Emitter};
use crate::apm::Event;

/// One submission captured by [`MemoryEmitter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedRecord {
    pub log_group: String,
    pub log_stream: String,
    pub payload: Vec<u8>,
    pub timestamp_millis: i64,
}

impl EmittedRecord {
    /// Decode the payload as a transaction [`Event`].
    pub fn event(&self) -> Result<Event, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }
}

/// Emitter that keeps every submission in memory.
///
/// With [`set_failing`](Self::set_failing) it rejects submissions instead,
/// which is how tests simulate an unreachable log sink.
#[derive(Debug, Default)]
pub struct MemoryEmitter {
    records: Mutex<Vec<EmittedRecord>>,
    failing: AtomicBool,
}

impl MemoryEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    #[must_use]
    pub fn records(&self) -> Vec<EmittedRecord> {
        self.records.lock().clone()
    }

    /// Submissions that decode as transaction events (plain log lines are skipped).
    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        self.records
            .lock()
            .iter()
            .filter_map(|r| r.event().ok())
            .collect()
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl Emitter for MemoryEmitter {
    fn submit(
        &self,
        log_group: &str,
        log_stream: &str,
        event: &[u8],
        timestamp_millis: i64,
    ) -> Result<(), EmitError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(EmitError::Transport("simulated log sink outage".to_string()));
        }
        self.records.lock().push(EmittedRecord {
            log_group: log_group.to_string(),
            log_stream: log_stream.to_string(),
            payload: event.to_vec(),
            timestamp_millis,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_and_fails_on_demand() {
        let sink = MemoryEmitter::new();
        sink.submit("g", "s", b"one", 1).unwrap();
        sink.set_failing(true);
        assert!(matches!(
            sink.submit("g", "s", b"two", 2),
            Err(EmitError::Transport(_))
        ));
        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].payload, b"one".to_vec());
        assert!(sink.events().is_empty());
    }
}
