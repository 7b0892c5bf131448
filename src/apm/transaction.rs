use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::segment::{SegmentGuard, SegmentRecord};
use super::ApmError;
use crate::ids::TransactionId;

/// Root timing record for one request.
///
/// A transaction is created by the entry side of
/// [`TransactionMiddleware`](crate::middleware::TransactionMiddleware), shared with the
/// handler coroutine through [`RequestContext`](super::RequestContext) and finished by the
/// exit side. The handler runs on a different coroutine than the middleware, so the
/// mutable part (end time and segment list) sits behind a mutex.
#[derive(Debug)]
pub struct Transaction {
    id: TransactionId,
    start_time: DateTime<Utc>,
    state: Mutex<TransactionState>,
}

#[derive(Debug, Default)]
struct TransactionState {
    end_time: Option<DateTime<Utc>>,
    segments: Vec<SegmentRecord>,
}

/// Point-in-time copy of a transaction, the `Details` payload of an
/// [`Event`](super::Event).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionSnapshot {
    pub transaction_id: TransactionId,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub segments: Vec<SegmentRecord>,
}

impl Transaction {
    /// Begin a new transaction stamped with the current time and no segments.
    #[must_use]
    pub fn start() -> Self {
        Self {
            id: TransactionId::new(),
            start_time: Utc::now(),
            state: Mutex::new(TransactionState::default()),
        }
    }

    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.id
    }

    #[must_use]
    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    #[must_use]
    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.state.lock().end_time
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state.lock().end_time.is_some()
    }

    /// Segments in the order they were opened.
    #[must_use]
    pub fn segments(&self) -> Vec<SegmentRecord> {
        self.state.lock().segments.clone()
    }

    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.state.lock().segments.len()
    }

    /// Open a segment and append it to this transaction immediately.
    pub fn open_segment(&self) -> SegmentGuard<'_> {
        let record = SegmentRecord::open_now();
        let mut state = self.state.lock();
        if state.end_time.is_some() {
            warn!(
                transaction_id = %self.id,
                segment_id = %record.segment_id,
                "Segment opened on a finished transaction"
            );
        }
        let index = state.segments.len();
        let guard = SegmentGuard::new(self, index, &record);
        state.segments.push(record);
        guard
    }

    pub(crate) fn close_segment(&self, index: usize) -> DateTime<Utc> {
        let now = Utc::now();
        let mut state = self.state.lock();
        match state.segments.get_mut(index) {
            Some(record) => record.close_at(now),
            None => now,
        }
    }

    /// Stamp the end time and return the finished snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ApmError::AlreadyFinished`] when called a second time; the
    /// original end time is kept.
    pub fn finish(&self) -> Result<TransactionSnapshot, ApmError> {
        let now = Utc::now();
        let mut state = self.state.lock();
        if state.end_time.is_some() {
            return Err(ApmError::AlreadyFinished(self.id));
        }
        state.end_time = Some(now.max(self.start_time));
        Ok(self.snapshot_locked(&state))
    }

    #[must_use]
    pub fn snapshot(&self) -> TransactionSnapshot {
        let state = self.state.lock();
        self.snapshot_locked(&state)
    }

    fn snapshot_locked(&self, state: &TransactionState) -> TransactionSnapshot {
        TransactionSnapshot {
            transaction_id: self.id,
            start_time: self.start_time,
            end_time: state.end_time,
            segments: state.segments.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn starts_empty_and_open() {
        let tx = Transaction::start();
        assert_eq!(tx.segment_count(), 0);
        assert!(!tx.is_finished());
        assert!(tx.end_time().is_none());
    }

    #[test]
    fn segment_order_follows_open_order_not_close_order() {
        let tx = Transaction::start();
        let a = tx.open_segment();
        let b = tx.open_segment();
        let (a_id, b_id) = (a.id(), b.id());
        b.close();
        a.close();

        let ids: Vec<_> = tx.segments().iter().map(|s| s.segment_id).collect();
        assert_eq!(ids, vec![a_id, b_id]);
    }

    #[test]
    fn open_segment_is_visible_before_close() {
        let tx = Transaction::start();
        let guard = tx.open_segment();
        assert_eq!(tx.segment_count(), 1);
        assert!(!tx.segments()[0].is_closed());
        drop(guard);
        assert!(tx.segments()[0].is_closed());
    }

    #[test]
    fn finish_is_irreversible() {
        let tx = Transaction::start();
        let snapshot = tx.finish().unwrap();
        let end = snapshot.end_time.unwrap();
        assert!(end >= tx.start_time());

        let err = tx.finish().unwrap_err();
        assert!(matches!(err, ApmError::AlreadyFinished(id) if id == tx.id()));
        assert_eq!(tx.end_time(), Some(end));
    }

    #[test]
    fn snapshot_keeps_still_open_segments() {
        let tx = Transaction::start();
        let guard = tx.open_segment();
        let snapshot = tx.finish().unwrap();
        assert_eq!(snapshot.segments.len(), 1);
        assert!(snapshot.segments[0].end_time.is_none());
        guard.close();
    }

    #[test]
    fn concurrent_subtasks_append_without_loss() {
        let tx = Arc::new(Transaction::start());
        let workers: Vec<_> = (0..8)
            .map(|_| {
                let tx = Arc::clone(&tx);
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        tx.open_segment().close();
                    }
                })
            })
            .collect();
        for w in workers {
            w.join().unwrap();
        }
        let segments = tx.segments();
        assert_eq!(segments.len(), 200);
        assert!(segments.iter().all(SegmentRecord::is_closed));
    }
}
