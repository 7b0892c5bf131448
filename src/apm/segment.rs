use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Transaction;
use crate::ids::SegmentId;

/// A timed sub-interval of a transaction as it is stored and emitted.
///
/// The record is appended to its transaction when the segment is opened, so
/// `end_time` stays `None` until the owning [`SegmentGuard`] closes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentRecord {
    pub segment_id: SegmentId,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}

impl SegmentRecord {
    pub(crate) fn open_now() -> Self {
        Self {
            segment_id: SegmentId::new(),
            start_time: Utc::now(),
            end_time: None,
        }
    }

    /// Close the record at `at`, never earlier than its start.
    ///
    /// A closed record keeps its first close time; later calls return it unchanged.
    pub(crate) fn close_at(&mut self, at: DateTime<Utc>) -> DateTime<Utc> {
        if let Some(end) = self.end_time {
            return end;
        }
        let end = at.max(self.start_time);
        self.end_time = Some(end);
        end
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.end_time.is_some()
    }

    /// Elapsed time between open and close, `None` while open.
    #[must_use]
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.end_time.map(|end| end - self.start_time)
    }
}

/// Scoped handle to an open segment.
///
/// Obtained from [`Transaction::open_segment`]. Closing consumes the guard, so a
/// segment cannot be closed twice through it. A guard that goes out of scope
/// unclosed (early return, `?`, or a panic unwinding the handler) closes the
/// segment in `Drop`.
///
/// ```rust
/// use courseapm::apm::Transaction;
///
/// let tx = Transaction::start();
/// {
///     let _segment = tx.open_segment();
///     // timed work
/// }
/// assert!(tx.segments()[0].is_closed());
/// ```
#[must_use = "dropping the guard immediately closes the segment"]
#[derive(Debug)]
pub struct SegmentGuard<'tx> {
    owner: &'tx Transaction,
    index: usize,
    id: SegmentId,
    start_time: DateTime<Utc>,
    closed: bool,
}

impl<'tx> SegmentGuard<'tx> {
    pub(crate) fn new(owner: &'tx Transaction, index: usize, record: &SegmentRecord) -> Self {
        Self {
            owner,
            index,
            id: record.segment_id,
            start_time: record.start_time,
            closed: false,
        }
    }

    #[must_use]
    pub fn id(&self) -> SegmentId {
        self.id
    }

    #[must_use]
    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    /// Close the segment and return the recorded end time.
    pub fn close(mut self) -> DateTime<Utc> {
        self.closed = true;
        self.owner.close_segment(self.index)
    }
}

impl Drop for SegmentGuard<'_> {
    fn drop(&mut self) {
        if !self.closed {
            self.owner.close_segment(self.index);
        }
    }
}
