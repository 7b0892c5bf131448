//! # APM Module
//!
//! Request-scoped timing records: one [`Transaction`] per request, any number of
//! segments opened by handler code, and an [`Event`] emitted when the
//! transaction is finished.
//!
//! ## Lifecycle
//!
//! ```text
//! no transaction ──start()──▶ active ──finalize()──▶ finished
//!                               │
//!                               └─ open_segment() / close()
//! ```
//!
//! - [`TransactionRecorder::start`] is called by the entry side of
//!   [`TransactionMiddleware`](crate::middleware::TransactionMiddleware)
//! - The transaction travels to the handler inside [`RequestContext`]
//! - Handlers time sub-operations with [`Transaction::open_segment`]
//! - [`TransactionRecorder::finalize`] is called by the exit side, on every
//!   exit path, and submits the serialized [`Event`] to the configured
//!   [`Emitter`](crate::emitter::Emitter)
//!
//! ## Handler Usage
//!
//! ```rust
//! use courseapm::apm::{RequestContext, Transaction};
//! use std::sync::Arc;
//!
//! let ctx = RequestContext::new().with_transaction(Arc::new(Transaction::start()));
//! if let Some(tx) = ctx.transaction() {
//!     let segment = tx.open_segment();
//!     // ... timed work ...
//!     segment.close();
//! }
//! ```

mod context;
mod event;
mod recorder;
mod segment;
mod transaction;

pub use context::RequestContext;
pub use event::Event;
pub use recorder::{FinalizeOutcome, RecorderSettings, RecorderStats, TransactionRecorder};
pub use segment::{SegmentGuard, SegmentRecord};
pub use transaction::{Transaction, TransactionSnapshot};

use crate::ids::TransactionId;

/// Errors raised by misuse of the transaction lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum ApmError {
    #[error("transaction {0} is already finished")]
    AlreadyFinished(TransactionId),
}
