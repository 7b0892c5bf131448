use std::sync::Arc;

use super::Transaction;

/// Per-request scope handed to every middleware and handler.
///
/// Carries the active [`Transaction`] as a typed field instead of a keyed value
/// bag. Attaching returns a new context and leaves the original untouched;
/// clones share the same transaction.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    transaction: Option<Arc<Transaction>>,
}

impl RequestContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive a context carrying `tx`.
    #[must_use]
    pub fn with_transaction(&self, tx: Arc<Transaction>) -> Self {
        Self {
            transaction: Some(tx),
        }
    }

    /// The active transaction, if the request went through the entry middleware.
    ///
    /// `None` means "skip instrumentation for this request".
    #[must_use]
    pub fn transaction(&self) -> Option<&Arc<Transaction>> {
        self.transaction.as_ref()
    }
}
