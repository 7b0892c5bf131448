use serde::{Deserialize, Serialize};

use super::TransactionSnapshot;

/// Envelope shipped to the log sink for every finished transaction.
///
/// Field names on the wire follow the event-bus convention used by the log
/// consumers: `Details`, `DetailType`, `Source`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "Details")]
    details: TransactionSnapshot,
    #[serde(rename = "DetailType")]
    detail_type: String,
    #[serde(rename = "Source")]
    source: String,
}

impl Event {
    pub fn new(
        details: TransactionSnapshot,
        detail_type: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            details,
            detail_type: detail_type.into(),
            source: source.into(),
        }
    }

    #[must_use]
    pub fn details(&self) -> &TransactionSnapshot {
        &self.details
    }

    #[must_use]
    pub fn detail_type(&self) -> &str {
        &self.detail_type
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Serialize to the JSON bytes handed to an [`Emitter`](crate::emitter::Emitter).
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}
