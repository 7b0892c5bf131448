use tracing::info;

use super::{EmitError, Emitter};

/// Emitter that writes each event to the process log.
///
/// Used when no CloudWatch sink is configured, so local runs still show what
/// would have been shipped.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEmitter;

impl Emitter for LogEmitter {
    fn submit(
        &self,
        log_group: &str,
        log_stream: &str,
        event: &[u8],
        timestamp_millis: i64,
    ) -> Result<(), EmitError> {
        info!(
            target: "courseapm::events",
            log_group = %log_group,
            log_stream = %log_stream,
            timestamp_millis = timestamp_millis,
            event = %String::from_utf8_lossy(event),
            "Log event"
        );
        Ok(())
    }
}
