use tracing::{debug, error};

use super::CourseStore;
use crate::apm::TransactionRecorder;
use crate::dispatcher::{HandlerRequest, HandlerResponse};

/// Body of `GET /`.
pub const HOME_MESSAGE: &str = "API is running";
/// Plain log line shipped on every `GET /cources`.
pub const LIST_LOG_MESSAGE: &str = "log is running";

/// `GET /` liveness payload. Opens no segment.
pub fn home(_req: &HandlerRequest) -> HandlerResponse {
    HandlerResponse::text(200, HOME_MESSAGE)
}

/// `GET /cources`: the whole catalogue as JSON.
///
/// The work is timed as one segment of the request's transaction when there is
/// one; the guard closes the segment even if encoding panics. The log line is
/// best effort and never affects the response.
pub fn list_courses(
    req: &HandlerRequest,
    store: &CourseStore,
    recorder: Option<&TransactionRecorder>,
) -> HandlerResponse {
    let segment = req.context.transaction().map(|tx| tx.open_segment());
    if segment.is_none() {
        debug!(request_id = %req.request_id, "No transaction on request - segment skipped");
    }

    if let Some(recorder) = recorder {
        recorder.log_message(LIST_LOG_MESSAGE);
    }

    let response = match serde_json::to_value(store.list()) {
        Ok(body) => HandlerResponse::json(200, body),
        Err(err) => {
            error!(request_id = %req.request_id, error = %err, "Failed to encode courses");
            HandlerResponse::error(500, "Failed to encode courses")
        }
    };

    if let Some(segment) = segment {
        segment.close();
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apm::{RecorderSettings, RequestContext, Transaction};
    use crate::emitter::MemoryEmitter;
    use crate::ids::RequestId;
    use http::Method;
    use may::sync::mpsc;
    use std::sync::Arc;

    fn request(context: RequestContext) -> HandlerRequest {
        HandlerRequest {
            request_id: RequestId::new(),
            method: Method::GET,
            path: "/cources".to_string(),
            handler_name: "list_courses".to_string(),
            path_params: Default::default(),
            headers: Default::default(),
            context,
            reply_tx: mpsc::channel().0,
        }
    }

    #[test]
    fn list_courses_records_one_closed_segment() {
        let tx = Arc::new(Transaction::start());
        let req = request(RequestContext::new().with_transaction(Arc::clone(&tx)));

        let resp = list_courses(&req, &CourseStore::seeded(), None);

        assert_eq!(resp.status, 200);
        assert_eq!(resp.body.as_array().map(Vec::len), Some(2));
        let segments = tx.segments();
        assert_eq!(segments.len(), 1);
        assert!(segments[0].is_closed());
    }

    #[test]
    fn list_courses_without_transaction_still_answers() {
        let resp = list_courses(
            &request(RequestContext::new()),
            &CourseStore::seeded(),
            None,
        );
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body[1]["name"], "Python");
    }

    #[test]
    fn list_courses_ships_log_line_and_ignores_sink_failure() {
        let sink = Arc::new(MemoryEmitter::new());
        let recorder = TransactionRecorder::new(sink.clone(), RecorderSettings::default());
        let req = request(RequestContext::new());

        list_courses(&req, &CourseStore::seeded(), Some(&recorder));
        assert_eq!(sink.records()[0].payload, LIST_LOG_MESSAGE.as_bytes().to_vec());

        sink.set_failing(true);
        let resp = list_courses(&req, &CourseStore::seeded(), Some(&recorder));
        assert_eq!(resp.status, 200);
    }

    #[test]
    fn home_is_plain_text() {
        let resp = home(&request(RequestContext::new()));
        assert_eq!(resp.body, serde_json::Value::String(HOME_MESSAGE.into()));
    }
}
