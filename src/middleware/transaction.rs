use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::Middleware;
use crate::apm::TransactionRecorder;
use crate::dispatcher::{HandlerRequest, HandlerResponse};

/// Entry/exit pair around every dispatched request.
///
/// `before` starts a transaction and attaches it to the request context,
/// `after` finalizes whatever transaction the context carries. The dispatcher
/// calls `after` on every exit path, so each request finalizes exactly once.
/// Register this first: `before` hooks run in registration order and `after`
/// hooks in reverse, so the transaction opens before and finalizes after every
/// other middleware.
pub struct TransactionMiddleware {
    recorder: Arc<TransactionRecorder>,
}

impl TransactionMiddleware {
    pub fn new(recorder: Arc<TransactionRecorder>) -> Self {
        Self { recorder }
    }

    pub fn recorder(&self) -> &Arc<TransactionRecorder> {
        &self.recorder
    }
}

impl Middleware for TransactionMiddleware {
    fn before(&self, req: &mut HandlerRequest) -> Option<HandlerResponse> {
        if let Some(existing) = req.context.transaction() {
            warn!(
                request_id = %req.request_id,
                transaction_id = %existing.id(),
                "Request already carries a transaction - not starting another"
            );
            return None;
        }
        let tx = self.recorder.start();
        debug!(
            request_id = %req.request_id,
            transaction_id = %tx.id(),
            "Transaction attached to request"
        );
        req.context = req.context.with_transaction(tx);
        None
    }

    fn after(&self, req: &HandlerRequest, res: &mut HandlerResponse, _latency: Duration) {
        match req.context.transaction() {
            Some(tx) => {
                let outcome = self.recorder.finalize(tx);
                debug!(
                    request_id = %req.request_id,
                    transaction_id = %tx.id(),
                    status = res.status,
                    outcome = ?outcome,
                    "Transaction finalized"
                );
            }
            None => {
                debug!(request_id = %req.request_id, "No transaction on request - nothing to finalize");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apm::{FinalizeOutcome, RecorderSettings, RequestContext};
    use crate::emitter::MemoryEmitter;
    use crate::ids::RequestId;
    use http::Method;
    use may::sync::mpsc;

    fn request() -> HandlerRequest {
        HandlerRequest {
            request_id: RequestId::new(),
            method: Method::GET,
            path: "/cources".to_string(),
            handler_name: "list_courses".to_string(),
            path_params: Default::default(),
            headers: Default::default(),
            context: RequestContext::new(),
            reply_tx: mpsc::channel().0,
        }
    }

    fn middleware() -> (Arc<MemoryEmitter>, TransactionMiddleware) {
        let sink = Arc::new(MemoryEmitter::new());
        let recorder = TransactionRecorder::new(sink.clone(), RecorderSettings::default());
        (sink, TransactionMiddleware::new(Arc::new(recorder)))
    }

    #[test]
    fn before_attaches_and_after_finalizes_once() {
        let (sink, mw) = middleware();
        let mut req = request();

        assert!(mw.before(&mut req).is_none());
        let tx = Arc::clone(req.context.transaction().unwrap());
        assert!(!tx.is_finished());

        let mut res = HandlerResponse::json(200, serde_json::json!([]));
        mw.after(&req, &mut res, Duration::from_millis(1));

        assert!(tx.is_finished());
        assert_eq!(sink.events().len(), 1);
        assert_eq!(sink.events()[0].details().transaction_id, tx.id());
        assert_eq!(res.status, 200);
    }

    #[test]
    fn after_without_transaction_is_a_no_op() {
        let (sink, mw) = middleware();
        let req = request();
        let mut res = HandlerResponse::error(500, "boom");
        mw.after(&req, &mut res, Duration::ZERO);
        assert!(sink.records().is_empty());
        assert_eq!(mw.recorder().stats().finalized, 0);
    }

    #[test]
    fn before_keeps_an_existing_transaction() {
        let (_sink, mw) = middleware();
        let mut req = request();
        mw.before(&mut req);
        let first = req.context.transaction().map(|t| t.id());
        mw.before(&mut req);
        assert_eq!(req.context.transaction().map(|t| t.id()), first);
        assert_eq!(mw.recorder().stats().started, 1);
    }

    #[test]
    fn emission_failure_leaves_response_untouched() {
        let (sink, mw) = middleware();
        sink.set_failing(true);
        let mut req = request();
        mw.before(&mut req);
        let mut res = HandlerResponse::json(200, serde_json::json!({"ok": true}));
        mw.after(&req, &mut res, Duration::ZERO);

        assert_eq!(res.status, 200);
        assert_eq!(res.body, serde_json::json!({"ok": true}));
        let tx = req.context.transaction().unwrap();
        assert_eq!(mw.recorder().finalize(tx), FinalizeOutcome::AlreadyFinished);
    }
}
