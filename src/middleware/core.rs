use std::time::Duration;

use crate::dispatcher::{HandlerRequest, HandlerResponse};

/// Hooks wrapped around every dispatched request.
///
/// `before` may enrich the request (its [`RequestContext`](crate::apm::RequestContext))
/// or short-circuit it by returning a response. `after` runs on every exit
/// path once a response exists, whether the handler returned, panicked or
/// never ran. The dispatcher calls `before` in registration order and `after`
/// in reverse.
pub trait Middleware: Send + Sync {
    fn before(&self, _req: &mut HandlerRequest) -> Option<HandlerResponse> {
        None
    }
    fn after(&self, _req: &HandlerRequest, _res: &mut HandlerResponse, _latency: Duration) {}
}
