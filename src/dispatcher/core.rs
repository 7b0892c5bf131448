//! Dispatcher core module - hot path for request dispatch.

use crate::apm::RequestContext;
use crate::ids::RequestId;
use crate::middleware::Middleware;
use crate::router::{ParamVec, RouteMatch, RouteMeta};
use crate::runtime_config::RuntimeConfig;
use http::Method;
use may::coroutine;
use may::sync::mpsc;
use serde::Serialize;
use serde_json::Value;
use smallvec::SmallVec;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

const MAX_INLINE_HEADERS: usize = 16;

/// Header storage for the hot path
///
/// Header names are `Arc<str>` since they repeat across requests; values are
/// per-request data.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Request data passed to a handler coroutine
///
/// Carries the matched route, the request headers, the per-request
/// [`RequestContext`] and the reply channel for sending the response back.
/// Bodies and query strings never reach handlers; every route is a `GET`
/// keyed on the path alone.
#[derive(Debug, Clone)]
pub struct HandlerRequest {
    /// Unique request ID for log correlation
    pub request_id: RequestId,
    pub method: Method,
    /// Route pattern that matched
    pub path: String,
    /// Name of the handler that should process this request
    pub handler_name: String,
    pub path_params: ParamVec,
    /// HTTP headers (lowercase names)
    pub headers: HeaderVec,
    /// Request scope populated by middleware (active transaction)
    pub context: RequestContext,
    /// Channel for sending the response back to the dispatcher
    pub reply_tx: mpsc::Sender<HandlerResponse>,
}

impl HandlerRequest {
    /// Get a path parameter by name (last occurrence wins)
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get a header by name (case-insensitive per RFC 7230)
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Send the handler's response back to the dispatcher.
    pub fn respond(&self, response: HandlerResponse) {
        if self.reply_tx.send(response).is_err() {
            warn!(
                request_id = %self.request_id,
                handler_name = %self.handler_name,
                "Dispatcher stopped waiting before the handler replied"
            );
        }
    }
}

/// Response data sent back from a handler coroutine
///
/// A `Value::String` body is written as `text/plain`, anything else as JSON.
#[derive(Debug, Clone, Serialize)]
pub struct HandlerResponse {
    pub status: u16,
    #[serde(skip_serializing)]
    pub headers: HeaderVec,
    pub body: Value,
}

impl HandlerResponse {
    /// Create a JSON response
    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        let mut headers = HeaderVec::new();
        headers.push((Arc::from("content-type"), "application/json".to_string()));
        Self {
            status,
            headers,
            body,
        }
    }

    /// Create a plain-text response
    #[must_use]
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        let mut headers = HeaderVec::new();
        headers.push((Arc::from("content-type"), "text/plain".to_string()));
        Self {
            status,
            headers,
            body: Value::String(body.into()),
        }
    }

    /// Create an error response `{ "error": message }`
    #[must_use]
    pub fn error(status: u16, message: &str) -> Self {
        Self::json(status, serde_json::json!({ "error": message }))
    }

    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add or replace a header
    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value));
    }
}

/// Type alias for a channel sender that dispatches requests to a handler
pub type HandlerSender = mpsc::Sender<HandlerRequest>;

/// Dispatcher that routes requests to registered handler coroutines
///
/// Maintains the handler name → channel registry and the ordered middleware
/// chain wrapped around every dispatch.
#[derive(Clone)]
pub struct Dispatcher {
    pub handlers: HashMap<String, HandlerSender>,
    pub middlewares: Vec<Arc<dyn Middleware>>,
    stack_size: usize,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    /// Create an empty dispatcher; coroutine stack size comes from [`RuntimeConfig::from_env`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_runtime(RuntimeConfig::from_env())
    }

    #[must_use]
    pub fn with_runtime(runtime: RuntimeConfig) -> Self {
        Dispatcher {
            handlers: HashMap::new(),
            middlewares: Vec::new(),
            stack_size: runtime.stack_size,
        }
    }

    /// Add a handler sender for the given route. Replacing an existing
    /// handler drops its sender, which ends the old coroutine.
    pub fn add_route(&mut self, route: RouteMeta, sender: HandlerSender) {
        let handler_name = route.handler_name.to_string();
        if self.handlers.remove(&handler_name).is_some() {
            warn!(
                handler_name = %handler_name,
                "Replaced existing handler - old coroutine will exit"
            );
        }
        info!(
            handler_name = %handler_name,
            total_handlers = self.handlers.len() + 1,
            "Handler registered successfully"
        );
        self.handlers.insert(handler_name, sender);
    }

    /// Append middleware. `before` hooks run in insertion order and `after`
    /// hooks in reverse, so the first middleware added is the outermost.
    pub fn add_middleware(&mut self, mw: Arc<dyn Middleware>) {
        self.middlewares.push(mw);
    }

    /// Registers a handler function under `name`.
    ///
    /// Spawns a coroutine that processes requests from a channel. Handler panics
    /// are caught and converted to 500 responses.
    ///
    /// # Safety
    ///
    /// Calls `may::coroutine::Builder::spawn()`, which is unsafe in the `may`
    /// runtime. The caller must ensure the runtime is configured before
    /// registering handlers, and handlers must not hold thread-local state
    /// across blocking points.
    pub unsafe fn register_handler<F>(&mut self, name: &str, handler_fn: F)
    where
        F: Fn(HandlerRequest) + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<HandlerRequest>();
        let name = name.to_string();
        let coroutine_name = name.clone();
        let stack_size = self.stack_size;

        // SAFETY: see the function-level contract; the closure is Send + 'static.
        let spawn_result = unsafe {
            coroutine::Builder::new()
                .name(name.clone())
                .stack_size(stack_size)
                .spawn(move || {
                    debug!(
                        handler_name = %coroutine_name,
                        stack_size = stack_size,
                        "Handler coroutine start"
                    );

                    for req in rx.iter() {
                        let reply_tx = req.reply_tx.clone();
                        let request_id = req.request_id;
                        let execution_start = Instant::now();

                        if let Err(panic) =
                            std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                                handler_fn(req);
                            }))
                        {
                            let panic_message = panic_message(panic.as_ref());
                            error!(
                                request_id = %request_id,
                                handler_name = %coroutine_name,
                                panic_message = %panic_message,
                                "Handler panicked - CRITICAL"
                            );
                            let error_response = HandlerResponse::error(
                                500,
                                &format!("Handler panicked: {panic_message}"),
                            );
                            if reply_tx.send(error_response).is_err() {
                                warn!(request_id = %request_id, "No receiver for panic response");
                            }
                        } else {
                            debug!(
                                request_id = %request_id,
                                handler_name = %coroutine_name,
                                execution_time_ms = execution_start.elapsed().as_millis() as u64,
                                "Handler execution complete"
                            );
                        }
                    }
                })
        };

        if let Err(e) = spawn_result {
            error!(
                handler_name = %name,
                error = %e,
                stack_size = stack_size,
                "Failed to spawn handler coroutine - CRITICAL"
            );
            return;
        }

        self.handlers.insert(name, tx);
    }

    /// Dispatch a request with a freshly generated request id.
    #[must_use]
    pub fn dispatch(&self, route_match: RouteMatch, headers: HeaderVec) -> HandlerResponse {
        self.dispatch_with_request_id(route_match, headers, RequestId::new())
    }

    /// Run the middleware chain and the handler for one request.
    ///
    /// Always produces a response. `after` hooks see every outcome, including
    /// early middleware responses, handler panics and missing handlers.
    #[must_use]
    pub fn dispatch_with_request_id(
        &self,
        route_match: RouteMatch,
        headers: HeaderVec,
        request_id: RequestId,
    ) -> HandlerResponse {
        let (reply_tx, reply_rx) = mpsc::channel();

        let mut request = HandlerRequest {
            request_id,
            method: route_match.route.method.clone(),
            path: route_match.route.path_pattern.to_string(),
            handler_name: route_match.handler_name,
            path_params: route_match.path_params,
            headers,
            context: RequestContext::new(),
            reply_tx,
        };

        let mut early_resp: Option<HandlerResponse> = None;
        for (idx, mw) in self.middlewares.iter().enumerate() {
            let resp = mw.before(&mut request);
            if early_resp.is_none() && resp.is_some() {
                debug!(
                    request_id = %request_id,
                    middleware_idx = idx,
                    "Middleware returned early response"
                );
                early_resp = resp;
            }
        }

        let (mut resp, latency) = match early_resp {
            Some(r) => (r, Duration::ZERO),
            None => {
                let start = Instant::now();
                let r = self.invoke(&mut request, &reply_rx);
                (r, start.elapsed())
            }
        };

        for mw in self.middlewares.iter().rev() {
            mw.after(&request, &mut resp, latency);
        }

        resp
    }

    fn invoke(
        &self,
        request: &mut HandlerRequest,
        reply_rx: &mpsc::Receiver<HandlerResponse>,
    ) -> HandlerResponse {
        let request_id = request.request_id;
        let Some(tx) = self.handlers.get(&request.handler_name) else {
            let available_handlers: Vec<&String> = self.handlers.keys().collect();
            error!(
                request_id = %request_id,
                handler_name = %request.handler_name,
                available_handlers = ?available_handlers,
                "Handler not found - CRITICAL"
            );
            return HandlerResponse::error(500, "Handler failed or not registered");
        };

        // The handler must hold the only live sender so that dropping the
        // request without replying unblocks `recv`.
        let outgoing = request.clone();
        request.reply_tx = mpsc::channel().0;

        info!(
            request_id = %request_id,
            handler_name = %request.handler_name,
            method = %request.method,
            path = %request.path,
            "Request dispatched to handler"
        );

        let start = Instant::now();
        if let Err(e) = tx.send(outgoing) {
            error!(
                request_id = %request_id,
                handler_name = %request.handler_name,
                error = %e,
                "Failed to send request to handler"
            );
            return HandlerResponse::error(503, "Handler is not accepting requests");
        }

        match reply_rx.recv() {
            Ok(response) => {
                debug!(
                    request_id = %request_id,
                    handler_name = %request.handler_name,
                    latency_ms = start.elapsed().as_millis() as u64,
                    status = response.status,
                    "Handler response received"
                );
                response
            }
            Err(e) => {
                error!(
                    request_id = %request_id,
                    handler_name = %request.handler_name,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    error = %e,
                    "Handler channel closed without a response"
                );
                HandlerResponse::error(
                    503,
                    &format!("Handler '{}' is not responding", request.handler_name),
                )
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
