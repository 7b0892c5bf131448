//! Route table and handler wiring for the service.

use std::sync::Arc;

use http::Method;

use crate::apm::TransactionRecorder;
use crate::courses::{self, CourseStore};
use crate::dispatcher::Dispatcher;
use crate::middleware::{MetricsMiddleware, TracingMiddleware, TransactionMiddleware};
use crate::router::{RouteMeta, Router};
use crate::runtime_config::RuntimeConfig;
use crate::server::AppService;

/// Every route the service answers through the dispatcher.
pub fn routes() -> Vec<RouteMeta> {
    vec![
        RouteMeta::new(Method::GET, "/", "home"),
        RouteMeta::new(Method::GET, "/cources", "list_courses"),
    ]
}

/// Register the course handlers.
///
/// # Safety
///
/// Spawns handler coroutines; see [`Dispatcher::register_handler`].
pub unsafe fn register_all(
    dispatcher: &mut Dispatcher,
    store: Arc<CourseStore>,
    recorder: Option<Arc<TransactionRecorder>>,
) {
    unsafe {
        dispatcher.register_handler("home", |req| {
            req.respond(courses::home(&req));
        });
        dispatcher.register_handler("list_courses", move |req| {
            req.respond(courses::list_courses(&req, &store, recorder.as_deref()));
        });
    }
}

/// Build the full HTTP service: router, handlers and the middleware chain.
///
/// The transaction middleware is registered first, which makes it the
/// outermost layer: it starts before tracing and metrics and finalizes after
/// their `after` hooks.
///
/// # Errors
///
/// Returns the regex error if a route pattern fails to compile.
pub fn build_service(
    recorder: Arc<TransactionRecorder>,
    store: Arc<CourseStore>,
    runtime: RuntimeConfig,
) -> Result<AppService, regex::Error> {
    let router = Router::new(routes())?;

    let metrics = Arc::new(MetricsMiddleware::new());
    let mut dispatcher = Dispatcher::with_runtime(runtime);
    dispatcher.add_middleware(Arc::new(TransactionMiddleware::new(Arc::clone(&recorder))));
    dispatcher.add_middleware(Arc::new(TracingMiddleware));
    dispatcher.add_middleware(metrics.clone());
    // SAFETY: called during startup, before the server accepts connections.
    unsafe {
        register_all(&mut dispatcher, store, Some(Arc::clone(&recorder)));
    }

    let mut service = AppService::new(Arc::new(router), Arc::new(dispatcher));
    service.set_metrics_middleware(metrics);
    service.set_recorder(recorder);
    Ok(service)
}
