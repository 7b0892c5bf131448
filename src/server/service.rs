use super::request::{parse_request, ParsedRequest};
use super::response::{write_handler_response, write_json_error, write_text};
use crate::apm::TransactionRecorder;
use crate::dispatcher::Dispatcher;
use crate::ids::RequestId;
use crate::middleware::MetricsMiddleware;
use crate::router::Router;
use http::Method;
use may_minihttp::{HttpService, Request, Response};
use serde_json::json;
use std::io;
use std::sync::Arc;
use tracing::warn;

/// The `may_minihttp` service: infrastructure endpoints, then router + dispatcher.
#[derive(Clone)]
pub struct AppService {
    pub router: Arc<Router>,
    pub dispatcher: Arc<Dispatcher>,
    pub metrics: Option<Arc<MetricsMiddleware>>,
    pub recorder: Option<Arc<TransactionRecorder>>,
}

impl AppService {
    pub fn new(router: Arc<Router>, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            router,
            dispatcher,
            metrics: None,
            recorder: None,
        }
    }

    pub fn set_metrics_middleware(&mut self, metrics: Arc<MetricsMiddleware>) {
        self.metrics = Some(metrics);
    }

    pub fn set_recorder(&mut self, recorder: Arc<TransactionRecorder>) {
        self.recorder = Some(recorder);
    }
}

/// Basic health check endpoint returning `{ "status": "ok" }`.
pub fn health_endpoint(res: &mut Response) -> io::Result<()> {
    write_handler_response(
        res,
        crate::dispatcher::HandlerResponse::json(200, json!({ "status": "ok" })),
    );
    Ok(())
}

/// Prometheus text exposition of request and transaction counters.
pub fn render_metrics(
    metrics: Option<&MetricsMiddleware>,
    recorder: Option<&TransactionRecorder>,
) -> String {
    let mut body = String::new();
    let mut gauge = |name: &str, kind: &str, help: &str, value: String| {
        body.push_str(&format!(
            "# HELP {name} {help}\n# TYPE {name} {kind}\n{name} {value}\n"
        ));
    };
    if let Some(m) = metrics {
        gauge(
            "courseapm_requests_total",
            "counter",
            "Total number of dispatched requests",
            m.request_count().to_string(),
        );
        gauge(
            "courseapm_request_latency_seconds",
            "gauge",
            "Average request latency in seconds",
            m.average_latency().as_secs_f64().to_string(),
        );
        gauge(
            "courseapm_server_errors_total",
            "counter",
            "Responses with a 5xx status",
            m.server_errors().to_string(),
        );
        gauge(
            "courseapm_top_level_requests_total",
            "counter",
            "Infrastructure endpoint requests",
            m.top_level_request_count().to_string(),
        );
        gauge(
            "courseapm_coroutine_stack_bytes",
            "gauge",
            "Configured coroutine stack size",
            m.stack_size().to_string(),
        );
    }
    if let Some(r) = recorder {
        let stats = r.stats();
        gauge(
            "courseapm_transactions_started_total",
            "counter",
            "Transactions started",
            stats.started.to_string(),
        );
        gauge(
            "courseapm_transactions_finalized_total",
            "counter",
            "Transactions finalized",
            stats.finalized.to_string(),
        );
        gauge(
            "courseapm_emission_failures_total",
            "counter",
            "Events or log lines the sink did not accept",
            stats.emission_failures.to_string(),
        );
    }
    body
}

impl HttpService for AppService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        let parsed = parse_request(req);

        if parsed.method == "GET" && (parsed.path == "/health" || parsed.path == "/metrics") {
            if let Some(m) = &self.metrics {
                m.inc_top_level_request();
            }
            if parsed.path == "/health" {
                return health_endpoint(res);
            }
            let body = render_metrics(self.metrics.as_deref(), self.recorder.as_deref());
            write_text(res, 200, "text/plain; version=0.0.4", body);
            return Ok(());
        }

        let ParsedRequest {
            method,
            path,
            headers,
        } = parsed;

        let Ok(http_method) = method.parse::<Method>() else {
            warn!(method = %method, path = %path, "Unparsable request method");
            write_json_error(
                res,
                400,
                json!({"error": "Bad Request", "method": method, "path": path}),
            );
            return Ok(());
        };

        let Some(route_match) = self.router.route(http_method, &path) else {
            write_json_error(
                res,
                404,
                json!({"error": "Not Found", "method": method, "path": path}),
            );
            return Ok(());
        };

        let request_id = RequestId::from_header_or_new(
            headers
                .iter()
                .find(|(k, _)| k.as_ref() == "x-request-id")
                .map(|(_, v)| v.as_str()),
        );
        let handler_response =
            self.dispatcher
                .dispatch_with_request_id(route_match, headers, request_id);
        write_handler_response(res, handler_response);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apm::RecorderSettings;
    use crate::emitter::MemoryEmitter;

    #[test]
    fn metrics_text_lists_transaction_counters() {
        let recorder = TransactionRecorder::new(
            Arc::new(MemoryEmitter::new()),
            RecorderSettings::default(),
        );
        let tx = recorder.start();
        recorder.finalize(&tx);

        let text = render_metrics(Some(&MetricsMiddleware::new()), Some(&recorder));
        assert!(text.contains("courseapm_requests_total 0\n"));
        assert!(text.contains("courseapm_transactions_started_total 1\n"));
        assert!(text.contains("courseapm_transactions_finalized_total 1\n"));
        assert!(text.contains("# TYPE courseapm_emission_failures_total counter\n"));
    }

    #[test]
    fn metrics_text_is_empty_without_sources() {
        assert!(render_metrics(None, None).is_empty());
    }
}
