//! # courseapm
//!
//! A small course catalogue HTTP service where every request is traced as an
//! APM **transaction**: a timed unit of work made of timed **segments**. When
//! a request completes, its transaction is finalized and shipped as one
//! structured event to a log sink (AWS CloudWatch Logs in production).
//!
//! ## Architecture
//!
//! - **[`router`]** - Regex path matching of `(method, path)` to a handler name
//! - **[`dispatcher`]** - Coroutine-per-handler dispatch with a middleware chain
//! - **[`middleware`]** - Transaction lifecycle, request tracing and counters
//! - **[`apm`]** - Transactions, segments, events and the recorder that ships them
//! - **[`emitter`]** - Event sinks: CloudWatch Logs, `tracing`, memory, background queue
//! - **[`courses`]** - The catalogue: model, in-memory store and handlers
//! - **[`server`]** - `may_minihttp` service, request parsing, `/health` and `/metrics`
//! - **[`config`]** - YAML configuration with `COURSEAPM_*` environment overrides
//! - **[`logging`]** - `tracing-subscriber` setup
//! - **[`cli`]** - `courseapm serve` and `courseapm logs`
//!
//! ### Request Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Client
//!     participant Server as server::AppService
//!     participant Router as router::Router
//!     participant Disp as dispatcher::Dispatcher
//!     participant TxMw as TransactionMiddleware
//!     participant Handler as courses::list_courses
//!     participant Rec as TransactionRecorder
//!     participant Sink as Emitter
//!
//!     Client->>Server: GET /cources
//!     Server->>Router: route(GET, "/cources")
//!     Router-->>Server: RouteMatch(list_courses)
//!     Server->>Disp: dispatch(route_match, ...)
//!     Disp->>TxMw: before(&mut req)
//!     TxMw->>Rec: start()
//!     Rec-->>TxMw: Arc<Transaction>
//!     TxMw->>TxMw: attach to RequestContext
//!     Disp->>Handler: HandlerRequest (own coroutine)
//!     Handler->>Handler: open_segment()
//!     Handler->>Rec: log_message("log is running")
//!     Handler->>Handler: segment.close()
//!     Handler-->>Disp: HandlerResponse
//!     Disp->>TxMw: after(&req, &mut resp, latency)
//!     TxMw->>Rec: finalize(&tx)
//!     Rec->>Sink: submit(event JSON)
//!     Disp-->>Server: HandlerResponse
//!     Server-->>Client: 200 application/json
//! ```
//!
//! A sink failure is logged and counted; it never changes the response the
//! client already has.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use courseapm::apm::{RecorderSettings, TransactionRecorder};
//! use courseapm::courses::CourseStore;
//! use courseapm::emitter::LogEmitter;
//! use courseapm::registry::build_service;
//! use courseapm::runtime_config::RuntimeConfig;
//! use courseapm::server::HttpServer;
//!
//! # fn main() -> anyhow::Result<()> {
//! let recorder = Arc::new(TransactionRecorder::new(
//!     Arc::new(LogEmitter),
//!     RecorderSettings::default(),
//! ));
//! let service = build_service(recorder, Arc::new(CourseStore::seeded()), RuntimeConfig::default())?;
//! let handle = HttpServer(service).start("127.0.0.1:8000")?;
//! handle.wait_ready()?;
//! # handle.stop();
//! # Ok(())
//! # }
//! ```
//!
//! ## Endpoints
//!
//! | Route | Response |
//! |---|---|
//! | `GET /` | `API is running` (text) |
//! | `GET /cources` | the catalogue as a JSON array |
//! | `GET /health` | `{"status":"ok"}` |
//! | `GET /metrics` | Prometheus text |
//!
//! Anything else answers `404` with a JSON error body.

pub mod apm;
pub mod cli;
pub mod config;
pub mod courses;
pub mod dispatcher;
pub mod emitter;
pub mod ids;
pub mod logging;
pub mod middleware;
pub mod registry;
pub mod router;
pub mod runtime_config;
pub mod server;

pub use apm::{RequestContext, Transaction, TransactionRecorder};
pub use config::AppConfig;
pub use router::RouteMeta;
