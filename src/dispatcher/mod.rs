//! # Dispatcher Module
//!
//! Coroutine-based request handler dispatch.
//!
//! ## Overview
//!
//! - Each registered handler runs in its own `may` coroutine and receives
//!   requests over an MPSC channel
//! - Handlers answer through the one-shot `reply_tx` carried by each
//!   [`HandlerRequest`]
//! - Middleware `before` hooks run ahead of the handler and may attach state to
//!   the request's [`RequestContext`](crate::apm::RequestContext)
//! - Middleware `after` hooks run in reverse registration order on **every**
//!   exit path: normal response,
//!   early middleware response, handler panic (500) and unresponsive handler
//!   (503). The transaction middleware depends on this to finalize exactly once
//!
//! ## Handler Registration
//!
//! ```rust,ignore
//! use courseapm::dispatcher::{Dispatcher, HandlerResponse};
//!
//! let mut dispatcher = Dispatcher::new();
//! unsafe {
//!     dispatcher.register_handler("home", |req| {
//!         req.respond(HandlerResponse::text(200, "API is running"));
//!     });
//! }
//! ```
//!
//! ## Error Handling
//!
//! - Unknown handler names return 500
//! - Handler panics are caught and return 500
//! - A handler that drops its request without replying yields 503

mod core;

pub use core::{Dispatcher, HandlerRequest, HandlerResponse, HandlerSender, HeaderVec};
