//! # Router Module
//!
//! Method + path matching for the service's routes.
//!
//! Routes are declared as [`RouteMeta`] values (method, path pattern, handler
//! name). At startup every pattern such as `/cources/{id}` is compiled into an
//! anchored regex; at request time the router scans the table and returns a
//! [`RouteMatch`] carrying the handler name and the extracted path parameters.
//!
//! ```rust
//! use courseapm::router::{RouteMeta, Router};
//! use http::Method;
//!
//! let router = Router::new(vec![
//!     RouteMeta::new(Method::GET, "/", "home"),
//!     RouteMeta::new(Method::GET, "/cources", "list_courses"),
//! ])
//! .unwrap();
//!
//! let m = router.route(Method::GET, "/cources").unwrap();
//! assert_eq!(m.handler_name, "list_courses");
//! assert!(router.route(Method::POST, "/cources").is_none());
//! ```

mod core;
#[cfg(test)]
mod tests;

pub use core::{ParamVec, RouteMatch, RouteMeta, Router, MAX_INLINE_PARAMS};
