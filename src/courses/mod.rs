//! The demo domain: a fixed catalogue of courses served over HTTP.

mod handlers;
mod model;
mod store;

pub use handlers::{home, list_courses, HOME_MESSAGE, LIST_LOG_MESSAGE};
pub use model::Course;
pub use store::CourseStore;
