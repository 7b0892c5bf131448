use parking_lot::RwLock;

use super::Course;

/// In-memory course repository, owned by the application and handed to handlers.
#[derive(Debug, Default)]
pub struct CourseStore {
    courses: RwLock<Vec<Course>>,
}

impl CourseStore {
    pub fn new(courses: Vec<Course>) -> Self {
        Self {
            courses: RwLock::new(courses),
        }
    }

    /// The two courses the service starts with.
    pub fn seeded() -> Self {
        Self::new(vec![
            Course::new("1", "Go", 10, "Go"),
            Course::new("2", "Python", 20, "Python"),
        ])
    }

    /// Snapshot of every course in insertion order.
    #[must_use]
    pub fn list(&self) -> Vec<Course> {
        self.courses.read().clone()
    }

    /// Append a course; empty records are ignored. Returns whether it was stored.
    pub fn add(&self, course: Course) -> bool {
        if course.is_empty() {
            return false;
        }
        self.courses.write().push(course);
        true
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.courses.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.courses.read().is_empty()
    }
}
