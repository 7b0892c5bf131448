use serde::{Deserialize, Serialize};

/// One course in the catalogue. Field names are part of the public JSON contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub cource_id: String,
    pub name: String,
    pub price: i64,
    pub language: String,
}

impl Course {
    pub fn new(cource_id: &str, name: &str, price: i64, language: &str) -> Self {
        Self {
            cource_id: cource_id.to_string(),
            name: name.to_string(),
            price,
            language: language.to_string(),
        }
    }

    /// A course with neither id nor name carries no information.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cource_id.is_empty() && self.name.is_empty()
    }
}
