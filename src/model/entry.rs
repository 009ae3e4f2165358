use serde::{Deserialize, Serialize};
use std::fmt;

/// One row of the ledger as shown to the user: a category name and the
/// computed value of its cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub category: String,
    pub value: String,
}

impl Entry {
    pub fn new(category: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.category, self.value)
    }
}
