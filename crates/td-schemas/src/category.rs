use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CategoryError {
    #[error("category must not be empty")]
    Empty,
}

/// Category key: the id prefix shared by every record of the category.
///
/// Always upper-cased. Membership is a plain prefix test on the record id;
/// ids are never case-folded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Category(String);

impl Category {
    pub fn parse(raw: &str) -> Result<Self, CategoryError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CategoryError::Empty);
        }
        Ok(Self(trimmed.to_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True iff a record with this id belongs to the category.
    pub fn owns(&self, id: &str) -> bool {
        id.starts_with(self.0.as_str())
    }
}

impl TryFrom<String> for Category {
    type Error = CategoryError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Category::parse(&raw)
    }
}

impl From<Category> for String {
    fn from(c: Category) -> Self {
        c.0
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
