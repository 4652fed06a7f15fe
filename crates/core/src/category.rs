use serde::{Deserialize, Serialize};

use crate::ids::{CategoryId, TagId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    /// Fallback for statements no pattern claims. Exactly one category
    /// carries the flag.
    #[serde(default, rename = "default")]
    pub is_default: bool,
}

impl Category {
    pub fn new(id: CategoryId, name: &str) -> Self {
        Category {
            id,
            name: name.to_string(),
            is_default: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    /// Category this tag pushes a statement towards.
    #[serde(default)]
    pub category_id: Option<CategoryId>,
}

impl Tag {
    pub fn new(id: TagId, name: &str, category_id: Option<CategoryId>) -> Self {
        Tag {
            id,
            name: name.to_string(),
            category_id,
        }
    }
}
