//! Sort specification.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Direction of a sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    /// Native name of the direction.
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "asc",
            SortOrder::Descending => "desc",
        }
    }
}

/// Sort on one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortCommand {
    /// The field to sort on.
    pub field: String,
    /// The direction.
    pub order: SortOrder,
}

impl SortCommand {
    /// Create a new sort command.
    pub fn new<F: Into<String>>(field: F, order: SortOrder) -> Self {
        SortCommand {
            field: field.into(),
            order,
        }
    }

    /// Ascending sort on a field.
    pub fn ascending<F: Into<String>>(field: F) -> Self {
        Self::new(field, SortOrder::Ascending)
    }

    /// Descending sort on a field.
    pub fn descending<F: Into<String>>(field: F) -> Self {
        Self::new(field, SortOrder::Descending)
    }

    /// Native sort clause.
    pub fn compile(&self) -> Value {
        json!({ self.field.as_str(): { "order": self.order.as_str() } })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile() {
        assert_eq!(
            SortCommand::descending("date").compile(),
            json!({"date": {"order": "desc"}})
        );
        assert_eq!(
            SortCommand::ascending("_doc").compile(),
            json!({"_doc": {"order": "asc"}})
        );
    }
}
