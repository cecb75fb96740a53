//! Completion suggestions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Name under which the completion suggester is registered in the request
/// and looked up in the response.
pub const SUGGESTION_NAME: &str = "completion";

/// A free-text completion suggestion on a completion field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionCommand {
    /// The text to complete.
    pub text: String,
    /// The completion field.
    pub field: String,
    /// Context filters, by context name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub categories: BTreeMap<String, Vec<String>>,
    /// Maximum number of suggestions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
}

impl SuggestionCommand {
    /// Create a suggestion without context filters.
    pub fn new<T: Into<String>, F: Into<String>>(text: T, field: F) -> Self {
        SuggestionCommand {
            text: text.into(),
            field: field.into(),
            categories: BTreeMap::new(),
            size: None,
        }
    }

    /// Restrict suggestions to the given values of a context.
    pub fn with_category<C, I, V>(mut self, context: C, values: I) -> Self
    where
        C: Into<String>,
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.categories
            .insert(context.into(), values.into_iter().map(Into::into).collect());
        self
    }

    /// Set the maximum number of suggestions.
    pub fn with_size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    /// Native `suggest` section.
    pub fn compile(&self) -> Value {
        let mut completion = Map::new();
        completion.insert("field".into(), json!(self.field));
        if let Some(size) = self.size {
            completion.insert("size".into(), json!(size));
        }
        if !self.categories.is_empty() {
            completion.insert("contexts".into(), json!(self.categories));
        }
        json!({
            SUGGESTION_NAME: {
                "text": self.text,
                "completion": completion
            }
        })
    }
}
