//! Highlighting specification.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::config::HighlightDefaults;
use crate::error::Result;
use crate::query::Query;
use crate::query::compiler::compile_query;

fn default_require_field_match() -> bool {
    true
}

/// Highlighting of one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightField {
    /// The field to highlight.
    pub field: String,
    /// Number of fragments to return.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_fragments: Option<u32>,
    /// Size of each fragment in characters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fragment_size: Option<u32>,
    /// Highlighter implementation (`plain`, `fvh`, `unified`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlighter: Option<String>,
    /// Whether only fields matching the query are highlighted.
    #[serde(default = "default_require_field_match")]
    pub require_field_match: bool,
    /// Characters returned from the field start when nothing matches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_match_size: Option<u32>,
    /// Query used for highlighting instead of the search query.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight_query: Option<Query>,
    /// Tag inserted before each highlighted term.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_tag: Option<String>,
    /// Tag inserted after each highlighted term.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_tag: Option<String>,
}

impl HighlightField {
    /// Create a highlight field with backend or configured defaults.
    pub fn new<F: Into<String>>(field: F) -> Self {
        HighlightField {
            field: field.into(),
            number_of_fragments: None,
            fragment_size: None,
            highlighter: None,
            require_field_match: true,
            no_match_size: None,
            highlight_query: None,
            pre_tag: None,
            post_tag: None,
        }
    }

    /// Set the number of fragments and the fragment size.
    pub fn with_fragments(mut self, number_of_fragments: u32, fragment_size: u32) -> Self {
        self.number_of_fragments = Some(number_of_fragments);
        self.fragment_size = Some(fragment_size);
        self
    }

    /// Set the highlighter implementation.
    pub fn with_highlighter<S: Into<String>>(mut self, highlighter: S) -> Self {
        self.highlighter = Some(highlighter.into());
        self
    }

    /// Set the tags surrounding highlighted terms.
    pub fn with_tags<P: Into<String>, Q: Into<String>>(mut self, pre: P, post: Q) -> Self {
        self.pre_tag = Some(pre.into());
        self.post_tag = Some(post.into());
        self
    }

    /// Set the highlight query.
    pub fn with_highlight_query(mut self, query: Query) -> Self {
        self.highlight_query = Some(query);
        self
    }

    /// Set whether only matching fields are highlighted.
    pub fn with_require_field_match(mut self, require: bool) -> Self {
        self.require_field_match = require;
        self
    }

    /// Set the no-match size.
    pub fn with_no_match_size(mut self, size: u32) -> Self {
        self.no_match_size = Some(size);
        self
    }
}

/// Highlighting of a set of fields.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HighlightCommand {
    /// The highlighted fields.
    pub fields: Vec<HighlightField>,
}

impl HighlightCommand {
    /// Create an empty highlight command.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field.
    pub fn add_field(mut self, field: HighlightField) -> Self {
        self.fields.push(field);
        self
    }

    /// Compile into a native `highlight` object.
    ///
    /// With `defaults`, unset fragment settings fall back to them; without,
    /// only explicitly given settings are emitted.
    pub fn compile(&self, defaults: Option<&HighlightDefaults>) -> Result<Value> {
        let mut fields = Map::new();
        for field in &self.fields {
            fields.insert(field.field.clone(), compile_field(field, defaults)?);
        }
        Ok(json!({ "fields": fields }))
    }
}

fn compile_field(field: &HighlightField, defaults: Option<&HighlightDefaults>) -> Result<Value> {
    let mut options = Map::new();

    let fragment_size = field
        .fragment_size
        .or_else(|| defaults.map(|d| d.fragment_size));
    let number_of_fragments = field
        .number_of_fragments
        .or_else(|| defaults.map(|d| d.number_of_fragments));
    if let Some(size) = fragment_size {
        options.insert("fragment_size".into(), json!(size));
    }
    if let Some(number) = number_of_fragments {
        options.insert("number_of_fragments".into(), json!(number));
    }

    if let Some(highlighter) = &field.highlighter {
        options.insert("type".into(), json!(highlighter));
    }
    if !field.require_field_match {
        options.insert("require_field_match".into(), json!(false));
    }
    if let Some(size) = field.no_match_size {
        options.insert("no_match_size".into(), json!(size));
    }
    if let Some(query) = &field.highlight_query {
        options.insert("highlight_query".into(), compile_query(query)?);
    }
    if let Some(pre) = &field.pre_tag {
        options.insert("pre_tags".into(), json!([pre]));
    }
    if let Some(post) = &field.post_tag {
        options.insert("post_tags".into(), json!([post]));
    }

    Ok(Value::Object(options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::TermQuery;

    #[test]
    fn test_defaults_applied() {
        let command = HighlightCommand::new().add_field(HighlightField::new("body"));
        let native = command.compile(Some(&HighlightDefaults::default())).unwrap();
        assert_eq!(
            native,
            json!({"fields": {"body": {"fragment_size": 100, "number_of_fragments": 5}}})
        );
    }

    #[test]
    fn test_without_defaults() {
        let command = HighlightCommand::new().add_field(HighlightField::new("body"));
        let native = command.compile(None).unwrap();
        assert_eq!(native, json!({"fields": {"body": {}}}));
    }

    #[test]
    fn test_full_field() {
        let command = HighlightCommand::new().add_field(
            HighlightField::new("title")
                .with_fragments(2, 50)
                .with_highlighter("fvh")
                .with_require_field_match(false)
                .with_no_match_size(20)
                .with_tags("<b>", "</b>")
                .with_highlight_query(TermQuery::new("title", "rust").into()),
        );
        let native = command.compile(Some(&HighlightDefaults::default())).unwrap();
        assert_eq!(
            native,
            json!({"fields": {"title": {
                "fragment_size": 50,
                "number_of_fragments": 2,
                "type": "fvh",
                "require_field_match": false,
                "no_match_size": 20,
                "highlight_query": {"term": {"title": {"value": "rust"}}},
                "pre_tags": ["<b>"],
                "post_tags": ["</b>"]
            }}})
        );
    }
}
