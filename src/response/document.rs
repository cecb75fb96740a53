//! Documents returned by a search.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::response::native::NativeHit;

/// A document hit.
///
/// Field values are looked up by name; a field the backend did not return
/// is simply empty.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SearchServerDocument {
    id: Option<String>,
    index: Option<String>,
    score: Option<f64>,
    fields: BTreeMap<String, Vec<Value>>,
    source: Option<Map<String, Value>>,
    highlights: BTreeMap<String, Vec<String>>,
    inner_hits: BTreeMap<String, Vec<SearchServerDocument>>,
    sort_values: Vec<Value>,
}

fn as_values(value: Value) -> Vec<Value> {
    match value {
        Value::Array(values) => values,
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

impl SearchServerDocument {
    /// Build a document from a hit of the main result list.
    ///
    /// Field values come from the returned stored fields only.
    pub fn from_hit(hit: NativeHit) -> Self {
        let inner_hits = hit
            .inner_hits
            .into_iter()
            .map(|(path, inner)| {
                let documents = inner.hits.hits.into_iter().map(Self::from_hit).collect();
                (path, documents)
            })
            .collect();

        SearchServerDocument {
            id: hit.id,
            index: hit.index,
            score: hit.score,
            fields: hit
                .fields
                .into_iter()
                .map(|(name, value)| (name, as_values(value)))
                .collect(),
            source: hit.source,
            highlights: hit.highlight,
            inner_hits,
            sort_values: hit.sort,
        }
    }

    /// Build a document from a top-hits aggregation hit.
    ///
    /// Top hits carry the document source rather than projected stored
    /// fields, so every top level source entry becomes a field.
    pub fn from_top_hit(hit: NativeHit) -> Self {
        let source_fields: Vec<(String, Vec<Value>)> = hit
            .source
            .iter()
            .flat_map(|source| source.iter())
            .map(|(name, value)| (name.clone(), as_values(value.clone())))
            .collect();

        let mut document = Self::from_hit(hit);
        for (name, values) in source_fields {
            document.fields.entry(name).or_insert(values);
        }
        document
    }

    /// Create a document from an id and field values.
    pub fn new<I: Into<String>>(id: I) -> Self {
        SearchServerDocument {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    /// Add a field value.
    pub fn with_field<N: Into<String>, V: Into<Value>>(mut self, name: N, value: V) -> Self {
        self.fields.entry(name.into()).or_default().push(value.into());
        self
    }

    /// The document id.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// The index the document was found in.
    pub fn index(&self) -> Option<&str> {
        self.index.as_deref()
    }

    /// The score, absent when the search was sorted without scoring.
    pub fn score(&self) -> Option<f64> {
        self.score
    }

    /// All values of a field; empty when the field was not returned.
    pub fn field_values(&self, name: &str) -> &[Value] {
        self.fields.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The first value of a field.
    pub fn field_value(&self, name: &str) -> Option<&Value> {
        self.field_values(name).first()
    }

    /// The first value of a field converted to `T`.
    pub fn field_as<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        self.field_value(name)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Names of the returned fields.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// The document source, when it was fetched.
    pub fn source(&self) -> Option<&Map<String, Value>> {
        self.source.as_ref()
    }

    /// Highlight fragments, by field.
    pub fn highlights(&self) -> &BTreeMap<String, Vec<String>> {
        &self.highlights
    }

    /// Highlight fragments of one field.
    pub fn highlight(&self, field: &str) -> &[String] {
        self.highlights.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Inner hits, by nested path.
    pub fn inner_hits(&self) -> &BTreeMap<String, Vec<SearchServerDocument>> {
        &self.inner_hits
    }

    /// Sort values of the hit.
    pub fn sort_values(&self) -> &[Value] {
        &self.sort_values
    }
}
