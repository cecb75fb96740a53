//! Wire form of the backend's search responses.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Whether a total hit count is exact or a lower bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TotalHitsRelation {
    /// The count is exact.
    #[default]
    Eq,
    /// The count is a lower bound.
    Gte,
}

impl TotalHitsRelation {
    /// Native name of the relation.
    pub fn as_str(&self) -> &'static str {
        match self {
            TotalHitsRelation::Eq => "eq",
            TotalHitsRelation::Gte => "gte",
        }
    }
}

/// Total hit count of a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct NativeTotalHits {
    /// The count.
    pub value: u64,
    /// Whether the count is exact.
    pub relation: TotalHitsRelation,
}

impl<'de> Deserialize<'de> for NativeTotalHits {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Older backends report the total as a bare number.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Object {
                value: u64,
                #[serde(default)]
                relation: TotalHitsRelation,
            },
            Count(u64),
        }

        Ok(match Wire::deserialize(deserializer)? {
            Wire::Object { value, relation } => NativeTotalHits { value, relation },
            Wire::Count(value) => NativeTotalHits {
                value,
                relation: TotalHitsRelation::Eq,
            },
        })
    }
}

/// One hit.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NativeHit {
    #[serde(rename = "_index", default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "_score", default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(rename = "_source", default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub fields: Map<String, Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub highlight: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub inner_hits: BTreeMap<String, NativeInnerHits>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<Value>,
}

/// Inner hits of one nested path.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NativeInnerHits {
    #[serde(default)]
    pub hits: NativeHits,
}

/// Hits section of a response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NativeHits {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<NativeTotalHits>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_score: Option<f64>,
    #[serde(default)]
    pub hits: Vec<NativeHit>,
}

/// A search, scroll or point-in-time response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NativeSearchResponse {
    #[serde(rename = "_scroll_id", default, skip_serializing_if = "Option::is_none")]
    pub scroll_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pit_id: Option<String>,
    #[serde(default)]
    pub took: u64,
    #[serde(default)]
    pub timed_out: bool,
    #[serde(default)]
    pub hits: NativeHits,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub aggregations: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub suggest: Map<String, Value>,
}

impl NativeSearchResponse {
    /// Total hit count, zero when the backend reported none.
    pub fn total_hits(&self) -> u64 {
        self.hits.total.map(|total| total.value).unwrap_or(0)
    }
}

/// One option of a completion suggestion.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NativeSuggestOption {
    #[serde(default)]
    pub text: String,
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "_score", default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(rename = "_source", default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Map<String, Value>>,
}

/// One entry of a suggestion: the completed text and its options.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NativeSuggestEntry {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub options: Vec<NativeSuggestOption>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_search_response() {
        let response: NativeSearchResponse = serde_json::from_value(json!({
            "_scroll_id": "c2Nyb2xs",
            "took": 3,
            "timed_out": false,
            "hits": {
                "total": {"value": 10000, "relation": "gte"},
                "max_score": null,
                "hits": [{
                    "_index": "docs",
                    "_id": "1",
                    "_score": null,
                    "fields": {"title": ["Rust"]},
                    "sort": [0]
                }]
            }
        }))
        .unwrap();

        assert_eq!(response.scroll_id.as_deref(), Some("c2Nyb2xs"));
        assert_eq!(response.total_hits(), 10000);
        assert_eq!(response.hits.total.unwrap().relation, TotalHitsRelation::Gte);
        assert_eq!(response.hits.hits[0].sort, vec![json!(0)]);
        assert_eq!(response.hits.hits[0].score, None);
    }

    #[test]
    fn test_legacy_total() {
        let hits: NativeHits = serde_json::from_value(json!({"total": 7, "hits": []})).unwrap();
        assert_eq!(
            hits.total,
            Some(NativeTotalHits {
                value: 7,
                relation: TotalHitsRelation::Eq
            })
        );
    }
}
