//! In-memory search backend for testing and local simulation.
//!
//! [`InMemoryTransport`] evaluates the subset of the native DSL this crate
//! produces for filtering and sorting: `match_all`, `match`, `term`,
//! `terms`, `range`, `bool` and `constant_score` queries, field and
//! `_doc`/`_shard_doc` sorting, scrolls, points-in-time with `search_after`,
//! `terms`/`max`/`significant_terms`/`top_hits` aggregations and completion
//! suggestions. Anything else is answered with status 400.
//!
//! Failures can be injected to exercise the error paths of callers.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::io::BufRead;

use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value, json};
use uuid::Uuid;

use crate::error::{ElasticQueryError, Result, TransportError};
use crate::request::deep_pagination::KeepAlive;
use crate::response::native::{NativeHit, NativeSearchResponse, NativeTotalHits, TotalHitsRelation};
use crate::transport::{NativeSearchRequest, SearchTransport, TransportResult};

const DEFAULT_SIZE: usize = 10;
const DEFAULT_TRACK_TOTAL_HITS: u64 = 10_000;
const DEFAULT_TOP_HITS_SIZE: usize = 3;
const DEFAULT_TERMS_SIZE: usize = 10;

/// Counters of the calls a transport received.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportStats {
    /// Search calls, including point-in-time continuations.
    pub searches: usize,
    /// Scroll continuation calls.
    pub scrolls: usize,
    /// Scroll release calls.
    pub scroll_clears: usize,
    /// Point-in-time open calls.
    pub pits_opened: usize,
    /// Point-in-time close calls.
    pub pits_closed: usize,
    /// Count calls.
    pub counts: usize,
}

/// Failures the transport simulates.
#[derive(Debug, Clone, Default)]
struct FailurePlan {
    unreachable: bool,
    continuations: bool,
    releases: bool,
    failing_indices: HashMap<String, u16>,
}

#[derive(Debug, Clone)]
struct StoredDocument {
    id: String,
    source: Map<String, Value>,
}

#[derive(Debug)]
struct ScrollContext {
    index: String,
    order: Vec<usize>,
    position: usize,
    size: usize,
    body: Value,
}

/// An in-memory search backend.
#[derive(Debug, Default)]
pub struct InMemoryTransport {
    /// Documents by index, in insertion order.
    indices: RwLock<BTreeMap<String, Vec<StoredDocument>>>,
    /// Open scroll contexts by id.
    scrolls: Mutex<HashMap<String, ScrollContext>>,
    /// Open points-in-time by id, with the index they cover.
    points_in_time: Mutex<HashMap<String, String>>,
    /// Injected failures.
    failures: Mutex<FailurePlan>,
    /// Call counters.
    stats: Mutex<TransportStats>,
}

impl InMemoryTransport {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an index if it does not exist yet.
    pub fn create_index(&self, index: &str) {
        self.indices.write().entry(index.to_string()).or_default();
    }

    /// Add a document; its source must be a JSON object.
    pub fn add_document<I: Into<String>>(&self, index: &str, id: I, source: Value) -> Result<()> {
        let Value::Object(source) = source else {
            return Err(ElasticQueryError::invalid_argument(
                "A document source must be a JSON object",
            ));
        };
        self.indices
            .write()
            .entry(index.to_string())
            .or_default()
            .push(StoredDocument {
                id: id.into(),
                source,
            });
        Ok(())
    }

    /// Add documents whose ids are their position in `sources`.
    pub fn add_documents<I>(&self, index: &str, sources: I) -> Result<usize>
    where
        I: IntoIterator<Item = Value>,
    {
        let start = self.document_count(index);
        let mut added = 0;
        for (offset, source) in sources.into_iter().enumerate() {
            self.add_document(index, (start + offset).to_string(), source)?;
            added += 1;
        }
        Ok(added)
    }

    /// Load one JSON object per line. The id is taken from an `_id` or `id`
    /// member, or else the line number.
    pub fn load_json_lines<R: BufRead>(&self, index: &str, reader: R) -> Result<usize> {
        let mut loaded = 0;
        for (number, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let mut source: Value = serde_json::from_str(&line)?;
            let id = match source.as_object_mut().and_then(|map| map.remove("_id")) {
                Some(Value::String(id)) => id,
                Some(other) => other.to_string(),
                None => match source.get("id") {
                    Some(Value::String(id)) => id.clone(),
                    Some(other) => other.to_string(),
                    None => (number + 1).to_string(),
                },
            };
            self.add_document(index, id, source)?;
            loaded += 1;
        }
        Ok(loaded)
    }

    /// Number of documents in an index.
    pub fn document_count(&self, index: &str) -> usize {
        self.indices.read().get(index).map(Vec::len).unwrap_or(0)
    }

    /// Make every call fail as if no node could be reached.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.failures.lock().unreachable = unreachable;
    }

    /// Make scroll and `search_after` continuations fail.
    pub fn fail_continuations(&self, fail: bool) {
        self.failures.lock().continuations = fail;
    }

    /// Make scroll and point-in-time releases fail.
    pub fn fail_releases(&self, fail: bool) {
        self.failures.lock().releases = fail;
    }

    /// Answer searches on `index` with the given status.
    pub fn fail_searches_on(&self, index: &str, status: u16) {
        self.failures
            .lock()
            .failing_indices
            .insert(index.to_string(), status);
    }

    /// Call counters so far.
    pub fn stats(&self) -> TransportStats {
        *self.stats.lock()
    }

    /// Number of scroll contexts still open.
    pub fn open_scrolls(&self) -> usize {
        self.scrolls.lock().len()
    }

    /// Number of points-in-time still open.
    pub fn open_points_in_time(&self) -> usize {
        self.points_in_time.lock().len()
    }

    fn check_reachable(&self) -> TransportResult<()> {
        if self.failures.lock().unreachable {
            Err(TransportError::NoNodeAvailable(
                "None of the configured nodes are available".to_string(),
            ))
        } else {
            Ok(())
        }
    }

    fn resolve_index(&self, request: &NativeSearchRequest) -> TransportResult<String> {
        match request.body.get("pit").and_then(|pit| pit.get("id")).and_then(Value::as_str) {
            Some(pit_id) => self.points_in_time.lock().get(pit_id).cloned().ok_or_else(|| {
                TransportError::Status {
                    status: 404,
                    reason: format!("search_context_missing_exception: no point-in-time [{pit_id}]"),
                }
            }),
            None => Ok(request.index.clone()),
        }
    }

    fn execute(&self, index: &str, body: &Value) -> TransportResult<(NativeSearchResponse, Vec<usize>)> {
        if let Some(status) = self.failures.lock().failing_indices.get(index) {
            return Err(TransportError::Status {
                status: *status,
                reason: format!("search_phase_execution_exception on [{index}]"),
            });
        }

        let indices = self.indices.read();
        let documents = indices.get(index).ok_or_else(|| index_not_found(index))?;

        let mut matching = Vec::new();
        for (position, document) in documents.iter().enumerate() {
            if matches_query(body.get("query"), &document.source)? {
                matching.push(position);
            }
        }

        let sort = sort_keys(body.get("sort"))?;
        let mut keyed: Vec<(usize, Vec<Value>)> = matching
            .iter()
            .map(|position| (*position, sort_values(&sort, &documents[*position], *position)))
            .collect();
        keyed.sort_by(|(a, x), (b, y)| compare_tuples(&sort, x, y).then(a.cmp(b)));

        let mut response = NativeSearchResponse::default();
        let total = matching.len() as u64;
        match body.get("track_total_hits") {
            Some(Value::Bool(false)) => {}
            Some(Value::Bool(true)) => response.hits.total = Some(total_hits(total, u64::MAX)),
            Some(limit) => {
                let limit = limit.as_u64().unwrap_or(DEFAULT_TRACK_TOTAL_HITS);
                response.hits.total = Some(total_hits(total, limit));
            }
            None => response.hits.total = Some(total_hits(total, DEFAULT_TRACK_TOTAL_HITS)),
        }

        if let Some(aggs) = body.get("aggs").and_then(Value::as_object) {
            response.aggregations = aggregate(aggs, documents, &matching, documents.len())?;
        }
        if let Some(suggest) = body.get("suggest").and_then(Value::as_object) {
            response.suggest = suggest_completions(suggest, documents);
        }

        if let Some(after) = body.get("search_after").and_then(Value::as_array) {
            keyed.retain(|(_, values)| compare_tuples(&sort, values, after) == Ordering::Greater);
        }
        let mut matching: Vec<usize> = keyed.into_iter().map(|(position, _)| position).collect();

        let from = body.get("from").and_then(Value::as_u64).unwrap_or(0) as usize;
        let size = body
            .get("size")
            .and_then(Value::as_u64)
            .map(|size| size as usize)
            .unwrap_or(DEFAULT_SIZE);
        let page: Vec<usize> = matching.iter().skip(from).take(size).copied().collect();
        response.hits.hits = page
            .iter()
            .map(|position| render_hit(index, &sort, documents, *position, body))
            .collect::<TransportResult<_>>()?;

        let rest = matching.split_off((from + size).min(matching.len()));
        Ok((response, rest))
    }

    fn bump(&self, update: impl FnOnce(&mut TransportStats)) {
        update(&mut self.stats.lock());
    }
}

impl SearchTransport for InMemoryTransport {
    fn search(&self, request: &NativeSearchRequest) -> TransportResult<NativeSearchResponse> {
        self.bump(|stats| stats.searches += 1);
        self.check_reachable()?;

        let continuation = request.body.get("search_after").is_some();
        if continuation && self.failures.lock().continuations {
            return Err(TransportError::Io("connection reset by peer".to_string()));
        }

        let index = self.resolve_index(request)?;
        let (mut response, rest) = self.execute(&index, &request.body)?;

        if let Some(pit_id) = request.body.get("pit").and_then(|pit| pit.get("id")).and_then(Value::as_str) {
            response.pit_id = Some(pit_id.to_string());
        }
        if request.scroll.is_some() {
            let scroll_id = Uuid::new_v4().to_string();
            let size = request
                .body
                .get("size")
                .and_then(Value::as_u64)
                .map(|size| size as usize)
                .unwrap_or(DEFAULT_SIZE);
            self.scrolls.lock().insert(
                scroll_id.clone(),
                ScrollContext {
                    index,
                    order: rest,
                    position: 0,
                    size,
                    body: request.body.clone(),
                },
            );
            response.scroll_id = Some(scroll_id);
        }
        Ok(response)
    }

    fn scroll(&self, scroll_id: &str, _keep_alive: &KeepAlive) -> TransportResult<NativeSearchResponse> {
        self.bump(|stats| stats.scrolls += 1);
        self.check_reachable()?;
        if self.failures.lock().continuations {
            return Err(TransportError::Io("connection reset by peer".to_string()));
        }

        let mut scrolls = self.scrolls.lock();
        let context = scrolls.get_mut(scroll_id).ok_or_else(|| TransportError::Status {
            status: 404,
            reason: format!("search_context_missing_exception: no scroll [{scroll_id}]"),
        })?;

        let indices = self.indices.read();
        let documents = indices
            .get(&context.index)
            .ok_or_else(|| index_not_found(&context.index))?;
        let sort = sort_keys(context.body.get("sort"))?;

        let end = (context.position + context.size).min(context.order.len());
        let page = &context.order[context.position..end];
        let hits = page
            .iter()
            .map(|position| render_hit(&context.index, &sort, documents, *position, &context.body))
            .collect::<TransportResult<Vec<_>>>()?;
        context.position = end;

        let mut response = NativeSearchResponse::default();
        response.scroll_id = Some(scroll_id.to_string());
        response.hits.hits = hits;
        Ok(response)
    }

    fn clear_scroll(&self, scroll_id: &str) -> TransportResult<()> {
        self.bump(|stats| stats.scroll_clears += 1);
        self.check_reachable()?;
        if self.failures.lock().releases {
            return Err(TransportError::Io("connection reset by peer".to_string()));
        }
        self.scrolls.lock().remove(scroll_id);
        Ok(())
    }

    fn open_point_in_time(&self, index: &str, _keep_alive: &KeepAlive) -> TransportResult<String> {
        self.bump(|stats| stats.pits_opened += 1);
        self.check_reachable()?;
        if !self.indices.read().contains_key(index) {
            return Err(index_not_found(index));
        }
        let pit_id = Uuid::new_v4().to_string();
        self.points_in_time
            .lock()
            .insert(pit_id.clone(), index.to_string());
        Ok(pit_id)
    }

    fn close_point_in_time(&self, pit_id: &str) -> TransportResult<()> {
        self.bump(|stats| stats.pits_closed += 1);
        self.check_reachable()?;
        if self.failures.lock().releases {
            return Err(TransportError::Io("connection reset by peer".to_string()));
        }
        self.points_in_time.lock().remove(pit_id);
        Ok(())
    }

    fn count(&self, index: &str, query: Option<&Value>) -> TransportResult<u64> {
        self.bump(|stats| stats.counts += 1);
        self.check_reachable()?;
        let indices = self.indices.read();
        let documents = indices.get(index).ok_or_else(|| index_not_found(index))?;
        let mut count = 0;
        for document in documents {
            if matches_query(query, &document.source)? {
                count += 1;
            }
        }
        Ok(count)
    }
}

fn index_not_found(index: &str) -> TransportError {
    TransportError::Status {
        status: 404,
        reason: format!("index_not_found_exception: no such index [{index}]"),
    }
}

fn bad_request<S: Into<String>>(reason: S) -> TransportError {
    TransportError::Status {
        status: 400,
        reason: reason.into(),
    }
}

fn total_hits(total: u64, limit: u64) -> NativeTotalHits {
    if total > limit {
        NativeTotalHits {
            value: limit,
            relation: TotalHitsRelation::Gte,
        }
    } else {
        NativeTotalHits {
            value: total,
            relation: TotalHitsRelation::Eq,
        }
    }
}

/// Values of a dotted field path, flattening arrays.
fn field_values<'a>(source: &'a Map<String, Value>, path: &str) -> Vec<&'a Value> {
    let mut current: Vec<&Value> = Vec::new();
    let mut parts = path.split('.');
    let Some(first) = parts.next() else {
        return current;
    };
    if let Some(value) = source.get(first) {
        current.push(value);
    }
    for part in parts {
        current = current
            .into_iter()
            .flat_map(|value| match value {
                Value::Array(values) => values.iter().collect::<Vec<_>>(),
                other => vec![other],
            })
            .filter_map(|value| value.get(part))
            .collect();
    }
    current
        .into_iter()
        .flat_map(|value| match value {
            Value::Array(values) => values.iter().collect::<Vec<_>>(),
            other => vec![other],
        })
        .filter(|value| !value.is_null())
        .collect()
}

fn single_entry<'a>(value: &'a Value, kind: &str) -> TransportResult<(&'a String, &'a Value)> {
    value
        .as_object()
        .and_then(|map| map.iter().next())
        .ok_or_else(|| bad_request(format!("[{kind}] query malformed, no field specified")))
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::String(x), Value::Number(_)) | (Value::Number(_), Value::String(x)) => {
            let other = if a.is_number() { a } else { b };
            x.parse::<f64>().ok() == other.as_f64()
        }
        _ => a == b,
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(value: &Value) -> u8 {
        match value {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn matches_query(query: Option<&Value>, source: &Map<String, Value>) -> TransportResult<bool> {
    let Some(query) = query else {
        return Ok(true);
    };
    let (kind, params) = single_entry(query, "query")?;
    match kind.as_str() {
        "match_all" => Ok(true),
        "match_none" => Ok(false),
        "term" => {
            let (field, params) = single_entry(params, "term")?;
            let expected = params.get("value").unwrap_or(params);
            Ok(field_values(source, field)
                .into_iter()
                .any(|value| values_equal(value, expected)))
        }
        "terms" => {
            let (field, params) = single_entry(params, "terms")?;
            let expected = params
                .as_array()
                .ok_or_else(|| bad_request("[terms] query requires an array of values"))?;
            Ok(field_values(source, field)
                .into_iter()
                .any(|value| expected.iter().any(|e| values_equal(value, e))))
        }
        "range" => {
            let (field, params) = single_entry(params, "range")?;
            Ok(field_values(source, field).into_iter().any(|value| {
                let check = |bound: &str, accept: fn(Ordering) -> bool| {
                    params.get(bound)
                        .is_none_or(|limit| accept(compare_values(value, limit)))
                };
                check("gt", |o| o == Ordering::Greater)
                    && check("gte", |o| o != Ordering::Less)
                    && check("lt", |o| o == Ordering::Less)
                    && check("lte", |o| o != Ordering::Greater)
            }))
        }
        "match" => {
            let (field, params) = single_entry(params, "match")?;
            let text = match params.get("query") {
                Some(Value::String(text)) => text.clone(),
                Some(other) => other.to_string(),
                None => match params {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                },
            };
            let wanted = tokens(&text);
            let present: Vec<String> = field_values(source, field)
                .into_iter()
                .flat_map(|value| match value {
                    Value::String(s) => tokens(s),
                    other => tokens(&other.to_string()),
                })
                .collect();
            let all = params
                .get("operator")
                .and_then(Value::as_str)
                .is_some_and(|operator| operator.eq_ignore_ascii_case("and"));
            let found = |token: &String| present.contains(token);
            Ok(if all {
                !wanted.is_empty() && wanted.iter().all(found)
            } else {
                wanted.iter().any(found)
            })
        }
        "constant_score" => matches_query(params.get("filter"), source),
        "bool" => matches_bool(params, source),
        other => Err(bad_request(format!(
            "unsupported query [{other}] in the in-memory backend"
        ))),
    }
}

fn bool_clauses<'a>(params: &'a Value, occur: &str) -> Vec<&'a Value> {
    match params.get(occur) {
        Some(Value::Array(queries)) => queries.iter().collect(),
        Some(query) => vec![query],
        None => Vec::new(),
    }
}

fn matches_bool(params: &Value, source: &Map<String, Value>) -> TransportResult<bool> {
    let clauses = |occur: &str| bool_clauses(params, occur);

    for query in clauses("must").into_iter().chain(clauses("filter")) {
        if !matches_query(Some(query), source)? {
            return Ok(false);
        }
    }
    for query in clauses("must_not") {
        if matches_query(Some(query), source)? {
            return Ok(false);
        }
    }

    let should = clauses("should");
    if should.is_empty() {
        return Ok(true);
    }
    let required = match params.get("minimum_should_match") {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(1) as usize,
        Some(Value::String(s)) => s.trim().parse::<usize>().unwrap_or(1),
        _ if params.get("must").is_some() || params.get("filter").is_some() => 0,
        _ => 1,
    };
    let mut matched = 0;
    for query in should {
        if matches_query(Some(query), source)? {
            matched += 1;
        }
    }
    Ok(matched >= required)
}

#[derive(Debug, Clone)]
struct SortKey {
    field: String,
    descending: bool,
}

fn sort_keys(sort: Option<&Value>) -> TransportResult<Vec<SortKey>> {
    let Some(sort) = sort else {
        return Ok(Vec::new());
    };
    let entries = sort
        .as_array()
        .ok_or_else(|| bad_request("[sort] must be an array"))?;
    entries
        .iter()
        .map(|entry| match entry {
            Value::String(field) => Ok(SortKey {
                field: field.clone(),
                descending: false,
            }),
            other => {
                let (field, params) = single_entry(other, "sort")?;
                let descending = params
                    .get("order")
                    .and_then(Value::as_str)
                    .is_some_and(|order| order == "desc");
                Ok(SortKey {
                    field: field.clone(),
                    descending,
                })
            }
        })
        .collect()
}

fn sort_values(sort: &[SortKey], document: &StoredDocument, position: usize) -> Vec<Value> {
    sort.iter()
        .map(|key| match key.field.as_str() {
            "_doc" | "_shard_doc" => json!(position),
            "_score" => json!(1.0),
            field => field_values(&document.source, field)
                .into_iter()
                .next()
                .cloned()
                .unwrap_or(Value::Null),
        })
        .collect()
}

fn compare_tuples(sort: &[SortKey], a: &[Value], b: &[Value]) -> Ordering {
    for (index, key) in sort.iter().enumerate() {
        let (Some(x), Some(y)) = (a.get(index), b.get(index)) else {
            break;
        };
        let ordering = match (x.is_null(), y.is_null()) {
            // Missing values sort last in either direction.
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            _ if key.descending => compare_values(y, x),
            _ => compare_values(x, y),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn filter_source(source: &Map<String, Value>, params: Option<&Value>) -> Option<Map<String, Value>> {
    let list = |value: Option<&Value>| -> Vec<String> {
        match value {
            Some(Value::Array(values)) => values
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            Some(Value::String(value)) => vec![value.clone()],
            _ => Vec::new(),
        }
    };
    match params {
        None | Some(Value::Bool(true)) => Some(source.clone()),
        Some(Value::Bool(false)) => None,
        Some(params) => {
            let includes = list(params.get("includes"));
            let excludes = list(params.get("excludes"));
            Some(
                source
                    .iter()
                    .filter(|(name, _)| includes.is_empty() || includes.contains(name))
                    .filter(|(name, _)| !excludes.contains(name))
                    .map(|(name, value)| (name.clone(), value.clone()))
                    .collect(),
            )
        }
    }
}

fn render_hit(
    index: &str,
    sort: &[SortKey],
    documents: &[StoredDocument],
    position: usize,
    body: &Value,
) -> TransportResult<NativeHit> {
    let document = &documents[position];

    let mut fields = Map::new();
    if let Some(stored) = body.get("stored_fields").and_then(Value::as_array) {
        for name in stored.iter().filter_map(Value::as_str) {
            if name == "*" {
                for (field, value) in &document.source {
                    fields.insert(field.clone(), as_array(value));
                }
            } else if let Some(value) = document.source.get(name) {
                fields.insert(name.to_string(), as_array(value));
            }
        }
    }

    let hit = json!({
        "_index": index,
        "_id": document.id,
        "_score": if sort.is_empty() { json!(1.0) } else { Value::Null },
        "_source": filter_source(&document.source, body.get("_source")),
        "fields": fields,
        "sort": sort_values(sort, document, position),
    });
    serde_json::from_value(hit).map_err(|e| bad_request(e.to_string()))
}

fn as_array(value: &Value) -> Value {
    match value {
        Value::Array(_) => value.clone(),
        other => Value::Array(vec![other.clone()]),
    }
}

fn aggregate(
    aggs: &Map<String, Value>,
    documents: &[StoredDocument],
    matching: &[usize],
    background: usize,
) -> TransportResult<Map<String, Value>> {
    let mut results = Map::new();
    for (name, params) in aggs {
        let subaggs = params.get("aggs").and_then(Value::as_object);
        let (kind, options) = params
            .as_object()
            .and_then(|map| map.iter().find(|(key, _)| key.as_str() != "aggs"))
            .ok_or_else(|| bad_request(format!("aggregation [{name}] has no type")))?;

        let result = match kind.as_str() {
            "terms" | "significant_terms" => {
                let field = options
                    .get("field")
                    .and_then(Value::as_str)
                    .ok_or_else(|| bad_request(format!("[{kind}] aggregation [{name}] requires a field")))?;
                let size = options
                    .get("size")
                    .and_then(Value::as_u64)
                    .map(|size| size as usize)
                    .unwrap_or(DEFAULT_TERMS_SIZE);

                let mut groups: Vec<(Value, Vec<usize>)> = Vec::new();
                for position in matching {
                    for value in field_values(&documents[*position].source, field) {
                        match groups.iter_mut().find(|(key, _)| values_equal(key, value)) {
                            Some((_, members)) => members.push(*position),
                            None => groups.push((value.clone(), vec![*position])),
                        }
                    }
                }
                groups.sort_by(|(a_key, a), (b_key, b)| {
                    b.len().cmp(&a.len()).then_with(|| compare_values(a_key, b_key))
                });
                groups.truncate(size);

                let mut buckets = Vec::with_capacity(groups.len());
                for (key, members) in groups {
                    let mut bucket = Map::new();
                    bucket.insert("doc_count".into(), json!(members.len()));
                    if kind == "significant_terms" {
                        let bg_count = documents
                            .iter()
                            .filter(|document| {
                                field_values(&document.source, field)
                                    .into_iter()
                                    .any(|value| values_equal(value, &key))
                            })
                            .count();
                        let foreground = members.len() as f64 / matching.len().max(1) as f64;
                        let backdrop = bg_count as f64 / background.max(1) as f64;
                        bucket.insert("bg_count".into(), json!(bg_count));
                        bucket.insert("score".into(), json!(foreground / backdrop.max(f64::EPSILON)));
                    }
                    if let Some(subaggs) = subaggs {
                        for (sub_name, sub_result) in aggregate(subaggs, documents, &members, background)? {
                            bucket.insert(sub_name, sub_result);
                        }
                    }
                    bucket.insert("key".into(), key);
                    buckets.push(Value::Object(bucket));
                }
                json!({"buckets": buckets})
            }
            "max" => {
                let field = options.get("field").and_then(Value::as_str).ok_or_else(|| {
                    bad_request(format!("[max] aggregation [{name}] requires a field"))
                })?;
                let max = matching
                    .iter()
                    .flat_map(|position| field_values(&documents[*position].source, field))
                    .filter_map(Value::as_f64)
                    .fold(None, |max: Option<f64>, value| {
                        Some(max.map_or(value, |max| max.max(value)))
                    });
                json!({"value": max})
            }
            "top_hits" => {
                let size = options
                    .get("size")
                    .and_then(Value::as_u64)
                    .map(|size| size as usize)
                    .unwrap_or(DEFAULT_TOP_HITS_SIZE);
                let hits: Vec<Value> = matching
                    .iter()
                    .take(size)
                    .map(|position| {
                        let document = &documents[*position];
                        json!({
                            "_id": document.id,
                            "_score": 1.0,
                            "_source": filter_source(&document.source, options.get("_source")),
                        })
                    })
                    .collect();
                json!({"hits": {
                    "total": {"value": matching.len(), "relation": "eq"},
                    "max_score": 1.0,
                    "hits": hits
                }})
            }
            other => {
                return Err(bad_request(format!(
                    "unsupported aggregation [{other}] in the in-memory backend"
                )));
            }
        };
        results.insert(name.clone(), result);
    }
    Ok(results)
}

fn suggest_completions(suggest: &Map<String, Value>, documents: &[StoredDocument]) -> Map<String, Value> {
    let mut results = Map::new();
    for (name, params) in suggest {
        let text = params.get("text").and_then(Value::as_str).unwrap_or_default();
        let prefix = text.to_lowercase();
        let completion = params.get("completion");
        let field = completion
            .and_then(|c| c.get("field"))
            .and_then(Value::as_str)
            .unwrap_or_default();
        let size = completion
            .and_then(|c| c.get("size"))
            .and_then(Value::as_u64)
            .map(|size| size as usize)
            .unwrap_or(5);

        let options: Vec<Value> = documents
            .iter()
            .filter_map(|document| {
                field_values(&document.source, field)
                    .into_iter()
                    .filter_map(Value::as_str)
                    .find(|candidate| candidate.to_lowercase().starts_with(&prefix))
                    .map(|candidate| {
                        json!({
                            "text": candidate,
                            "_id": document.id,
                            "_score": 1.0,
                            "_source": document.source,
                        })
                    })
            })
            .take(size)
            .collect();
        results.insert(
            name.clone(),
            json!([{"text": text, "offset": 0, "length": text.len(), "options": options}]),
        );
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport() -> InMemoryTransport {
        let transport = InMemoryTransport::new();
        transport
            .add_documents(
                "books",
                vec![
                    json!({"title": "The Rust Book", "year": 2018, "tags": ["rust", "guide"]}),
                    json!({"title": "Programming Rust", "year": 2021, "tags": ["rust"]}),
                    json!({"title": "Go in Action", "year": 2015, "tags": ["go"]}),
                ],
            )
            .unwrap();
        transport
    }

    fn search(transport: &InMemoryTransport, body: Value) -> NativeSearchResponse {
        transport.search(&NativeSearchRequest::new("books", body)).unwrap()
    }

    fn ids(response: &NativeSearchResponse) -> Vec<String> {
        response
            .hits
            .hits
            .iter()
            .filter_map(|hit| hit.id.clone())
            .collect()
    }

    #[test]
    fn test_queries() {
        let transport = transport();
        let response = search(&transport, json!({"query": {"term": {"tags": {"value": "rust"}}}}));
        assert_eq!(ids(&response), vec!["0", "1"]);
        assert_eq!(response.total_hits(), 2);

        let response = search(
            &transport,
            json!({"query": {"bool": {
                "must": [{"match": {"title": {"query": "rust"}}}],
                "must_not": [{"range": {"year": {"lt": 2020}}}]
            }}}),
        );
        assert_eq!(ids(&response), vec!["1"]);

        let response = search(&transport, json!({"query": {"terms": {"year": [2015, 2021]}}}));
        assert_eq!(ids(&response), vec!["1", "2"]);

        let error = transport
            .search(&NativeSearchRequest::new("books", json!({"query": {"geo_shape": {}}})))
            .unwrap_err();
        assert!(matches!(error, TransportError::Status { status: 400, .. }));
    }

    #[test]
    fn test_sort_and_projection() {
        let transport = transport();
        let response = search(
            &transport,
            json!({"sort": [{"year": {"order": "desc"}}], "stored_fields": ["title"], "_source": false}),
        );
        assert_eq!(ids(&response), vec!["1", "0", "2"]);
        let hit = &response.hits.hits[0];
        assert_eq!(hit.sort, vec![json!(2021)]);
        assert_eq!(hit.fields.get("title"), Some(&json!(["Programming Rust"])));
        assert!(hit.fields.get("year").is_none());
        assert!(hit.source.is_none());
    }

    #[test]
    fn test_scroll() {
        let transport = transport();
        let request = NativeSearchRequest::new("books", json!({"size": 2, "sort": [{"_doc": {"order": "asc"}}]}))
            .with_scroll(KeepAlive::minutes(1));
        let first = transport.search(&request).unwrap();
        assert_eq!(ids(&first), vec!["0", "1"]);
        let scroll_id = first.scroll_id.unwrap();
        assert_eq!(transport.open_scrolls(), 1);

        let second = transport.scroll(&scroll_id, &KeepAlive::minutes(1)).unwrap();
        assert_eq!(ids(&second), vec!["2"]);
        let third = transport.scroll(&scroll_id, &KeepAlive::minutes(1)).unwrap();
        assert!(third.hits.hits.is_empty());

        transport.clear_scroll(&scroll_id).unwrap();
        assert_eq!(transport.open_scrolls(), 0);
        assert_eq!(transport.stats().scrolls, 2);
    }

    #[test]
    fn test_point_in_time() {
        let transport = transport();
        let pit_id = transport.open_point_in_time("books", &KeepAlive::minutes(1)).unwrap();
        let body = json!({
            "size": 2,
            "sort": [{"_shard_doc": {"order": "asc"}}],
            "pit": {"id": pit_id, "keep_alive": "1m"}
        });
        let first = transport.search(&NativeSearchRequest::new("", body.clone())).unwrap();
        assert_eq!(ids(&first), vec!["0", "1"]);
        assert_eq!(first.pit_id.as_deref(), Some(pit_id.as_str()));

        let mut next = body;
        next["search_after"] = json!(first.hits.hits[1].sort);
        let second = transport.search(&NativeSearchRequest::new("", next)).unwrap();
        assert_eq!(ids(&second), vec!["2"]);

        transport.close_point_in_time(&pit_id).unwrap();
        assert_eq!(transport.open_points_in_time(), 0);
    }

    #[test]
    fn test_aggregations() {
        let transport = transport();
        let response = search(
            &transport,
            json!({"size": 0, "aggs": {"tags": {
                "terms": {"field": "tags"},
                "aggs": {"latest": {"max": {"field": "year"}}}
            }}}),
        );
        assert!(response.hits.hits.is_empty());
        let buckets = &response.aggregations["tags"]["buckets"];
        assert_eq!(buckets[0]["key"], json!("rust"));
        assert_eq!(buckets[0]["doc_count"], json!(2));
        assert_eq!(buckets[0]["latest"]["value"], json!(2021.0));
    }

    #[test]
    fn test_failure_injection() {
        let transport = transport();
        transport.set_unreachable(true);
        let error = transport.count("books", None).unwrap_err();
        assert!(error.is_no_node_available());
        transport.set_unreachable(false);
        assert_eq!(transport.count("books", None).unwrap(), 3);

        transport.fail_searches_on("books", 503);
        let error = transport
            .search(&NativeSearchRequest::new("books", json!({})))
            .unwrap_err();
        assert!(matches!(error, TransportError::Status { status: 503, .. }));
    }

    #[test]
    fn test_load_json_lines() {
        let transport = InMemoryTransport::new();
        let lines = "{\"_id\": \"a\", \"title\": \"x\"}\n\n{\"id\": 7, \"title\": \"y\"}\n{\"title\": \"z\"}\n";
        assert_eq!(transport.load_json_lines("docs", lines.as_bytes()).unwrap(), 3);
        let response = transport
            .search(&NativeSearchRequest::new("docs", json!({"stored_fields": ["*"]})))
            .unwrap();
        assert_eq!(ids(&response), vec!["a", "7", "4"]);
    }
}
