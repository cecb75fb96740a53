//! Deep pagination controls.
//!
//! Two mutually exclusive strategies retrieve result sets larger than one
//! page:
//!
//! - [`DeepPaginationMethod::Scroll`]: the main query opens a scroll context
//!   with a keep-alive and every further batch is fetched by scroll id.
//! - [`DeepPaginationMethod::SearchAfter`]: a point-in-time lease is opened
//!   on the index before the main query; every further batch re-runs the
//!   query against the lease, resuming after the sort values of the last hit
//!   and refreshing the lease keep-alive.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ElasticQueryError, Result};

static KEEP_ALIVE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d+)\s*(nanos|micros|ms|s|m|h|d)\s*$").expect("keep-alive pattern is valid")
});

/// Time units understood by the backend's time-value syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Nanos,
    Micros,
    Millis,
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    fn suffix(&self) -> &'static str {
        match self {
            TimeUnit::Nanos => "nanos",
            TimeUnit::Micros => "micros",
            TimeUnit::Millis => "ms",
            TimeUnit::Seconds => "s",
            TimeUnit::Minutes => "m",
            TimeUnit::Hours => "h",
            TimeUnit::Days => "d",
        }
    }

    fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "nanos" => Some(TimeUnit::Nanos),
            "micros" => Some(TimeUnit::Micros),
            "ms" => Some(TimeUnit::Millis),
            "s" => Some(TimeUnit::Seconds),
            "m" => Some(TimeUnit::Minutes),
            "h" => Some(TimeUnit::Hours),
            "d" => Some(TimeUnit::Days),
            _ => None,
        }
    }
}

/// Lifetime of a server-side scroll context or point-in-time lease, e.g. `5m`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeepAlive {
    amount: u64,
    unit: TimeUnit,
}

impl KeepAlive {
    /// A keep-alive of whole minutes.
    pub fn minutes(amount: u64) -> Self {
        KeepAlive {
            amount,
            unit: TimeUnit::Minutes,
        }
    }

    /// A keep-alive of whole seconds.
    pub fn seconds(amount: u64) -> Self {
        KeepAlive {
            amount,
            unit: TimeUnit::Seconds,
        }
    }

    /// The keep-alive as a duration.
    pub fn as_duration(&self) -> Duration {
        let amount = self.amount;
        match self.unit {
            TimeUnit::Nanos => Duration::from_nanos(amount),
            TimeUnit::Micros => Duration::from_micros(amount),
            TimeUnit::Millis => Duration::from_millis(amount),
            TimeUnit::Seconds => Duration::from_secs(amount),
            TimeUnit::Minutes => Duration::from_secs(amount.saturating_mul(60)),
            TimeUnit::Hours => Duration::from_secs(amount.saturating_mul(3_600)),
            TimeUnit::Days => Duration::from_secs(amount.saturating_mul(86_400)),
        }
    }
}

impl Default for KeepAlive {
    fn default() -> Self {
        KeepAlive::minutes(5)
    }
}

impl FromStr for KeepAlive {
    type Err = ElasticQueryError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || ElasticQueryError::invalid_config(format!("Invalid keep-alive '{s}'"));
        let captures = KEEP_ALIVE_PATTERN.captures(s).ok_or_else(invalid)?;
        let amount = captures[1].parse::<u64>().map_err(|_| invalid())?;
        let unit = TimeUnit::from_suffix(&captures[2]).ok_or_else(invalid)?;
        if amount == 0 {
            return Err(invalid());
        }
        Ok(KeepAlive { amount, unit })
    }
}

impl TryFrom<String> for KeepAlive {
    type Error = ElasticQueryError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<KeepAlive> for String {
    fn from(keep_alive: KeepAlive) -> Self {
        keep_alive.to_string()
    }
}

impl fmt::Display for KeepAlive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.unit.suffix())
    }
}

/// Strategy used to continue a result set across batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeepPaginationMethod {
    /// Continue by scroll id.
    Scroll,
    /// Continue with a point-in-time lease and the last sort values.
    SearchAfter,
}

impl DeepPaginationMethod {
    /// The sort order the backend serves fastest for this strategy.
    pub fn optimal_sort_field(&self) -> &'static str {
        match self {
            DeepPaginationMethod::Scroll => "_doc",
            DeepPaginationMethod::SearchAfter => "_shard_doc",
        }
    }
}

impl FromStr for DeepPaginationMethod {
    type Err = ElasticQueryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "scroll" => Ok(DeepPaginationMethod::Scroll),
            "searchafter" | "search_after" | "pit" => Ok(DeepPaginationMethod::SearchAfter),
            _ => Err(ElasticQueryError::invalid_argument(format!(
                "Unknown deep pagination method '{s}', expected scroll or searchAfter"
            ))),
        }
    }
}

impl fmt::Display for DeepPaginationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeepPaginationMethod::Scroll => f.write_str("scroll"),
            DeepPaginationMethod::SearchAfter => f.write_str("searchAfter"),
        }
    }
}

/// Deep pagination controls of a search request.
///
/// A request without these controls returns a single page. Search-after
/// continues from the complete sort tuple of the last hit, not from a single
/// sort field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeepPagination {
    /// Continuation strategy.
    pub method: DeepPaginationMethod,
    /// Lifetime of the server-side context between batches; the configured
    /// default is used when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_alive: Option<KeepAlive>,
    /// Maximum number of documents yielded by the cursor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    /// Do not warn when the sort order is slow for the strategy.
    #[serde(default)]
    pub suppress_sort_warning: bool,
}

impl DeepPagination {
    /// Deep pagination with the given strategy.
    pub fn new(method: DeepPaginationMethod) -> Self {
        DeepPagination {
            method,
            keep_alive: None,
            limit: None,
            suppress_sort_warning: false,
        }
    }

    /// Deep pagination by scroll id.
    pub fn scroll() -> Self {
        Self::new(DeepPaginationMethod::Scroll)
    }

    /// Deep pagination with a point-in-time lease.
    pub fn search_after() -> Self {
        Self::new(DeepPaginationMethod::SearchAfter)
    }

    /// Set the keep-alive.
    pub fn with_keep_alive(mut self, keep_alive: KeepAlive) -> Self {
        self.keep_alive = Some(keep_alive);
        self
    }

    /// Set the maximum number of documents yielded.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Silence the slow sort order warning.
    pub fn suppress_sort_warning(mut self) -> Self {
        self.suppress_sort_warning = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_keep_alive_parse() {
        let keep_alive: KeepAlive = "5m".parse().unwrap();
        assert_eq!(keep_alive, KeepAlive::minutes(5));
        assert_eq!(keep_alive.as_duration(), Duration::from_secs(300));

        let keep_alive: KeepAlive = "500ms".parse().unwrap();
        assert_eq!(keep_alive.to_string(), "500ms");
        assert_eq!(keep_alive.as_duration(), Duration::from_millis(500));

        assert_eq!("2d".parse::<KeepAlive>().unwrap().as_duration(), Duration::from_secs(172_800));
    }

    #[test]
    fn test_keep_alive_invalid() {
        assert!("five minutes".parse::<KeepAlive>().is_err());
        assert!("0m".parse::<KeepAlive>().is_err());
        assert!("10y".parse::<KeepAlive>().is_err());
    }

    #[test]
    fn test_keep_alive_serde() {
        let keep_alive: KeepAlive = serde_json::from_value(json!("30s")).unwrap();
        assert_eq!(keep_alive, KeepAlive::seconds(30));
        assert_eq!(serde_json::to_value(keep_alive).unwrap(), json!("30s"));
        assert!(serde_json::from_value::<KeepAlive>(json!("soon")).is_err());
    }

    #[test]
    fn test_method_parse() {
        assert_eq!("scroll".parse::<DeepPaginationMethod>().unwrap(), DeepPaginationMethod::Scroll);
        assert_eq!(
            "searchAfter".parse::<DeepPaginationMethod>().unwrap(),
            DeepPaginationMethod::SearchAfter
        );
        assert!("cursor".parse::<DeepPaginationMethod>().is_err());

        let method: DeepPaginationMethod = serde_json::from_value(json!("searchAfter")).unwrap();
        assert_eq!(method, DeepPaginationMethod::SearchAfter);
    }

    #[test]
    fn test_optimal_sort_fields() {
        assert_eq!(DeepPaginationMethod::Scroll.optimal_sort_field(), "_doc");
        assert_eq!(DeepPaginationMethod::SearchAfter.optimal_sort_field(), "_shard_doc");
    }
}
