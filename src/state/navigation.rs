//! Navigation State - Query string round-tripping.
//!
//! Reads `key=value&...` pairs from a location's search string and writes
//! merged values back in the same format. Keys keep their original order;
//! new keys are appended; keys merged with `None` are dropped.
//!
//! # Example
//!
//! ```ignore
//! let current = parse_query("?a=1&b=2");
//! let merged = merge_values(current, &values);   // { b: None, c: "3" }
//! assert_eq!(to_query_string(&merged), "a=1&c=3");
//! ```

use url::form_urlencoded;

use crate::types::{NavigationValues, QueryParams};

/// Options for pushing navigation state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationOptions {
    /// Replace the current history entry instead of pushing a new one.
    pub replace_state: bool,
    /// Use this search string (including `?`, or empty) verbatim instead of merging.
    pub location_search: Option<String>,
}

impl NavigationOptions {
    pub fn replace() -> Self {
        Self {
            replace_state: true,
            ..Self::default()
        }
    }
}

/// Parse a search string (with or without the leading `?`) into parameters.
///
/// Values are decoded as `application/x-www-form-urlencoded`: percent escapes
/// are resolved and `+` reads as a space, matching what [`to_query_string`]
/// writes. A literal plus sign must arrive as `%2B`; an externally written
/// `?q=c++` reads as `"c  "`. A repeated key keeps its last value.
pub fn parse_query(search: &str) -> QueryParams {
    let query = search.strip_prefix('?').unwrap_or(search);
    if query.is_empty() {
        return QueryParams::new();
    }

    form_urlencoded::parse(query.as_bytes())
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect()
}

/// Merge `values` into `current`. `None` removes the key.
pub fn merge_values(mut current: QueryParams, values: &NavigationValues) -> QueryParams {
    for (key, value) in values {
        match value {
            Some(value) => {
                current.insert(key.clone(), value.clone());
            }
            None => {
                current.shift_remove(key);
            }
        }
    }
    current
}

/// Serialize parameters as `key=value&...` (form-urlencoded).
pub fn to_query_string(params: &QueryParams) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params.iter())
        .finish()
}

/// Serialize parameters as a location search: `?key=value...`, or empty.
pub fn to_location_search(params: &QueryParams) -> String {
    let query = to_query_string(params);
    if query.is_empty() {
        query
    } else {
        format!("?{query}")
    }
}
