//! # Query Model
//!
//! Backend-agnostic search predicates. A [`Query`] is an ordered list of
//! [`Filter`] clauses, AND-combined, plus optional nested sub-queries that are
//! OR-combined with the filter block. An empty query matches every document.
//!
//! Translation into a concrete query language belongs to the indexing
//! adapter; this module only accumulates data.
//!
//! ## JSON shape
//!
//! ```json
//! {
//!   "query": [
//!     {"name": "author", "operation": "EQUALS", "value": "alice"},
//!     {"names": ["title", "body"], "operation": "FULL_TEXT", "value": "ipfs"}
//!   ],
//!   "or": [ { "query": [ ... ] } ]
//! }
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Comparison applied by a [`Filter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryOperation {
    /// Relevance-scored text match across one or more fields.
    FullText,
    Equals,
    NotEquals,
    /// Analyzed (tokenized) match on a single field.
    Contains,
    /// Field equals any element of a collection value.
    In,
    /// Field equals no element of a collection value.
    NotIn,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl QueryOperation {
    /// Returns the wire token for this operation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FullText => "FULL_TEXT",
            Self::Equals => "EQUALS",
            Self::NotEquals => "NOT_EQUALS",
            Self::Contains => "CONTAINS",
            Self::In => "IN",
            Self::NotIn => "NOT_IN",
            Self::Lt => "LT",
            Self::Lte => "LTE",
            Self::Gt => "GT",
            Self::Gte => "GTE",
        }
    }

    /// Operations that require a collection value.
    pub fn requires_collection(&self) -> bool {
        matches!(self, Self::In | Self::NotIn)
    }

    /// Range operations.
    pub fn is_range(&self) -> bool {
        matches!(self, Self::Lt | Self::Lte | Self::Gt | Self::Gte)
    }
}

impl fmt::Display for QueryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single predicate on one or more fields.
///
/// On the wire a filter carries either `name` (single field) or `names`
/// (multi-field full text); both deserialize into [`Filter::names`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFilter", into = "RawFilter")]
pub struct Filter {
    names: Vec<String>,
    operation: QueryOperation,
    value: Value,
}

impl Filter {
    /// Create a filter on a single field.
    pub fn new(name: impl Into<String>, operation: QueryOperation, value: impl Into<Value>) -> Self {
        Self {
            names: vec![name.into()],
            operation,
            value: value.into(),
        }
    }

    /// Create a filter spanning several fields.
    pub fn multi<I, S>(names: I, operation: QueryOperation, value: impl Into<Value>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            operation,
            value: value.into(),
        }
    }

    /// Field names targeted by this filter. Never empty for a deserialized filter.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// First field name, the only one for single-field operations.
    pub fn name(&self) -> &str {
        self.names.first().map(String::as_str).unwrap_or_default()
    }

    pub fn operation(&self) -> QueryOperation {
        self.operation
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

#[derive(Serialize, Deserialize)]
struct RawFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    names: Option<Vec<String>>,
    operation: QueryOperation,
    #[serde(default)]
    value: Value,
}

impl TryFrom<RawFilter> for Filter {
    type Error = String;

    fn try_from(raw: RawFilter) -> Result<Self, Self::Error> {
        let mut names = raw.names.unwrap_or_default();
        if let Some(name) = raw.name {
            names.insert(0, name);
        }
        if names.is_empty() {
            return Err("filter requires `name` or `names`".to_string());
        }
        Ok(Self {
            names,
            operation: raw.operation,
            value: raw.value,
        })
    }
}

impl From<Filter> for RawFilter {
    fn from(filter: Filter) -> Self {
        let (name, names) = if filter.names.len() == 1 {
            (filter.names.into_iter().next(), None)
        } else {
            (None, Some(filter.names))
        };
        Self {
            name,
            names,
            operation: filter.operation,
            value: filter.value,
        }
    }
}

/// Search predicate tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    #[serde(rename = "query", default)]
    filter_clauses: Vec<Filter>,
    #[serde(rename = "or", default, skip_serializing_if = "Vec::is_empty")]
    sub_queries: Vec<Query>,
}

impl Query {
    /// An empty query, matching all documents.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a filter.
    pub fn filter(mut self, name: impl Into<String>, operation: QueryOperation, value: impl Into<Value>) -> Self {
        self.filter_clauses.push(Filter::new(name, operation, value));
        self
    }

    /// Append an already-built filter.
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter_clauses.push(filter);
        self
    }

    pub fn full_text<I, S>(mut self, names: I, value: impl Into<Value>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter_clauses
            .push(Filter::multi(names, QueryOperation::FullText, value));
        self
    }

    pub fn equals(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(name, QueryOperation::Equals, value)
    }

    pub fn not_equals(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(name, QueryOperation::NotEquals, value)
    }

    pub fn contains(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(name, QueryOperation::Contains, value)
    }

    pub fn is_in<I, V>(self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        self.filter(name, QueryOperation::In, values)
    }

    pub fn not_in<I, V>(self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        self.filter(name, QueryOperation::NotIn, values)
    }

    pub fn less_than(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(name, QueryOperation::Lt, value)
    }

    pub fn less_than_or_equals(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(name, QueryOperation::Lte, value)
    }

    pub fn greater_than(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(name, QueryOperation::Gt, value)
    }

    pub fn greater_than_or_equals(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(name, QueryOperation::Gte, value)
    }

    /// Append a sub-query, OR-combined with this query's filter block.
    pub fn or(mut self, sub_query: Query) -> Self {
        self.sub_queries.push(sub_query);
        self
    }

    pub fn filter_clauses(&self) -> &[Filter] {
        &self.filter_clauses
    }

    pub fn sub_queries(&self) -> &[Query] {
        &self.sub_queries
    }

    /// True iff there are no filter clauses and no sub-queries.
    pub fn is_empty(&self) -> bool {
        self.filter_clauses.is_empty() && self.sub_queries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // ── Builder ──────────────────────────────────────────────────────

    #[test]
    fn new_query_is_empty() {
        assert!(Query::new().is_empty());
    }

    #[test]
    fn builder_appends_in_order() {
        let q = Query::new()
            .equals("author", "alice")
            .greater_than("year", 2018)
            .is_in("tag", ["a", "b"]);
        let ops: Vec<_> = q.filter_clauses().iter().map(|f| f.operation()).collect();
        assert_eq!(
            ops,
            vec![QueryOperation::Equals, QueryOperation::Gt, QueryOperation::In]
        );
        assert_eq!(q.filter_clauses()[2].value(), &json!(["a", "b"]));
        assert!(!q.is_empty());
    }

    #[test]
    fn sub_query_alone_makes_query_non_empty() {
        let q = Query::new().or(Query::new().equals("a", 1));
        assert!(q.filter_clauses().is_empty());
        assert_eq!(q.sub_queries().len(), 1);
        assert!(!q.is_empty());
    }

    #[test]
    fn full_text_keeps_all_names() {
        let q = Query::new().full_text(["title", "body"], "hello");
        let f = &q.filter_clauses()[0];
        assert_eq!(f.names(), ["title", "body"]);
        assert_eq!(f.name(), "title");
        assert_eq!(f.operation(), QueryOperation::FullText);
    }

    // ── Wire format ──────────────────────────────────────────────────

    #[test]
    fn deserializes_name_and_names() {
        let q: Query = serde_json::from_value(json!({
            "query": [
                {"name": "author", "operation": "EQUALS", "value": "alice"},
                {"names": ["title", "body"], "operation": "FULL_TEXT", "value": "ipfs"}
            ],
            "or": [{"query": [{"name": "year", "operation": "GTE", "value": 2019}]}]
        }))
        .unwrap();
        assert_eq!(q.filter_clauses()[0].names(), ["author"]);
        assert_eq!(q.filter_clauses()[1].names(), ["title", "body"]);
        assert_eq!(q.sub_queries()[0].filter_clauses()[0].operation(), QueryOperation::Gte);
    }

    #[test]
    fn empty_object_is_empty_query() {
        let q: Query = serde_json::from_value(json!({})).unwrap();
        assert!(q.is_empty());
    }

    #[test]
    fn filter_without_name_is_rejected() {
        let result: Result<Query, _> = serde_json::from_value(json!({
            "query": [{"operation": "EQUALS", "value": "x"}]
        }));
        assert!(result.is_err());
    }

    #[test]
    fn unknown_operation_is_rejected() {
        let result: Result<Query, _> = serde_json::from_value(json!({
            "query": [{"name": "a", "operation": "LIKE", "value": "x"}]
        }));
        assert!(result.is_err());
    }

    #[test]
    fn single_name_serializes_as_name() {
        let json = serde_json::to_value(Query::new().not_in("tag", ["x"])).unwrap();
        assert_eq!(
            json,
            json!({"query": [{"name": "tag", "operation": "NOT_IN", "value": ["x"]}]})
        );
    }

    #[test]
    fn operation_classification() {
        assert!(QueryOperation::In.requires_collection());
        assert!(QueryOperation::NotIn.requires_collection());
        assert!(!QueryOperation::Equals.requires_collection());
        assert!(QueryOperation::Lte.is_range());
        assert!(!QueryOperation::Contains.is_range());
        assert_eq!(QueryOperation::FullText.to_string(), "FULL_TEXT");
    }
}
