//! In-process evaluation of a [`Query`] against a JSON document.
//!
//! Mirrors the structure of the search-engine translation: the filter block
//! is a conjunction, sub-queries are OR-ed with it, an empty query matches
//! everything.

use std::cmp::Ordering;

use serde_json::{Map, Value};

use crate::query::{Filter, Query, QueryOperation};

/// Does `doc` satisfy `query`?
pub fn matches(query: &Query, doc: &Map<String, Value>) -> bool {
    if query.is_empty() {
        return true;
    }
    let filters = query.filter_clauses();
    let filter_block = !filters.is_empty() && filters.iter().all(|f| filter_matches(f, doc));
    if query.sub_queries().is_empty() {
        return filter_block;
    }
    filter_block || query.sub_queries().iter().any(|q| matches(q, doc))
}

fn filter_matches(filter: &Filter, doc: &Map<String, Value>) -> bool {
    let field = doc.get(filter.name());
    let value = filter.value();
    match filter.operation() {
        QueryOperation::FullText => filter
            .names()
            .iter()
            .filter_map(|n| doc.get(n))
            .any(|f| phrase_prefix(f, value)),
        QueryOperation::Equals => field.is_some_and(|f| term_eq(f, value)),
        QueryOperation::NotEquals => !field.is_some_and(|f| term_eq(f, value)),
        QueryOperation::Contains => field.is_some_and(|f| any_token(f, value)),
        QueryOperation::In | QueryOperation::NotIn => {
            let Some(candidates) = value.as_array() else {
                tracing::warn!(
                    field = filter.name(),
                    operation = %filter.operation(),
                    "filter value must be a collection, ignoring filter"
                );
                return true;
            };
            let hit = field.is_some_and(|f| candidates.iter().any(|c| term_eq(f, c)));
            if filter.operation() == QueryOperation::In {
                hit
            } else {
                !hit
            }
        }
        op => field.is_some_and(|f| range_matches(op, f, value)),
    }
}

/// Exact match; an array field matches when any element does.
fn term_eq(field: &Value, value: &Value) -> bool {
    match field {
        Value::Array(items) => items.iter().any(|i| scalar_eq(i, value)),
        other => scalar_eq(other, value),
    }
}

fn scalar_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::String(s), Value::Number(n)) | (Value::Number(n), Value::String(s)) => {
            s.parse::<f64>().ok() == n.as_f64()
        }
        (Value::String(s), Value::Bool(b)) | (Value::Bool(b), Value::String(s)) => {
            s == if *b { "true" } else { "false" }
        }
        _ => a == b,
    }
}

/// Ordering between two scalars of compatible types.
pub(crate) fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::String(s), Value::Number(n)) => s.parse::<f64>().ok()?.partial_cmp(&n.as_f64()?),
        (Value::Number(n), Value::String(s)) => n.as_f64()?.partial_cmp(&s.parse::<f64>().ok()?),
        _ => None,
    }
}

fn range_matches(op: QueryOperation, field: &Value, value: &Value) -> bool {
    let Some(ord) = compare(field, value) else {
        return false;
    };
    match op {
        QueryOperation::Lt => ord == Ordering::Less,
        QueryOperation::Lte => ord != Ordering::Greater,
        QueryOperation::Gt => ord == Ordering::Greater,
        QueryOperation::Gte => ord != Ordering::Less,
        _ => false,
    }
}

fn tokens(value: &Value) -> Vec<String> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(text_of).collect::<Vec<_>>().join(" "),
        other => text_of(other),
    };
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn any_token(field: &Value, value: &Value) -> bool {
    let field_tokens = tokens(field);
    tokens(value).iter().any(|t| field_tokens.contains(t))
}

/// Phrase match where the last query token may be a prefix.
fn phrase_prefix(field: &Value, value: &Value) -> bool {
    let query = tokens(value);
    let Some((last, head)) = query.split_last() else {
        return false;
    };
    let text = tokens(field);
    if text.len() < query.len() {
        return false;
    }
    text.windows(query.len()).any(|w| {
        w[..head.len()] == *head && w[head.len()].starts_with(last.as_str())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn empty_query_matches_everything() {
        assert!(matches(&Query::new(), &doc(json!({}))));
    }

    #[test]
    fn equals_and_not_equals() {
        let d = doc(json!({"author": "alice", "tags": ["a", "b"], "year": 2019}));
        assert!(matches(&Query::new().equals("author", "alice"), &d));
        assert!(!matches(&Query::new().equals("author", "bob"), &d));
        assert!(matches(&Query::new().equals("tags", "b"), &d));
        assert!(matches(&Query::new().equals("year", 2019), &d));
        assert!(matches(&Query::new().not_equals("author", "bob"), &d));
        assert!(matches(&Query::new().not_equals("missing", "x"), &d));
    }

    #[test]
    fn in_requires_a_collection() {
        let d = doc(json!({"author": "alice"}));
        assert!(matches(&Query::new().is_in("author", ["bob", "alice"]), &d));
        assert!(!matches(&Query::new().not_in("author", ["alice"]), &d));
        // A scalar value is ignored rather than failing the whole query.
        assert!(matches(
            &Query::new()
                .filter("author", QueryOperation::In, "bob")
                .equals("author", "alice"),
            &d
        ));
    }

    #[test]
    fn ranges() {
        let d = doc(json!({"year": 2019, "name": "m"}));
        assert!(matches(&Query::new().greater_than("year", 2018), &d));
        assert!(matches(&Query::new().greater_than_or_equals("year", 2019), &d));
        assert!(!matches(&Query::new().less_than("year", 2019), &d));
        assert!(matches(&Query::new().less_than_or_equals("name", "z"), &d));
        assert!(!matches(&Query::new().less_than("year", "abc"), &d));
    }

    #[test]
    fn contains_matches_any_token() {
        let d = doc(json!({"title": "The Quick brown fox"}));
        assert!(matches(&Query::new().contains("title", "quick cat"), &d));
        assert!(!matches(&Query::new().contains("title", "slow cat"), &d));
    }

    #[test]
    fn full_text_is_phrase_prefix_across_fields() {
        let d = doc(json!({"title": "Storage gateway", "body": "content addressable storage on ipfs"}));
        assert!(matches(&Query::new().full_text(["title", "body"], "addressable sto"), &d));
        assert!(matches(&Query::new().full_text(["title", "body"], "gate"), &d));
        assert!(!matches(&Query::new().full_text(["title"], "addressable"), &d));
        assert!(!matches(&Query::new().full_text(["body"], "storage content"), &d));
    }

    #[test]
    fn sub_queries_are_or_combined() {
        let d = doc(json!({"author": "alice", "year": 2010}));
        let q = Query::new()
            .equals("author", "bob")
            .or(Query::new().less_than("year", 2015));
        assert!(matches(&q, &d));

        let q = Query::new()
            .equals("author", "bob")
            .or(Query::new().greater_than("year", 2015));
        assert!(!matches(&q, &d));

        let only_or = Query::new().or(Query::new().equals("author", "alice"));
        assert!(matches(&only_or, &d));
    }

    #[test]
    fn boolean_flags_match_by_value() {
        let d = doc(json!({"__pinned": false}));
        assert!(matches(&Query::new().equals("__pinned", false), &d));
        assert!(!matches(&Query::new().equals("__pinned", true), &d));
    }
}
