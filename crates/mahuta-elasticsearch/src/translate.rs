//! # Query Translation
//!
//! Maps a [`Query`] to the Elasticsearch query DSL.
//!
//! | Operation | Clause | Section |
//! |-----------|--------|---------|
//! | `FULL_TEXT` | `multi_match` (`phrase_prefix`) | `must` |
//! | `EQUALS` | `term` | `must` |
//! | `NOT_EQUALS` | `term` | `must_not` |
//! | `CONTAINS` | `match` | `must` |
//! | `IN` | `terms` | `filter` |
//! | `NOT_IN` | `terms` | `must_not` |
//! | `LT` `LTE` `GT` `GTE` | `range` | `must` |
//!
//! The filter block of a query is one `bool`. Sub-queries are OR-ed with it
//! through a `should` with `minimum_should_match: 1`. An empty query is
//! `match_all`.

use mahuta_core::{Filter, PageRequest, Query, QueryOperation};
use serde_json::{json, Map, Value};

/// Full `_search` body: query, pagination, sort and exact hit counting.
pub fn search_body(query: &Query, page_request: &PageRequest) -> Value {
    let mut body = json!({
        "query": to_query_dsl(query),
        "from": page_request.offset(),
        "size": page_request.size(),
        "track_total_hits": true,
    });
    if let Some(field) = page_request.sort() {
        body["sort"] = json!([{
            field: {
                "order": page_request.direction().as_str(),
                "unmapped_type": "keyword",
            }
        }]);
    }
    body
}

/// Translate a query tree.
pub fn to_query_dsl(query: &Query) -> Value {
    if query.is_empty() {
        return json!({"match_all": {}});
    }
    let filters = query.filter_clauses();
    if query.sub_queries().is_empty() {
        return filter_block(filters);
    }

    let mut should = Vec::with_capacity(query.sub_queries().len() + 1);
    if !filters.is_empty() {
        should.push(filter_block(filters));
    }
    should.extend(query.sub_queries().iter().map(to_query_dsl));
    json!({"bool": {"should": should, "minimum_should_match": 1}})
}

fn filter_block(filters: &[Filter]) -> Value {
    let mut must = Vec::new();
    let mut must_not = Vec::new();
    let mut filter = Vec::new();

    for f in filters {
        let name = f.name();
        let value = f.value();
        match f.operation() {
            QueryOperation::FullText => must.push(json!({
                "multi_match": {
                    "query": value,
                    "fields": f.names(),
                    "type": "phrase_prefix",
                }
            })),
            QueryOperation::Equals => must.push(json!({"term": {name: value}})),
            QueryOperation::NotEquals => must_not.push(json!({"term": {name: value}})),
            QueryOperation::Contains => must.push(json!({"match": {name: value}})),
            op @ (QueryOperation::In | QueryOperation::NotIn) => {
                if !value.is_array() {
                    tracing::warn!(field = name, operation = %op, "filter value must be a collection, ignoring filter");
                    continue;
                }
                let clause = json!({"terms": {name: value}});
                if op == QueryOperation::In {
                    filter.push(clause);
                } else {
                    must_not.push(clause);
                }
            }
            op => {
                let bound = match op {
                    QueryOperation::Lt => "lt",
                    QueryOperation::Lte => "lte",
                    QueryOperation::Gt => "gt",
                    _ => "gte",
                };
                must.push(json!({"range": {name: {bound: value}}}));
            }
        }
    }

    let mut bool_query = Map::new();
    for (section, clauses) in [("must", must), ("must_not", must_not), ("filter", filter)] {
        if !clauses.is_empty() {
            bool_query.insert(section.to_string(), Value::Array(clauses));
        }
    }
    json!({"bool": bool_query})
}
