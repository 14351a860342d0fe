//! [`IndexingService`] implementation over the Elasticsearch REST API.
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | GET    | `/` | cluster info, checked on connect |
//! | HEAD   | `/{index}` | index existence |
//! | PUT    | `/{index}` | create index with mapping |
//! | GET    | `/_aliases` | list indices |
//! | GET    | `/{index}/_doc/{id}` | fetch a document |
//! | PUT    | `/{index}/_doc/{id}?refresh=true` | create a document |
//! | POST   | `/{index}/_update/{id}?refresh=true&retry_on_conflict=5` | merge or scripted update |
//! | DELETE | `/{index}/_doc/{id}?refresh=true` | delete a document |
//! | POST   | `/{index}/_search` | search |

use async_trait::async_trait;
use mahuta_core::indexing::{
    generate_doc_id, is_reserved_key, ALL_INDICES, CONTENT_TYPE_INDEX_KEY, HASH_INDEX_KEY,
    PINNED_INDEX_KEY,
};
use mahuta_core::{
    IndexFields, IndexingService, MahutaError, MahutaResult, Metadata, Page, PageRequest, Query,
};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use url::Url;

use crate::config::{ConfigError, ElasticConfig};
use crate::error::ElasticError;
use crate::translate::search_body;

const RETRY_ON_CONFLICT: &str = "5";

#[derive(Debug, Deserialize)]
struct ClusterInfo {
    cluster_name: String,
    #[serde(default)]
    version: Option<ClusterVersion>,
}

#[derive(Debug, Deserialize)]
struct ClusterVersion {
    number: String,
}

#[derive(Debug, Deserialize)]
struct DocResponse {
    #[serde(rename = "_index")]
    index: String,
    #[serde(rename = "_id")]
    id: String,
    #[serde(default)]
    found: bool,
    #[serde(rename = "_source", default)]
    source: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: Hits,
}

#[derive(Debug, Deserialize)]
struct Hits {
    #[serde(default)]
    total: Value,
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_index")]
    index: String,
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_source", default)]
    source: Map<String, Value>,
}

/// Mapping applied when an index is created without configuration.
pub fn default_mapping() -> Value {
    json!({
        "mappings": {
            "properties": {
                HASH_INDEX_KEY: {"type": "keyword"},
                CONTENT_TYPE_INDEX_KEY: {"type": "keyword"},
            }
        }
    })
}

#[derive(Debug, Clone)]
pub struct ElasticSearchIndexer {
    http: reqwest::Client,
    config: ElasticConfig,
}

impl ElasticSearchIndexer {
    pub fn new(config: ElasticConfig) -> Result<Self, ElasticError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ElasticError::http("client_init", e))?;
        Ok(Self { http, config })
    }

    /// Build the indexer and check the cluster answers `GET /`.
    ///
    /// # Errors
    ///
    /// `Connection` when the cluster cannot be reached.
    pub async fn connect(config: ElasticConfig) -> MahutaResult<Self> {
        let indexer = Self::new(config)?;
        let backend = format!("elasticsearch [{}]", indexer.config.url);
        let info: ClusterInfo = indexer
            .send(Method::GET, &[], &[], None)
            .await
            .map_err(|e| MahutaError::connection(backend.clone(), e))?
            .json()
            .await
            .map_err(|e| MahutaError::connection(backend.clone(), e))?;

        if info.cluster_name != indexer.config.cluster_name {
            tracing::warn!(
                expected = %indexer.config.cluster_name,
                actual = %info.cluster_name,
                "connected to an unexpected Elasticsearch cluster"
            );
        }
        tracing::info!(
            cluster = %info.cluster_name,
            version = info.version.as_ref().map(|v| v.number.as_str()).unwrap_or("unknown"),
            url = %indexer.config.url,
            "connected to Elasticsearch"
        );
        Ok(indexer)
    }

    pub fn config(&self) -> &ElasticConfig {
        &self.config
    }

    fn url(&self, segments: &[&str]) -> Result<Url, ElasticError> {
        let mut url = self.config.url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ConfigError::InvalidUrl(self.config.url.to_string(), "cannot be a base".into())
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Send a request and fail on any non-2xx status.
    async fn send(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<reqwest::Response, ElasticError> {
        let endpoint = format!("{method} /{}", segments.join("/"));
        let url = self.url(segments)?;
        let mut request = self.http.request(method, url).query(query);
        if let Some(body) = body {
            request = request.json(body);
        }
        let resp = request
            .send()
            .await
            .map_err(|e| ElasticError::http(endpoint.clone(), e))?;
        if !resp.status().is_success() {
            return Err(ElasticError::from_response(endpoint, resp).await);
        }
        Ok(resp)
    }

    async fn index_exists(&self, index_name: &str) -> Result<bool, ElasticError> {
        match self.send(Method::HEAD, &[index_name], &[], None).await {
            Ok(_) => Ok(true),
            Err(err) if err.status() == Some(StatusCode::NOT_FOUND.as_u16()) => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn fetch(&self, index_name: &str, index_doc_id: &str) -> Result<Option<DocResponse>, ElasticError> {
        let endpoint = format!("GET /{index_name}/_doc/{index_doc_id}");
        let resp = match self
            .send(Method::GET, &[index_name, "_doc", index_doc_id], &[], None)
            .await
        {
            Ok(resp) => resp,
            Err(err) if err.status() == Some(StatusCode::NOT_FOUND.as_u16()) => return Ok(None),
            Err(err) => return Err(err),
        };
        let doc: DocResponse = resp
            .json()
            .await
            .map_err(|e| ElasticError::deserialization(endpoint, e))?;
        Ok(doc.found.then_some(doc))
    }

    /// Field values as written: reserved keys dropped, nulls replaced when
    /// configured.
    fn source_of(&self, index_fields: &IndexFields) -> Map<String, Value> {
        let mut source: Map<String, Value> = index_fields
            .iter()
            .filter(|(k, _)| !is_reserved_key(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if self.config.index_null_value {
            replace_null_values(&mut source);
        }
        source
    }
}

/// Replace null and empty-string values with `"null"`, recursively.
pub fn replace_null_values(fields: &mut Map<String, Value>) {
    for value in fields.values_mut() {
        if value.is_null() || value.as_str() == Some("") {
            *value = Value::from("null");
        } else if let Value::Object(nested) = value {
            replace_null_values(nested);
        }
    }
}

fn to_metadata(index_name: String, index_doc_id: String, source: Map<String, Value>) -> Metadata {
    let text = |key: &str| source.get(key).and_then(Value::as_str).map(str::to_string);
    Metadata {
        content_id: text(HASH_INDEX_KEY),
        content_type: text(CONTENT_TYPE_INDEX_KEY),
        index_fields: source
            .iter()
            .filter(|(k, _)| !is_reserved_key(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
        index_name,
        index_doc_id,
    }
}

fn total_hits(total: &Value) -> u64 {
    match total {
        Value::Number(n) => n.as_u64().unwrap_or(0),
        Value::Object(o) => o.get("value").and_then(Value::as_u64).unwrap_or(0),
        _ => 0,
    }
}

fn not_found(index_name: &str, index_doc_id: &str) -> MahutaError {
    MahutaError::NotFound(format!(
        "Document not found [index: {index_name}, id: {index_doc_id}]"
    ))
}

#[async_trait]
impl IndexingService for ElasticSearchIndexer {
    fn name(&self) -> &str {
        "elasticsearch"
    }

    async fn create_index(&self, index_name: &str, configuration: Option<&Value>) -> MahutaResult<()> {
        let name = index_name.to_lowercase();
        if self.index_exists(&name).await? {
            tracing::debug!(index = %name, "index already exists");
            return Ok(());
        }
        let mapping = configuration.cloned().unwrap_or_else(default_mapping);
        match self.send(Method::PUT, &[name.as_str()], &[], Some(&mapping)).await {
            Ok(_) => {
                tracing::info!(index = %name, "index created");
                Ok(())
            }
            Err(err) if err.is_already_exists() => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    async fn get_indexes(&self) -> MahutaResult<Vec<String>> {
        let aliases: Map<String, Value> = self
            .send(Method::GET, &["_aliases"], &[], None)
            .await?
            .json()
            .await
            .map_err(|e| ElasticError::deserialization("GET /_aliases", e))?;
        Ok(aliases
            .into_iter()
            .map(|(name, _)| name)
            .filter(|name| !name.starts_with('.'))
            .collect())
    }

    async fn index(
        &self,
        index_name: &str,
        index_doc_id: Option<&str>,
        content_id: Option<&str>,
        content_type: Option<&str>,
        index_fields: &IndexFields,
    ) -> MahutaResult<String> {
        let name = index_name.to_lowercase();
        if !self.index_exists(&name).await? {
            return Err(MahutaError::NoIndex(name));
        }

        let mut source = self.source_of(index_fields);
        if let Some(cid) = content_id {
            source.insert(HASH_INDEX_KEY.to_string(), Value::from(cid));
        }
        if let Some(ct) = content_type {
            source.insert(CONTENT_TYPE_INDEX_KEY.to_string(), Value::from(ct));
        }
        // Created or merged, the document waits for the replica fan-out.
        source.insert(PINNED_INDEX_KEY.to_string(), Value::Bool(false));

        if let Some(id) = index_doc_id {
            if self.fetch(&name, id).await?.is_some() {
                let body = json!({"doc": source});
                self.send(
                    Method::POST,
                    &[name.as_str(), "_update", id],
                    &[("refresh", "true"), ("retry_on_conflict", RETRY_ON_CONFLICT)],
                    Some(&body),
                )
                .await?;
                tracing::debug!(index = %name, id, "document updated");
                return Ok(id.to_string());
            }
        }

        let id = index_doc_id.map_or_else(generate_doc_id, str::to_string);
        self.send(
            Method::PUT,
            &[name.as_str(), "_doc", id.as_str()],
            &[("refresh", "true")],
            Some(&Value::Object(source)),
        )
        .await?;
        tracing::debug!(index = %name, id = %id, "document created");
        Ok(id)
    }

    async fn deindex(&self, index_name: &str, index_doc_id: &str) -> MahutaResult<()> {
        let name = index_name.to_lowercase();
        match self
            .send(
                Method::DELETE,
                &[name.as_str(), "_doc", index_doc_id],
                &[("refresh", "true")],
                None,
            )
            .await
        {
            Ok(_) => Ok(()),
            Err(err) if err.status() == Some(StatusCode::NOT_FOUND.as_u16()) => {
                Err(not_found(&name, index_doc_id))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn get_document(&self, index_name: &str, index_doc_id: &str) -> MahutaResult<Metadata> {
        let name = index_name.to_lowercase();
        let doc = self
            .fetch(&name, index_doc_id)
            .await?
            .ok_or_else(|| not_found(&name, index_doc_id))?;
        Ok(to_metadata(doc.index, doc.id, doc.source))
    }

    async fn update_field(
        &self,
        index_name: &str,
        index_doc_id: &str,
        key: &str,
        value: Value,
    ) -> MahutaResult<()> {
        let name = index_name.to_lowercase();
        let body = json!({
            "script": {
                "source": "ctx._source[params.key] = params.value",
                "lang": "painless",
                "params": {"key": key, "value": value},
            }
        });
        match self
            .send(
                Method::POST,
                &[name.as_str(), "_update", index_doc_id],
                &[("refresh", "true"), ("retry_on_conflict", RETRY_ON_CONFLICT)],
                Some(&body),
            )
            .await
        {
            Ok(_) => Ok(()),
            Err(err) if err.status() == Some(StatusCode::NOT_FOUND.as_u16()) => {
                Err(not_found(&name, index_doc_id))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn search_documents(
        &self,
        index_name: Option<&str>,
        query: &Query,
        page_request: &PageRequest,
    ) -> MahutaResult<Page<Metadata>> {
        let target = index_name
            .map(str::to_lowercase)
            .unwrap_or_else(|| ALL_INDICES.to_string());
        let body = search_body(query, page_request);
        tracing::trace!(index = %target, body = %body, "search");

        let resp = match self
            .send(Method::POST, &[target.as_str(), "_search"], &[], Some(&body))
            .await
        {
            Ok(resp) => resp,
            Err(err) if err.is_index_not_found() => return Err(MahutaError::NoIndex(target)),
            Err(err) => return Err(err.into()),
        };
        let result: SearchResponse = resp
            .json()
            .await
            .map_err(|e| ElasticError::deserialization(format!("POST /{target}/_search"), e))?;

        let total = total_hits(&result.hits.total);
        let elements = result
            .hits
            .hits
            .into_iter()
            .map(|hit| to_metadata(hit.index, hit.id, hit.source))
            .collect();
        Ok(Page::new(page_request.clone(), elements, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_mapping_declares_reserved_keywords() {
        let mapping = default_mapping();
        let props = &mapping["mappings"]["properties"];
        assert_eq!(props["__hash"]["type"], "keyword");
        assert_eq!(props["__content_type"]["type"], "keyword");
    }

    #[test]
    fn null_values_are_replaced_recursively() {
        let mut fields = json!({"a": null, "b": "", "c": "x", "d": {"e": null}, "f": 0})
            .as_object()
            .cloned()
            .unwrap();
        replace_null_values(&mut fields);
        assert_eq!(
            Value::Object(fields),
            json!({"a": "null", "b": "null", "c": "x", "d": {"e": "null"}, "f": 0})
        );
    }

    #[test]
    fn metadata_strips_reserved_keys() {
        let source = json!({"__hash": "QmA", "__content_type": "text/plain", "__pinned": true, "author": "alice"})
            .as_object()
            .cloned()
            .unwrap();
        let m = to_metadata("docs".into(), "1".into(), source);
        assert_eq!(m.content_id.as_deref(), Some("QmA"));
        assert_eq!(m.content_type.as_deref(), Some("text/plain"));
        assert_eq!(Value::Object(m.index_fields), json!({"author": "alice"}));
    }

    #[test]
    fn total_hits_accepts_both_formats() {
        assert_eq!(total_hits(&json!(7)), 7);
        assert_eq!(total_hits(&json!({"value": 12, "relation": "eq"})), 12);
        assert_eq!(total_hits(&Value::Null), 0);
    }
}
