//! Weaviate HTTP client
//!
//! Talks to Weaviate's REST schema and batch endpoints and its GraphQL
//! `Get` query. Embedding happens inside Weaviate through the collection's
//! vectorizer module; the provider key travels as a request header.

use super::{CollectionSchema, ScoredRecord, StoredRecord, VectorStore, BODY_PROPERTY};
use crate::config::{required, AppConfig};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Resolved connection settings
#[derive(Debug, Clone)]
pub struct WeaviateSettings {
    pub cluster_url: String,
    pub api_key: String,
    /// Header name and key for the vectorizer's provider
    pub vectorizer_header: Option<(String, String)>,
    pub batch_size: usize,
    pub timeout: Duration,
}

impl WeaviateSettings {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let cluster_url = required(&config.store.cluster_url, "store.cluster_url", "CLUSTER_URL")?;
        let api_key = required(&config.store.api_key, "store.api_key", "WEAVIATE_API_KEY")?;
        let vectorizer_key =
            required(&config.vectorizer.api_key, "vectorizer.api_key", "HuggingFace_API")?;

        Ok(Self {
            cluster_url: cluster_url.to_string(),
            api_key: api_key.to_string(),
            vectorizer_header: provider_header(&config.vectorizer.module)
                .map(|name| (name.to_string(), vectorizer_key.to_string())),
            batch_size: config.store.batch_size.max(1),
            timeout: config.store_timeout(),
        })
    }
}

/// Header Weaviate reads the provider key from, per vectorizer module
fn provider_header(module: &str) -> Option<&'static str> {
    match module {
        "text2vec-huggingface" => Some("X-HuggingFace-Api-Key"),
        "text2vec-openai" => Some("X-OpenAI-Api-Key"),
        "text2vec-cohere" => Some("X-Cohere-Api-Key"),
        _ => None,
    }
}

/// Accept bare hosts the way cloud connection strings are usually given
fn normalize_base_url(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

/// Weaviate client
pub struct WeaviateStore {
    client: reqwest::Client,
    base_url: String,
    batch_size: usize,
}

#[derive(Deserialize)]
struct BatchObjectResult {
    id: Option<String>,
    result: Option<BatchObjectStatus>,
}

#[derive(Deserialize)]
struct BatchObjectStatus {
    errors: Option<BatchErrors>,
}

#[derive(Deserialize)]
struct BatchErrors {
    #[serde(default)]
    error: Vec<BatchErrorMessage>,
}

#[derive(Deserialize)]
struct BatchErrorMessage {
    message: String,
}

#[derive(Deserialize)]
struct GraphQlResponse {
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
}

impl WeaviateStore {
    /// Create a new client
    pub fn new(settings: WeaviateSettings) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", settings.api_key)).map_err(|e| {
                AppError::Configuration {
                    message: format!("Invalid store API key: {}", e),
                }
            })?,
        );
        if let Some((name, key)) = &settings.vectorizer_header {
            let name = reqwest::header::HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                AppError::Configuration {
                    message: format!("Invalid vectorizer header name: {}", e),
                }
            })?;
            let value = HeaderValue::from_str(key).map_err(|e| AppError::Configuration {
                message: format!("Invalid vectorizer API key: {}", e),
            })?;
            headers.insert(name, value);
        }

        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: normalize_base_url(&settings.cluster_url),
            batch_size: settings.batch_size,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn unavailable(context: &str, e: impl std::fmt::Display) -> AppError {
        AppError::StoreUnavailable {
            message: format!("{}: {}", context, e),
        }
    }

    async fn insert_batch(&self, collection: &str, records: &[StoredRecord]) -> Result<()> {
        let objects: Vec<Value> = records
            .iter()
            .map(|r| {
                json!({
                    "class": collection,
                    "id": r.id,
                    "properties": { BODY_PROPERTY: r.body },
                })
            })
            .collect();

        let response = self
            .client
            .post(format!("{}/v1/batch/objects", self.base_url))
            .json(&json!({ "objects": objects }))
            .send()
            .await
            .map_err(|e| AppError::StoreWriteFailed {
                message: format!("Batch request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::StoreWriteFailed {
                message: format!("Batch API error {}: {}", status, body),
            });
        }

        let results: Vec<BatchObjectResult> =
            response.json().await.map_err(|e| AppError::StoreWriteFailed {
                message: format!("Failed to parse batch response: {}", e),
            })?;

        let rejected: Vec<String> = results
            .into_iter()
            .filter_map(|r| {
                let errors = r.result?.errors?;
                let first = errors.error.into_iter().next()?;
                Some(format!(
                    "{}: {}",
                    r.id.unwrap_or_else(|| "<unknown>".to_string()),
                    first.message
                ))
            })
            .collect();

        if !rejected.is_empty() {
            return Err(AppError::StoreWriteFailed {
                message: format!(
                    "{} of {} objects rejected; first: {}",
                    rejected.len(),
                    records.len(),
                    rejected[0]
                ),
            });
        }

        Ok(())
    }
}

/// Build the GraphQL `Get` query for a nearest-text lookup.
///
/// The concept is embedded as a JSON string literal, whose escapes GraphQL accepts.
fn near_text_query(collection: &str, query: &str, limit: usize) -> Result<String> {
    let concept = serde_json::to_string(query)?;
    Ok(format!(
        "{{ Get {{ {collection}(nearText: {{ concepts: [{concept}] }}, limit: {limit}) \
         {{ {BODY_PROPERTY} _additional {{ id distance certainty }} }} }} }}"
    ))
}

/// Pull matches out of `data.Get.<collection>`
fn parse_matches(data: &Value, collection: &str) -> Vec<ScoredRecord> {
    let Some(objects) = data
        .get("Get")
        .and_then(|get| get.get(collection))
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };

    objects
        .iter()
        .filter_map(|object| {
            let body = object.get(BODY_PROPERTY)?.as_str()?.to_string();
            let additional = object.get("_additional");
            let id = additional
                .and_then(|a| a.get("id"))
                .and_then(Value::as_str)
                .and_then(|s| Uuid::parse_str(s).ok());
            let certainty = additional
                .and_then(|a| a.get("certainty"))
                .and_then(Value::as_f64);
            let distance = additional
                .and_then(|a| a.get("distance"))
                .and_then(Value::as_f64);
            let score = certainty
                .or_else(|| distance.map(|d| 1.0 - d))
                .unwrap_or(0.0) as f32;
            Some(ScoredRecord { id, body, score })
        })
        .collect()
}

fn schema_body(schema: &CollectionSchema) -> Value {
    let properties: Vec<Value> = schema
        .properties
        .iter()
        .map(|p| json!({ "name": p.name, "dataType": [p.data_type] }))
        .collect();

    let mut class = json!({
        "class": schema.name,
        "properties": properties,
    });

    match &schema.vectorizer {
        Some(v) => {
            class["vectorizer"] = json!(v.module);
            class["moduleConfig"] = json!({ v.module.as_str(): { "model": v.model } });
        }
        None => class["vectorizer"] = json!("none"),
    }
    class
}

#[async_trait]
impl VectorStore for WeaviateStore {
    async fn collection_exists(&self, name: &str) -> Result<bool> {
        let response = self
            .client
            .get(format!("{}/v1/schema/{}", self.base_url, name))
            .send()
            .await
            .map_err(|e| Self::unavailable("Schema lookup failed", e))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(Self::unavailable(
                    "Schema lookup failed",
                    format!("{} {}", status, body),
                ))
            }
        }
    }

    async fn create_collection(&self, schema: &CollectionSchema) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/v1/schema", self.base_url))
            .json(&schema_body(schema))
            .send()
            .await
            .map_err(|e| Self::unavailable("Collection creation failed", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Self::unavailable(
                "Collection creation failed",
                format!("{} {}", status, body),
            ));
        }

        info!(collection = %schema.name, "Weaviate collection created");
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let response = self
            .client
            .delete(format!("{}/v1/schema/{}", self.base_url, name))
            .send()
            .await
            .map_err(|e| Self::unavailable("Collection deletion failed", e))?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                warn!(collection = %name, "Collection already deleted (404)");
                Ok(())
            }
            status if status.is_success() => Ok(()),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(Self::unavailable(
                    "Collection deletion failed",
                    format!("{} {}", status, body),
                ))
            }
        }
    }

    async fn insert_many(&self, collection: &str, records: &[StoredRecord]) -> Result<()> {
        for batch in records.chunks(self.batch_size) {
            self.insert_batch(collection, batch).await?;
            debug!(collection = %collection, batch = batch.len(), "Batch stored");
        }
        Ok(())
    }

    async fn near_text(
        &self,
        collection: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ScoredRecord>> {
        let graphql = near_text_query(collection, query, limit)?;

        let response = self
            .client
            .post(format!("{}/v1/graphql", self.base_url))
            .json(&json!({ "query": graphql }))
            .send()
            .await
            .map_err(|e| AppError::RetrievalFailed {
                message: format!("Query request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::RetrievalFailed {
                message: format!("Query API error {}: {}", status, body),
            });
        }

        let parsed: GraphQlResponse =
            response.json().await.map_err(|e| AppError::RetrievalFailed {
                message: format!("Failed to parse query response: {}", e),
            })?;

        if let Some(first) = parsed.errors.first() {
            // Querying a class that does not exist is a GraphQL error, not an empty result
            if !self.collection_exists(collection).await.unwrap_or(true) {
                debug!(collection = %collection, "Query against absent collection");
                return Ok(Vec::new());
            }
            return Err(AppError::RetrievalFailed {
                message: first.message.clone(),
            });
        }

        Ok(parsed
            .data
            .map(|data| parse_matches(&data, collection))
            .unwrap_or_default())
    }

    async fn ping(&self) -> Result<()> {
        let response = self
            .client
            .get(format!("{}/v1/.well-known/ready", self.base_url))
            .send()
            .await
            .map_err(|e| Self::unavailable("Readiness check failed", e))?;

        if !response.status().is_success() {
            return Err(Self::unavailable(
                "Readiness check failed",
                response.status(),
            ));
        }
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "weaviate"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::VectorizerSpec;

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(
            normalize_base_url("demo.weaviate.cloud/"),
            "https://demo.weaviate.cloud"
        );
        assert_eq!(
            normalize_base_url("http://localhost:8080"),
            "http://localhost:8080"
        );
    }

    #[test]
    fn test_near_text_query_escapes_concept() {
        let query = near_text_query("HR_doc", "what is \"PTO\"?\n", 1).unwrap();
        assert!(query.contains(r#"concepts: ["what is \"PTO\"?\n"]"#));
        assert!(query.contains("HR_doc(nearText:"));
        assert!(query.contains("limit: 1"));
        assert!(query.contains("_additional { id distance certainty }"));
    }

    #[test]
    fn test_parse_matches_prefers_certainty() {
        let data = json!({
            "Get": {
                "HR_doc": [{
                    "body": "Annual leave is 25 days.",
                    "_additional": {
                        "id": "6f1a1d4e-0000-5000-8000-000000000000",
                        "certainty": 0.91,
                        "distance": 0.18
                    }
                }]
            }
        });
        let matches = parse_matches(&data, "HR_doc");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].body, "Annual leave is 25 days.");
        assert!((matches[0].score - 0.91).abs() < 1e-6);
        assert!(matches[0].id.is_some());
    }

    #[test]
    fn test_parse_matches_falls_back_to_distance() {
        let data = json!({
            "Get": { "HR_doc": [{ "body": "x", "_additional": { "distance": 0.25 } }] }
        });
        let matches = parse_matches(&data, "HR_doc");
        assert!((matches[0].score - 0.75).abs() < 1e-6);
        assert_eq!(matches[0].id, None);
    }

    #[test]
    fn test_parse_matches_empty() {
        let data = json!({ "Get": { "HR_doc": [] } });
        assert!(parse_matches(&data, "HR_doc").is_empty());
        assert!(parse_matches(&json!({}), "HR_doc").is_empty());
    }

    #[test]
    fn test_schema_body_with_vectorizer() {
        let schema = CollectionSchema::documents(
            "HR_doc",
            Some(VectorizerSpec {
                module: "text2vec-huggingface".into(),
                model: "sentence-transformers/all-MiniLM-L6-v2".into(),
            }),
        );
        let body = schema_body(&schema);
        assert_eq!(body["class"], "HR_doc");
        assert_eq!(body["vectorizer"], "text2vec-huggingface");
        assert_eq!(
            body["moduleConfig"]["text2vec-huggingface"]["model"],
            "sentence-transformers/all-MiniLM-L6-v2"
        );
        assert_eq!(body["properties"][0]["name"], "body");
        assert_eq!(body["properties"][0]["dataType"][0], "text");
    }

    #[test]
    fn test_provider_header() {
        assert_eq!(
            provider_header("text2vec-huggingface"),
            Some("X-HuggingFace-Api-Key")
        );
        assert_eq!(provider_header("none"), None);
    }

    #[test]
    fn test_settings_require_keys() {
        let config = AppConfig::default();
        assert!(matches!(
            WeaviateSettings::from_config(&config),
            Err(AppError::ConfigurationMissing { .. })
        ));
    }
}
