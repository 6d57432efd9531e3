//! Typesense backend / Typesense 后端
//!
//! Requires a running Typesense server (default localhost:8108, api key "xyz").
//! `create` drops the configured collection before importing.

pub mod client;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;

use crate::backend::{ignore_not_found, BackendError, BackendFactory, Capability, SearchBackend, SubmitReport};
use crate::config::{AppConfig, TypesenseConfig};
use crate::search::mapper::MappingOptions;
use crate::search::schema::{CollectionSchema, ConceptDocument, FieldSpec, SearchRequest, SearchResults};

use client::TypesenseClient;
use types::{ImportResult, TypesenseDocument};

/// Searchable fields, in `query_by` order / 搜索字段
pub const QUERY_BY: [&str; 4] = ["identifier", "prefLabel", "altLabel", "notes"];

pub struct TypesenseBackend {
    config: TypesenseConfig,
    client: TypesenseClient,
}

impl TypesenseBackend {
    pub fn new(config: TypesenseConfig) -> Result<Self, BackendError> {
        let client = TypesenseClient::new(
            &config.url,
            &config.api_key,
            Duration::from_secs(config.connection_timeout_secs),
        )?;
        Ok(Self { config, client })
    }
}

/// NDJSON import body / 导入请求体
pub fn to_import_body(batch: &[ConceptDocument]) -> Result<String, BackendError> {
    let mut body = String::new();
    for doc in batch {
        body.push_str(&serde_json::to_string(&TypesenseDocument::from(doc))?);
        body.push('\n');
    }
    Ok(body)
}

/// Count successes, log rejected documents / 统计导入结果
fn summarize(results: &[ImportResult]) -> SubmitReport {
    let mut report = SubmitReport::default();
    for result in results {
        if result.success {
            report.indexed += 1;
        } else {
            report.failed += 1;
            tracing::warn!(
                "Document rejected: {} ({})",
                result.error.as_deref().unwrap_or("unknown error"),
                result.document.as_deref().unwrap_or("-")
            );
        }
    }
    report
}

#[async_trait]
impl SearchBackend for TypesenseBackend {
    fn name(&self) -> &str {
        "typesense"
    }

    fn capabilities(&self) -> Capability {
        Capability {
            batch_size: self.config.batch_size,
            display_limit: self.config.display_limit,
        }
    }

    fn schema(&self) -> CollectionSchema {
        CollectionSchema {
            name: self.config.collection.clone(),
            fields: QUERY_BY
                .iter()
                .map(|name| FieldSpec::string_array(name).infix())
                .collect(),
        }
    }

    fn mapping_options(&self) -> MappingOptions {
        MappingOptions {
            search_keys: false,
            ..MappingOptions::default()
        }
    }

    async fn recreate(&self, schema: &CollectionSchema) -> Result<(), BackendError> {
        if ignore_not_found(self.client.delete_collection(&schema.name).await)? {
            tracing::info!("- Collection {} deleted.", schema.name);
        }
        self.client.create_collection(schema).await?;
        tracing::info!("- Collection {} created.", schema.name);
        Ok(())
    }

    async fn submit(&self, batch: &[ConceptDocument]) -> Result<SubmitReport, BackendError> {
        if batch.is_empty() {
            return Ok(SubmitReport::default());
        }
        let body = to_import_body(batch)?;
        let results = self.client.import(&self.config.collection, body).await?;
        Ok(summarize(&results))
    }

    async fn search(&self, request: &SearchRequest) -> Result<SearchResults, BackendError> {
        let per_page = request.limit.min(self.config.per_page);
        let response = self
            .client
            .search(&self.config.collection, &request.query, &QUERY_BY, per_page)
            .await?;
        Ok(SearchResults {
            total: response.found,
            hits: response.hits.into_iter().map(Into::into).collect(),
            notation_position: None,
        })
    }
}

pub struct TypesenseBackendFactory;

impl BackendFactory for TypesenseBackendFactory {
    fn backend_type(&self) -> &'static str {
        "typesense"
    }

    fn description(&self) -> &'static str {
        "Typesense server collection with native infix search"
    }

    fn create_backend(&self, config: &AppConfig) -> Result<Box<dyn SearchBackend>, BackendError> {
        Ok(Box::new(TypesenseBackend::new(config.typesense.clone())?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::mapper::DocumentMapper;
    use crate::search::schema::SearchHit;
    use serde_json::{json, Value};

    #[test]
    fn test_schema_declares_infix_string_arrays() {
        let backend = TypesenseBackend::new(TypesenseConfig::default()).unwrap();
        let schema = serde_json::to_value(backend.schema()).unwrap();
        assert_eq!(
            schema,
            json!({
                "name": "test",
                "fields": [
                    { "name": "identifier", "type": "string[]", "infix": true },
                    { "name": "prefLabel", "type": "string[]", "infix": true },
                    { "name": "altLabel", "type": "string[]", "infix": true },
                    { "name": "notes", "type": "string[]", "infix": true }
                ]
            })
        );
    }

    #[test]
    fn test_import_body_is_ndjson() {
        let record = json!({
            "uri": "http://x/1",
            "notation": ["612.1"],
            "prefLabel": { "de": "Kreislauf" },
            "scopeNote": { "de": ["Hinweis"] }
        });
        let doc = DocumentMapper::default().map(&record).unwrap().unwrap();
        let body = to_import_body(&[doc.clone(), doc]).unwrap();

        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["id"], "http://x/1");
        assert_eq!(first["identifier"], json!(["http://x/1", "612.1"]));
        assert_eq!(first["prefLabel"], json!(["Kreislauf"]));
        assert_eq!(first["altLabel"], json!([]));
        assert_eq!(first["notes"], json!(["Hinweis"]));
        assert_eq!(first["concept"], record);
    }

    #[test]
    fn test_summarize_counts_rejections() {
        let results = client::parse_import_response("{\"success\":true}\n{\"success\":false,\"error\":\"bad\"}").unwrap();
        assert_eq!(summarize(&results), SubmitReport { indexed: 1, failed: 1 });
    }

    #[tokio::test]
    async fn test_empty_batch_is_noop() {
        // Points at a closed port; an empty batch must not touch the network
        let config = TypesenseConfig {
            url: "http://127.0.0.1:9".to_string(),
            ..TypesenseConfig::default()
        };
        let backend = TypesenseBackend::new(config).unwrap();
        assert_eq!(backend.submit(&[]).await.unwrap(), SubmitReport::default());
    }

    #[test]
    fn test_search_response_to_hits() {
        let response: types::SearchResponse = serde_json::from_value(json!({
            "found": 12,
            "hits": [
                {
                    "document": {
                        "id": "http://x/1",
                        "identifier": ["http://x/1", "612.1"],
                        "prefLabel": ["Kreislauf", "Circulation"],
                        "concept": { "notation": ["612.1"] }
                    },
                    "text_match": 578730123365187705u64
                },
                {
                    "document": { "id": "http://x/2", "identifier": ["http://x/2", "urn:x", "551.5"], "prefLabel": [] }
                }
            ]
        }))
        .unwrap();

        let hits: Vec<SearchHit> = response.hits.into_iter().map(Into::into).collect();
        assert_eq!(response.found, 12);
        assert_eq!(hits[0].notation.as_deref(), Some("612.1"));
        assert_eq!(hits[0].pref_label.as_deref(), Some("Kreislauf"));
        assert!(hits[0].score.is_some());
        assert_eq!(hits[1].notation.as_deref(), Some("551.5"));
        assert_eq!(hits[1].pref_label, None);
    }

    #[test]
    fn test_hit_shows_last_identifier() {
        let response: types::SearchResponse = serde_json::from_value(json!({
            "found": 2,
            "hits": [
                {
                    "document": {
                        "id": "http://x/1",
                        "identifier": ["http://x/1", "612.1", "612.10"],
                        "prefLabel": ["Kreislauf"],
                        "concept": { "notation": ["612.1", "612.10"] }
                    }
                },
                {
                    "document": { "id": "http://x/2", "identifier": ["http://x/2"], "prefLabel": ["Atmung"] }
                }
            ]
        }))
        .unwrap();

        let results = SearchResults {
            total: response.found,
            hits: response.hits.into_iter().map(Into::into).collect(),
            notation_position: None,
        };
        assert_eq!(results.hits[0].notation.as_deref(), Some("612.10"));
        assert_eq!(results.notation_rank("612.10"), Some(0));
        assert_eq!(results.notation_rank("612.1"), None);
        // URI only: nothing beyond the id to show
        assert_eq!(results.hits[1].notation, None);
    }
}
