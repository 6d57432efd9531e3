//! Meilisearch backend / Meilisearch 后端

pub mod client;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;

use crate::backend::{ignore_not_found, BackendError, BackendFactory, Capability, SearchBackend, SubmitReport};
use crate::config::{AppConfig, MeilisearchConfig};
use crate::search::mapper::MappingOptions;
use crate::search::schema::{CollectionSchema, ConceptDocument, FieldSpec, SearchRequest, SearchResults};

use client::MeiliClient;
use types::MeiliDocument;

/// Searchable attributes, in ranking order / 可搜索属性
pub const SEARCHABLE_ATTRIBUTES: [&str; 3] = ["notation", "prefLabel", "altLabel"];

pub struct MeilisearchBackend {
    config: MeilisearchConfig,
    client: MeiliClient,
}

impl MeilisearchBackend {
    pub fn new(config: MeilisearchConfig) -> Result<Self, BackendError> {
        let client = MeiliClient::new(
            &config.url,
            config.api_key.clone(),
            Duration::from_secs(config.connection_timeout_secs),
            Duration::from_secs(config.task_timeout_secs),
            Duration::from_millis(config.poll_interval_ms),
        )?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl SearchBackend for MeilisearchBackend {
    fn name(&self) -> &str {
        "meilisearch"
    }

    fn capabilities(&self) -> Capability {
        Capability {
            batch_size: self.config.batch_size,
            display_limit: self.config.display_limit,
        }
    }

    fn schema(&self) -> CollectionSchema {
        CollectionSchema {
            name: self.config.index.clone(),
            fields: vec![
                FieldSpec::string("notation"),
                FieldSpec::string_array("prefLabel"),
                FieldSpec::string_array("altLabel"),
            ],
        }
    }

    fn mapping_options(&self) -> MappingOptions {
        MappingOptions {
            language: self.config.language.clone(),
            search_keys: false,
        }
    }

    async fn recreate(&self, schema: &CollectionSchema) -> Result<(), BackendError> {
        if ignore_not_found(self.client.delete_index(&schema.name).await)? {
            tracing::info!("- Index {} deleted.", schema.name);
        }
        self.client.create_index(&schema.name).await?;
        self.client
            .set_searchable_attributes(&schema.name, &schema.field_names())
            .await?;
        tracing::info!("- Index {} created.", schema.name);
        Ok(())
    }

    async fn submit(&self, batch: &[ConceptDocument]) -> Result<SubmitReport, BackendError> {
        if batch.is_empty() {
            return Ok(SubmitReport::default());
        }
        let documents: Vec<MeiliDocument> = batch.iter().map(MeiliDocument::from).collect();
        let task = self.client.add_documents(&self.config.index, &documents).await?;

        let indexed = task
            .details
            .and_then(|d| d.indexed_documents)
            .unwrap_or(batch.len());
        Ok(SubmitReport {
            indexed,
            failed: batch.len().saturating_sub(indexed),
        })
    }

    async fn search(&self, request: &SearchRequest) -> Result<SearchResults, BackendError> {
        let response = self
            .client
            .search(&self.config.index, &request.query, request.limit)
            .await?;
        Ok(SearchResults {
            total: response.total(),
            hits: response.hits.into_iter().map(Into::into).collect(),
            notation_position: None,
        })
    }
}

pub struct MeilisearchBackendFactory;

impl BackendFactory for MeilisearchBackendFactory {
    fn backend_type(&self) -> &'static str {
        "meilisearch"
    }

    fn description(&self) -> &'static str {
        "Meilisearch server index, writes awaited as tasks"
    }

    fn create_backend(&self, config: &AppConfig) -> Result<Box<dyn SearchBackend>, BackendError> {
        Ok(Box::new(MeilisearchBackend::new(config.meilisearch.clone())?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::mapper::DocumentMapper;
    use crate::search::schema::SearchHit;
    use serde_json::json;

    #[test]
    fn test_document_id_is_valid_meilisearch_id() {
        let id = types::document_id("http://dewey.info/class/612.1/e23/");
        assert_eq!(id.len(), 64);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(id, types::document_id("http://dewey.info/class/612.1/e23/"));
        assert_ne!(id, types::document_id("http://dewey.info/class/612.2/e23/"));
    }

    #[test]
    fn test_document_keeps_uri() {
        let doc = DocumentMapper::default()
            .map(&json!({
                "uri": "http://x/1",
                "notation": ["612.1"],
                "prefLabel": { "de": "Kreislauf", "en": "Circulation" },
                "altLabel": { "de": ["Blutkreislauf"] }
            }))
            .unwrap()
            .unwrap();

        let value = serde_json::to_value(MeiliDocument::from(&doc)).unwrap();
        assert_eq!(value["uri"], "http://x/1");
        assert_eq!(value["notation"], "612.1");
        assert_eq!(value["label"], "Kreislauf");
        assert_eq!(value["prefLabel"], json!(["Kreislauf", "Circulation"]));
        assert_eq!(value["altLabel"], json!(["Blutkreislauf"]));
        assert_eq!(value["id"], types::document_id("http://x/1"));
    }

    #[test]
    fn test_schema_lists_searchable_attributes() {
        let backend = MeilisearchBackend::new(MeilisearchConfig::default()).unwrap();
        assert_eq!(backend.schema().field_names(), SEARCHABLE_ATTRIBUTES.to_vec());
        assert_eq!(backend.schema().name, "concepts");
    }

    #[test]
    fn test_search_response_total() {
        let response: types::SearchResponse = serde_json::from_value(json!({
            "hits": [
                { "id": "ab", "uri": "http://x/1", "notation": "612.1", "label": "Kreislauf", "prefLabel": ["Kreislauf"] },
                { "id": "cd", "uri": "http://x/2", "prefLabel": ["Atmung"] }
            ],
            "estimatedTotalHits": 42
        }))
        .unwrap();
        assert_eq!(response.total(), 42);

        let hits: Vec<SearchHit> = response.hits.into_iter().map(Into::into).collect();
        assert_eq!(hits[0].id, "http://x/1");
        assert_eq!(hits[0].notation.as_deref(), Some("612.1"));
        assert_eq!(hits[1].pref_label.as_deref(), Some("Atmung"));

        let bare: types::SearchResponse = serde_json::from_value(json!({ "hits": [] })).unwrap();
        assert_eq!(bare.total(), 0);
    }
}
