//! Local backend - in-process index persisted as one JSON file / 本地索引后端
//!
//! `create` builds a fresh index and writes the snapshot in `finish`;
//! `search` loads the snapshot wholesale on first use.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::backend::{BackendError, BackendFactory, Capability, SearchBackend, SubmitReport};
use crate::config::{AppConfig, LocalConfig};
use crate::search::engine::{EngineError, IndexField, IndexOptions, SearchEngine};
use crate::search::mapper::MappingOptions;
use crate::search::schema::{CollectionSchema, ConceptDocument, FieldSpec, SearchRequest, SearchResults};
use crate::search::snapshot;

pub struct LocalBackend {
    options: IndexOptions,
    index_file: PathBuf,
    language: String,
    batch_size: usize,
    display_limit: usize,
    engine: RwLock<Option<Arc<SearchEngine>>>,
}

impl LocalBackend {
    pub fn new(config: &LocalConfig) -> Self {
        Self {
            options: config.index_options(),
            index_file: PathBuf::from(&config.index_file),
            language: config.language.clone(),
            batch_size: config.batch_size,
            display_limit: config.display_limit,
            engine: RwLock::new(None),
        }
    }

    pub fn index_file(&self) -> &PathBuf {
        &self.index_file
    }

    /// Current engine, loading the snapshot if none is open / 获取或加载索引
    fn engine(&self) -> Result<Arc<SearchEngine>, BackendError> {
        if let Some(engine) = self.engine.read().as_ref() {
            return Ok(engine.clone());
        }

        let stopwatch = crate::utils::Stopwatch::start("loading index from file");
        let engine = Arc::new(snapshot::load(&self.index_file, self.options.clone())?);
        stopwatch.finish();

        *self.engine.write() = Some(engine.clone());
        Ok(engine)
    }
}

fn field_name(field: IndexField) -> &'static str {
    match field {
        IndexField::Notation => "notation",
        IndexField::PrefLabel => "prefLabel",
        IndexField::AltLabel => "altLabel",
        IndexField::SearchKeys => "searchKeys",
    }
}

#[async_trait]
impl SearchBackend for LocalBackend {
    fn name(&self) -> &str {
        "local"
    }

    fn capabilities(&self) -> Capability {
        Capability {
            batch_size: self.batch_size,
            display_limit: self.display_limit,
        }
    }

    fn schema(&self) -> CollectionSchema {
        CollectionSchema {
            name: self.index_file.display().to_string(),
            fields: self
                .options
                .fields
                .iter()
                .map(|f| FieldSpec::string(field_name(*f)))
                .collect(),
        }
    }

    fn mapping_options(&self) -> MappingOptions {
        MappingOptions {
            language: self.language.clone(),
            search_keys: self.options.fields.contains(&IndexField::SearchKeys),
        }
    }

    async fn recreate(&self, schema: &CollectionSchema) -> Result<(), BackendError> {
        match tokio::fs::remove_file(&self.index_file).await {
            Ok(()) => tracing::info!("- Index file {} deleted.", schema.name),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(BackendError::Io(e)),
        }

        *self.engine.write() = Some(Arc::new(SearchEngine::new(self.options.clone())));
        tracing::info!("- Index {} created with fields {:?}.", schema.name, schema.field_names());
        Ok(())
    }

    async fn submit(&self, batch: &[ConceptDocument]) -> Result<SubmitReport, BackendError> {
        let engine = {
            let guard = self.engine.read();
            guard.clone()
        };
        let engine = match engine {
            Some(engine) => engine,
            None => {
                // Submitting without recreate starts an empty index
                let engine = Arc::new(SearchEngine::new(self.options.clone()));
                *self.engine.write() = Some(engine.clone());
                engine
            }
        };

        let mut report = SubmitReport::default();
        for doc in batch {
            match engine.add(doc) {
                Ok(()) => report.indexed += 1,
                Err(EngineError::DuplicateId(id)) => {
                    tracing::warn!("Error adding document {}: duplicate id", id);
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }

    async fn finish(&self) -> Result<(), BackendError> {
        let engine = self.engine.read().clone();
        if let Some(engine) = engine {
            let path = self.index_file.clone();
            // Serialization of a large index is blocking work
            tokio::task::spawn_blocking(move || snapshot::save(&engine, &path))
                .await
                .map_err(|e| BackendError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))??;
        }
        Ok(())
    }

    async fn search(&self, request: &SearchRequest) -> Result<SearchResults, BackendError> {
        let engine = self.engine()?;
        Ok(engine.search(request))
    }
}

pub struct LocalBackendFactory;

impl BackendFactory for LocalBackendFactory {
    fn backend_type(&self) -> &'static str {
        "local"
    }

    fn description(&self) -> &'static str {
        "In-process index with prefix/fuzzy matching, saved to one JSON file"
    }

    fn create_backend(&self, config: &AppConfig) -> Result<Box<dyn SearchBackend>, BackendError> {
        Ok(Box::new(LocalBackend::new(&config.local)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::mapper::DocumentMapper;
    use serde_json::json;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> LocalConfig {
        LocalConfig {
            index_file: dir.path().join("index.json").to_string_lossy().to_string(),
            ..LocalConfig::default()
        }
    }

    fn doc(uri: &str, label: &str) -> ConceptDocument {
        let backend_mapping = MappingOptions {
            search_keys: true,
            ..MappingOptions::default()
        };
        DocumentMapper::new(backend_mapping)
            .map(&json!({ "uri": uri, "prefLabel": { "de": label } }))
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_mapping_options_follow_fields() {
        let dir = TempDir::new().unwrap();
        let backend = LocalBackend::new(&config(&dir));
        assert!(backend.mapping_options().search_keys);
        assert_eq!(backend.mapping_options().language, "de");
        assert_eq!(
            backend.schema().field_names(),
            vec!["notation", "prefLabel", "searchKeys"]
        );

        let mut cfg = config(&dir);
        cfg.fields = vec![IndexField::PrefLabel];
        assert!(!LocalBackend::new(&cfg).mapping_options().search_keys);
    }

    #[tokio::test]
    async fn test_duplicate_is_reported_not_fatal() {
        let dir = TempDir::new().unwrap();
        let backend = LocalBackend::new(&config(&dir));
        backend.recreate(&backend.schema()).await.unwrap();

        let report = backend
            .submit(&[doc("http://x/1", "Kreislauf"), doc("http://x/1", "Kreislauf")])
            .await
            .unwrap();
        assert_eq!(report, SubmitReport { indexed: 1, failed: 1 });
        assert_eq!(backend.submit(&[]).await.unwrap(), SubmitReport::default());
    }

    #[tokio::test]
    async fn test_recreate_drops_old_file() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&dir);

        let backend = LocalBackend::new(&cfg);
        backend.recreate(&backend.schema()).await.unwrap();
        backend.submit(&[doc("http://x/1", "Kreislauf")]).await.unwrap();
        backend.finish().await.unwrap();
        assert!(backend.index_file().exists());

        let again = LocalBackend::new(&cfg);
        again.recreate(&again.schema()).await.unwrap();
        assert!(!again.index_file().exists());
        again.finish().await.unwrap();

        let reader = LocalBackend::new(&cfg);
        let results = reader.search(&SearchRequest::new("Kreislauf")).await.unwrap();
        assert_eq!(results.total, 0);
    }

    #[tokio::test]
    async fn test_search_without_index_file() {
        let dir = TempDir::new().unwrap();
        let backend = LocalBackend::new(&config(&dir));
        let err = backend.search(&SearchRequest::new("x")).await.unwrap_err();
        assert!(matches!(err, BackendError::Snapshot(_)));
    }
}
