use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::search::schema::{ConceptDocument, SearchHit};

/// Meilisearch ids allow only `[A-Za-z0-9_-]`; URIs are hashed / 文档ID
pub fn document_id(uri: &str) -> String {
    hex::encode(Sha256::digest(uri.as_bytes()))
}

/// Document shape stored in the index / 索引中的文档结构
#[derive(Debug, Serialize)]
pub struct MeiliDocument<'a> {
    pub id: String,
    pub uri: &'a str,
    pub notation: Option<&'a str>,
    pub label: Option<&'a str>,
    #[serde(rename = "prefLabel")]
    pub pref_label: &'a [String],
    #[serde(rename = "altLabel")]
    pub alt_label: &'a [String],
}

impl<'a> From<&'a ConceptDocument> for MeiliDocument<'a> {
    fn from(doc: &'a ConceptDocument) -> Self {
        Self {
            id: document_id(&doc.id),
            uri: &doc.id,
            notation: doc.notation.as_deref(),
            label: doc.label.as_deref(),
            pref_label: &doc.pref_label,
            alt_label: &doc.alt_label,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIndex<'a> {
    pub uid: &'a str,
    pub primary_key: &'a str,
}

#[derive(Debug, Serialize)]
pub struct SearchBody<'a> {
    pub q: &'a str,
    pub limit: usize,
}

/// Response to every write: an enqueued task / 已入队任务
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInfo {
    pub task_uid: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskStatus {
    Enqueued,
    Processing,
    Succeeded,
    Failed,
    Canceled,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskError {
    pub message: String,
    pub code: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDetails {
    #[serde(default)]
    pub received_documents: Option<usize>,
    #[serde(default)]
    pub indexed_documents: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Task {
    pub uid: u64,
    pub status: TaskStatus,
    #[serde(default)]
    pub error: Option<TaskError>,
    #[serde(default)]
    pub details: Option<TaskDetails>,
}

impl Task {
    pub fn is_finished(&self) -> bool {
        !matches!(self.status, TaskStatus::Enqueued | TaskStatus::Processing)
    }
}

/// Error body / 错误响应
#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    pub message: String,
    #[serde(default)]
    pub code: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    #[serde(default)]
    pub hits: Vec<Hit>,
    #[serde(default)]
    pub estimated_total_hits: Option<usize>,
    #[serde(default)]
    pub total_hits: Option<usize>,
}

impl SearchResponse {
    pub fn total(&self) -> usize {
        self.estimated_total_hits
            .or(self.total_hits)
            .unwrap_or(self.hits.len())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Hit {
    pub uri: String,
    #[serde(default)]
    pub notation: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default, rename = "prefLabel")]
    pub pref_label: Vec<String>,
}

impl From<Hit> for SearchHit {
    fn from(hit: Hit) -> Self {
        let pref_label = hit.label.or_else(|| hit.pref_label.into_iter().next());
        SearchHit {
            id: hit.uri,
            notation: hit.notation,
            pref_label,
            score: None,
        }
    }
}
