use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::search::schema::{ConceptDocument, SearchHit};

/// Document shape stored in the collection / 集合中的文档结构
#[derive(Debug, Serialize)]
pub struct TypesenseDocument<'a> {
    pub id: &'a str,
    /// Unmodified concept data / 原始概念数据
    pub concept: &'a Value,
    pub identifier: &'a [String],
    #[serde(rename = "prefLabel")]
    pub pref_label: &'a [String],
    #[serde(rename = "altLabel")]
    pub alt_label: &'a [String],
    pub notes: &'a [String],
}

impl<'a> From<&'a ConceptDocument> for TypesenseDocument<'a> {
    fn from(doc: &'a ConceptDocument) -> Self {
        Self {
            id: &doc.id,
            concept: &doc.concept,
            identifier: &doc.identifier,
            pref_label: &doc.pref_label,
            alt_label: &doc.alt_label,
            notes: &doc.notes,
        }
    }
}

/// One line of the import response / 导入结果（每行一条）
#[derive(Debug, Clone, Deserialize)]
pub struct ImportResult {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    /// Echo of the rejected document / 被拒绝的文档
    #[serde(default)]
    pub document: Option<String>,
}

/// Error body / 错误响应
#[derive(Debug, Clone, Deserialize)]
pub struct ApiMessage {
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    pub found: usize,
    #[serde(default)]
    pub hits: Vec<Hit>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Hit {
    pub document: HitDocument,
    #[serde(default)]
    pub text_match: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HitDocument {
    pub id: String,
    #[serde(default)]
    pub identifier: Vec<String>,
    #[serde(default, rename = "prefLabel")]
    pub pref_label: Vec<String>,
}

impl From<Hit> for SearchHit {
    fn from(hit: Hit) -> Self {
        let doc = hit.document;
        // identifier = [uri, ...identifiers, ...notations]; the last entry is shown
        let notation = if doc.identifier.len() > 1 {
            doc.identifier.last().cloned()
        } else {
            None
        };
        SearchHit {
            id: doc.id,
            notation,
            pref_label: doc.pref_label.into_iter().next(),
            score: hit.text_match.map(|m| m as f32),
        }
    }
}
