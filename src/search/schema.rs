//! Search document schema definition / 搜索文档的 Schema 定义

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Mapped concept document - what every backend receives / 映射后的概念文档
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConceptDocument {
    /// Concept URI, stable for the lifetime of the index / 概念URI
    pub id: String,
    /// Unmodified raw record / 原始记录
    pub concept: Value,
    /// URI, external identifiers and notations / 标识符列表
    pub identifier: Vec<String>,
    /// First notation, if any / 首个记号
    pub notation: Option<String>,
    /// Preferred label in the configured language / 指定语言的首选标签
    pub label: Option<String>,
    /// Alternative labels in the configured language / 指定语言的替代标签
    pub alt_label_in_language: Vec<String>,
    /// All preferred labels (empty for combined concepts) / 所有首选标签
    pub pref_label: Vec<String>,
    /// All alternative labels (empty for combined concepts) / 所有替代标签
    pub alt_label: Vec<String>,
    /// Scope notes followed by editorial notes / 注释
    pub notes: Vec<String>,
    /// Uppercased label suffixes for infix emulation / 后缀搜索键
    pub search_keys: Vec<String>,
}

impl ConceptDocument {
    /// Last entry of the identifier list; the notation when one exists / 标识符列表最后一项
    pub fn display_identifier(&self) -> &str {
        self.identifier.last().map(String::as_str).unwrap_or(&self.id)
    }
}

/// Field type of a collection schema entry / 字段类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    #[serde(rename = "string")]
    String,
    #[serde(rename = "string[]")]
    StringArray,
}

/// Collection field declaration / 集合字段声明
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub infix: bool,
}

impl FieldSpec {
    pub fn string_array(name: &str) -> Self {
        Self {
            name: name.to_string(),
            field_type: FieldType::StringArray,
            infix: false,
        }
    }

    pub fn string(name: &str) -> Self {
        Self {
            name: name.to_string(),
            field_type: FieldType::String,
            infix: false,
        }
    }

    pub fn infix(mut self) -> Self {
        self.infix = true;
        self
    }
}

/// Collection schema, declared once per backend / 集合 Schema
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectionSchema {
    pub name: String,
    pub fields: Vec<FieldSpec>,
}

impl CollectionSchema {
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }
}

/// Search request / 搜索请求
#[derive(Debug, Clone)]
pub struct SearchRequest {
    /// Free-text query / 查询文本
    pub query: String,
    /// Maximum number of hits the backend should return / 最大返回结果数
    pub limit: usize,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            limit: 250,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

/// Single search hit / 单条搜索结果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    /// Concept URI / 概念URI
    pub id: String,
    pub notation: Option<String>,
    pub pref_label: Option<String>,
    /// Relevance score, when the backend reports one / 相关性分数
    pub score: Option<f32>,
}

/// Ranked hits plus untruncated total / 搜索结果与总数
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResults {
    pub hits: Vec<SearchHit>,
    pub total: usize,
    /// Exact notation match over all results, when the backend ranks them locally / 全部结果中的记号位置
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notation_position: Option<usize>,
}

impl SearchResults {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Position of the hit whose notation equals the query exactly / 记号精确匹配的位置
    ///
    /// Remote backends only return one page of hits (`per_page`, default 250),
    /// so for them a match beyond that page is reported as not found.
    pub fn notation_rank(&self, query: &str) -> Option<usize> {
        self.notation_position.or_else(|| {
            self.hits
                .iter()
                .position(|h| h.notation.as_deref() == Some(query))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_spec_serializes_like_typesense() {
        let field = FieldSpec::string_array("prefLabel").infix();
        let json = serde_json::to_value(&field).unwrap();
        assert_eq!(json["name"], "prefLabel");
        assert_eq!(json["type"], "string[]");
        assert_eq!(json["infix"], true);
    }

    #[test]
    fn test_notation_rank() {
        let hit = |id: &str, notation: &str| SearchHit {
            id: id.to_string(),
            notation: Some(notation.to_string()),
            pref_label: None,
            score: None,
        };
        let results = SearchResults {
            hits: vec![hit("a", "612.1"), hit("b", "612")],
            total: 2,
            notation_position: None,
        };
        assert_eq!(results.notation_rank("612"), Some(1));
        assert_eq!(results.notation_rank("613"), None);

        let ranked = SearchResults {
            hits: Vec::new(),
            total: 400,
            notation_position: Some(312),
        };
        assert_eq!(ranked.notation_rank("612"), Some(312));
    }
}
