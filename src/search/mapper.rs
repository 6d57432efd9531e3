//! Document mapper - raw concept record to `ConceptDocument` / 文档映射
//!
//! Pure transform, no side effects. A record without `uri` or `prefLabel` is
//! skipped (`Ok(None)`); malformed label data is an error the caller logs.

use serde_json::{Map, Value};
use thiserror::Error;

use super::schema::ConceptDocument;
use super::tokenizer::make_suffixes;

/// Type marker of combined concepts / 组合概念类型标记
pub const COMBINED_CONCEPT_TYPE: &str = "http://rdf-vocabulary.ddialliance.org/xkos#CombinedConcept";

#[derive(Debug, Error, PartialEq)]
pub enum MappingError {
    #[error("field `{0}` must be a language map")]
    NotALanguageMap(&'static str),
    #[error("field `{field}` has a non-string value for language `{language}`")]
    InvalidLabel { field: &'static str, language: String },
    #[error("field `{0}` must be a list of strings")]
    NotAStringList(&'static str),
    #[error("field `uri` must be a string")]
    InvalidUri,
}

/// Mapping options / 映射选项
#[derive(Debug, Clone)]
pub struct MappingOptions {
    /// Language of the representative label / 代表标签的语言
    pub language: String,
    /// Whether to derive suffix search keys / 是否生成后缀搜索键
    pub search_keys: bool,
}

impl Default for MappingOptions {
    fn default() -> Self {
        Self {
            language: "de".to_string(),
            search_keys: false,
        }
    }
}

/// Document mapper / 文档映射器
#[derive(Debug, Clone, Default)]
pub struct DocumentMapper {
    options: MappingOptions,
}

impl DocumentMapper {
    pub fn new(options: MappingOptions) -> Self {
        Self { options }
    }

    /// Map one raw record / 映射单条记录
    pub fn map(&self, record: &Value) -> Result<Option<ConceptDocument>, MappingError> {
        let Some(concept) = record.as_object() else {
            return Ok(None);
        };

        let uri = match concept.get("uri") {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::String(uri)) if uri.is_empty() => return Ok(None),
            Some(Value::String(uri)) => uri.clone(),
            Some(_) => return Err(MappingError::InvalidUri),
        };
        let pref_label_map = match concept.get("prefLabel") {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::Object(map)) => map,
            Some(_) => return Err(MappingError::NotALanguageMap("prefLabel")),
        };

        let notations = string_list(concept, "notation")?;
        let mut identifier = vec![uri.clone()];
        identifier.extend(string_list(concept, "identifier")?);
        identifier.extend(notations.iter().cloned());

        let mut document = ConceptDocument {
            id: uri,
            concept: record.clone(),
            identifier,
            notation: notations.first().cloned(),
            label: None,
            alt_label_in_language: Vec::new(),
            pref_label: Vec::new(),
            alt_label: Vec::new(),
            notes: Vec::new(),
            search_keys: Vec::new(),
        };

        if is_combined(concept)? {
            return Ok(Some(document));
        }

        document.pref_label = flatten_language_map("prefLabel", pref_label_map)?;
        document.label = language_values("prefLabel", pref_label_map, &self.options.language)?
            .into_iter()
            .next();

        if let Some(alt) = optional_language_map(concept, "altLabel")? {
            document.alt_label = flatten_language_map("altLabel", alt)?;
            document.alt_label_in_language = language_values("altLabel", alt, &self.options.language)?;
        }
        if let Some(scope) = optional_language_map(concept, "scopeNote")? {
            document.notes.extend(flatten_language_map("scopeNote", scope)?);
        }
        if let Some(editorial) = optional_language_map(concept, "editorialNote")? {
            document.notes.extend(flatten_language_map("editorialNote", editorial)?);
        }

        if self.options.search_keys {
            document.search_keys = make_suffixes(&document.pref_label);
        }

        Ok(Some(document))
    }
}

fn is_combined(concept: &Map<String, Value>) -> Result<bool, MappingError> {
    Ok(string_list(concept, "type")?
        .iter()
        .any(|t| t == COMBINED_CONCEPT_TYPE))
}

/// Missing or null list fields are empty / 缺失字段视为空列表
fn string_list(concept: &Map<String, Value>, field: &'static str) -> Result<Vec<String>, MappingError> {
    match concept.get(field) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| v.as_str().map(str::to_string).ok_or(MappingError::NotAStringList(field)))
            .collect(),
        Some(_) => Err(MappingError::NotAStringList(field)),
    }
}

fn optional_language_map<'a>(
    concept: &'a Map<String, Value>,
    field: &'static str,
) -> Result<Option<&'a Map<String, Value>>, MappingError> {
    match concept.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(MappingError::NotALanguageMap(field)),
    }
}

/// Values of one language entry; a string or a list of strings / 单个语言的取值
fn label_values(field: &'static str, language: &str, value: &Value) -> Result<Vec<String>, MappingError> {
    let invalid = || MappingError::InvalidLabel {
        field,
        language: language.to_string(),
    };
    match value {
        Value::String(s) => Ok(vec![s.clone()]),
        Value::Array(items) => items
            .iter()
            .map(|v| v.as_str().map(str::to_string).ok_or_else(invalid))
            .collect(),
        _ => Err(invalid()),
    }
}

/// Flatten all languages in map order / 按语言顺序展开
fn flatten_language_map(field: &'static str, map: &Map<String, Value>) -> Result<Vec<String>, MappingError> {
    let mut values = Vec::new();
    for (language, value) in map {
        values.extend(label_values(field, language, value)?);
    }
    Ok(values)
}

fn language_values(
    field: &'static str,
    map: &Map<String, Value>,
    language: &str,
) -> Result<Vec<String>, MappingError> {
    match map.get(language) {
        Some(value) => label_values(field, language, value),
        None => Ok(Vec::new()),
    }
}
