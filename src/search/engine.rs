//! Search engine - in-memory full-text index / 内存全文索引
//!
//! Architecture principle: only expose primitive operations, do not control flow / 架构原则
//! - add: index single document / 索引单个文档
//! - search: search / 搜索
//! - data / from_data: snapshot hand-off for persistence / 快照读写
//!
//! Scoring is BM25 per field, multiplied by the field boost and by the match
//! weight (exact, prefix or fuzzy term expansion).

use std::collections::{BTreeMap, HashMap, HashSet};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::schema::{ConceptDocument, SearchHit, SearchRequest, SearchResults};
use super::tokenizer::{levenshtein_distance, tokenize, tokenize_query};

const BM25_K1: f32 = 1.2;
const BM25_B: f32 = 0.7;

/// Indexable field / 可索引字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IndexField {
    Notation,
    PrefLabel,
    AltLabel,
    SearchKeys,
}

impl IndexField {
    /// Text values this field takes from a mapped document / 字段取值
    fn values<'a>(&self, doc: &'a ConceptDocument) -> Vec<&'a str> {
        match self {
            IndexField::Notation => doc.notation.as_deref().into_iter().collect(),
            IndexField::PrefLabel => doc.label.as_deref().into_iter().collect(),
            IndexField::AltLabel => doc.alt_label_in_language.iter().map(String::as_str).collect(),
            IndexField::SearchKeys => doc.search_keys.iter().map(String::as_str).collect(),
        }
    }
}

/// How per-term matches are combined / 多个词的组合方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CombineWith {
    And,
    Or,
}

/// Index options, resolved once at construction / 索引选项
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexOptions {
    pub fields: Vec<IndexField>,
    pub store_fields: Vec<IndexField>,
    pub boost: HashMap<IndexField, f32>,
    pub combine_with: CombineWith,
    /// Enable prefix expansion of query terms / 启用前缀匹配
    pub prefix: bool,
    /// Fuzzy distance as a fraction of term length (0 disables) / 模糊匹配比例
    pub fuzzy: f32,
    pub prefix_weight: f32,
    pub fuzzy_weight: f32,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            fields: vec![IndexField::Notation, IndexField::PrefLabel, IndexField::SearchKeys],
            store_fields: vec![IndexField::Notation, IndexField::PrefLabel],
            boost: HashMap::from([(IndexField::Notation, 5.0)]),
            combine_with: CombineWith::And,
            prefix: true,
            fuzzy: 0.2,
            prefix_weight: 0.5,
            fuzzy_weight: 0.2,
        }
    }
}

impl IndexOptions {
    fn boost_for(&self, field: IndexField) -> f32 {
        self.boost.get(&field).copied().unwrap_or(1.0)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    #[error("duplicate document id: {0}")]
    DuplicateId(String),
}

/// Stored fields of an indexed document / 存储的文档字段
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "prefLabel")]
    pub pref_label: Option<String>,
}

/// Serializable index state / 可序列化的索引数据
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexData {
    next_id: u32,
    /// short id -> stored document / 文档存储
    documents: BTreeMap<u32, StoredDocument>,
    /// term -> field -> short id -> term frequency / 倒排索引
    index: BTreeMap<String, HashMap<IndexField, HashMap<u32, u32>>>,
    /// short id -> field -> token count / 字段长度
    field_lengths: HashMap<u32, HashMap<IndexField, u32>>,
    /// field -> total token count / 字段总长度
    total_field_length: HashMap<IndexField, u64>,
    /// uri -> short id, rebuilt on load / 外部ID映射
    #[serde(skip)]
    ids: HashMap<String, u32>,
}

impl IndexData {
    fn rebuild_ids(&mut self) {
        self.ids = self
            .documents
            .iter()
            .map(|(short, doc)| (doc.id.clone(), *short))
            .collect();
    }

    fn average_field_length(&self, field: IndexField) -> f32 {
        let total = self.total_field_length.get(&field).copied().unwrap_or(0) as f32;
        let count = self.documents.len().max(1) as f32;
        (total / count).max(1.0)
    }

    fn field_length(&self, short: u32, field: IndexField) -> f32 {
        self.field_lengths
            .get(&short)
            .and_then(|f| f.get(&field))
            .copied()
            .unwrap_or(0) as f32
    }
}

/// Search engine / 搜索引擎
#[derive(Debug)]
pub struct SearchEngine {
    options: IndexOptions,
    data: RwLock<IndexData>,
}

impl SearchEngine {
    /// Create new empty engine / 创建新的搜索引擎实例
    pub fn new(options: IndexOptions) -> Self {
        Self {
            options,
            data: RwLock::new(IndexData::default()),
        }
    }

    /// Restore engine from snapshot data / 从快照数据恢复
    pub fn from_data(options: IndexOptions, mut data: IndexData) -> Self {
        data.rebuild_ids();
        Self {
            options,
            data: RwLock::new(data),
        }
    }

    /// Copy of the current index state / 当前索引数据副本
    pub fn data(&self) -> IndexData {
        self.data.read().clone()
    }

    pub fn document_count(&self) -> usize {
        self.data.read().documents.len()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.data.read().ids.contains_key(id)
    }

    /// Index single document (primitive operation) / 索引单个文档
    pub fn add(&self, doc: &ConceptDocument) -> Result<(), EngineError> {
        let mut data = self.data.write();
        if data.ids.contains_key(&doc.id) {
            return Err(EngineError::DuplicateId(doc.id.clone()));
        }

        let short = data.next_id;
        data.next_id += 1;

        for field in &self.options.fields {
            let mut frequencies: HashMap<String, u32> = HashMap::new();
            let mut length = 0u32;
            for value in field.values(doc) {
                for token in tokenize(value) {
                    length += 1;
                    *frequencies.entry(token).or_default() += 1;
                }
            }
            if length == 0 {
                continue;
            }

            data.field_lengths.entry(short).or_default().insert(*field, length);
            *data.total_field_length.entry(*field).or_default() += length as u64;
            for (token, tf) in frequencies {
                data.index
                    .entry(token)
                    .or_default()
                    .entry(*field)
                    .or_default()
                    .insert(short, tf);
            }
        }

        let stores = |f: IndexField| self.options.store_fields.contains(&f);
        let stored = StoredDocument {
            id: doc.id.clone(),
            notation: doc.notation.clone().filter(|_| stores(IndexField::Notation)),
            pref_label: doc.label.clone().filter(|_| stores(IndexField::PrefLabel)),
        };
        data.documents.insert(short, stored);
        data.ids.insert(doc.id.clone(), short);
        Ok(())
    }

    /// Search (primitive operation) / 搜索
    pub fn search(&self, request: &SearchRequest) -> SearchResults {
        let terms = tokenize_query(&request.query);
        if terms.is_empty() {
            return SearchResults::empty();
        }

        let data = self.data.read();
        let mut combined: Option<HashMap<u32, f32>> = None;

        for term in &terms {
            let term_scores = self.score_term(&data, term);
            combined = Some(match combined {
                None => term_scores,
                Some(acc) => combine(acc, term_scores, self.options.combine_with),
            });
        }

        let mut scored: Vec<(u32, f32)> = combined.unwrap_or_default().into_iter().collect();
        // Score descending, insertion order on ties / 按分数排序
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });

        let total = scored.len();
        // Ranked over every match, not only the returned page / 在全部结果中定位
        let notation_position = scored.iter().position(|(short, _)| {
            data.documents
                .get(short)
                .and_then(|doc| doc.notation.as_deref())
                == Some(request.query.as_str())
        });
        let hits = scored
            .into_iter()
            .take(request.limit)
            .filter_map(|(short, score)| {
                let doc = data.documents.get(&short)?;
                Some(SearchHit {
                    id: doc.id.clone(),
                    notation: doc.notation.clone(),
                    pref_label: doc.pref_label.clone(),
                    score: Some(score),
                })
            })
            .collect();

        SearchResults {
            hits,
            total,
            notation_position,
        }
    }

    /// Scores of one query term over its expansions / 单个查询词的得分
    fn score_term(&self, data: &IndexData, term: &str) -> HashMap<u32, f32> {
        let mut scores: HashMap<u32, f32> = HashMap::new();
        let mut seen: HashSet<&str> = HashSet::new();
        let term_len = term.chars().count() as f32;

        // Exact match / 精确匹配
        if let Some((indexed, fields)) = data.index.get_key_value(term) {
            seen.insert(indexed.as_str());
            self.accumulate(data, fields, 1.0, &mut scores);
        }

        // Prefix match / 前缀匹配
        if self.options.prefix {
            for (indexed, fields) in data
                .index
                .range::<str, _>((std::ops::Bound::Excluded(term), std::ops::Bound::Unbounded))
                .take_while(|(t, _)| t.starts_with(term))
            {
                let distance = indexed.chars().count() as f32 - term_len;
                let weight = self.options.prefix_weight * term_len / (term_len + 0.3 * distance);
                seen.insert(indexed.as_str());
                self.accumulate(data, fields, weight, &mut scores);
            }
        }

        // Fuzzy match / 模糊匹配
        let max_distance = (self.options.fuzzy * term_len).round() as usize;
        if max_distance > 0 {
            for (indexed, fields) in &data.index {
                if seen.contains(indexed.as_str()) {
                    continue;
                }
                if (indexed.chars().count() as f32 - term_len).abs() > max_distance as f32 {
                    continue;
                }
                let distance = levenshtein_distance(term, indexed);
                if distance == 0 || distance > max_distance {
                    continue;
                }
                let weight = self.options.fuzzy_weight * term_len / (term_len + distance as f32);
                self.accumulate(data, fields, weight, &mut scores);
            }
        }

        scores
    }

    fn accumulate(
        &self,
        data: &IndexData,
        fields: &HashMap<IndexField, HashMap<u32, u32>>,
        weight: f32,
        scores: &mut HashMap<u32, f32>,
    ) {
        let doc_count = data.documents.len() as f32;
        for (field, postings) in fields {
            let boost = self.options.boost_for(*field);
            let df = postings.len() as f32;
            let idf = (1.0 + (doc_count - df + 0.5) / (df + 0.5)).ln();
            let avg = data.average_field_length(*field);
            for (short, tf) in postings {
                let tf = *tf as f32;
                let length = data.field_length(*short, *field);
                let norm = tf * (BM25_K1 + 1.0) / (tf + BM25_K1 * (1.0 - BM25_B + BM25_B * length / avg));
                *scores.entry(*short).or_default() += weight * boost * idf * norm;
            }
        }
    }
}

fn combine(mut acc: HashMap<u32, f32>, next: HashMap<u32, f32>, mode: CombineWith) -> HashMap<u32, f32> {
    match mode {
        CombineWith::Or => {
            for (short, score) in next {
                *acc.entry(short).or_default() += score;
            }
            acc
        }
        CombineWith::And => acc
            .into_iter()
            .filter_map(|(short, score)| next.get(&short).map(|s| (short, score + s)))
            .collect(),
    }
}
