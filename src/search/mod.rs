//! Search module - document model, mapping and the in-process index / 搜索模块
//!
//! Architecture principles / 架构原则：
//! - Search module only exposes primitive operations: map, add, search, save, load
//! - Import and query workflows control batching, progress and error recovery
//! - Call direction: workflow → backend → search (unidirectional) / 调用方向
//!
//! Index features / 索引特性：
//! - Field boosts, AND/OR term combination
//! - Prefix and fuzzy (edit distance) term expansion
//! - Suffix search keys to emulate infix matching
//! - Whole-index JSON snapshot

pub mod engine;
pub mod mapper;
pub mod schema;
pub mod snapshot;
pub mod tokenizer;

pub use engine::{CombineWith, IndexField, IndexOptions, SearchEngine};
pub use mapper::{DocumentMapper, MappingError, MappingOptions};
pub use schema::{CollectionSchema, ConceptDocument, FieldSpec, SearchHit, SearchRequest, SearchResults};
