//! Application configuration module / 应用配置模块
//!
//! Manages configuration loaded from config.json (or the path given with
//! `--config`). Every section has defaults, so a missing default file simply
//! means defaults. `init-config` writes the defaults out.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::search::engine::{CombineWith, IndexField, IndexOptions};

/// Default config file name, resolved against the working directory / 默认配置文件
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file {0} not found")]
    NotFound(String),
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
    #[error("failed to write config file {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to serialize config: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("config file {0} already exists (use --force to overwrite)")]
    Exists(String),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Application configuration / 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// In-process index written to one JSON file / 本地索引
    pub local: LocalConfig,
    /// Typesense server / Typesense 服务器
    pub typesense: TypesenseConfig,
    /// Meilisearch server / Meilisearch 服务器
    pub meilisearch: MeilisearchConfig,
}

/// Local index configuration / 本地索引配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalConfig {
    /// Snapshot file path / 索引文件路径
    pub index_file: String,
    pub batch_size: usize,
    pub display_limit: usize,
    /// Language of the indexed labels / 索引标签语言
    pub language: String,
    pub fields: Vec<IndexField>,
    pub store_fields: Vec<IndexField>,
    pub boost: HashMap<IndexField, f32>,
    pub combine_with: CombineWith,
    pub prefix: bool,
    pub fuzzy: f32,
    pub prefix_weight: f32,
    pub fuzzy_weight: f32,
}

impl Default for LocalConfig {
    fn default() -> Self {
        let options = IndexOptions::default();
        Self {
            index_file: "./minisearch-index.json".to_string(),
            batch_size: 1000,
            display_limit: 3,
            language: "de".to_string(),
            fields: options.fields,
            store_fields: options.store_fields,
            boost: options.boost,
            combine_with: options.combine_with,
            prefix: options.prefix,
            fuzzy: options.fuzzy,
            prefix_weight: options.prefix_weight,
            fuzzy_weight: options.fuzzy_weight,
        }
    }
}

impl LocalConfig {
    /// Resolve the index options record / 生成索引选项
    pub fn index_options(&self) -> IndexOptions {
        IndexOptions {
            fields: self.fields.clone(),
            store_fields: self.store_fields.clone(),
            boost: self.boost.clone(),
            combine_with: self.combine_with,
            prefix: self.prefix,
            fuzzy: self.fuzzy,
            prefix_weight: self.prefix_weight,
            fuzzy_weight: self.fuzzy_weight,
        }
    }
}

/// Typesense configuration / Typesense 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TypesenseConfig {
    pub url: String,
    pub api_key: String,
    pub collection: String,
    pub connection_timeout_secs: u64,
    pub batch_size: usize,
    pub display_limit: usize,
    pub per_page: usize,
}

impl Default for TypesenseConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8108".to_string(),
            api_key: "xyz".to_string(),
            collection: "test".to_string(),
            connection_timeout_secs: 15,
            batch_size: 10000,
            display_limit: 10,
            per_page: 250,
        }
    }
}

/// Meilisearch configuration / Meilisearch 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MeilisearchConfig {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub index: String,
    pub language: String,
    pub connection_timeout_secs: u64,
    /// How long to wait for an enqueued task / 等待任务完成的超时
    pub task_timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub batch_size: usize,
    pub display_limit: usize,
}

impl Default for MeilisearchConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:7700".to_string(),
            api_key: None,
            index: "concepts".to_string(),
            language: "de".to_string(),
            connection_timeout_secs: 15,
            task_timeout_secs: 120,
            poll_interval_ms: 50,
            batch_size: 1000,
            display_limit: 10,
        }
    }
}

impl AppConfig {
    /// Reject values no backend can work with / 校验配置
    pub fn validate(&self) -> Result<(), ConfigError> {
        let batch_sizes = [
            ("local", self.local.batch_size),
            ("typesense", self.typesense.batch_size),
            ("meilisearch", self.meilisearch.batch_size),
        ];
        for (section, size) in batch_sizes {
            if size == 0 {
                return Err(ConfigError::Invalid(format!("{}.batch_size must be at least 1", section)));
            }
        }
        if self.local.fields.is_empty() {
            return Err(ConfigError::Invalid("local.fields must not be empty".to_string()));
        }
        if !(0.0..=1.0).contains(&self.local.fuzzy) {
            return Err(ConfigError::Invalid("local.fuzzy must be between 0 and 1".to_string()));
        }
        Ok(())
    }

    /// Environment variables win over the file / 环境变量覆盖
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("TYPESENSE_URL") {
            self.typesense.url = url;
        }
        if let Some(key) = lookup("TYPESENSE_API_KEY") {
            self.typesense.api_key = key;
        }
        if let Some(url) = lookup("MEILISEARCH_URL") {
            self.meilisearch.url = url;
        }
        if let Some(key) = lookup("MEILISEARCH_API_KEY") {
            self.meilisearch.api_key = Some(key);
        }
    }
}

/// Get the config file path / 获取配置文件路径
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    match explicit {
        Some(path) => path.to_path_buf(),
        None => std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(DEFAULT_CONFIG_FILE),
    }
}

/// Load configuration / 加载配置
///
/// An explicit path must exist; the default path may be absent.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let path = config_path(explicit);

    let mut config = if path.exists() {
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: AppConfig = serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            source: e,
        })?;
        tracing::debug!("Loaded configuration from {:?}", path);
        config
    } else if explicit.is_some() {
        return Err(ConfigError::NotFound(path.display().to_string()));
    } else {
        AppConfig::default()
    };

    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}

/// Save configuration to file / 保存配置到文件
pub fn save_config(config: &AppConfig, path: &Path, overwrite: bool) -> Result<(), ConfigError> {
    if path.exists() && !overwrite {
        return Err(ConfigError::Exists(path.display().to_string()));
    }

    let content = serde_json::to_string_pretty(config).map_err(ConfigError::Serialize)?;

    std::fs::write(path, content).map_err(|e| ConfigError::Write {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_match_reference_setup() {
        let config = AppConfig::default();
        assert_eq!(config.local.batch_size, 1000);
        assert_eq!(config.local.display_limit, 3);
        assert_eq!(config.typesense.batch_size, 10000);
        assert_eq!(config.typesense.collection, "test");
        assert_eq!(config.typesense.connection_timeout_secs, 15);
        assert_eq!(config.local.boost.get(&IndexField::Notation), Some(&5.0));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "typesense": { "collection": "ddc" }, "local": { "fields": ["prefLabel", "altLabel"], "combine_with": "or" } }"#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.typesense.collection, "ddc");
        assert_eq!(config.typesense.url, "http://localhost:8108");
        assert_eq!(config.local.fields, vec![IndexField::PrefLabel, IndexField::AltLabel]);
        assert_eq!(config.local.combine_with, CombineWith::Or);
        assert_eq!(config.local.index_options().combine_with, CombineWith::Or);
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        let err = load_config(Some(&dir.path().join("missing.json"))).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_invalid_batch_size() {
        let mut config = AppConfig::default();
        config.typesense.batch_size = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_save_refuses_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        save_config(&AppConfig::default(), &path, false).unwrap();
        assert!(matches!(
            save_config(&AppConfig::default(), &path, false),
            Err(ConfigError::Exists(_))
        ));
        save_config(&AppConfig::default(), &path, true).unwrap();

        let reloaded = load_config(Some(&path)).unwrap();
        assert_eq!(reloaded.local.index_file, "./minisearch-index.json");
    }

    #[test]
    fn test_overrides() {
        let mut config = AppConfig::default();
        config.apply_overrides(|key| match key {
            "TYPESENSE_API_KEY" => Some("secret".to_string()),
            "MEILISEARCH_API_KEY" => Some("master".to_string()),
            _ => None,
        });
        assert_eq!(config.typesense.api_key, "secret");
        assert_eq!(config.meilisearch.api_key.as_deref(), Some("master"));
        assert_eq!(config.meilisearch.url, "http://localhost:7700");
    }
}
