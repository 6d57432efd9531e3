use std::collections::BTreeMap;

use anyhow::{anyhow, Result};

use super::{BackendError, SearchBackend};
use crate::config::AppConfig;

pub type BackendBox = Box<dyn SearchBackend>;

/// Backend factory trait / 后端工厂 trait
pub trait BackendFactory: Send + Sync {
    /// Backend type name / 后端类型名称
    fn backend_type(&self) -> &'static str;

    /// One-line description for `backends` / 描述
    fn description(&self) -> &'static str;

    /// Create backend instance from its config section / 创建后端实例
    fn create_backend(&self, config: &AppConfig) -> Result<BackendBox, BackendError>;
}

/// Backend manager (registry of factories) / 后端管理器
#[derive(Default)]
pub struct BackendManager {
    factories: BTreeMap<&'static str, Box<dyn BackendFactory>>,
}

impl BackendManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register backend factory / 注册后端工厂
    pub fn register_factory(&mut self, factory: Box<dyn BackendFactory>) {
        let backend_type = factory.backend_type();
        self.factories.insert(backend_type, factory);
        tracing::debug!("Backend factory registered: {}", backend_type);
    }

    /// Registered backend names, sorted / 已注册的后端
    pub fn available(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }

    /// (name, description) pairs / 后端说明
    pub fn describe(&self) -> Vec<(&'static str, &'static str)> {
        self.factories
            .values()
            .map(|f| (f.backend_type(), f.description()))
            .collect()
    }

    /// Create backend instance / 创建后端实例
    pub fn create(&self, backend_type: &str, config: &AppConfig) -> Result<BackendBox> {
        let factory = self.factories.get(backend_type).ok_or_else(|| {
            anyhow!(
                "Backend {} not found. Available backends: {}",
                backend_type,
                self.available().join(", ")
            )
        })?;

        let backend = factory.create_backend(config)?;
        tracing::debug!("Backend created: {}", backend_type);
        Ok(backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_backend_lists_available() {
        let manager = crate::drivers::default_manager();
        let err = manager.create("elasticsearch", &AppConfig::default()).err().unwrap();
        let message = err.to_string();
        assert!(message.contains("elasticsearch"));
        assert!(message.contains("local, meilisearch, typesense"));
    }

    #[test]
    fn test_creates_registered_backends() {
        let manager = crate::drivers::default_manager();
        for name in manager.available() {
            let backend = manager.create(name, &AppConfig::default()).unwrap();
            assert_eq!(backend.name(), name);
        }
    }
}
