// Backend drivers / 后端驱动包
pub mod local;
pub mod meilisearch;
pub mod typesense;

use crate::backend::BackendManager;

/// Register all backends to BackendManager / 注册所有后端
pub fn register_all(manager: &mut BackendManager) {
    // In-process index persisted to one file / 本地索引
    manager.register_factory(Box::new(local::LocalBackendFactory));
    // Typesense server / Typesense 服务器
    manager.register_factory(Box::new(typesense::TypesenseBackendFactory));
    // Meilisearch server / Meilisearch 服务器
    manager.register_factory(Box::new(meilisearch::MeilisearchBackendFactory));
}

/// Manager with every built-in backend registered / 默认后端管理器
pub fn default_manager() -> BackendManager {
    let mut manager = BackendManager::new();
    register_all(&mut manager);
    manager
}
