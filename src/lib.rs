pub mod backend;
pub mod config;
pub mod import;
pub mod query;
pub mod search;
pub mod source;
pub mod utils;

// Backend drivers (point to project root drivers via path attribute) / 后端驱动
#[path = "../drivers/mod.rs"]
pub mod drivers;

pub use backend::{BackendManager, SearchBackend};
pub use config::AppConfig;
