//! 基础设施层：持有稀缺资源（页面、磁盘），只暴露能力

pub mod durable_store;
pub mod js_executor;

pub use durable_store::{DurableStore, FileStore, MemoryStore};
pub use js_executor::JsExecutor;
