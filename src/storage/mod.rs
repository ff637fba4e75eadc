//! 存储管理模块
//!
//! 提供翻译结果的持久化缓存。

pub mod cache;

pub use cache::{CacheStats, TranslationCache};
