//! # Sourcetrans Library
//!
//! 代码感知的源文件翻译库：只翻译注释、文档字符串等自然语言片段，
//! 代码结构原样保留。
//!
//! ## 模块组织
//!
//! - `config` - 配置加载与常量
//! - `script` - 文字系统识别与可译性判定
//! - `pipeline` - 片段提取、占位符保护、偏移回写
//! - `backend` - 翻译后端抽象与 HTTP 实现
//! - `resolver` - 多后端解析链与回退
//! - `storage` - 持久化翻译缓存
//! - `service` - 文件级编排入口

pub mod backend;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod resolver;
pub mod script;
pub mod service;
pub mod storage;

// Re-export commonly used items for convenience
pub use backend::{BackendRegistry, HttpBackend, TranslationBackend};
pub use config::TranslationConfig;
pub use error::{TranslationError, TranslationResult};
pub use pipeline::{
    PlaceholderGuard, SegmentExtractor, SegmentKind, SegmentRewriter, TranslatableSegment,
};
pub use resolver::{Translation, TranslationResolver};
pub use script::ScriptClassifier;
pub use service::{FileReport, SourceTranslation, SourceTranslator};
pub use storage::TranslationCache;

/// 判断一段文本是否值得送去翻译
pub fn should_translate(text: &str, source_lang: &str, target_lang: &str) -> bool {
    ScriptClassifier::new().needs_translation(text, source_lang, target_lang)
}

/// 用默认配置从源码文本里提取可翻译片段
pub fn extract_segments(source: &str) -> Vec<TranslatableSegment> {
    SegmentExtractor::new(Default::default()).extract(source)
}
