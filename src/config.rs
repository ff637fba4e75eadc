//! 翻译配置管理模块
//!
//! 提供配置加载、验证和默认值，支持 TOML 配置文件与代码内构造两种来源。

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{TranslationError, TranslationResult};

/// 翻译配置常量
pub mod constants {
    /// 低于此长度的文本一律跳过翻译
    pub const MIN_TEXT_LENGTH: usize = 2;
    /// 低于此长度的片段内容直接视为代码
    pub const MIN_SEGMENT_LENGTH: usize = 3;
    /// 字符串字面量的最小可翻译长度
    pub const MIN_STRING_LENGTH: usize = 4;
    /// 字母字符占非空白字符的比例阈值，低于该值视为代码
    pub const ALPHA_RATIO_THRESHOLD: f32 = 0.6;
    /// 批量翻译时相邻后端请求之间的间隔（毫秒）
    pub const BATCH_DELAY_MS: u64 = 100;
    /// 统计信息中保留的最近错误条数
    pub const MAX_RECENT_ERRORS: usize = 20;
    /// 占位符令牌格式，计数器保证片段内唯一
    pub const PLACEHOLDER_FORMAT: &str = "__CODE_PLACEHOLDER_";
    /// 覆盖文件前的备份后缀，已有备份不会被覆盖
    pub const BACKUP_SUFFIX: &str = ".orig";
    /// 回退结果使用的后端标识
    pub const FALLBACK_BACKEND: &str = "fallback";

    /// 默认的后端优先顺序
    pub const DEFAULT_BACKEND_ORDER: &[&str] = &["google", "libre", "mymemory"];

    /// 本地 LibreTranslate 服务的默认地址
    pub const DEFAULT_API_URL: &str = "http://localhost:5000/translate";

    /// 配置文件搜索路径
    pub const CONFIG_PATHS: &[&str] = &[
        "sourcetrans.toml",
        ".sourcetrans.toml",
        "translation-config.toml",
    ];

    /// 常见英文功能词，用于判定拉丁字母文本是否为英文自然语言
    pub const COMMON_ENGLISH_WORDS: &[&str] = &[
        "the", "and", "or", "of", "to", "in", "for", "with", "by", "from", "up", "about", "into",
        "through", "during", "before", "after", "above", "below", "between", "among", "is", "are",
        "was", "were", "be", "been", "being", "have", "has", "had", "do", "does", "did", "will",
        "would", "could", "should", "may", "might", "can", "must", "error", "warning", "info",
        "success", "failed", "loading", "loaded", "configuration", "service", "available",
        "ready", "method", "file",
    ];
}

/// 翻译配置
///
/// 描述一次翻译任务的语言对、启用的片段类别、后端顺序与缓存位置。
/// 所有字段都有默认值，配置文件中只需写出需要覆盖的部分。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    /// 源语言（规范名称，如 "english"；"auto" 表示不限定）
    pub source_lang: String,
    /// 目标语言（规范名称，如 "russian"）
    pub target_lang: String,
    /// 后端尝试顺序，按优先级排列
    pub backend_order: Vec<String>,
    /// 翻译行注释
    pub translate_comments: bool,
    /// 翻译块注释与文档字符串
    pub translate_docstrings: bool,
    /// 翻译普通字符串字面量（默认关闭，避免破坏格式化串或作为数据的标识符）
    pub translate_strings: bool,
    /// 翻译字典键字符串（默认关闭，键经常兼作序列化输出中的标识符）
    pub translate_dict_keys: bool,
    /// 最小可翻译文本长度
    pub min_text_length: usize,
    /// 批量翻译的请求间隔（毫秒）
    pub batch_delay_ms: u64,
    /// 缓存文件路径；None 表示仅内存缓存
    pub cache_file: Option<PathBuf>,
    /// HTTP 后端地址
    pub api_url: Option<String>,
    /// 付费后端的 API 密钥，键为后端标识
    pub api_keys: HashMap<String, String>,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            source_lang: "auto".to_string(),
            target_lang: "english".to_string(),
            backend_order: constants::DEFAULT_BACKEND_ORDER
                .iter()
                .map(|s| s.to_string())
                .collect(),
            translate_comments: true,
            translate_docstrings: true,
            translate_strings: false,
            translate_dict_keys: false,
            min_text_length: constants::MIN_TEXT_LENGTH,
            batch_delay_ms: constants::BATCH_DELAY_MS,
            cache_file: None,
            api_url: None,
            api_keys: HashMap::new(),
        }
    }
}

impl TranslationConfig {
    /// 以指定语言对创建默认配置
    pub fn with_langs(source_lang: &str, target_lang: &str) -> Self {
        Self {
            source_lang: source_lang.to_lowercase(),
            target_lang: target_lang.to_lowercase(),
            ..Self::default()
        }
    }

    /// 从 TOML 文件加载配置
    pub fn from_file(path: impl AsRef<Path>) -> TranslationResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| TranslationError::ConfigError(format!("读取 {} 失败: {e}", path.display())))?;
        let config: Self = toml::from_str(&raw)
            .map_err(|e| TranslationError::ConfigError(format!("解析 {} 失败: {e}", path.display())))?;
        config.validate()?;
        tracing::debug!("已加载配置文件: {}", path.display());
        Ok(config)
    }

    /// 按搜索路径查找并加载配置，找不到时返回默认配置
    pub fn load() -> TranslationResult<Self> {
        for candidate in constants::CONFIG_PATHS {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::from_file(path);
            }
        }
        tracing::debug!("未找到配置文件，使用默认配置");
        Ok(Self::default())
    }

    /// 校验配置的基本一致性
    pub fn validate(&self) -> TranslationResult<()> {
        if self.target_lang.trim().is_empty() {
            return Err(TranslationError::ConfigError("目标语言不能为空".to_string()));
        }
        if self.source_lang.trim().is_empty() {
            return Err(TranslationError::ConfigError("源语言不能为空".to_string()));
        }
        if self.backend_order.is_empty() {
            return Err(TranslationError::ConfigError(
                "后端顺序不能为空，至少配置一个后端".to_string(),
            ));
        }
        if self.min_text_length == 0 {
            return Err(TranslationError::ConfigError(
                "最小文本长度必须大于 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// 检查标准搜索路径上是否存在配置文件
pub fn config_file_exists() -> bool {
    constants::CONFIG_PATHS
        .iter()
        .any(|p| Path::new(p).exists())
}
