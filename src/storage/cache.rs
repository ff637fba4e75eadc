//! 翻译缓存模块
//!
//! 以 `"文本|源语言|目标语言"` 为键的持久化键值存储。键取字面元组，
//! 不做任何大小写或空白归一化，命中率因此依赖文本的精确重复。
//! 磁盘格式为 JSON 对象；加载时容忍旧格式条目（值为裸字符串），
//! 损坏的缓存文件只记一条警告并按空缓存处理，绝不致命。

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::TranslationResult;
use crate::resolver::Translation;

/// 缓存统计信息
#[derive(Debug, Default, Clone)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// 文件落盘的翻译缓存
///
/// 条目在首次成功（或回退）翻译时创建，跨进程重启存活，
/// 只有显式 `clear` 才会提前结束其生命周期。
pub struct TranslationCache {
    entries: RwLock<HashMap<String, Translation>>,
    path: Option<PathBuf>,
    stats: RwLock<CacheStats>,
}

impl TranslationCache {
    /// 仅内存的缓存，用于测试或一次性任务
    pub fn in_memory() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            path: None,
            stats: RwLock::new(CacheStats::default()),
        }
    }

    /// 打开文件缓存；文件不存在或损坏时从空缓存开始
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = Self::load(&path);
        debug!("缓存已打开: {} ({} 条)", path.display(), entries.len());
        Self {
            entries: RwLock::new(entries),
            path: Some(path),
            stats: RwLock::new(CacheStats::default()),
        }
    }

    fn load(path: &Path) -> HashMap<String, Translation> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(_) => return HashMap::new(),
        };
        let value: Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                warn!("缓存文件 {} 损坏，按空缓存处理: {e}", path.display());
                return HashMap::new();
            }
        };
        let Value::Object(map) = value else {
            warn!("缓存文件 {} 不是 JSON 对象，按空缓存处理", path.display());
            return HashMap::new();
        };

        let mut entries = HashMap::with_capacity(map.len());
        for (key, value) in map {
            match value {
                Value::Object(_) => match serde_json::from_value::<Translation>(value) {
                    Ok(translation) => {
                        entries.insert(key, translation);
                    }
                    Err(e) => warn!("跳过无法解析的缓存条目 {key}: {e}"),
                },
                // 旧格式：值为裸译文字符串，键同时充当缓存键与原文
                Value::String(translated) => {
                    let mut parts = key.rsplitn(3, '|');
                    let target_lang = parts.next().unwrap_or_default().to_string();
                    let source_lang = parts.next().unwrap_or_default().to_string();
                    let original = parts.next().unwrap_or(key.as_str()).to_string();
                    entries.insert(
                        key.clone(),
                        Translation {
                            original,
                            translated,
                            source_lang,
                            target_lang,
                            backend: "unknown".to_string(),
                            confidence: 0.0,
                        },
                    );
                }
                _ => warn!("跳过类型异常的缓存条目 {key}"),
            }
        }
        entries
    }

    /// 缓存键：字面元组拼接
    pub fn key(text: &str, source_lang: &str, target_lang: &str) -> String {
        format!("{text}|{source_lang}|{target_lang}")
    }

    pub fn get(&self, text: &str, source_lang: &str, target_lang: &str) -> Option<Translation> {
        let key = Self::key(text, source_lang, target_lang);
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let hit = entries.get(&key).cloned();
        let mut stats = self.stats.write().unwrap_or_else(|e| e.into_inner());
        match hit {
            Some(translation) => {
                stats.hits += 1;
                Some(translation)
            }
            None => {
                stats.misses += 1;
                None
            }
        }
    }

    /// 写入条目并立即落盘
    pub fn put(&self, translation: Translation) {
        let key = Self::key(
            &translation.original,
            &translation.source_lang,
            &translation.target_lang,
        );
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(key, translation);
        self.persist(&entries);
    }

    /// 清空全部条目并删除缓存文件
    pub fn clear(&self) -> TranslationResult<()> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.clear();
        if let Some(path) = &self.path {
            if path.exists() {
                std::fs::remove_file(path)?;
            }
        }
        debug!("缓存已清空");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let mut stats = self
            .stats
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        stats.entries = self.len();
        stats
    }

    /// 落盘失败只降级为警告，缓存问题不允许影响翻译流程
    fn persist(&self, entries: &HashMap<String, Translation>) {
        let Some(path) = &self.path else {
            return;
        };
        match serde_json::to_string_pretty(entries) {
            Ok(json) => {
                if let Err(e) = std::fs::write(path, json) {
                    warn!("缓存写入 {} 失败: {e}", path.display());
                }
            }
            Err(e) => warn!("缓存序列化失败: {e}"),
        }
    }
}

impl std::fmt::Debug for TranslationCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationCache")
            .field("entries", &self.len())
            .field("path", &self.path)
            .finish()
    }
}

/// 默认缓存文件名，按语言对区分
pub fn default_cache_file(source_lang: &str, target_lang: &str) -> PathBuf {
    PathBuf::from(format!("translation_cache_{source_lang}_{target_lang}.json"))
}
