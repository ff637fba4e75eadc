//! 翻译后端模块
//!
//! 所有第三方翻译能力都收敛到一个接口后面：
//! `translate(text, source_code, target_code) -> 译文`。
//! 后端以字符串标识注册进一个封闭的注册表，调用方按标识查找，
//! 不在调用点上对名字做分支判断。每个后端的语言代码差异
//! 由描述符中的映射表吸收。

pub mod http;

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::TranslationResult;

pub use http::HttpBackend;

/// 翻译后端能力接口
///
/// 实现方负责自己的网络、鉴权与配额处理；任何失败以错误返回，
/// 由解析器决定是否继续尝试下一个后端。
pub trait TranslationBackend: Send + Sync {
    /// 后端标识，与注册表键一致
    fn id(&self) -> &str;

    /// 翻译一段文本，语言参数为该后端自己的语言代码
    fn translate(
        &self,
        text: &str,
        source_code: &str,
        target_code: &str,
    ) -> TranslationResult<String>;
}

/// 后端静态描述
///
/// 运行期不可变：优先级、是否需要凭据，以及
/// 规范语言名称到该后端语言代码的映射。
#[derive(Debug, Clone)]
pub struct BackendDescriptor {
    pub id: String,
    pub priority: u32,
    pub requires_credentials: bool,
    /// 规范语言名称 → 后端语言代码
    pub language_codes: HashMap<String, String>,
}

impl BackendDescriptor {
    fn new(id: &str, priority: u32, requires_credentials: bool) -> Self {
        Self {
            id: id.to_string(),
            priority,
            requires_credentials,
            language_codes: HashMap::new(),
        }
    }
}

/// 规范语言名称与各后端语言代码的对照表
///
/// 列顺序: (规范名, google, libre, mymemory)
const LANGUAGE_CODE_TABLE: &[(&str, &str, &str, &str)] = &[
    ("russian", "ru", "ru", "ru-RU"),
    ("english", "en", "en", "en-US"),
    ("chinese", "zh-cn", "zh", "zh"),
    ("japanese", "ja", "ja", "ja"),
    ("korean", "ko", "ko", "ko"),
    ("german", "de", "de", "de"),
    ("french", "fr", "fr", "fr"),
    ("spanish", "es", "es", "es"),
    ("italian", "it", "it", "it"),
    ("portuguese", "pt", "pt", "pt"),
    ("arabic", "ar", "ar", "ar"),
    ("hebrew", "he", "he", "he"),
    ("thai", "th", "th", "th"),
    ("greek", "el", "el", "el"),
];

/// 内置后端描述符
///
/// 免费后端排在前面；需要凭据的后端在注册阶段没有密钥时会被跳过。
pub fn builtin_descriptors() -> Vec<BackendDescriptor> {
    let mut google = BackendDescriptor::new("google", 1, false);
    let mut libre = BackendDescriptor::new("libre", 2, false);
    let mut mymemory = BackendDescriptor::new("mymemory", 3, false);
    for (lang, g, l, m) in LANGUAGE_CODE_TABLE {
        google
            .language_codes
            .insert(lang.to_string(), g.to_string());
        libre.language_codes.insert(lang.to_string(), l.to_string());
        mymemory
            .language_codes
            .insert(lang.to_string(), m.to_string());
    }

    vec![
        google,
        libre,
        mymemory,
        BackendDescriptor::new("microsoft", 6, true),
        BackendDescriptor::new("yandex", 7, true),
        BackendDescriptor::new("deepl", 8, true),
    ]
}

/// 后端注册表
///
/// 标识 → 实例的封闭集合，另持有描述符供语言代码映射与排序使用。
pub struct BackendRegistry {
    backends: HashMap<String, Arc<dyn TranslationBackend>>,
    descriptors: HashMap<String, BackendDescriptor>,
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BackendRegistry {
    /// 带内置描述符的空注册表
    pub fn new() -> Self {
        let descriptors = builtin_descriptors()
            .into_iter()
            .map(|d| (d.id.clone(), d))
            .collect();
        Self {
            backends: HashMap::new(),
            descriptors,
        }
    }

    /// 注册后端实例；没有描述符的标识会得到一个低优先级的默认描述符
    pub fn register(&mut self, backend: Arc<dyn TranslationBackend>) {
        let id = backend.id().to_string();
        self.descriptors
            .entry(id.clone())
            .or_insert_with(|| BackendDescriptor::new(&id, 99, false));
        self.backends.insert(id, backend);
    }

    pub fn get(&self, id: &str) -> Option<&Arc<dyn TranslationBackend>> {
        self.backends.get(id)
    }

    pub fn descriptor(&self, id: &str) -> Option<&BackendDescriptor> {
        self.descriptors.get(id)
    }

    /// 把规范语言名称映射为指定后端的语言代码
    ///
    /// 查找顺序：该后端的映射 → google 列的映射 → 原样返回。
    pub fn lang_code(&self, id: &str, lang: &str) -> String {
        if let Some(code) = self
            .descriptors
            .get(id)
            .and_then(|d| d.language_codes.get(lang))
        {
            return code.clone();
        }
        if let Some(code) = self
            .descriptors
            .get("google")
            .and_then(|d| d.language_codes.get(lang))
        {
            return code.clone();
        }
        lang.to_string()
    }

    /// 已注册后端的标识，按描述符优先级升序
    pub fn default_order(&self) -> Vec<String> {
        let mut ids: Vec<&String> = self.backends.keys().collect();
        ids.sort_by_key(|id| {
            self.descriptors
                .get(id.as_str())
                .map(|d| d.priority)
                .unwrap_or(u32::MAX)
        });
        ids.into_iter().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("backends", &self.backends.keys().collect::<Vec<_>>())
            .finish()
    }
}
