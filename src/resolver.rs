//! 翻译解析引擎
//!
//! 对每个翻译请求按调用方给定的顺序逐个尝试后端：
//! 先查缓存，命中立即返回；后端抛错、返回空串或原样返回都算软失败，
//! 继续尝试下一个；整条链都失败时返回零置信度的回退结果。
//! 该调用对后端级失败永不报错，只有编程错误（空的后端顺序）才返回 Err。

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::backend::BackendRegistry;
use crate::config::{constants, TranslationConfig};
use crate::error::{TranslationError, TranslationResult};
use crate::storage::TranslationCache;

/// 一次翻译的不可变结果
///
/// 同一 (文本, 源语言, 目标语言) 元组只产生一次，之后从缓存复用。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Translation {
    pub original: String,
    pub translated: String,
    pub source_lang: String,
    pub target_lang: String,
    /// 产生该结果的后端标识；回退结果为 `"fallback"`
    pub backend: String,
    /// 置信度，范围 [0, 1]；回退结果恒为 0.0
    pub confidence: f32,
}

impl Translation {
    /// 整条后端链失败时的回退结果：译文即原文
    pub fn fallback(text: &str, source_lang: &str, target_lang: &str) -> Self {
        Self {
            original: text.to_string(),
            translated: text.to_string(),
            source_lang: source_lang.to_string(),
            target_lang: target_lang.to_string(),
            backend: constants::FALLBACK_BACKEND.to_string(),
            confidence: 0.0,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.backend == constants::FALLBACK_BACKEND
    }
}

/// 解析器实例的使用统计
#[derive(Debug, Default, Clone)]
pub struct ResolverStats {
    pub total_requests: u64,
    pub cache_hits: u64,
    /// 各后端成功次数
    pub backend_usage: HashMap<String, u64>,
    /// 最近的错误信息，容量固定的环形缓冲
    pub recent_errors: VecDeque<String>,
}

/// 日志用的文本预览，按字符截断避免切坏 UTF-8 边界
fn preview(text: &str) -> String {
    text.chars().take(40).collect()
}

impl ResolverStats {
    fn record_error(&mut self, message: String) {
        if self.recent_errors.len() >= constants::MAX_RECENT_ERRORS {
            self.recent_errors.pop_front();
        }
        self.recent_errors.push_back(message);
    }

    pub fn cache_hit_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 0.0;
        }
        self.cache_hits as f64 / self.total_requests as f64
    }
}

/// 翻译解析器
///
/// 持有后端注册表与缓存，单线程顺序使用；缓存自身带锁，
/// 共享实例跨线程时由调用方负责解析器级别的互斥。
pub struct TranslationResolver {
    registry: BackendRegistry,
    cache: TranslationCache,
    source_lang: String,
    target_lang: String,
    backend_order: Vec<String>,
    batch_delay: Duration,
    stats: ResolverStats,
}

impl TranslationResolver {
    pub fn new(registry: BackendRegistry, cache: TranslationCache, config: &TranslationConfig) -> Self {
        Self {
            registry,
            cache,
            source_lang: config.source_lang.clone(),
            target_lang: config.target_lang.clone(),
            backend_order: config.backend_order.clone(),
            batch_delay: Duration::from_millis(config.batch_delay_ms),
            stats: ResolverStats::default(),
        }
    }

    /// 按配置的默认后端顺序翻译
    pub fn translate(&mut self, text: &str) -> TranslationResult<Translation> {
        let order = self.backend_order.clone();
        self.translate_with_order(text, &order)
    }

    /// 按调用方给定的后端顺序翻译
    ///
    /// 调用方顺序优先于描述符中的静态优先级。
    pub fn translate_with_order(
        &mut self,
        text: &str,
        order: &[String],
    ) -> TranslationResult<Translation> {
        if order.is_empty() {
            return Err(TranslationError::InvalidInput(
                "后端顺序为空，无法解析翻译请求".to_string(),
            ));
        }

        self.stats.total_requests += 1;

        if let Some(hit) = self.cache.get(text, &self.source_lang, &self.target_lang) {
            self.stats.cache_hits += 1;
            debug!("缓存命中: {:?}", preview(text));
            return Ok(hit);
        }

        for id in order {
            let Some(backend) = self.registry.get(id).cloned() else {
                warn!("后端 {id} 未注册，跳过");
                self.stats.record_error(format!("{id}: 后端未注册"));
                continue;
            };
            let source_code = self.registry.lang_code(id, &self.source_lang);
            let target_code = self.registry.lang_code(id, &self.target_lang);

            debug!("尝试后端 {id} ({source_code} → {target_code})");
            match backend.translate(text, &source_code, &target_code) {
                Ok(translated) => {
                    // 空结果或原样返回视为软失败，换下一个后端
                    if translated.trim().is_empty() || translated == text {
                        warn!("后端 {id} 返回空或未变化的结果");
                        continue;
                    }
                    let result = Translation {
                        original: text.to_string(),
                        translated,
                        source_lang: self.source_lang.clone(),
                        target_lang: self.target_lang.clone(),
                        backend: id.clone(),
                        confidence: 1.0,
                    };
                    self.cache.put(result.clone());
                    *self.stats.backend_usage.entry(id.clone()).or_insert(0) += 1;
                    info!("已通过后端 {id} 翻译");
                    return Ok(result);
                }
                Err(e) => {
                    warn!("后端 {id} 失败: {e}");
                    self.stats.record_error(format!("{id}: {e}"));
                    continue;
                }
            }
        }

        warn!("所有后端均不可用，返回原文回退结果");
        let fallback = Translation::fallback(text, &self.source_lang, &self.target_lang);
        self.cache.put(fallback.clone());
        Ok(fallback)
    }

    /// 批量翻译
    ///
    /// 访问过后端的请求之间插入固定间隔以遵守速率限制；
    /// 纯缓存命中不计入间隔。每 10 项记录一次进度。
    pub fn translate_batch(&mut self, texts: &[String]) -> TranslationResult<Vec<Translation>> {
        let mut results = Vec::with_capacity(texts.len());
        let total = texts.len();

        for (i, text) in texts.iter().enumerate() {
            if i % 10 == 0 {
                debug!("批量翻译进度: {i}/{total}");
            }
            let hits_before = self.stats.cache_hits;
            let result = self.translate(text)?;
            results.push(result);

            let visited_backend = self.stats.cache_hits == hits_before;
            if visited_backend && i + 1 < total {
                std::thread::sleep(self.batch_delay);
            }
        }
        debug!("批量翻译完成: {total}/{total}");
        Ok(results)
    }

    pub fn stats(&self) -> &ResolverStats {
        &self.stats
    }

    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    /// 清空缓存，条目生命周期的唯一提前终点
    pub fn clear_cache(&self) -> TranslationResult<()> {
        self.cache.clear()
    }

    pub fn target_lang(&self) -> &str {
        &self.target_lang
    }

    pub fn source_lang(&self) -> &str {
        &self.source_lang
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::TranslationBackend;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// 记录调用次数的词典桩后端
    struct StubBackend {
        id: &'static str,
        mapping: HashMap<&'static str, &'static str>,
        calls: Arc<AtomicUsize>,
    }

    impl StubBackend {
        fn new(id: &'static str, pairs: &[(&'static str, &'static str)]) -> (Arc<Self>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let backend = Arc::new(Self {
                id,
                mapping: pairs.iter().copied().collect(),
                calls: Arc::clone(&calls),
            });
            (backend, calls)
        }
    }

    impl TranslationBackend for StubBackend {
        fn id(&self) -> &str {
            self.id
        }
        fn translate(&self, text: &str, _s: &str, _t: &str) -> TranslationResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.mapping.get(text) {
                Some(translated) => Ok(translated.to_string()),
                None => Err(TranslationError::BackendError {
                    backend: self.id.to_string(),
                    message: "词典中没有该文本".to_string(),
                }),
            }
        }
    }

    struct FailingBackend(&'static str);

    impl TranslationBackend for FailingBackend {
        fn id(&self) -> &str {
            self.0
        }
        fn translate(&self, _text: &str, _s: &str, _t: &str) -> TranslationResult<String> {
            Err(TranslationError::NetworkError("connection refused".to_string()))
        }
    }

    struct EchoBackend(&'static str);

    impl TranslationBackend for EchoBackend {
        fn id(&self) -> &str {
            self.0
        }
        fn translate(&self, text: &str, _s: &str, _t: &str) -> TranslationResult<String> {
            Ok(text.to_string())
        }
    }

    fn config(order: &[&str]) -> TranslationConfig {
        TranslationConfig {
            backend_order: order.iter().map(|s| s.to_string()).collect(),
            ..TranslationConfig::with_langs("english", "russian")
        }
    }

    #[test]
    fn test_first_backend_success() {
        let (stub, calls) = StubBackend::new("google", &[("Calculate the sum", "Вычислить сумму")]);
        let mut registry = BackendRegistry::new();
        registry.register(stub);
        let mut resolver =
            TranslationResolver::new(registry, TranslationCache::in_memory(), &config(&["google"]));

        let result = resolver.translate("Calculate the sum").unwrap();
        assert_eq!(result.translated, "Вычислить сумму");
        assert_eq!(result.backend, "google");
        assert_eq!(result.confidence, 1.0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cache_determinism() {
        let (stub, calls) = StubBackend::new("google", &[("Calculate the sum", "Вычислить сумму")]);
        let mut registry = BackendRegistry::new();
        registry.register(stub);
        let mut resolver =
            TranslationResolver::new(registry, TranslationCache::in_memory(), &config(&["google"]));

        let first = resolver.translate("Calculate the sum").unwrap();
        let second = resolver.translate("Calculate the sum").unwrap();
        assert_eq!(first, second);
        // 两次请求至多一次后端调用
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(resolver.stats().cache_hits, 1);
        assert_eq!(resolver.stats().total_requests, 2);
    }

    #[test]
    fn test_fallback_when_chain_exhausted() {
        let mut registry = BackendRegistry::new();
        registry.register(Arc::new(FailingBackend("google")));
        registry.register(Arc::new(EchoBackend("libre")));
        let mut resolver = TranslationResolver::new(
            registry,
            TranslationCache::in_memory(),
            &config(&["google", "libre"]),
        );

        let result = resolver.translate("Calculate the sum").unwrap();
        assert_eq!(result.translated, "Calculate the sum");
        assert_eq!(result.backend, "fallback");
        assert_eq!(result.confidence, 0.0);
        assert!(result.is_fallback());
    }

    #[test]
    fn test_unchanged_result_falls_through_to_next_backend() {
        let (stub, _) = StubBackend::new("libre", &[("Calculate the sum", "Вычислить сумму")]);
        let mut registry = BackendRegistry::new();
        registry.register(Arc::new(EchoBackend("google")));
        registry.register(stub);
        let mut resolver = TranslationResolver::new(
            registry,
            TranslationCache::in_memory(),
            &config(&["google", "libre"]),
        );

        let result = resolver.translate("Calculate the sum").unwrap();
        assert_eq!(result.backend, "libre");
        assert_eq!(result.translated, "Вычислить сумму");
    }

    #[test]
    fn test_empty_order_is_programmer_error() {
        let mut resolver = TranslationResolver::new(
            BackendRegistry::new(),
            TranslationCache::in_memory(),
            &config(&["google"]),
        );
        let err = resolver.translate_with_order("text", &[]).unwrap_err();
        assert!(matches!(err, TranslationError::InvalidInput(_)));
    }

    #[test]
    fn test_unknown_backend_skipped_and_recorded() {
        let (stub, _) = StubBackend::new("libre", &[("hi there", "привет")]);
        let mut registry = BackendRegistry::new();
        registry.register(stub);
        let mut resolver = TranslationResolver::new(
            registry,
            TranslationCache::in_memory(),
            &config(&["missing", "libre"]),
        );

        let result = resolver.translate("hi there").unwrap();
        assert_eq!(result.backend, "libre");
        assert!(resolver
            .stats()
            .recent_errors
            .iter()
            .any(|e| e.contains("missing")));
    }

    #[test]
    fn test_error_ring_is_bounded() {
        let mut registry = BackendRegistry::new();
        registry.register(Arc::new(FailingBackend("google")));
        let mut resolver =
            TranslationResolver::new(registry, TranslationCache::in_memory(), &config(&["google"]));

        for i in 0..(constants::MAX_RECENT_ERRORS + 10) {
            let _ = resolver.translate(&format!("unique text number {i}"));
        }
        assert_eq!(
            resolver.stats().recent_errors.len(),
            constants::MAX_RECENT_ERRORS
        );
    }

    #[test]
    fn test_fallback_is_cached() {
        let mut registry = BackendRegistry::new();
        registry.register(Arc::new(FailingBackend("google")));
        let mut resolver =
            TranslationResolver::new(registry, TranslationCache::in_memory(), &config(&["google"]));

        let _ = resolver.translate("Calculate the sum").unwrap();
        let second = resolver.translate("Calculate the sum").unwrap();
        assert!(second.is_fallback());
        assert_eq!(resolver.stats().cache_hits, 1);
    }

    #[test]
    fn test_batch_translation_uses_cache() {
        let (stub, calls) = StubBackend::new("google", &[("Calculate the sum", "Вычислить сумму")]);
        let mut registry = BackendRegistry::new();
        registry.register(stub);
        let mut config = config(&["google"]);
        config.batch_delay_ms = 0;
        let mut resolver =
            TranslationResolver::new(registry, TranslationCache::in_memory(), &config);

        let texts = vec![
            "Calculate the sum".to_string(),
            "Calculate the sum".to_string(),
        ];
        let results = resolver.translate_batch(&texts).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0], results[1]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
