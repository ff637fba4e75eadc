//! 源码翻译服务
//!
//! 协调整条流水线：提取片段 → 保护代码子表达式 → 解析翻译 →
//! 还原占位符 → 回写并校验。文件级入口在成功且有实际改动时
//! 先写备份再覆盖原文件；校验失败时磁盘上的文件保持原样。

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::backend::{BackendRegistry, HttpBackend};
use crate::config::{constants, TranslationConfig};
use crate::error::TranslationResult;
use crate::pipeline::{
    ExtractorConfig, PlaceholderGuard, SegmentExtractor, SegmentKind, SegmentRewriter,
    SyntaxIssue, SyntaxValidator, TranslatedSegment,
};
use crate::resolver::TranslationResolver;
use crate::script::ScriptClassifier;
use crate::storage::TranslationCache;

/// 单个片段的翻译记录，用于追溯
#[derive(Debug, Clone)]
pub struct SegmentOutcome {
    pub original: String,
    pub translated: String,
    pub kind: SegmentKind,
    pub start: usize,
    pub end: usize,
    pub backend: String,
}

/// 一次源码文本翻译的结果
#[derive(Debug)]
pub struct SourceTranslation {
    /// 翻译后的完整文本；校验失败时与输入逐字节相同
    pub text: String,
    pub outcomes: Vec<SegmentOutcome>,
    pub changed: bool,
    pub validation_error: Option<SyntaxIssue>,
}

/// 文件翻译报告
#[derive(Debug)]
pub struct FileReport {
    pub path: PathBuf,
    /// 创建或复用的备份路径；文件未改动时为 None
    pub backup: Option<PathBuf>,
    pub segments_translated: usize,
    pub changed: bool,
    pub validation_error: Option<SyntaxIssue>,
}

/// 源码翻译服务
///
/// 拥有流水线的全部子系统。同一文件内严格顺序处理，
/// 片段之间检查取消标志以支持提前退出。
pub struct SourceTranslator {
    config: TranslationConfig,
    extractor: SegmentExtractor,
    classifier: ScriptClassifier,
    resolver: TranslationResolver,
    rewriter: SegmentRewriter,
    cancel: Option<Arc<AtomicBool>>,
}

impl SourceTranslator {
    /// 用现成的解析器组装服务，回写用默认的配平校验器
    pub fn new(config: TranslationConfig, resolver: TranslationResolver) -> Self {
        let extractor = SegmentExtractor::new(ExtractorConfig::from(&config));
        Self {
            config,
            extractor,
            classifier: ScriptClassifier::new(),
            resolver,
            rewriter: SegmentRewriter::default(),
            cancel: None,
        }
    }

    /// 按配置组装完整服务：HTTP 后端 + 文件缓存
    ///
    /// 需要凭据而未配置密钥的后端此处直接不注册，
    /// 解析阶段会按"未注册"跳过它们。
    pub fn from_config(config: TranslationConfig) -> TranslationResult<Self> {
        config.validate()?;

        let mut registry = BackendRegistry::new();
        let api_url = config
            .api_url
            .clone()
            .unwrap_or_else(|| constants::DEFAULT_API_URL.to_string());
        let libre = HttpBackend::new("libre", &api_url, config.api_keys.get("libre").cloned())?;
        registry.register(Arc::new(libre));

        let cache = match &config.cache_file {
            Some(path) => TranslationCache::open(path),
            None => TranslationCache::in_memory(),
        };
        let resolver = TranslationResolver::new(registry, cache, &config);
        Ok(Self::new(config, resolver))
    }

    /// 替换语法校验器（由外部语言工具提供）
    pub fn with_validator(mut self, validator: Box<dyn SyntaxValidator>) -> Self {
        self.rewriter = SegmentRewriter::new(validator);
        self
    }

    /// 设置取消标志，片段之间轮询
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(|flag| flag.load(Ordering::Relaxed))
            .unwrap_or(false)
    }

    /// 翻译一段源码文本
    ///
    /// 后端级失败不会让本调用出错：翻不动的片段保持原样。
    /// 回写校验失败时返回的文本与输入逐字节相同，并带上错误位置。
    pub fn translate_source(&mut self, source: &str) -> TranslationResult<SourceTranslation> {
        let segments = self.extractor.extract(source);
        debug!("提取到 {} 个候选片段", segments.len());

        let mut translated_segments: Vec<TranslatedSegment> = Vec::new();
        let mut outcomes: Vec<SegmentOutcome> = Vec::new();

        for segment in segments {
            if self.cancelled() {
                info!("收到取消信号，停止处理后续片段");
                break;
            }

            // 占位符作用域限于这一个片段的往返
            let mut guard = PlaceholderGuard::new();
            let (guarded, placeholders) = guard.protect(&segment.text);

            if !self.classifier.needs_translation(
                &guarded,
                &self.config.source_lang,
                &self.config.target_lang,
            ) {
                continue;
            }

            let result = self.resolver.translate(&guarded)?;
            let restored = guard.restore(&result.translated, &placeholders);
            if restored == segment.text {
                continue;
            }

            outcomes.push(SegmentOutcome {
                original: segment.text.clone(),
                translated: restored.clone(),
                kind: segment.kind,
                start: segment.start,
                end: segment.end,
                backend: result.backend.clone(),
            });
            translated_segments.push(TranslatedSegment {
                segment,
                translated: restored,
            });
        }

        if translated_segments.is_empty() {
            return Ok(SourceTranslation {
                text: source.to_string(),
                outcomes,
                changed: false,
                validation_error: None,
            });
        }

        let rewrite = self.rewriter.apply(source, &translated_segments);
        if let Some(issue) = rewrite.validation_error {
            warn!(
                "翻译结果未通过语法校验，放弃改写 (行 {} 列 {})",
                issue.line, issue.column
            );
            return Ok(SourceTranslation {
                text: source.to_string(),
                outcomes: Vec::new(),
                changed: false,
                validation_error: Some(issue),
            });
        }

        let changed = rewrite.text != source;
        Ok(SourceTranslation {
            text: rewrite.text,
            outcomes,
            changed,
            validation_error: None,
        })
    }

    /// 翻译整个源文件
    ///
    /// 有实际改动且校验通过时：先写备份（已存在的备份绝不覆盖，
    /// 保留最早的原始副本），再覆盖原文件。任何失败路径都不会
    /// 留下写了一半的文件。
    pub fn translate_file(&mut self, path: impl AsRef<Path>) -> TranslationResult<FileReport> {
        let path = path.as_ref();
        info!("开始处理文件: {}", path.display());
        let source = std::fs::read_to_string(path)?;

        let result = self.translate_source(&source)?;

        if !result.changed {
            if result.validation_error.is_some() {
                warn!("{} 的翻译结果被语法校验拒绝，文件保持原样", path.display());
            } else {
                info!("{} 无需修改", path.display());
            }
            return Ok(FileReport {
                path: path.to_path_buf(),
                backup: None,
                segments_translated: 0,
                changed: false,
                validation_error: result.validation_error,
            });
        }

        let backup = backup_path(path);
        if backup.exists() {
            debug!("备份 {} 已存在，保留最早副本", backup.display());
        } else {
            std::fs::copy(path, &backup)?;
            info!("已创建备份: {}", backup.display());
        }

        std::fs::write(path, &result.text)?;
        info!(
            "{} 翻译完成（{} 个片段）",
            path.display(),
            result.outcomes.len()
        );

        Ok(FileReport {
            path: path.to_path_buf(),
            backup: Some(backup),
            segments_translated: result.outcomes.len(),
            changed: true,
            validation_error: None,
        })
    }

    pub fn resolver(&self) -> &TranslationResolver {
        &self.resolver
    }

    pub fn config(&self) -> &TranslationConfig {
        &self.config
    }
}

/// 备份路径：原路径追加固定后缀
fn backup_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(constants::BACKUP_SUFFIX);
    PathBuf::from(os)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::TranslationBackend;
    use crate::error::TranslationError;
    use std::collections::HashMap;

    struct DictBackend {
        id: &'static str,
        mapping: HashMap<&'static str, &'static str>,
    }

    impl DictBackend {
        fn new(id: &'static str, pairs: &[(&'static str, &'static str)]) -> Arc<Self> {
            Arc::new(Self {
                id,
                mapping: pairs.iter().copied().collect(),
            })
        }
    }

    impl TranslationBackend for DictBackend {
        fn id(&self) -> &str {
            self.id
        }
        fn translate(&self, text: &str, _s: &str, _t: &str) -> TranslationResult<String> {
            match self.mapping.get(text) {
                Some(translated) => Ok(translated.to_string()),
                None => Err(TranslationError::BackendError {
                    backend: self.id.to_string(),
                    message: "词典中没有该文本".to_string(),
                }),
            }
        }
    }

    fn translator_with(pairs: &[(&'static str, &'static str)]) -> SourceTranslator {
        let mut registry = BackendRegistry::new();
        registry.register(DictBackend::new("google", pairs));
        let config = TranslationConfig {
            backend_order: vec!["google".to_string()],
            ..TranslationConfig::with_langs("english", "russian")
        };
        let resolver = TranslationResolver::new(registry, TranslationCache::in_memory(), &config);
        SourceTranslator::new(config, resolver)
    }

    #[test]
    fn test_comment_translated_in_place() {
        let mut translator =
            translator_with(&[("Calculate the sum", "Вычислить сумму")]);
        let result = translator
            .translate_source("x = 1  # Calculate the sum\n")
            .unwrap();
        assert!(result.changed);
        assert_eq!(result.text, "x = 1  # Вычислить сумму\n");
        assert_eq!(result.outcomes.len(), 1);
        assert_eq!(result.outcomes[0].kind, SegmentKind::Comment);
        assert_eq!(result.outcomes[0].backend, "google");
    }

    #[test]
    fn test_pure_code_untouched() {
        let mut translator = translator_with(&[]);
        let result = translator.translate_source("result = a + b\n").unwrap();
        assert!(!result.changed);
        assert_eq!(result.text, "result = a + b\n");
        assert!(result.outcomes.is_empty());
    }

    #[test]
    fn test_untranslatable_segment_kept_verbatim() {
        // 词典后端对该文本报错，解析器回退为原文，片段保持不变
        let mut translator = translator_with(&[]);
        let result = translator
            .translate_source("# Calculate the sum of the values\n")
            .unwrap();
        assert!(!result.changed);
    }

    #[test]
    fn test_file_backup_created_once() {
        let mut translator =
            translator_with(&[("Calculate the sum", "Вычислить сумму")]);
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("sample.py");
        std::fs::write(&file, "x = 1  # Calculate the sum\n").unwrap();

        let report = translator.translate_file(&file).unwrap();
        assert!(report.changed);
        let backup = report.backup.unwrap();
        assert!(backup.exists());
        assert_eq!(
            std::fs::read_to_string(&backup).unwrap(),
            "x = 1  # Calculate the sum\n"
        );
        assert_eq!(
            std::fs::read_to_string(&file).unwrap(),
            "x = 1  # Вычислить сумму\n"
        );

        // 翻回去也不会覆盖最早的备份
        std::fs::write(&backup, "pristine\n").unwrap();
        std::fs::write(&file, "x = 1  # Calculate the sum\n").unwrap();
        let report = translator.translate_file(&file).unwrap();
        assert!(report.changed);
        assert_eq!(std::fs::read_to_string(report.backup.unwrap()).unwrap(), "pristine\n");
    }

    #[test]
    fn test_validation_failure_leaves_file_untouched() {
        struct RejectAll;
        impl SyntaxValidator for RejectAll {
            fn parse_check(&self, _text: &str) -> Result<(), SyntaxIssue> {
                Err(SyntaxIssue {
                    line: 1,
                    column: 1,
                    message: "rejected".to_string(),
                })
            }
        }

        let mut translator = translator_with(&[("Calculate the sum", "Вычислить сумму")])
            .with_validator(Box::new(RejectAll));
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("sample.py");
        std::fs::write(&file, "x = 1  # Calculate the sum\n").unwrap();

        let report = translator.translate_file(&file).unwrap();
        assert!(!report.changed);
        assert!(report.validation_error.is_some());
        assert!(report.backup.is_none());
        assert_eq!(
            std::fs::read_to_string(&file).unwrap(),
            "x = 1  # Calculate the sum\n"
        );
    }

    #[test]
    fn test_cancel_flag_stops_between_segments() {
        let mut translator =
            translator_with(&[("Calculate the sum", "Вычислить сумму")]);
        let flag = Arc::new(AtomicBool::new(true));
        translator = translator.with_cancel_flag(Arc::clone(&flag));

        let result = translator
            .translate_source("# Calculate the sum\n# Calculate the sum\n")
            .unwrap();
        // 取消标志已置位：一个片段都不处理
        assert!(!result.changed);
        assert!(result.outcomes.is_empty());
    }
}
