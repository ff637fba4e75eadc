//! 可翻译片段提取模块
//!
//! 扫描源文件文本，产出带精确字节偏移的可翻译片段列表。
//! 各提取规则独立运行，按优先级合并，重叠区间先到先得，
//! 保证结果按起始偏移升序且互不重叠。

use std::sync::OnceLock;

use regex::Regex;

use crate::config::{constants, TranslationConfig};
use crate::script::ScriptClassifier;

/// 片段类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentKind {
    /// 行注释（`# …` 或 `// …`）
    Comment,
    /// 块注释（`/* … */`）
    BlockComment,
    /// 文档字符串（`"""…"""` 或 `'''…'''`）
    Docstring,
    /// 普通字符串字面量
    StringLiteral,
    /// 字典键字符串，常兼作标识符，需要更保守的处理
    DictKey,
}

/// 一段被识别为翻译候选的源码文本
///
/// 偏移为提取时刻原文中的字节偏移；改写阶段会按先前替换的长度差重新定位。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatableSegment {
    /// 片段内容（已去除注释标记与首尾空白）
    pub text: String,
    /// 原文中的起始字节偏移（含）
    pub start: usize,
    /// 原文中的结束字节偏移（不含）
    pub end: usize,
    pub kind: SegmentKind,
}

/// 提取器配置
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub translate_comments: bool,
    pub translate_docstrings: bool,
    /// 默认关闭：翻译任意字符串有破坏格式化串或数据标识符的风险
    pub translate_strings: bool,
    pub translate_dict_keys: bool,
    pub min_string_length: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            translate_comments: true,
            translate_docstrings: true,
            translate_strings: false,
            translate_dict_keys: false,
            min_string_length: constants::MIN_STRING_LENGTH,
        }
    }
}

impl From<&TranslationConfig> for ExtractorConfig {
    fn from(config: &TranslationConfig) -> Self {
        Self {
            translate_comments: config.translate_comments,
            translate_docstrings: config.translate_docstrings,
            translate_strings: config.translate_strings,
            translate_dict_keys: config.translate_dict_keys,
            min_string_length: constants::MIN_STRING_LENGTH,
        }
    }
}

fn line_comment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)(?:#|//).*").expect("内置提取模式必须合法"))
}

fn docstring_res() -> &'static [Regex; 2] {
    static RE: OnceLock<[Regex; 2]> = OnceLock::new();
    RE.get_or_init(|| {
        [
            Regex::new(r#"(?s)"""(.*?)""""#).expect("内置提取模式必须合法"),
            Regex::new(r"(?s)'''(.*?)'''").expect("内置提取模式必须合法"),
        ]
    })
}

fn block_comment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)/\*(.*?)\*/").expect("内置提取模式必须合法"))
}

fn dict_key_res() -> &'static [Regex; 2] {
    static RE: OnceLock<[Regex; 2]> = OnceLock::new();
    RE.get_or_init(|| {
        [
            Regex::new(r#""([^"\n]+?)"\s*:"#).expect("内置提取模式必须合法"),
            Regex::new(r"'([^'\n]+?)'\s*:").expect("内置提取模式必须合法"),
        ]
    })
}

fn string_literal_res() -> &'static [Regex; 2] {
    static RE: OnceLock<[Regex; 2]> = OnceLock::new();
    RE.get_or_init(|| {
        [
            Regex::new(r#""([^"\\\n]*(?:\\.[^"\\\n]*)*)""#).expect("内置提取模式必须合法"),
            Regex::new(r"'([^'\\\n]*(?:\\.[^'\\\n]*)*)'").expect("内置提取模式必须合法"),
        ]
    })
}

/// 可翻译片段提取器
pub struct SegmentExtractor {
    config: ExtractorConfig,
    classifier: ScriptClassifier,
}

impl Default for SegmentExtractor {
    fn default() -> Self {
        Self::new(ExtractorConfig::default())
    }
}

impl SegmentExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self {
            config,
            classifier: ScriptClassifier::new(),
        }
    }

    /// 提取全部翻译候选片段
    ///
    /// 规则优先级：行注释 → 块注释/文档字符串 → 字典键 → 字符串字面量。
    /// 后续规则命中的区间若与已接受片段重叠则被丢弃。
    pub fn extract(&self, source: &str) -> Vec<TranslatableSegment> {
        let mut segments: Vec<TranslatableSegment> = Vec::new();

        if self.config.translate_comments {
            for m in line_comment_re().find_iter(source) {
                let marker_len = m
                    .as_str()
                    .bytes()
                    .take_while(|b| *b == b'#' || *b == b'/')
                    .count();
                self.push_candidate(
                    &mut segments,
                    source,
                    m.start() + marker_len,
                    m.end(),
                    SegmentKind::Comment,
                );
            }
        }

        if self.config.translate_docstrings {
            for re in docstring_res() {
                for caps in re.captures_iter(source) {
                    let inner = caps.get(1).expect("捕获组 1 必然存在");
                    self.push_candidate(
                        &mut segments,
                        source,
                        inner.start(),
                        inner.end(),
                        SegmentKind::Docstring,
                    );
                }
            }
            for caps in block_comment_re().captures_iter(source) {
                let inner = caps.get(1).expect("捕获组 1 必然存在");
                self.push_candidate(
                    &mut segments,
                    source,
                    inner.start(),
                    inner.end(),
                    SegmentKind::BlockComment,
                );
            }
        }

        // 字典键比普通字符串更具体，先匹配才能在先到先得的合并下保留类别
        if self.config.translate_dict_keys {
            for re in dict_key_res() {
                for caps in re.captures_iter(source) {
                    let inner = caps.get(1).expect("捕获组 1 必然存在");
                    self.push_candidate(
                        &mut segments,
                        source,
                        inner.start(),
                        inner.end(),
                        SegmentKind::DictKey,
                    );
                }
            }
        }

        if self.config.translate_strings {
            for re in string_literal_res() {
                for caps in re.captures_iter(source) {
                    let inner = caps.get(1).expect("捕获组 1 必然存在");
                    if inner.as_str().chars().count() < self.config.min_string_length {
                        continue;
                    }
                    self.push_candidate(
                        &mut segments,
                        source,
                        inner.start(),
                        inner.end(),
                        SegmentKind::StringLiteral,
                    );
                }
            }
        }

        segments.sort_by_key(|s| s.start);
        segments
    }

    /// 去除候选区间的首尾空白、过滤代码形态内容，并做重叠检查
    fn push_candidate(
        &self,
        segments: &mut Vec<TranslatableSegment>,
        source: &str,
        start: usize,
        end: usize,
        kind: SegmentKind,
    ) {
        debug_assert!(start <= end && end <= source.len());
        let raw = &source[start..end];
        let ltrim = raw.len() - raw.trim_start().len();
        let text = raw.trim();
        if text.is_empty() {
            return;
        }
        let start = start + ltrim;
        let end = start + text.len();

        if self.classifier.is_code_like(text) {
            return;
        }
        if segments.iter().any(|s| s.start < end && start < s.end) {
            return;
        }
        segments.push(TranslatableSegment {
            text: text.to_string(),
            start,
            end,
            kind,
        });
    }
}
