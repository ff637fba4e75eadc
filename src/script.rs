//! 文字系统分类模块
//!
//! 通过 Unicode 区段统计判断文本的主要书写系统，并据此决定一段文本
//! 是"需要翻译的自然语言"还是"不应触碰的代码"。
//!
//! 这里的判定是尽力而为的启发式：允许漏掉真实文本（false negative），
//! 绝不允许把代码送去翻译（false positive 是本模块要防止的一级故障）。

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::config::constants;

/// 书写系统分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Script {
    Latin,
    Cyrillic,
    Cjk,
    Arabic,
    Hebrew,
    Greek,
    Other,
    /// 文本中没有任何字母字符
    Unknown,
}

impl Script {
    /// 单个字母字符所属的书写系统
    fn of_char(c: char) -> Option<Script> {
        if !c.is_alphabetic() {
            return None;
        }
        let script = match c {
            'A'..='Z' | 'a'..='z' | '\u{00C0}'..='\u{024F}' | '\u{1E00}'..='\u{1EFF}' => {
                Script::Latin
            }
            '\u{0400}'..='\u{052F}' => Script::Cyrillic,
            '\u{3040}'..='\u{30FF}'
            | '\u{3400}'..='\u{4DBF}'
            | '\u{4E00}'..='\u{9FFF}'
            | '\u{AC00}'..='\u{D7AF}'
            | '\u{F900}'..='\u{FAFF}' => Script::Cjk,
            '\u{0600}'..='\u{06FF}' | '\u{0750}'..='\u{077F}' => Script::Arabic,
            '\u{0590}'..='\u{05FF}' => Script::Hebrew,
            '\u{0370}'..='\u{03FF}' | '\u{1F00}'..='\u{1FFF}' => Script::Greek,
            _ => Script::Other,
        };
        Some(script)
    }

    /// 规范语言名称对应的预期书写系统
    pub fn expected_for(lang: &str) -> Option<Script> {
        let script = match lang.to_lowercase().as_str() {
            "english" | "german" | "french" | "spanish" | "italian" | "portuguese" | "dutch"
            | "czech" | "polish" | "hungarian" | "catalan" => Script::Latin,
            "russian" | "ukrainian" | "bulgarian" | "serbian" => Script::Cyrillic,
            "chinese" | "japanese" | "korean" => Script::Cjk,
            "arabic" => Script::Arabic,
            "hebrew" => Script::Hebrew,
            "greek" => Script::Greek,
            _ => return None,
        };
        Some(script)
    }
}

/// 结构性代码模式，命中任意一条即判定为代码
///
/// 与原文匹配时均已去除首尾空白，因此模式统一以 `^` 锚定。
fn code_patterns() -> &'static Vec<Regex> {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            // 赋值语句开头
            r"^[\p{L}_][\p{L}\p{N}_]*\s*=",
            // 关键字开头
            r"^(def|class|import|from|if|elif|else|for|while|try|except|with|return|yield)\s",
            // 单词注释体
            r"^#\s*\w+$",
            // 仅括号
            r"^[{}()\[\]]+$",
            // 仅数字与运算符
            r"^[0-9.,\-+*/=<>!&|\s]+$",
            // 函数调用形态
            r"^\w+\(\w*\)",
            // 属性访问形态
            r"^\w+\.\w+",
            // 全大写常量名
            r"^[A-Z_][A-Z0-9_]*$",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("内置代码模式必须合法"))
        .collect()
    })
}

fn word_pattern() -> &'static Regex {
    static WORDS: OnceLock<Regex> = OnceLock::new();
    WORDS.get_or_init(|| Regex::new(r"[\p{L}\p{N}_]+").expect("内置分词模式必须合法"))
}

/// 文字系统分类器
///
/// 无内部可变状态，可以在多个组件间共享。
pub struct ScriptClassifier {
    english_words: HashSet<&'static str>,
    min_text_length: usize,
}

impl Default for ScriptClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptClassifier {
    pub fn new() -> Self {
        Self {
            english_words: constants::COMMON_ENGLISH_WORDS.iter().copied().collect(),
            min_text_length: constants::MIN_TEXT_LENGTH,
        }
    }

    /// 判定文本的主要书写系统
    ///
    /// 统计每个书写系统的字母字符数，返回计数最高者；
    /// 没有字母字符时返回 [`Script::Unknown`]。
    pub fn classify(text: &str) -> Script {
        let mut counts: [(Script, usize); 7] = [
            (Script::Latin, 0),
            (Script::Cyrillic, 0),
            (Script::Cjk, 0),
            (Script::Arabic, 0),
            (Script::Hebrew, 0),
            (Script::Greek, 0),
            (Script::Other, 0),
        ];
        for c in text.chars() {
            if let Some(script) = Script::of_char(c) {
                for slot in counts.iter_mut() {
                    if slot.0 == script {
                        slot.1 += 1;
                        break;
                    }
                }
            }
        }
        counts
            .iter()
            .filter(|(_, n)| *n > 0)
            .max_by_key(|(_, n)| *n)
            .map(|(s, _)| *s)
            .unwrap_or(Script::Unknown)
    }

    /// 判断文本是否需要翻译
    ///
    /// 决策顺序：长度下限 → 结构性代码模式 → 书写系统比对 →
    /// 常见英文词证据（仅拉丁字母文本）→ 字母占比。
    pub fn needs_translation(&self, text: &str, source_lang: &str, target_lang: &str) -> bool {
        let trimmed = text.trim();
        if trimmed.chars().count() < self.min_text_length {
            return false;
        }
        if self.matches_code_pattern(trimmed) {
            return false;
        }

        let script = Self::classify(trimmed);
        if script == Script::Unknown {
            return false;
        }
        // 已经是目标语言的书写系统，保守跳过
        if Script::expected_for(target_lang) == Some(script) {
            return false;
        }
        if let Some(source_script) = Script::expected_for(source_lang) {
            if script == source_script {
                // 拉丁字母覆盖太多语言，要求常见英文词作为自然语言证据
                if script == Script::Latin {
                    return self.contains_common_english(trimmed);
                }
                return true;
            }
        }
        self.is_natural_language(trimmed)
    }

    /// 片段内容是否形似代码（提取器的跳过判据）
    pub fn is_code_like(&self, text: &str) -> bool {
        let trimmed = text.trim();
        if trimmed.chars().count() < constants::MIN_SEGMENT_LENGTH {
            return true;
        }
        if self.matches_code_pattern(trimmed) {
            return true;
        }
        !self.is_natural_language(trimmed)
    }

    /// 字母字符占非空白字符的比例是否达到自然语言阈值
    pub fn is_natural_language(&self, text: &str) -> bool {
        let mut letters = 0usize;
        let mut total = 0usize;
        for c in text.chars() {
            if c.is_whitespace() {
                continue;
            }
            total += 1;
            if c.is_alphabetic() {
                letters += 1;
            }
        }
        if total == 0 {
            return false;
        }
        (letters as f32 / total as f32) > constants::ALPHA_RATIO_THRESHOLD
    }

    fn matches_code_pattern(&self, trimmed: &str) -> bool {
        code_patterns().iter().any(|p| p.is_match(trimmed))
    }

    fn contains_common_english(&self, text: &str) -> bool {
        word_pattern()
            .find_iter(text)
            .any(|m| self.english_words.contains(m.as_str().to_lowercase().as_str()))
    }
}
