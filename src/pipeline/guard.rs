//! 占位符保护模块
//!
//! 已被选为翻译候选的片段内部仍可能嵌着代码子表达式
//! （插值表达式、函数调用、属性链等）。发送给后端之前，
//! 这些子表达式被替换为编号唯一的不透明令牌，翻译完成后再还原。
//! 还原按大小写不敏感匹配，因为后端可能改写周围文本的大小写。

use std::sync::OnceLock;

use regex::{NoExpand, Regex};

use crate::config::constants;

/// 一次片段翻译往返中使用的占位符
///
/// 生命周期限于单个片段的 protect/restore 往返，还原后即丢弃。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    /// 令牌文本，形如 `__CODE_PLACEHOLDER_3__`
    pub token: String,
    /// 被保护的原始代码子表达式
    pub original: String,
}

/// 保护模式按优先级排列，花括号插值必须最先处理
fn protection_patterns() -> &'static Vec<Regex> {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            // 花括号内的插值表达式
            r"\{[^}]+\}",
            // 方括号下标表达式
            r"\[[^\]]+\]",
            // 函数调用
            r"\w+\([^)]*\)",
            // 属性访问链
            r"\b\w+(?:\.\w+)+",
            // 关键字后跟标识符
            r"\b(?:def|class|import|from|if|elif|else|for|while|try|except|with|return|yield|break|continue|pass|assert|global|nonlocal|lambda)\s+\w+",
            // 赋值语句左侧
            r"\b[\p{L}_][\p{L}\p{N}_]*\s*=",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("内置保护模式必须合法"))
        .collect()
    })
}

/// 代码子表达式保护器
///
/// 每个片段的翻译往返使用一个独立实例，令牌编号从 0 递增，
/// 保证片段内全局唯一。
#[derive(Debug, Default)]
pub struct PlaceholderGuard {
    counter: usize,
}

impl PlaceholderGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// 用占位符替换文本中的全部代码子表达式
    ///
    /// 模式按优先级逐个应用；同一轮内的匹配从右向左替换，
    /// 使尚未处理的匹配偏移保持有效。覆盖到已有令牌的匹配
    /// 直接跳过，令牌绝不嵌进后续占位符的原文里。
    pub fn protect(&mut self, text: &str) -> (String, Vec<Placeholder>) {
        let mut guarded = text.to_string();
        let mut placeholders = Vec::new();

        for pattern in protection_patterns() {
            let matches: Vec<(usize, usize)> = pattern
                .find_iter(&guarded)
                .filter(|m| !m.as_str().contains(constants::PLACEHOLDER_FORMAT))
                .map(|m| (m.start(), m.end()))
                .collect();
            for (start, end) in matches.into_iter().rev() {
                let token = format!("{}{}__", constants::PLACEHOLDER_FORMAT, self.counter);
                self.counter += 1;
                placeholders.push(Placeholder {
                    token: token.clone(),
                    original: guarded[start..end].to_string(),
                });
                guarded.replace_range(start..end, &token);
            }
        }

        (guarded, placeholders)
    }

    /// 把占位符还原为原始代码子表达式
    ///
    /// 按创建的逆序还原：即使调用方自行构造了原文里带令牌的
    /// 占位符，外层先回来、内层后替换，令牌不会残留。
    /// 匹配大小写不敏感，以容忍后端对文本的重新大小写。
    pub fn restore(&self, translated: &str, placeholders: &[Placeholder]) -> String {
        let mut restored = translated.to_string();
        for placeholder in placeholders.iter().rev() {
            let pattern = Regex::new(&format!("(?i){}", regex::escape(&placeholder.token)))
                .expect("转义后的令牌模式必须合法");
            restored = pattern
                .replace_all(&restored, NoExpand(&placeholder.original))
                .into_owned();
        }
        restored
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(text: &str) -> String {
        let mut guard = PlaceholderGuard::new();
        let (guarded, placeholders) = guard.protect(text);
        guard.restore(&guarded, &placeholders)
    }

    #[test]
    fn test_protect_restore_identity() {
        for sample in [
            "Hello {name}!",
            "call foo(a, b) before returning",
            "the value of obj.field.inner matters",
            "items[0] holds the first result",
            "def main is the entry point",
            "count = starts the accumulator",
            "plain prose with no code at all",
        ] {
            assert_eq!(roundtrip(sample), sample, "roundtrip must be identity");
        }
    }

    #[test]
    fn test_interpolation_protected_first() {
        let mut guard = PlaceholderGuard::new();
        let (guarded, placeholders) = guard.protect("Hello {user.name}!");
        assert!(!guarded.contains("{user.name}"));
        assert!(guarded.contains("__CODE_PLACEHOLDER_0__"));
        // 花括号规则先命中，属性链不再被二次保护
        assert_eq!(placeholders.len(), 1);
        assert_eq!(placeholders[0].original, "{user.name}");
    }

    #[test]
    fn test_restore_is_case_insensitive() {
        let mut guard = PlaceholderGuard::new();
        let (guarded, placeholders) = guard.protect("Hello {name}!");
        // 模拟后端改写大小写
        let recased = guarded.to_uppercase();
        let restored = guard.restore(&recased, &placeholders);
        assert!(restored.contains("{name}"), "placeholder must come back verbatim: {restored}");
    }

    #[test]
    fn test_multiple_placeholders_unique_tokens() {
        let mut guard = PlaceholderGuard::new();
        let (guarded, placeholders) = guard.protect("use {a} and {b} with items[2]");
        assert_eq!(placeholders.len(), 3);
        let mut tokens: Vec<&str> = placeholders.iter().map(|p| p.token.as_str()).collect();
        tokens.sort();
        tokens.dedup();
        assert_eq!(tokens.len(), 3, "tokens must be unique");
        for p in &placeholders {
            assert!(guarded.contains(&p.token));
        }
        assert_eq!(guard.restore(&guarded, &placeholders), "use {a} and {b} with items[2]");
    }

    #[test]
    fn test_roundtrip_with_token_adjacent_code_shapes() {
        // 花括号表达式紧邻属性链或跟在关键字后面时，
        // 先插入的令牌不得被后续模式二次捕获
        for sample in [
            "Format {value}.total for display",
            "loop for {item} in the list",
            "use {a} and {b} with items[2]",
        ] {
            let mut guard = PlaceholderGuard::new();
            let (guarded, placeholders) = guard.protect(sample);
            for p in &placeholders {
                assert!(
                    !p.original.contains(constants::PLACEHOLDER_FORMAT),
                    "placeholder original must not contain tokens: {:?}",
                    p
                );
            }
            assert_eq!(
                guard.restore(&guarded, &placeholders),
                sample,
                "roundtrip must be identity"
            );
        }
    }

    #[test]
    fn test_dollar_sign_in_original_restored_verbatim() {
        // NoExpand 保证替换文本中的 $ 不被当作捕获组引用
        assert_eq!(roundtrip("run foo($1, $x) now"), "run foo($1, $x) now");
    }

    #[test]
    fn test_restore_order_independent() {
        let mut guard = PlaceholderGuard::new();
        let (guarded, mut placeholders) = guard.protect("mix {a} and items[1] and foo()");
        placeholders.reverse();
        assert_eq!(
            guard.restore(&guarded, &placeholders),
            "mix {a} and items[1] and foo()"
        );
    }
}
