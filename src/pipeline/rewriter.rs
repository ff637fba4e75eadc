//! 片段回写模块
//!
//! 把翻译完成的片段按原始偏移写回文件文本。替换会改变文本长度，
//! 因此用一个随替换累积的有符号偏移量修正后续片段的位置。
//! 回写完成后交由语法校验器复核；校验失败时返回与输入逐字节相同的原文，
//! 绝不提交一份解析不过的文件。

use tracing::warn;

use super::extractor::TranslatableSegment;

/// 语法校验发现的问题位置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxIssue {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

/// 语法校验能力
///
/// 具体的语言工具（解析器、编译器前端）由外部协作方提供；
/// 本 crate 自带一个尽力而为的括号/引号配平实现作为默认协作方。
pub trait SyntaxValidator {
    fn parse_check(&self, text: &str) -> Result<(), SyntaxIssue>;
}

/// 原片段与其翻译结果的配对
#[derive(Debug, Clone)]
pub struct TranslatedSegment {
    pub segment: TranslatableSegment,
    pub translated: String,
}

/// 回写结果
///
/// 校验失败时 `text` 与传入原文逐字节相同，`validation_error` 记录原因。
#[derive(Debug)]
pub struct RewriteOutcome {
    pub text: String,
    /// 实际完成替换的片段数
    pub replaced: usize,
    pub validation_error: Option<SyntaxIssue>,
}

/// 片段回写器
pub struct SegmentRewriter {
    validator: Box<dyn SyntaxValidator>,
}

impl Default for SegmentRewriter {
    fn default() -> Self {
        Self::new(Box::new(DelimiterValidator))
    }
}

impl SegmentRewriter {
    pub fn new(validator: Box<dyn SyntaxValidator>) -> Self {
        Self { validator }
    }

    /// 应用全部替换并校验结果
    ///
    /// 片段按原始起始偏移升序应用；每次替换后把长度差累加进偏移量，
    /// 后续片段的原始偏移经偏移量修正后仍指向正确位置。
    pub fn apply(&self, source: &str, segments: &[TranslatedSegment]) -> RewriteOutcome {
        let mut ordered: Vec<&TranslatedSegment> = segments.iter().collect();
        ordered.sort_by_key(|s| s.segment.start);

        let mut result = source.to_string();
        let mut delta: i64 = 0;
        let mut replaced = 0usize;

        for item in ordered {
            let seg = &item.segment;
            let start = (seg.start as i64 + delta) as usize;
            let end = (seg.end as i64 + delta) as usize;
            if end > result.len()
                || start > end
                || !result.is_char_boundary(start)
                || !result.is_char_boundary(end)
            {
                warn!("片段偏移越界，跳过替换: {}..{}", seg.start, seg.end);
                continue;
            }
            result.replace_range(start..end, &item.translated);
            delta += item.translated.len() as i64 - (seg.end - seg.start) as i64;
            replaced += 1;
        }

        if replaced > 0 {
            if let Err(issue) = self.validator.parse_check(&result) {
                warn!(
                    "回写后语法校验失败 (行 {} 列 {}): {}，保留原文",
                    issue.line, issue.column, issue.message
                );
                return RewriteOutcome {
                    text: source.to_string(),
                    replaced: 0,
                    validation_error: Some(issue),
                };
            }
        }

        RewriteOutcome {
            text: result,
            replaced,
            validation_error: None,
        }
    }
}

/// 括号与引号配平校验器
///
/// 尽力而为的默认实现：跳过字符串与注释内容，检查括号配对与
/// 引号闭合。不能替代真正的语言解析器，但足以拦截翻译文本
/// 吞掉定界符这类最常见的破坏。
pub struct DelimiterValidator;

impl SyntaxValidator for DelimiterValidator {
    fn parse_check(&self, text: &str) -> Result<(), SyntaxIssue> {
        let mut stack: Vec<(char, usize, usize)> = Vec::new();
        let mut in_string: Option<char> = None;
        let mut escaped = false;
        let mut line = 1usize;
        let mut column = 0usize;
        let mut chars = text.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '\n' {
                line += 1;
                column = 0;
                continue;
            }
            column += 1;

            if let Some(quote) = in_string {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == quote {
                    in_string = None;
                }
                continue;
            }

            match c {
                '"' | '\'' => in_string = Some(c),
                // 行注释吞到行尾
                '#' => {
                    while let Some(&next) = chars.peek() {
                        if next == '\n' {
                            break;
                        }
                        chars.next();
                    }
                }
                '/' => match chars.peek() {
                    Some('/') => {
                        while let Some(&next) = chars.peek() {
                            if next == '\n' {
                                break;
                            }
                            chars.next();
                        }
                    }
                    Some('*') => {
                        chars.next();
                        let mut prev = '\0';
                        for next in chars.by_ref() {
                            if next == '\n' {
                                line += 1;
                                column = 0;
                            }
                            if prev == '*' && next == '/' {
                                break;
                            }
                            prev = next;
                        }
                    }
                    _ => {}
                },
                '(' | '[' | '{' => stack.push((c, line, column)),
                ')' | ']' | '}' => {
                    let expected = match c {
                        ')' => '(',
                        ']' => '[',
                        _ => '{',
                    };
                    match stack.pop() {
                        Some((open, ..)) if open == expected => {}
                        _ => {
                            return Err(SyntaxIssue {
                                line,
                                column,
                                message: format!("意外的闭合定界符 '{c}'"),
                            })
                        }
                    }
                }
                _ => {}
            }
        }

        if in_string.is_some() {
            return Err(SyntaxIssue {
                line,
                column,
                message: "字符串未闭合".to_string(),
            });
        }
        if let Some((open, line, column)) = stack.pop() {
            return Err(SyntaxIssue {
                line,
                column,
                message: format!("定界符 '{open}' 未闭合"),
            });
        }
        Ok(())
    }
}
