//! 文本处理管道模块
//!
//! 负责从源码中提取可翻译片段、保护片段内的代码子表达式，
//! 以及把翻译结果安全地写回原文。

pub mod extractor;
pub mod guard;
pub mod rewriter;

pub use extractor::{ExtractorConfig, SegmentExtractor, SegmentKind, TranslatableSegment};
pub use guard::{Placeholder, PlaceholderGuard};
pub use rewriter::{
    DelimiterValidator, RewriteOutcome, SegmentRewriter, SyntaxIssue, SyntaxValidator,
    TranslatedSegment,
};
