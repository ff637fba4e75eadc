//! 翻译系统统一错误处理
//!
//! 提供结构化错误类型和错误处理机制。
//! 后端级别的失败（网络、配额、空结果）不会以错误形式向上传播，
//! 而是由解析器内部降级处理，这里的错误类型只覆盖真正需要上报的情况。

use std::fmt;

use thiserror::Error;

/// 翻译错误类型
#[derive(Error, Debug, Clone)]
pub enum TranslationError {
    /// 配置错误
    #[error("配置错误: {0}")]
    ConfigError(String),

    /// 网络错误
    #[error("网络错误: {0}")]
    NetworkError(String),

    /// 输入验证错误
    #[error("输入无效: {0}")]
    InvalidInput(String),

    /// 后端错误（仅在单个后端内部使用，解析器会捕获并继续尝试下一个）
    #[error("翻译后端 {backend} 错误: {message}")]
    BackendError { backend: String, message: String },

    /// 缓存错误
    #[error("缓存错误: {0}")]
    CacheError(String),

    /// 语法校验失败，改写已中止
    #[error("语法校验失败 (行 {line} 列 {column}): {message}")]
    SyntaxValidation {
        line: usize,
        column: usize,
        message: String,
    },

    /// 文件读写错误
    #[error("文件操作错误: {0}")]
    IoError(String),

    /// 序列化错误
    #[error("序列化错误: {0}")]
    SerializationError(String),

    /// 内部错误
    #[error("内部错误: {0}")]
    InternalError(String),
}

impl TranslationError {
    /// 检查错误是否可重试
    pub fn is_retryable(&self) -> bool {
        match self {
            TranslationError::NetworkError(_) => true,
            TranslationError::BackendError { .. } => true,
            TranslationError::CacheError(_) => true,
            TranslationError::ConfigError(_) => false,
            TranslationError::InvalidInput(_) => false,
            TranslationError::SyntaxValidation { .. } => false,
            TranslationError::IoError(_) => true,
            TranslationError::SerializationError(_) => false,
            TranslationError::InternalError(_) => false,
        }
    }

    /// 获取错误的严重程度
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            TranslationError::ConfigError(_) => ErrorSeverity::Critical,
            TranslationError::NetworkError(_) => ErrorSeverity::Warning,
            TranslationError::InvalidInput(_) => ErrorSeverity::Info,
            TranslationError::BackendError { .. } => ErrorSeverity::Warning,
            TranslationError::CacheError(_) => ErrorSeverity::Warning,
            TranslationError::SyntaxValidation { .. } => ErrorSeverity::Error,
            TranslationError::IoError(_) => ErrorSeverity::Error,
            TranslationError::SerializationError(_) => ErrorSeverity::Error,
            TranslationError::InternalError(_) => ErrorSeverity::Critical,
        }
    }
}

/// 错误严重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// 信息级别，不影响功能
    Info,
    /// 警告级别，功能降级但可继续
    Warning,
    /// 错误级别，当前操作失败
    Error,
    /// 严重级别，服务不可用
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorSeverity::Info => "INFO",
            ErrorSeverity::Warning => "WARNING",
            ErrorSeverity::Error => "ERROR",
            ErrorSeverity::Critical => "CRITICAL",
        };
        write!(f, "{label}")
    }
}

impl From<std::io::Error> for TranslationError {
    fn from(err: std::io::Error) -> Self {
        TranslationError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for TranslationError {
    fn from(err: serde_json::Error) -> Self {
        TranslationError::SerializationError(err.to_string())
    }
}

impl From<reqwest::Error> for TranslationError {
    fn from(err: reqwest::Error) -> Self {
        TranslationError::NetworkError(err.to_string())
    }
}

/// 翻译操作的统一结果类型
pub type TranslationResult<T> = Result<T, TranslationError>;
