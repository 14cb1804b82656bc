//! 错误处理模块
//!
//! 定义翻译流程中使用的错误类型。错误按影响范围分类：
//!
//! * [`ConfigError`] - 配置错误，在处理任何文档之前触发，整个运行失败
//! * [`TranslationError`] - 单次翻译请求失败，降级为返回原文
//! * [`CacheError`] - 缓存不可用，整个运行失败
//! * [`DocumentError`] - 单个文档损坏或无法解析，仅跳过该文档

use std::path::PathBuf;
use thiserror::Error;

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unsupported language code `{code}`, expected one of: {supported}")]
    UnsupportedLanguage { code: String, supported: String },

    #[error("`auto` can only be used as the source language")]
    InvalidTarget,

    #[error("input directory {0} does not exist")]
    MissingInputDir(PathBuf),

    #[error("output directory {0} must differ from the input directory")]
    SameDirectories(PathBuf),

    #[error("environment variable {0} is not set")]
    MissingCredential(&'static str),

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// 翻译错误类型
///
/// 单次请求级别的错误。客户端在重试耗尽后会吞掉这些错误并返回原文。
#[derive(Debug, Error)]
pub enum TranslationError {
    /// HTTP请求错误
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API响应错误
    #[error("API error {code}: {message}")]
    Api { code: String, message: String },

    /// API没有返回译文
    #[error("API returned no translation")]
    EmptyResult,

    /// 解析错误
    #[error("parse error: {0}")]
    Parse(String),
}

impl TranslationError {
    /// Whether another attempt could plausibly succeed.
    ///
    /// 52001 is a request timeout, 52002 a server-side failure and 54003 the
    /// access frequency limit; everything else on the API side (bad sign,
    /// unauthorized, unsupported direction) fails the same way every time.
    pub fn is_retryable(&self) -> bool {
        match self {
            TranslationError::Http(_) => true,
            TranslationError::Api { code, .. } => {
                matches!(code.as_str(), "52001" | "52002" | "54003")
            }
            TranslationError::EmptyResult => false,
            TranslationError::Parse(_) => false,
        }
    }
}

/// 缓存错误
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache storage error: {0}")]
    Storage(#[from] redb::Error),

    #[error("failed to prepare cache file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// 文档错误
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("invalid XML in {part}: {message}")]
    Xml { part: String, message: String },

    #[error("archive has no {0} part")]
    MissingPart(String),

    #[error("archive entry escapes the extraction directory: {0}")]
    UnsafeEntry(String),

    #[error("unsupported document type: {0}")]
    UnsupportedFormat(PathBuf),
}

/// 流水线错误
///
/// 由编排器返回，区分致命错误和仅影响单个文档的错误。
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("{path}: {source}")]
    Document {
        path: PathBuf,
        #[source]
        source: DocumentError,
    },
}

impl PipelineError {
    /// Whether the error should stop the whole batch.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, PipelineError::Document { .. })
    }
}

/// 翻译结果类型别名
pub type Result<T> = std::result::Result<T, TranslationError>;
