//! # Office Translator
//!
//! 批量翻译 Excel 和 Word 文档的 Rust 库，使用百度翻译 API，并把结果持久化缓存。
//!
//! ## 主要特性
//!
//! - **文档适配**: 直接编辑 OOXML 包，只替换文本内容，其他部件保持原样
//! - **持久缓存**: 以 (原文, 目标语言) 为键的本地缓存，重复文本不再请求 API
//! - **文本分类**: 跳过空白、数字和公式，可选的源语言检测
//! - **速率限制**: 内置速率限制器和指数退避重试
//! - **失败隔离**: 单个文档出错不影响同一批次的其他文档
//!
//! ## 快速开始
//!
//! ```rust,no_run
//! use office_translator::{
//!     AppConfig, BaiduBackend, Credentials, Orchestrator, SpreadsheetAdapter,
//!     TextClassifier, TranslationCache, TranslationClient,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load(None)?;
//!     let settings = config.validate()?;
//!
//!     let backend = BaiduBackend::new(Credentials::from_env()?, &config.translation)?;
//!     let client = TranslationClient::from_config(backend, &config.translation);
//!     let cache = TranslationCache::open(&settings.cache_path)?;
//!     let orchestrator =
//!         Orchestrator::from_settings(client, cache, TextClassifier::default(), &settings);
//!
//!     let report = orchestrator
//!         .process_directory(&SpreadsheetAdapter::default(), &settings.input_dir, &settings.output_dir)
//!         .await?;
//!     println!("translated {} documents", report.documents.len());
//!     Ok(())
//! }
//! ```
//!
//! ## 配置文件支持
//!
//! ```toml
//! [translation]
//! source_lang = "jp"
//! target_lang = "en"
//! api_url = "https://fanyi-api.baidu.com/api/trans/vip/translate"
//! max_requests_per_second = 1.0
//! request_timeout_secs = 30
//!
//! [paths]
//! input_dir = "./test/"
//! output_dir = "./out/"
//! cache_path = "local_db.redb"
//! ```

pub mod cache;
pub mod classifier;
pub mod config;
pub mod document;
pub mod error;
pub mod orchestrator;
pub mod translator;
pub mod types;

pub use cache::TranslationCache;
pub use classifier::{
    AcceptAll, Classification, DetectedLanguageMatcher, LanguageMatcher, TextClassifier,
};
pub use config::{AppConfig, ConfigOverrides, Credentials, RunSettings};
pub use document::{
    DocumentAdapter, DocumentKind, SpreadsheetAdapter, TextUnit, UnitLocation, WordAdapter,
};
pub use error::{
    CacheError, ConfigError, DocumentError, PipelineError, Result, TranslationError,
};
pub use orchestrator::{BatchReport, DocumentReport, Orchestrator, Resolution};
pub use translator::{
    retry_with_backoff, BaiduBackend, RateLimiter, TranslationBackend, TranslationClient,
};
pub use types::{LanguageCode, RetryConfig, TranslationConfig, TranslationOutcome};
