//! 翻译编排模块
//!
//! 把分类器、缓存、翻译客户端和文档适配器串起来：逐个文档打开、枚举文本单元、
//! 查缓存或调用翻译、写回并保存。单个文档失败只记录日志，批处理继续。

use crate::cache::TranslationCache;
use crate::classifier::TextClassifier;
use crate::config::RunSettings;
use crate::document::{output_path, DocumentAdapter, DocumentKind};
use crate::error::{CacheError, ConfigError, DocumentError, PipelineError};
use crate::translator::{TranslationBackend, TranslationClient};
use crate::types::LanguageCode;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// How the value written back for a unit was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    CacheHit,
    Translated,
    /// The request failed or came back unchanged.
    Suspect,
}

/// Counts for one processed document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub units: usize,
    pub translated: usize,
    pub cache_hits: usize,
    pub skipped: usize,
    pub suspected_failures: usize,
}

/// Outcome of a directory run.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub documents: Vec<DocumentReport>,
    pub failed: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn suspected_failures(&self) -> usize {
        self.documents.iter().map(|doc| doc.suspected_failures).sum()
    }
}

pub struct Orchestrator<B> {
    client: TranslationClient<B>,
    cache: TranslationCache,
    classifier: TextClassifier,
    source: LanguageCode,
    target: LanguageCode,
}

impl<B: TranslationBackend> Orchestrator<B> {
    pub fn new(
        client: TranslationClient<B>,
        cache: TranslationCache,
        classifier: TextClassifier,
        source: LanguageCode,
        target: LanguageCode,
    ) -> Self {
        Self {
            client,
            cache,
            classifier,
            source,
            target,
        }
    }

    pub fn from_settings(
        client: TranslationClient<B>,
        cache: TranslationCache,
        classifier: TextClassifier,
        settings: &RunSettings,
    ) -> Self {
        Self::new(
            client,
            cache,
            classifier,
            settings.source_lang,
            settings.target_lang,
        )
    }

    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    pub fn client(&self) -> &TranslationClient<B> {
        &self.client
    }

    /// Cached value for `text`, or a fresh translation that is then cached.
    ///
    /// A fallback value is cached as well, so a failed text is not retried
    /// on later runs.
    pub async fn resolve(&self, text: &str) -> Result<(String, Resolution), CacheError> {
        if let Some(value) = self.cache.get(text, self.target)? {
            debug!(text, "cache hit");
            return Ok((value, Resolution::CacheHit));
        }

        let outcome = self.client.translate(text, self.source, self.target).await;
        let resolution = if !outcome.succeeded || outcome.value == text {
            warn!(
                text,
                target = %self.target,
                succeeded = outcome.succeeded,
                "translation looks unchanged, possible failure"
            );
            Resolution::Suspect
        } else {
            Resolution::Translated
        };

        self.cache.put(text, self.target, &outcome.value)?;
        Ok((outcome.value, resolution))
    }

    /// Translate a single string, skipping the ones the classifier rejects.
    pub async fn translate_text(&self, text: &str) -> Result<String, CacheError> {
        if !self.classifier.should_translate(text, self.source) {
            return Ok(text.to_string());
        }
        let (value, _) = self.resolve(text).await?;
        Ok(value)
    }

    /// Translate one document into `output_dir`.
    pub async fn process_document<A: DocumentAdapter>(
        &self,
        adapter: &A,
        input: &Path,
        output_dir: &Path,
    ) -> Result<DocumentReport, PipelineError> {
        let document_error = |source: DocumentError| PipelineError::Document {
            path: input.to_path_buf(),
            source,
        };

        let output = output_path(output_dir, self.target, input).map_err(document_error)?;
        info!(input = %input.display(), kind = %adapter.kind(), "processing document");

        let mut document = adapter.open(input).map_err(document_error)?;
        let mut report = DocumentReport {
            input: input.to_path_buf(),
            output: output.clone(),
            ..DocumentReport::default()
        };

        for unit in adapter.enumerate_text_units(&document) {
            report.units += 1;
            let classification =
                self.classifier
                    .classify(unit.value(), self.source, adapter.language_gate());
            if !classification.should_translate() {
                debug!(location = %unit.location(), reason = %classification, "skipped");
                report.skipped += 1;
                continue;
            }

            let (value, resolution) = self.resolve(unit.value()).await?;
            match resolution {
                Resolution::CacheHit => report.cache_hits += 1,
                Resolution::Translated => report.translated += 1,
                Resolution::Suspect => report.suspected_failures += 1,
            }
            adapter
                .apply_translated_value(&mut document, &unit, &value)
                .map_err(document_error)?;
        }

        adapter.save(document, &output).map_err(document_error)?;
        info!(
            output = %output.display(),
            units = report.units,
            translated = report.translated,
            cache_hits = report.cache_hits,
            skipped = report.skipped,
            suspected = report.suspected_failures,
            "saved document"
        );
        Ok(report)
    }

    /// Translate every recognized file directly inside `input_dir`.
    ///
    /// Files are visited in name order. A document that fails is logged and
    /// recorded in the report; configuration and cache errors stop the run.
    pub async fn process_directory<A: DocumentAdapter>(
        &self,
        adapter: &A,
        input_dir: &Path,
        output_dir: &Path,
    ) -> Result<BatchReport, PipelineError> {
        let io_error = |path: &Path| {
            let path = path.to_path_buf();
            move |source| ConfigError::Io { path, source }
        };

        fs::create_dir_all(output_dir).map_err(io_error(output_dir))?;
        let mut files = Vec::new();
        for entry in fs::read_dir(input_dir).map_err(io_error(input_dir))? {
            let path = entry.map_err(io_error(input_dir))?.path();
            if path.is_file() {
                files.push(path);
            }
        }
        files.sort();

        let mut batch = BatchReport::default();
        for path in files {
            if !adapter.recognizes(&path) {
                match adapter.kind() {
                    DocumentKind::Spreadsheet => {
                        debug!(path = %path.display(), "not a spreadsheet, skipped")
                    }
                    DocumentKind::WordProcessor => {
                        warn!(path = %path.display(), "not a word document, skipped")
                    }
                }
                batch.skipped.push(path);
                continue;
            }

            match self.process_document(adapter, &path, output_dir).await {
                Ok(report) => batch.documents.push(report),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    error!(error = %e, "document failed, continuing with the next one");
                    batch.failed.push(path);
                }
            }
        }

        info!(
            processed = batch.documents.len(),
            failed = batch.failed.len(),
            skipped = batch.skipped.len(),
            "batch finished"
        );
        Ok(batch)
    }
}
