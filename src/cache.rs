//! 翻译缓存模块
//!
//! 以 (原文, 目标语言) 为键，把每一次翻译结果持久化到本地 redb 文件中，
//! 避免重复调用付费API。每次写入立即提交，没有过期和淘汰。

use crate::error::CacheError;
use crate::types::LanguageCode;
use redb::{Database, ReadableTableMetadata, StorageBackend, TableDefinition, TableError};
use std::path::Path;

/// (source text, target language) -> translated text
const TRANSLATIONS: TableDefinition<(&str, &str), &str> = TableDefinition::new("kv_store");

fn storage<E: Into<redb::Error>>(error: E) -> CacheError {
    CacheError::Storage(error.into())
}

/// 持久化翻译缓存
///
/// The source language is not part of the key: the same text translated
/// from two declared source languages into one target shares an entry.
pub struct TranslationCache {
    db: Database,
}

impl TranslationCache {
    /// Open the cache file, creating the file and its table when absent.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CacheError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| CacheError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let db = Database::create(path).map_err(storage)?;
        let cache = Self { db };
        cache.init()?;
        Ok(cache)
    }

    /// Open a cache on another redb storage backend, such as
    /// `redb::backends::InMemoryBackend`.
    pub fn with_backend(backend: impl StorageBackend) -> Result<Self, CacheError> {
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(storage)?;
        let cache = Self { db };
        cache.init()?;
        Ok(cache)
    }

    /// Create the table if it does not exist yet. Safe to call repeatedly.
    fn init(&self) -> Result<(), CacheError> {
        let txn = self.db.begin_write().map_err(storage)?;
        txn.open_table(TRANSLATIONS).map_err(storage)?;
        txn.commit().map_err(storage)
    }

    pub fn get(&self, key: &str, target: LanguageCode) -> Result<Option<String>, CacheError> {
        let txn = self.db.begin_read().map_err(storage)?;
        let table = match txn.open_table(TRANSLATIONS) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => return Err(storage(e)),
        };
        let value = table
            .get((key, target.as_str()))
            .map_err(storage)?
            .map(|guard| guard.value().to_string());
        Ok(value)
    }

    /// Insert or replace, committed before returning.
    pub fn put(&self, key: &str, target: LanguageCode, value: &str) -> Result<(), CacheError> {
        let txn = self.db.begin_write().map_err(storage)?;
        {
            let mut table = txn.open_table(TRANSLATIONS).map_err(storage)?;
            table
                .insert((key, target.as_str()), value)
                .map_err(storage)?;
        }
        txn.commit().map_err(storage)
    }

    pub fn len(&self) -> Result<u64, CacheError> {
        let txn = self.db.begin_read().map_err(storage)?;
        let table = txn.open_table(TRANSLATIONS).map_err(storage)?;
        table.len().map_err(storage)
    }

    pub fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.len()? == 0)
    }
}
