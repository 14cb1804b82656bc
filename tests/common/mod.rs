#![allow(dead_code)]

use async_trait::async_trait;
use office_translator::error::Result;
use office_translator::translator::LineRequest;
use office_translator::{
    LanguageCode, Orchestrator, RateLimiter, RetryConfig, TextClassifier, TranslationBackend,
    TranslationCache, TranslationClient, TranslationError,
};
use redb::backends::InMemoryBackend;
use redb::StorageBackend;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

/// Translates from a dictionary and falls back to `{to}:{text}`.
#[derive(Default)]
pub struct FakeBackend {
    dictionary: HashMap<String, String>,
    calls: Mutex<Vec<String>>,
    fail: bool,
}

impl FakeBackend {
    pub fn with_dictionary(entries: &[(&str, &str)]) -> Self {
        Self {
            dictionary: entries
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TranslationBackend for FakeBackend {
    async fn translate_line(&self, request: &LineRequest<'_>) -> Result<String> {
        self.calls.lock().unwrap().push(request.text.to_string());
        if self.fail {
            return Err(TranslationError::Api {
                code: "54001".to_string(),
                message: "Invalid Sign".to_string(),
            });
        }
        Ok(self
            .dictionary
            .get(request.text)
            .cloned()
            .unwrap_or_else(|| format!("{}:{}", request.to, request.text)))
    }

    fn provider_name(&self) -> &str {
        "fake"
    }
}

pub fn orchestrator(backend: FakeBackend, cache_path: &Path) -> Orchestrator<FakeBackend> {
    let cache = TranslationCache::open(cache_path).unwrap();
    orchestrator_with(backend, cache, TextClassifier::default())
}

pub fn orchestrator_with(
    backend: FakeBackend,
    cache: TranslationCache,
    classifier: TextClassifier,
) -> Orchestrator<FakeBackend> {
    let client = TranslationClient::new(backend, RetryConfig::disabled(), RateLimiter::unlimited());
    Orchestrator::new(client, cache, classifier, LanguageCode::Jp, LanguageCode::En)
}

/// In-memory cache storage whose writes start failing once `broken` is set.
#[derive(Debug)]
pub struct BrittleStorage {
    inner: InMemoryBackend,
    broken: Arc<AtomicBool>,
}

impl BrittleStorage {
    pub fn new() -> (Self, Arc<AtomicBool>) {
        let broken = Arc::new(AtomicBool::new(false));
        let storage = Self {
            inner: InMemoryBackend::new(),
            broken: Arc::clone(&broken),
        };
        (storage, broken)
    }

    fn check(&self) -> io::Result<()> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::Other, "disk unavailable"));
        }
        Ok(())
    }
}

impl StorageBackend for BrittleStorage {
    fn len(&self) -> io::Result<u64> {
        self.inner.len()
    }

    fn read(&self, offset: u64, len: usize) -> io::Result<Vec<u8>> {
        self.inner.read(offset, len)
    }

    fn set_len(&self, len: u64) -> io::Result<()> {
        self.check()?;
        self.inner.set_len(len)
    }

    fn sync_data(&self, eventual: bool) -> io::Result<()> {
        self.check()?;
        self.inner.sync_data(eventual)
    }

    fn write(&self, offset: u64, data: &[u8]) -> io::Result<()> {
        self.check()?;
        self.inner.write(offset, data)
    }
}

pub fn write_zip(path: &Path, members: &[(&str, &str)]) {
    let mut writer = ZipWriter::new(File::create(path).unwrap());
    for (name, content) in members {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap();
}

/// Every member of an archive as (name, content), in archive order.
pub fn read_zip(path: &Path) -> Vec<(String, String)> {
    let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
    (0..archive.len())
        .map(|i| {
            let mut file = archive.by_index(i).unwrap();
            let mut content = String::new();
            file.read_to_string(&mut content).unwrap();
            (file.name().to_string(), content)
        })
        .collect()
}

pub fn member(path: &Path, name: &str) -> String {
    read_zip(path)
        .into_iter()
        .find(|(member, _)| member == name)
        .map(|(_, content)| content)
        .unwrap_or_else(|| panic!("{} has no member {}", path.display(), name))
}

pub const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/></Types>"#;

pub const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="売上" sheetId="1" r:id="rId1"/><sheet name="2024" sheetId="2" r:id="rId2"/></sheets></workbook>"#;

pub const SHARED_STRINGS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="3" uniqueCount="3"><si><t>こんにちは</t></si><si><t>100</t></si><si><r><t>東京</t></r><rPh sb="0" eb="2"><t>トウキョウ</t></rPh></si></sst>"#;

pub const SHEET1: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData><row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1"><v>42</v></c><c r="C1"><f>SUM(A1:A2)</f><v>42</v></c><c r="D1" t="inlineStr"><is><t>さようなら</t></is></c></row><row r="2"><c r="A2" t="s"><v>1</v></c><c r="B2" t="s"><v>2</v></c></row></sheetData></worksheet>"#;

pub const SHEET2: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData><row r="1"><c r="A1"><v>3.14</v></c></row></sheetData></worksheet>"#;

pub fn write_xlsx(path: &Path) {
    write_zip(
        path,
        &[
            ("[Content_Types].xml", CONTENT_TYPES),
            ("xl/workbook.xml", WORKBOOK),
            ("xl/sharedStrings.xml", SHARED_STRINGS),
            ("xl/worksheets/sheet1.xml", SHEET1),
            ("xl/worksheets/sheet2.xml", SHEET2),
        ],
    );
}

/// A workbook whose only text is one shared string split over two runs.
pub fn write_rich_text_xlsx(path: &Path) {
    write_zip(
        path,
        &[
            ("[Content_Types].xml", CONTENT_TYPES),
            (
                "xl/workbook.xml",
                r#"<workbook><sheets><sheet name="1" sheetId="1"/></sheets></workbook>"#,
            ),
            ("xl/sharedStrings.xml", RICH_TEXT_STRINGS),
        ],
    );
}

pub const RICH_TEXT_STRINGS: &str = r#"<sst count="1" uniqueCount="1"><si><r><t>売上</t></r><r><rPr><b/></rPr><t>合計</t></r><rPh sb="0" eb="2"><t>ウリアゲ</t></rPh></si></sst>"#;

pub const DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body><w:p><w:r><w:t>見積書</w:t></w:r></w:p><w:p><w:r><w:t xml:space="preserve">A &amp; B</w:t></w:r><w:r><w:t>123</w:t></w:r></w:p></w:body></w:document>"#;

pub const HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:hdr xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:p><w:r><w:t>社外秘</w:t></w:r></w:p></w:hdr>"#;

pub fn write_docx(path: &Path) {
    write_zip(
        path,
        &[
            ("[Content_Types].xml", CONTENT_TYPES),
            ("word/document.xml", DOCUMENT),
            ("word/header1.xml", HEADER),
        ],
    );
}
