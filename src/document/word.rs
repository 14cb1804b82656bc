//! Word 文档适配器
//!
//! 只翻译主文档 `word/document.xml` 中的 `<t>` 文本节点，页眉、页脚、
//! 样式和嵌入媒体都不处理。

use super::{DocumentAdapter, DocumentKind, ExpandedPackage, TextPart, TextUnit, TextUnits, UnitLocation, XmlPart};
use crate::error::DocumentError;
use std::path::Path;
use tracing::debug;

pub const DOCUMENT_PART: &str = "word/document.xml";

/// A word-processor package expanded on disk with its body parsed.
#[derive(Debug)]
pub struct WordDocument {
    package: ExpandedPackage,
    body: TextPart,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WordAdapter;

impl DocumentAdapter for WordAdapter {
    type Document = WordDocument;

    fn kind(&self) -> DocumentKind {
        DocumentKind::WordProcessor
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["doc", "docx"]
    }

    fn open(&self, path: &Path) -> Result<WordDocument, DocumentError> {
        let package = ExpandedPackage::open(path)?;
        let bytes = package.read(DOCUMENT_PART)?;
        let xml = XmlPart::parse(DOCUMENT_PART, &bytes, |stack| {
            stack.last().is_some_and(|name| name.as_slice() == b"t")
        })?;
        let body = TextPart::new(DOCUMENT_PART, xml);
        debug!(texts = body.slot_count(), "parsed document body");

        Ok(WordDocument { package, body })
    }

    fn enumerate_text_units(&self, document: &WordDocument) -> TextUnits {
        document.body.units(0).collect::<Vec<_>>().into_iter()
    }

    fn apply_translated_value(
        &self,
        document: &mut WordDocument,
        unit: &TextUnit,
        value: &str,
    ) -> Result<(), DocumentError> {
        match unit.location() {
            UnitLocation::Text { part: 0, slot } => document.body.set(slot, value),
            other => Err(DocumentError::Xml {
                part: DOCUMENT_PART.to_string(),
                message: format!("{} does not belong to a word document", other),
            }),
        }
    }

    fn save(&self, document: WordDocument, output: &Path) -> Result<(), DocumentError> {
        let WordDocument { mut package, body } = document;
        body.flush(&mut package)?;
        package.save(output)
    }
}
