//! 文档适配器模块
//!
//! 每种文档格式一个适配器：枚举可翻译的文本位置，把译文写回原位置，
//! 最后序列化整个文档。公式、数字、XML属性和其他包成员保持不变。

pub mod package;
pub mod spreadsheet;
pub mod word;
pub mod xml;

pub use package::ExpandedPackage;
pub use spreadsheet::{sanitize_sheet_name, SpreadsheetAdapter, Workbook};
pub use word::{WordAdapter, WordDocument};
pub use xml::XmlPart;

use crate::error::DocumentError;
use crate::types::LanguageCode;
use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Spreadsheet,
    WordProcessor,
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKind::Spreadsheet => f.write_str("spreadsheet"),
            DocumentKind::WordProcessor => f.write_str("word-processor"),
        }
    }
}

/// Where a text unit lives inside its document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitLocation {
    /// Name of the n-th sheet of a workbook.
    SheetName { sheet: usize },
    /// A text unit of one of the document's XML parts.
    Text { part: usize, slot: usize },
}

impl fmt::Display for UnitLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitLocation::SheetName { sheet } => write!(f, "sheet #{} name", sheet + 1),
            UnitLocation::Text { part, slot } => write!(f, "part #{} text #{}", part, slot),
        }
    }
}

/// A translatable string inside a document, valid for one processing pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextUnit {
    location: UnitLocation,
    value: String,
}

impl TextUnit {
    pub fn new(location: UnitLocation, value: impl Into<String>) -> Self {
        Self {
            location,
            value: value.into(),
        }
    }

    pub fn location(&self) -> UnitLocation {
        self.location
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

/// Units of one document in visiting order; consumed once.
pub type TextUnits = std::vec::IntoIter<TextUnit>;

/// An XML part of a package together with its member name.
///
/// Text slots are grouped into units; a unit covers all runs of one cell or
/// a single text node.
#[derive(Debug)]
pub(crate) struct TextPart {
    entry: String,
    xml: XmlPart,
    units: Vec<Vec<usize>>,
}

impl TextPart {
    /// One unit per text slot.
    pub(crate) fn new(entry: impl Into<String>, xml: XmlPart) -> Self {
        let units = (0..xml.slot_count()).map(|slot| vec![slot]).collect();
        Self {
            entry: entry.into(),
            xml,
            units,
        }
    }

    /// One unit per `group` element, joining the runs inside it.
    pub(crate) fn grouped(entry: impl Into<String>, xml: XmlPart, group: &[u8]) -> Self {
        let units = xml.slot_groups(group);
        Self {
            entry: entry.into(),
            xml,
            units,
        }
    }

    pub(crate) fn slot_count(&self) -> usize {
        self.xml.slot_count()
    }

    fn text_of(&self, slots: &[usize]) -> String {
        slots.iter().filter_map(|&slot| self.xml.text(slot)).collect()
    }

    pub(crate) fn units(&self, part: usize) -> impl Iterator<Item = TextUnit> + '_ {
        self.units.iter().enumerate().map(move |(slot, slots)| {
            TextUnit::new(UnitLocation::Text { part, slot }, self.text_of(slots))
        })
    }

    /// Put `value` into the first run of a unit and empty the others, so the
    /// first run's formatting carries the whole text.
    pub(crate) fn set(&mut self, unit: usize, value: &str) -> Result<(), DocumentError> {
        let slots = self.units.get(unit).ok_or_else(|| DocumentError::Xml {
            part: self.entry.clone(),
            message: format!("no text unit {}", unit),
        })?;
        if self.text_of(slots) == value {
            return Ok(());
        }
        let slots = slots.clone();
        for (index, &slot) in slots.iter().enumerate() {
            self.xml.set_text(slot, if index == 0 { value } else { "" })?;
        }
        Ok(())
    }

    /// Write the part back into the package if any of its text changed.
    pub(crate) fn flush(&self, package: &mut ExpandedPackage) -> Result<(), DocumentError> {
        if self.xml.is_dirty() {
            package.write(&self.entry, &self.xml.to_bytes()?)?;
        }
        Ok(())
    }
}

/// Format-specific access to a document's text.
pub trait DocumentAdapter {
    type Document;

    fn kind(&self) -> DocumentKind;

    /// Lowercase file extensions this adapter accepts.
    fn extensions(&self) -> &'static [&'static str];

    fn recognizes(&self, path: &Path) -> bool {
        path.extension()
            .and_then(OsStr::to_str)
            .map(|ext| ext.to_ascii_lowercase())
            .is_some_and(|ext| self.extensions().contains(&ext.as_str()))
    }

    /// Whether the optional source-language gate applies to this format.
    fn language_gate(&self) -> bool {
        false
    }

    fn open(&self, path: &Path) -> Result<Self::Document, DocumentError>;

    fn enumerate_text_units(&self, document: &Self::Document) -> TextUnits;

    fn apply_translated_value(
        &self,
        document: &mut Self::Document,
        unit: &TextUnit,
        value: &str,
    ) -> Result<(), DocumentError>;

    fn save(&self, document: Self::Document, output: &Path) -> Result<(), DocumentError>;
}

/// `{target}_{original file name}` inside `output_dir`.
pub fn output_path(output_dir: &Path, target: LanguageCode, input: &Path) -> Result<PathBuf, DocumentError> {
    let file_name = input
        .file_name()
        .ok_or_else(|| DocumentError::UnsupportedFormat(input.to_path_buf()))?;
    Ok(output_dir.join(format!("{}_{}", target, file_name.to_string_lossy())))
}
