//! Excel 工作簿适配器
//!
//! 直接编辑 OOXML 包：工作表名称位于 `xl/workbook.xml`，字符串单元格位于
//! 共享字符串表 `xl/sharedStrings.xml` 和工作表中的内联字符串。数字、公式
//! 及其缓存结果不属于文本单元，因此保持原样。

use super::{
    DocumentAdapter, DocumentKind, ExpandedPackage, TextPart, TextUnit, TextUnits, UnitLocation,
    XmlPart,
};
use crate::error::DocumentError;
use std::path::Path;
use tracing::{debug, info};

pub const WORKBOOK_PART: &str = "xl/workbook.xml";
pub const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";
const WORKSHEETS_DIR: &str = "xl/worksheets/";

/// Excel rejects longer sheet names.
pub const MAX_SHEET_NAME_CHARS: usize = 31;
const FORBIDDEN_SHEET_CHARS: [char; 7] = ['/', ':', '\\', '?', '*', '[', ']'];

#[derive(Debug, Clone)]
struct Sheet {
    node: usize,
    name: String,
}

/// A workbook package expanded on disk.
#[derive(Debug)]
pub struct Workbook {
    package: ExpandedPackage,
    workbook: XmlPart,
    sheets: Vec<Sheet>,
    parts: Vec<TextPart>,
}

impl Workbook {
    fn rename_sheet(&mut self, index: usize, value: &str) -> Result<(), DocumentError> {
        let sheet = self.sheets.get(index).ok_or_else(|| DocumentError::Xml {
            part: WORKBOOK_PART.to_string(),
            message: format!("no sheet #{}", index + 1),
        })?;
        let current = sheet.name.clone();
        let node = sheet.node;

        let sanitized = sanitize_sheet_name(value, &current);
        if sanitized == current {
            return Ok(());
        }
        let name = self.unique_sheet_name(index, &sanitized);
        self.workbook.set_attribute(node, "name", &name)?;
        info!(from = %current, to = %name, "renamed sheet");
        self.sheets[index].name = name;
        Ok(())
    }

    /// Append a counter when another sheet already uses `candidate`,
    /// ignoring case like Excel does.
    fn unique_sheet_name(&self, index: usize, candidate: &str) -> String {
        let taken = |name: &str| {
            let lowered = name.to_lowercase();
            self.sheets
                .iter()
                .enumerate()
                .any(|(i, sheet)| i != index && sheet.name.to_lowercase() == lowered)
        };
        if !taken(candidate) {
            return candidate.to_string();
        }

        let mut counter = 1usize;
        loop {
            let suffix = counter.to_string();
            let base: String = candidate
                .chars()
                .take(MAX_SHEET_NAME_CHARS - suffix.len())
                .collect();
            let name = format!("{}{}", base, suffix);
            if !taken(&name) {
                return name;
            }
            counter += 1;
        }
    }
}

/// Make a translated sheet name acceptable to spreadsheet applications.
///
/// Forbidden characters become `_`, control characters become spaces and the
/// result is cut to 31 characters. A name that ends up blank is replaced by
/// `fallback`.
pub fn sanitize_sheet_name(name: &str, fallback: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|ch| {
            if FORBIDDEN_SHEET_CHARS.contains(&ch) {
                '_'
            } else if ch.is_control() {
                ' '
            } else {
                ch
            }
        })
        .collect();
    let trimmed = replaced.trim().trim_matches('\'').trim();
    let truncated: String = trimmed.chars().take(MAX_SHEET_NAME_CHARS).collect();
    let truncated = truncated.trim_end();

    if truncated.is_empty() {
        fallback.to_string()
    } else {
        truncated.to_string()
    }
}

fn is_worksheet(entry: &str) -> bool {
    entry
        .strip_prefix(WORKSHEETS_DIR)
        .is_some_and(|rest| !rest.contains('/') && rest.ends_with(".xml"))
}

fn contains_bytes(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

fn in_element(stack: &[Vec<u8>], name: &[u8]) -> bool {
    stack.iter().any(|open| open.as_slice() == name)
}

fn is_t(stack: &[Vec<u8>]) -> bool {
    stack.last().is_some_and(|name| name.as_slice() == b"t")
}

/// `<t>` runs of a shared string item, without phonetic guides. The runs of
/// one `<si>` form a single unit.
fn shared_string_text(stack: &[Vec<u8>]) -> bool {
    is_t(stack) && !in_element(stack, b"rPh")
}

/// `<t>` runs of an inline string cell.
fn inline_string_text(stack: &[Vec<u8>]) -> bool {
    is_t(stack) && in_element(stack, b"is") && !in_element(stack, b"rPh")
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SpreadsheetAdapter {
    language_gate: bool,
}

impl SpreadsheetAdapter {
    pub fn new(language_gate: bool) -> Self {
        Self { language_gate }
    }
}

impl DocumentAdapter for SpreadsheetAdapter {
    type Document = Workbook;

    fn kind(&self) -> DocumentKind {
        DocumentKind::Spreadsheet
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["xls", "xlsx"]
    }

    fn language_gate(&self) -> bool {
        self.language_gate
    }

    fn open(&self, path: &Path) -> Result<Workbook, DocumentError> {
        let package = ExpandedPackage::open(path)?;

        let workbook = XmlPart::parse(WORKBOOK_PART, &package.read(WORKBOOK_PART)?, |_| false)?;
        let mut sheets = Vec::new();
        for node in workbook.elements(b"sheet") {
            let name = workbook
                .attribute(node, b"name")?
                .ok_or_else(|| DocumentError::Xml {
                    part: WORKBOOK_PART.to_string(),
                    message: "sheet without a name".to_string(),
                })?;
            sheets.push(Sheet { node, name });
        }

        let mut parts = Vec::new();
        if package.contains(SHARED_STRINGS_PART) {
            let bytes = package.read(SHARED_STRINGS_PART)?;
            let xml = XmlPart::parse(SHARED_STRINGS_PART, &bytes, shared_string_text)?;
            parts.push(TextPart::grouped(SHARED_STRINGS_PART, xml, b"si"));
        }

        let worksheets: Vec<String> = package
            .entry_names()
            .filter(|entry| is_worksheet(entry))
            .map(str::to_string)
            .collect();
        for entry in worksheets {
            let bytes = package.read(&entry)?;
            if !contains_bytes(&bytes, b"inlineStr") {
                continue;
            }
            let xml = XmlPart::parse(&entry, &bytes, inline_string_text)?;
            parts.push(TextPart::grouped(entry, xml, b"is"));
        }

        debug!(
            sheets = sheets.len(),
            parts = parts.len(),
            "parsed workbook"
        );
        Ok(Workbook {
            package,
            workbook,
            sheets,
            parts,
        })
    }

    /// Sheet names first, then shared strings, then inline strings.
    fn enumerate_text_units(&self, document: &Workbook) -> TextUnits {
        let names = document
            .sheets
            .iter()
            .enumerate()
            .map(|(sheet, entry)| TextUnit::new(UnitLocation::SheetName { sheet }, entry.name.as_str()));
        let texts = document
            .parts
            .iter()
            .enumerate()
            .flat_map(|(index, part)| part.units(index));
        names.chain(texts).collect::<Vec<_>>().into_iter()
    }

    fn apply_translated_value(
        &self,
        document: &mut Workbook,
        unit: &TextUnit,
        value: &str,
    ) -> Result<(), DocumentError> {
        match unit.location() {
            UnitLocation::SheetName { sheet } => document.rename_sheet(sheet, value),
            UnitLocation::Text { part, slot } => {
                let target = document
                    .parts
                    .get_mut(part)
                    .ok_or_else(|| DocumentError::Xml {
                        part: WORKBOOK_PART.to_string(),
                        message: format!("no text part #{}", part),
                    })?;
                target.set(slot, value)
            }
        }
    }

    fn save(&self, document: Workbook, output: &Path) -> Result<(), DocumentError> {
        let Workbook {
            mut package,
            workbook,
            parts,
            ..
        } = document;

        if workbook.is_dirty() {
            package.write(WORKBOOK_PART, &workbook.to_bytes()?)?;
        }
        for part in &parts {
            part.flush(&mut package)?;
        }
        package.save(output)
    }
}
