//! 文本分类模块
//!
//! 判断一段文本是否需要发送翻译：空白、数字和公式一律跳过，
//! 可选的语言检测门控只放行与源语言一致的文本。

use crate::types::LanguageCode;
use std::fmt;

/// Why a value was, or was not, sent for translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Translate,
    Blank,
    Numeric,
    Formula,
    LanguageMismatch,
}

impl Classification {
    pub fn should_translate(self) -> bool {
        self == Classification::Translate
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Classification::Translate => "translate",
            Classification::Blank => "blank",
            Classification::Numeric => "numeric",
            Classification::Formula => "formula",
            Classification::LanguageMismatch => "language mismatch",
        };
        f.write_str(reason)
    }
}

/// Decides whether a text is written in the declared source language.
pub trait LanguageMatcher: Send + Sync {
    fn matches(&self, text: &str, source: LanguageCode) -> bool;
}

/// Lets every text through. The default gate.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl LanguageMatcher for AcceptAll {
    fn matches(&self, _text: &str, _source: LanguageCode) -> bool {
        true
    }
}

/// Gate backed by statistical language detection.
///
/// Texts whose language cannot be detected, or is detected as a language
/// outside the supported set, never match. An `auto` source matches anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetectedLanguageMatcher;

impl LanguageMatcher for DetectedLanguageMatcher {
    fn matches(&self, text: &str, source: LanguageCode) -> bool {
        if source == LanguageCode::Auto {
            return true;
        }
        let Some(info) = whatlang::detect(text) else {
            return false;
        };
        match detected_language(info.lang().code()) {
            // Chinese detection does not tell the written varieties apart
            Some(LanguageCode::Zh) => matches!(
                source,
                LanguageCode::Zh | LanguageCode::Cht | LanguageCode::Yue | LanguageCode::Wyw
            ),
            Some(detected) => detected == source,
            None => false,
        }
    }
}

/// Map an ISO 639-3 code reported by the detector to an API language code.
pub fn detected_language(iso639_3: &str) -> Option<LanguageCode> {
    let code = match iso639_3 {
        "ara" => LanguageCode::Ara,
        "bul" => LanguageCode::Bul,
        "ces" => LanguageCode::Cs,
        "cmn" => LanguageCode::Zh,
        "dan" => LanguageCode::Dan,
        "deu" => LanguageCode::De,
        "ell" => LanguageCode::El,
        "eng" => LanguageCode::En,
        "est" => LanguageCode::Est,
        "fin" => LanguageCode::Fin,
        "fra" => LanguageCode::Fra,
        "hun" => LanguageCode::Hu,
        "ita" => LanguageCode::It,
        "jpn" => LanguageCode::Jp,
        "kor" => LanguageCode::Kor,
        "nld" => LanguageCode::Nl,
        "pol" => LanguageCode::Pl,
        "por" => LanguageCode::Pt,
        "ron" => LanguageCode::Rom,
        "rus" => LanguageCode::Ru,
        "slv" => LanguageCode::Slo,
        "spa" => LanguageCode::Spa,
        "swe" => LanguageCode::Swe,
        "tha" => LanguageCode::Th,
        "vie" => LanguageCode::Vie,
        _ => return None,
    };
    Some(code)
}

/// 文本分类器
///
/// Rules run in order and stop at the first one that rejects the value.
pub struct TextClassifier {
    matcher: Box<dyn LanguageMatcher>,
}

impl Default for TextClassifier {
    fn default() -> Self {
        Self::new(Box::new(AcceptAll))
    }
}

impl TextClassifier {
    pub fn new(matcher: Box<dyn LanguageMatcher>) -> Self {
        Self { matcher }
    }

    /// `language_gate` is only honoured by adapters that opt into it.
    pub fn classify(&self, value: &str, source: LanguageCode, language_gate: bool) -> Classification {
        if is_blank(value) {
            Classification::Blank
        } else if is_number(value) {
            Classification::Numeric
        } else if is_formula(value) {
            Classification::Formula
        } else if language_gate && !self.matcher.matches(value, source) {
            Classification::LanguageMismatch
        } else {
            Classification::Translate
        }
    }

    pub fn should_translate(&self, value: &str, source: LanguageCode) -> bool {
        self.classify(value, source, true).should_translate()
    }
}

pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Any text containing `=` is treated as a formula, prose included.
pub fn is_formula(value: &str) -> bool {
    value.contains('=')
}

/// Numeric literal check.
///
/// Accepts what a float parser accepts after trimming (sign, exponent, `inf`,
/// `nan`), digit-group underscores, decimal digits of any script, and any single
/// character that carries a numeric value on its own such as `½`, `Ⅻ` or `五`.
pub fn is_number(value: &str) -> bool {
    let mut chars = value.chars();
    if let (Some(ch), None) = (chars.next(), chars.next()) {
        if ch.is_numeric() || is_cjk_numeral(ch) {
            return true;
        }
    }

    let normalized: String = value.trim().chars().map(fold_to_ascii).collect();
    let Some(normalized) = strip_digit_separators(&normalized) else {
        return false;
    };
    normalized.parse::<f64>().is_ok()
}

/// First code point of each block of ten Unicode decimal digits (`Nd`).
const DECIMAL_ZEROS: [u32; 64] = [
    0x0660, 0x06F0, 0x07C0, 0x0966, 0x09E6, 0x0A66, 0x0AE6, 0x0B66, 0x0BE6, 0x0C66, 0x0CE6,
    0x0D66, 0x0DE6, 0x0E50, 0x0ED0, 0x0F20, 0x1040, 0x1090, 0x17E0, 0x1810, 0x1946, 0x19D0,
    0x1A80, 0x1A90, 0x1B50, 0x1BB0, 0x1C40, 0x1C50, 0xA620, 0xA8D0, 0xA900, 0xA9D0, 0xA9F0,
    0xAA50, 0xABF0, 0xFF10, 0x104A0, 0x10D30, 0x11066, 0x110F0, 0x11136, 0x111D0, 0x112F0,
    0x11450, 0x114D0, 0x11650, 0x116C0, 0x11730, 0x118E0, 0x11950, 0x11C50, 0x11D50, 0x11DA0,
    0x16A60, 0x16B50, 0x1D7CE, 0x1D7D8, 0x1D7E2, 0x1D7EC, 0x1D7F6, 0x1E140, 0x1E2F0, 0x1E950,
    0x1FBF0,
];

/// Value of a decimal digit from any script.
fn decimal_digit(ch: char) -> Option<u32> {
    if let Some(digit) = ch.to_digit(10) {
        return Some(digit);
    }
    let code = ch as u32;
    DECIMAL_ZEROS
        .iter()
        .find(|&&zero| (zero..zero + 10).contains(&code))
        .map(|zero| code - zero)
}

fn fold_to_ascii(ch: char) -> char {
    if let Some(digit) = decimal_digit(ch) {
        return char::from(b'0' + digit as u8);
    }
    match ch {
        '．' => '.',
        '－' => '-',
        '＋' => '+',
        _ => ch,
    }
}

/// Remove `_` that sits between two digits; any other `_` makes the value
/// non-numeric.
fn strip_digit_separators(value: &str) -> Option<String> {
    if !value.contains('_') {
        return Some(value.to_string());
    }
    let chars: Vec<char> = value.chars().collect();
    let mut out = String::with_capacity(value.len());
    for (i, &ch) in chars.iter().enumerate() {
        if ch == '_' {
            let before = i > 0 && chars[i - 1].is_ascii_digit();
            let after = chars.get(i + 1).is_some_and(|c| c.is_ascii_digit());
            if !(before && after) {
                return None;
            }
        } else {
            out.push(ch);
        }
    }
    Some(out)
}

fn is_cjk_numeral(ch: char) -> bool {
    matches!(
        ch,
        '〇' | '零'
            | '一'
            | '二'
            | '三'
            | '四'
            | '五'
            | '六'
            | '七'
            | '八'
            | '九'
            | '十'
            | '百'
            | '千'
            | '万'
            | '萬'
            | '億'
            | '兆'
            | '壱'
            | '弐'
            | '参'
            | '壹'
            | '贰'
            | '貳'
            | '叁'
            | '參'
            | '肆'
            | '伍'
            | '陆'
            | '陸'
            | '柒'
            | '捌'
            | '玖'
            | '拾'
            | '佰'
            | '仟'
    )
}
