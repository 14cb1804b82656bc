//! 类型定义模块
//!
//! 定义翻译库中使用的语言代码、配置结构、API请求/响应以及翻译结果类型。

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 百度翻译支持的语言代码
///
/// `Auto` 表示自动检测，只能作为源语言使用。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageCode {
    /// 自动检测
    Auto,
    /// 中文
    Zh,
    /// 英语
    En,
    /// 粤语
    Yue,
    /// 文言文
    Wyw,
    /// 日语
    Jp,
    /// 韩语
    Kor,
    /// 法语
    Fra,
    /// 西班牙语
    Spa,
    /// 泰语
    Th,
    /// 阿拉伯语
    Ara,
    /// 俄语
    Ru,
    /// 葡萄牙语
    Pt,
    /// 德语
    De,
    /// 意大利语
    It,
    /// 希腊语
    El,
    /// 荷兰语
    Nl,
    /// 波兰语
    Pl,
    /// 保加利亚语
    Bul,
    /// 爱沙尼亚语
    Est,
    /// 丹麦语
    Dan,
    /// 芬兰语
    Fin,
    /// 捷克语
    Cs,
    /// 罗马尼亚语
    Rom,
    /// 斯洛文尼亚语
    Slo,
    /// 瑞典语
    Swe,
    /// 匈牙利语
    Hu,
    /// 繁体中文
    Cht,
    /// 越南语
    Vie,
}

impl LanguageCode {
    /// All supported codes, in the order the API documents them.
    pub const ALL: [LanguageCode; 29] = [
        LanguageCode::Auto,
        LanguageCode::Zh,
        LanguageCode::En,
        LanguageCode::Yue,
        LanguageCode::Wyw,
        LanguageCode::Jp,
        LanguageCode::Kor,
        LanguageCode::Fra,
        LanguageCode::Spa,
        LanguageCode::Th,
        LanguageCode::Ara,
        LanguageCode::Ru,
        LanguageCode::Pt,
        LanguageCode::De,
        LanguageCode::It,
        LanguageCode::El,
        LanguageCode::Nl,
        LanguageCode::Pl,
        LanguageCode::Bul,
        LanguageCode::Est,
        LanguageCode::Dan,
        LanguageCode::Fin,
        LanguageCode::Cs,
        LanguageCode::Rom,
        LanguageCode::Slo,
        LanguageCode::Swe,
        LanguageCode::Hu,
        LanguageCode::Cht,
        LanguageCode::Vie,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LanguageCode::Auto => "auto",
            LanguageCode::Zh => "zh",
            LanguageCode::En => "en",
            LanguageCode::Yue => "yue",
            LanguageCode::Wyw => "wyw",
            LanguageCode::Jp => "jp",
            LanguageCode::Kor => "kor",
            LanguageCode::Fra => "fra",
            LanguageCode::Spa => "spa",
            LanguageCode::Th => "th",
            LanguageCode::Ara => "ara",
            LanguageCode::Ru => "ru",
            LanguageCode::Pt => "pt",
            LanguageCode::De => "de",
            LanguageCode::It => "it",
            LanguageCode::El => "el",
            LanguageCode::Nl => "nl",
            LanguageCode::Pl => "pl",
            LanguageCode::Bul => "bul",
            LanguageCode::Est => "est",
            LanguageCode::Dan => "dan",
            LanguageCode::Fin => "fin",
            LanguageCode::Cs => "cs",
            LanguageCode::Rom => "rom",
            LanguageCode::Slo => "slo",
            LanguageCode::Swe => "swe",
            LanguageCode::Hu => "hu",
            LanguageCode::Cht => "cht",
            LanguageCode::Vie => "vie",
        }
    }

    /// Comma separated list of every supported code, used in error messages.
    pub fn supported_list() -> String {
        Self::ALL
            .iter()
            .map(|code| code.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LanguageCode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|candidate| candidate.as_str() == code)
            .ok_or_else(|| ConfigError::UnsupportedLanguage {
                code: code.to_string(),
                supported: Self::supported_list(),
            })
    }
}

/// 翻译配置
///
/// 包含翻译服务的所有配置选项，如API地址、语言设置、速率与重试参数等。
///
/// # 字段说明
///
/// * `source_lang` - 源语言代码，"auto"表示自动检测
/// * `target_lang` - 目标语言代码
/// * `api_url` - 百度翻译 API 地址
/// * `max_requests_per_second` - 每秒最大请求数
/// * `request_timeout_secs` - 单次HTTP请求超时时间
/// * `retry` - 失败重试策略
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    /// 源语言代码，"auto"表示自动检测
    pub source_lang: String,
    /// 目标语言代码
    pub target_lang: String,
    /// 百度翻译 API 地址
    pub api_url: String,
    /// 每秒最大请求数
    pub max_requests_per_second: f64,
    /// 单次HTTP请求超时时间（秒）
    pub request_timeout_secs: u64,
    /// 重试策略
    pub retry: RetryConfig,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            source_lang: "jp".to_string(),
            target_lang: "en".to_string(),
            api_url: "https://fanyi-api.baidu.com/api/trans/vip/translate".to_string(),
            max_requests_per_second: 1.0,
            request_timeout_secs: 30,
            retry: RetryConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: usize,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay_ms: 500,
            max_delay_ms: 4000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// No retries at all; every failure degrades immediately.
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }
}

/// One signed request to the translation API, serialized as query parameters.
#[derive(Debug, Clone, Serialize)]
pub struct BaiduRequest<'a> {
    pub q: &'a str,
    pub from: &'a str,
    pub to: &'a str,
    pub appid: &'a str,
    pub salt: String,
    pub sign: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct BaiduResponse {
    #[serde(default)]
    pub trans_result: Vec<BaiduTranslation>,
    /// Sent as a string by the API, but tolerated as a number too.
    #[serde(default)]
    pub error_code: Option<serde_json::Value>,
    #[serde(default)]
    pub error_msg: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BaiduTranslation {
    #[serde(default)]
    pub src: String,
    pub dst: String,
}

/// Result of translating one text through the client.
///
/// `succeeded` is false when at least one line fell back to its original
/// text, so callers can tell a real translation from a degraded one even when
/// `value` happens to equal the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationOutcome {
    pub value: String,
    pub succeeded: bool,
}

impl TranslationOutcome {
    pub fn translated(value: String) -> Self {
        Self {
            value,
            succeeded: true,
        }
    }

    pub fn fallback(original: &str) -> Self {
        Self {
            value: original.to_string(),
            succeeded: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_code_round_trip_through_str() {
        for code in LanguageCode::ALL {
            assert_eq!(code.as_str().parse::<LanguageCode>().unwrap(), code);
        }
    }

    #[test]
    fn test_unsupported_language_lists_supported_set() {
        let err = "xx".parse::<LanguageCode>().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("xx"));
        assert!(message.contains("jp"));
        assert!(message.contains("vie"));
    }

    #[test]
    fn test_language_code_serde_uses_api_codes() {
        #[derive(Deserialize)]
        struct Wrapper {
            lang: LanguageCode,
        }
        let parsed: Wrapper = toml::from_str("lang = \"kor\"").unwrap();
        assert_eq!(parsed.lang, LanguageCode::Kor);
    }

    #[test]
    fn test_baidu_response_with_error_payload() {
        let body = r#"{"error_code":"54001","error_msg":"Invalid Sign"}"#;
        let response: BaiduResponse = serde_json::from_str(body).unwrap();
        assert!(response.trans_result.is_empty());
        assert_eq!(response.error_msg.as_deref(), Some("Invalid Sign"));
    }

    #[test]
    fn test_default_translation_config_matches_cli_defaults() {
        let config = TranslationConfig::default();
        assert_eq!(config.source_lang, "jp");
        assert_eq!(config.target_lang, "en");
        assert!(config.max_requests_per_second > 0.0);
    }
}
