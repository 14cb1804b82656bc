//! 配置管理模块
//!
//! 提供TOML配置文件的读取、写入和自动发现功能，命令行参数覆盖，
//! 以及运行前的配置校验和API凭据加载。

use crate::error::ConfigError;
use crate::types::{LanguageCode, TranslationConfig};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Files probed, in order, when no explicit config path is given.
pub const DEFAULT_CONFIG_PATHS: [&str; 3] = [
    "office-translator.toml",
    "translation-config.toml",
    ".office-translator.toml",
];

const ENV_FILES: [&str; 2] = [".env.local", ".env"];

pub const APP_ID_ENV: &str = "BAIDU_APP_ID";
pub const APP_KEY_ENV: &str = "BAIDU_APP_KEY";

/// 应用配置结构
///
/// 包含翻译、路径和过滤相关的配置选项，支持从TOML文件加载和保存。
///
/// # 示例
///
/// ```rust,no_run
/// use office_translator::AppConfig;
///
/// // 从默认位置加载配置
/// let config = AppConfig::load_from_default_locations().unwrap();
///
/// // 保存配置到文件
/// config.save_to_file("output.toml").unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// 翻译配置
    #[serde(default)]
    pub translation: TranslationConfig,
    /// 输入输出路径
    #[serde(default)]
    pub paths: PathsConfig,
    /// 文本过滤
    #[serde(default)]
    pub filter: FilterConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub cache_path: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("./test/"),
            output_dir: PathBuf::from("./out/"),
            cache_path: PathBuf::from("local_db.redb"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Only translate spreadsheet text whose detected language matches the
    /// source language.
    pub language_gate: bool,
}

/// Values given on the command line; each one wins over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub input_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub source_lang: Option<String>,
    pub target_lang: Option<String>,
    pub cache_path: Option<PathBuf>,
    pub language_gate: bool,
}

/// Validated settings for one run.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub cache_path: PathBuf,
    pub source_lang: LanguageCode,
    pub target_lang: LanguageCode,
    pub language_gate: bool,
}

impl AppConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load configuration from multiple possible locations
    ///
    /// A file that exists but does not parse is an error rather than a
    /// silent fallback to defaults.
    pub fn load_from_default_locations() -> Result<Self, ConfigError> {
        for path in DEFAULT_CONFIG_PATHS {
            if Path::new(path).exists() {
                let config = Self::from_file(path)?;
                info!(path, "loaded configuration");
                return Ok(config);
            }
        }

        info!("no configuration file found, using defaults");
        Ok(Self::default())
    }

    /// Load from `path` when given, otherwise from the default locations.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Self::load_from_default_locations(),
        }
    }

    /// Generate example configuration file
    pub fn generate_example_config<P: AsRef<Path>>(path: P) -> Result<(), ConfigError> {
        Self::default().save_to_file(path)
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(dir) = overrides.input_dir {
            self.paths.input_dir = dir;
        }
        if let Some(dir) = overrides.output_dir {
            self.paths.output_dir = dir;
        }
        if let Some(lang) = overrides.source_lang {
            self.translation.source_lang = lang;
        }
        if let Some(lang) = overrides.target_lang {
            self.translation.target_lang = lang;
        }
        if let Some(path) = overrides.cache_path {
            self.paths.cache_path = path;
        }
        if overrides.language_gate {
            self.filter.language_gate = true;
        }
    }

    /// Check everything a run depends on before any document is touched.
    ///
    /// Creates the output directory when it is missing.
    pub fn validate(&self) -> Result<RunSettings, ConfigError> {
        let source_lang: LanguageCode = self.translation.source_lang.parse()?;
        let target_lang: LanguageCode = self.translation.target_lang.parse()?;
        if target_lang == LanguageCode::Auto {
            return Err(ConfigError::InvalidTarget);
        }

        let input_dir = self.paths.input_dir.clone();
        if !input_dir.is_dir() {
            return Err(ConfigError::MissingInputDir(input_dir));
        }

        let output_dir = self.paths.output_dir.clone();
        fs::create_dir_all(&output_dir).map_err(|source| ConfigError::Io {
            path: output_dir.clone(),
            source,
        })?;

        let canonical = |path: &Path| {
            path.canonicalize().map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        };
        if canonical(&input_dir)? == canonical(&output_dir)? {
            return Err(ConfigError::SameDirectories(output_dir));
        }

        Ok(RunSettings {
            input_dir,
            output_dir,
            cache_path: self.paths.cache_path.clone(),
            source_lang,
            target_lang,
            language_gate: self.filter.language_gate,
        })
    }
}

/// 百度翻译 API 凭据
#[derive(Clone)]
pub struct Credentials {
    pub app_id: String,
    app_key: String,
}

impl Credentials {
    pub fn new(app_id: impl Into<String>, app_key: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            app_key: app_key.into(),
        }
    }

    /// Read `BAIDU_APP_ID` and `BAIDU_APP_KEY`, after loading a `.env` file
    /// if one is present.
    pub fn from_env() -> Result<Self, ConfigError> {
        load_dotenv();
        let read = |name: &'static str| match std::env::var(name) {
            Ok(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(ConfigError::MissingCredential(name)),
        };
        Ok(Self::new(read(APP_ID_ENV)?, read(APP_KEY_ENV)?))
    }

    pub(crate) fn app_key(&self) -> &str {
        &self.app_key
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("app_id", &self.app_id)
            .field("app_key", &"<redacted>")
            .finish()
    }
}

fn load_dotenv() {
    for env_file in ENV_FILES {
        if Path::new(env_file).exists() {
            match dotenv::from_filename(env_file) {
                Ok(_) => {
                    info!(file = env_file, "loaded environment file");
                    break;
                }
                Err(e) => warn!(file = env_file, error = %e, "failed to load environment file"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [translation]
            target_lang = "zh"

            [paths]
            input_dir = "./in/"
            "#,
        )
        .unwrap();
        assert_eq!(config.translation.source_lang, "jp");
        assert_eq!(config.translation.target_lang, "zh");
        assert_eq!(config.paths.input_dir, PathBuf::from("./in/"));
        assert_eq!(config.paths.output_dir, PathBuf::from("./out/"));
        assert!(!config.filter.language_gate);
        assert_eq!(config.translation.retry.max_retries, 2);
    }

    #[test]
    fn test_overrides_win_over_file_values() {
        let mut config = AppConfig::default();
        config.apply_overrides(ConfigOverrides {
            source_lang: Some("zh".to_string()),
            output_dir: Some(PathBuf::from("/tmp/elsewhere")),
            language_gate: true,
            ..ConfigOverrides::default()
        });
        assert_eq!(config.translation.source_lang, "zh");
        assert_eq!(config.translation.target_lang, "en");
        assert_eq!(config.paths.output_dir, PathBuf::from("/tmp/elsewhere"));
        assert!(config.filter.language_gate);
    }

    #[test]
    fn test_validate_creates_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        fs::create_dir(&input).unwrap();
        let output = dir.path().join("nested").join("out");

        let mut config = AppConfig::default();
        config.paths.input_dir = input.clone();
        config.paths.output_dir = output.clone();
        let settings = config.validate().unwrap();

        assert!(output.is_dir());
        assert_eq!(settings.source_lang, LanguageCode::Jp);
        assert_eq!(settings.target_lang, LanguageCode::En);
        assert_eq!(settings.input_dir, input);
    }

    #[test]
    fn test_validate_rejects_unsupported_language() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.paths.input_dir = dir.path().to_path_buf();
        config.paths.output_dir = dir.path().join("out");
        config.translation.target_lang = "english".to_string();

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedLanguage { ref code, .. } if code == "english"));
        // nothing is created when validation fails early
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_validate_rejects_auto_target() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.paths.input_dir = dir.path().to_path_buf();
        config.translation.target_lang = "auto".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidTarget)));
    }

    #[test]
    fn test_validate_rejects_missing_input_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.paths.input_dir = dir.path().join("missing");
        config.paths.output_dir = dir.path().join("out");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingInputDir(_))
        ));
    }

    #[test]
    fn test_validate_rejects_output_equal_to_input() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.paths.input_dir = dir.path().to_path_buf();
        config.paths.output_dir = dir.path().join(".");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::SameDirectories(_))
        ));
    }

    #[test]
    fn test_example_config_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("office-translator.toml");
        AppConfig::generate_example_config(&path).unwrap();
        let loaded = AppConfig::from_file(&path).unwrap();
        assert_eq!(loaded.translation.api_url, TranslationConfig::default().api_url);
        assert_eq!(loaded.paths.cache_path, PathBuf::from("local_db.redb"));
    }

    #[test]
    fn test_broken_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[translation\nsource_lang = ").unwrap();
        assert!(matches!(
            AppConfig::from_file(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_credentials_debug_hides_key() {
        let credentials = Credentials::new("2015063000000001", "12345678");
        let debug = format!("{:?}", credentials);
        assert!(debug.contains("2015063000000001"));
        assert!(!debug.contains("12345678"));
    }
}
