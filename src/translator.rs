//! 翻译服务核心模块
//!
//! 提供翻译客户端：按行拆分文本、请求签名、速率限制、带退避的重试，
//! 以及失败时降级为原文。

use crate::config::Credentials;
use crate::error::{Result, TranslationError};
use crate::types::{
    BaiduRequest, BaiduResponse, LanguageCode, RetryConfig, TranslationConfig, TranslationOutcome,
};
use async_trait::async_trait;
use rand::Rng;
use reqwest::Client;
use std::ops::RangeInclusive;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

const SALT_RANGE: RangeInclusive<u32> = 327_681_365..=655_368_412;

/// 速率限制器
///
/// 用于控制API请求频率，保证相邻两次请求之间至少间隔 `1 / requests_per_second` 秒。
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// 创建新的速率限制器
    ///
    /// # 参数
    ///
    /// * `requests_per_second` - 每秒允许的最大请求数，非正数表示不限制
    ///
    /// # 示例
    ///
    /// ```rust
    /// use office_translator::RateLimiter;
    ///
    /// let limiter = RateLimiter::new(1.0); // 每秒1个请求
    /// ```
    pub fn new(requests_per_second: f64) -> Self {
        let interval = if requests_per_second > 0.0 {
            Duration::from_secs_f64(1.0 / requests_per_second)
        } else {
            Duration::ZERO
        };
        Self {
            interval,
            last_request: Mutex::new(None),
        }
    }

    pub fn unlimited() -> Self {
        Self::new(0.0)
    }

    /// 获取请求许可
    ///
    /// 在发起API请求前调用此方法，必要时等待到下一个可用时间点。
    pub async fn acquire(&self) {
        if self.interval.is_zero() {
            return;
        }
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let ready_at = previous + self.interval;
            let now = Instant::now();
            if ready_at > now {
                sleep(ready_at - now).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// 带指数退避的重试机制
///
/// 为API调用提供重试，失败时按指数增长的延迟重试。不可重试的错误立即返回。
///
/// # 参数
///
/// * `operation` - 要执行的异步操作
/// * `config` - 重试配置
/// * `rate_limiter` - 速率限制器，每次尝试前都会获取许可
///
/// # 返回
///
/// * `Ok(T)` - 操作成功的结果
/// * `Err(TranslationError)` - 最后一次尝试的错误
pub async fn retry_with_backoff<F, Fut, T>(
    mut operation: F,
    config: &RetryConfig,
    rate_limiter: &RateLimiter,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut delay = config.initial_delay_ms;
    let mut attempt = 0;

    loop {
        rate_limiter.acquire().await;

        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if attempt >= config.max_retries || !e.is_retryable() => return Err(e),
            Err(e) => {
                attempt += 1;
                debug!(attempt, delay_ms = delay, error = %e, "request failed, retrying");
                sleep(Duration::from_millis(delay)).await;
                delay = std::cmp::min(
                    (delay as f64 * config.backoff_multiplier) as u64,
                    config.max_delay_ms,
                );
            }
        }
    }
}

/// A single-line request as handed to a backend.
///
/// `salt` is shared by every line of one `translate` call.
#[derive(Debug, Clone)]
pub struct LineRequest<'a> {
    pub text: &'a str,
    pub from: LanguageCode,
    pub to: LanguageCode,
    pub salt: &'a str,
}

/// Remote translation service that translates one line per request.
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    async fn translate_line(&self, request: &LineRequest<'_>) -> Result<String>;

    /// Used in log fields only.
    fn provider_name(&self) -> &str;
}

/// 百度翻译 API
#[derive(Debug, Clone)]
pub struct BaiduBackend {
    /// HTTP客户端，用于API调用
    client: Client,
    credentials: Credentials,
    api_url: String,
}

impl BaiduBackend {
    pub fn new(credentials: Credentials, config: &TranslationConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            credentials,
            api_url: config.api_url.clone(),
        })
    }

    /// `md5(appid + q + salt + key)` as lowercase hex.
    pub fn sign(credentials: &Credentials, text: &str, salt: &str) -> String {
        let payload = format!(
            "{}{}{}{}",
            credentials.app_id,
            text,
            salt,
            credentials.app_key()
        );
        format!("{:x}", md5::compute(payload.as_bytes()))
    }
}

#[async_trait]
impl TranslationBackend for BaiduBackend {
    async fn translate_line(&self, request: &LineRequest<'_>) -> Result<String> {
        let query = BaiduRequest {
            q: request.text,
            from: request.from.as_str(),
            to: request.to.as_str(),
            appid: &self.credentials.app_id,
            salt: request.salt.to_string(),
            sign: Self::sign(&self.credentials, request.text, request.salt),
        };

        let response = self
            .client
            .get(&self.api_url)
            .query(&query)
            .send()
            .await?
            .error_for_status()?;

        let body = response.text().await?;
        let parsed: BaiduResponse = serde_json::from_str(&body)
            .map_err(|e| TranslationError::Parse(format!("{}: {}", e, body)))?;
        extract_translation(parsed)
    }

    fn provider_name(&self) -> &str {
        "baidu"
    }
}

/// Pull the first translated string out of an API response.
pub fn extract_translation(response: BaiduResponse) -> Result<String> {
    if let Some(code) = response.error_code {
        let code = match code {
            serde_json::Value::String(code) => code,
            other => other.to_string(),
        };
        // "52000" is the documented success code and may be echoed back
        if code != "52000" {
            return Err(TranslationError::Api {
                code,
                message: response.error_msg.unwrap_or_default(),
            });
        }
    }

    response
        .trans_result
        .into_iter()
        .next()
        .map(|item| item.dst)
        .ok_or(TranslationError::EmptyResult)
}

fn generate_salt() -> String {
    rand::rng().random_range(SALT_RANGE).to_string()
}

/// 翻译客户端
///
/// Splits input on `\n`, sends one request per non-blank line and joins the
/// results with the same separators. A line whose request ultimately fails
/// is kept as-is and the outcome is marked as not succeeded; this method
/// never returns an error.
pub struct TranslationClient<B> {
    backend: B,
    rate_limiter: RateLimiter,
    retry: RetryConfig,
}

impl<B: TranslationBackend> TranslationClient<B> {
    pub fn new(backend: B, retry: RetryConfig, rate_limiter: RateLimiter) -> Self {
        Self {
            backend,
            rate_limiter,
            retry,
        }
    }

    pub fn from_config(backend: B, config: &TranslationConfig) -> Self {
        Self::new(
            backend,
            config.retry.clone(),
            RateLimiter::new(config.max_requests_per_second),
        )
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// 翻译文本
    ///
    /// 按行翻译并保持换行，`\r\n` 结尾保持不变，空白行不发送请求。
    pub async fn translate(
        &self,
        text: &str,
        from: LanguageCode,
        to: LanguageCode,
    ) -> TranslationOutcome {
        let salt = generate_salt();
        let mut succeeded = true;
        let mut translated = Vec::new();

        for raw in text.split('\n') {
            let (line, ending) = match raw.strip_suffix('\r') {
                Some(line) => (line, "\r"),
                None => (raw, ""),
            };
            if line.trim().is_empty() {
                translated.push(raw.to_string());
                continue;
            }

            let request = LineRequest {
                text: line,
                from,
                to,
                salt: &salt,
            };
            let result = retry_with_backoff(
                || self.backend.translate_line(&request),
                &self.retry,
                &self.rate_limiter,
            )
            .await;

            match result {
                Ok(value) => translated.push(format!("{}{}", value, ending)),
                Err(e) => {
                    warn!(
                        provider = self.backend.provider_name(),
                        error = %e,
                        "translation request failed, keeping original line"
                    );
                    succeeded = false;
                    translated.push(raw.to_string());
                }
            }
        }

        TranslationOutcome {
            value: translated.join("\n"),
            succeeded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    /// Replies from a script, then echoes `[to] text`.
    #[derive(Default)]
    struct ScriptedBackend {
        script: StdMutex<VecDeque<Result<String>>>,
        calls: StdMutex<Vec<(String, String)>>,
    }

    impl ScriptedBackend {
        fn with_script(script: Vec<Result<String>>) -> Self {
            Self {
                script: StdMutex::new(script.into()),
                calls: StdMutex::default(),
            }
        }

        fn calls(&self) -> Vec<(String, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TranslationBackend for ScriptedBackend {
        async fn translate_line(&self, request: &LineRequest<'_>) -> Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push((request.text.to_string(), request.salt.to_string()));
            match self.script.lock().unwrap().pop_front() {
                Some(reply) => reply,
                None => Ok(format!("[{}] {}", request.to, request.text)),
            }
        }

        fn provider_name(&self) -> &str {
            "scripted"
        }
    }

    fn client(backend: ScriptedBackend, retry: RetryConfig) -> TranslationClient<ScriptedBackend> {
        TranslationClient::new(backend, retry, RateLimiter::unlimited())
    }

    fn fast_retry(max_retries: usize) -> RetryConfig {
        RetryConfig {
            max_retries,
            initial_delay_ms: 1,
            max_delay_ms: 2,
            backoff_multiplier: 2.0,
        }
    }

    #[tokio::test]
    async fn test_multiline_text_is_translated_line_by_line() {
        let client = client(ScriptedBackend::default(), RetryConfig::disabled());
        let outcome = client
            .translate("line1\nline2", LanguageCode::Jp, LanguageCode::En)
            .await;

        assert_eq!(outcome.value, "[en] line1\n[en] line2");
        assert!(outcome.succeeded);
        let calls = client.backend().calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0, "line1");
        assert_eq!(calls[1].0, "line2");
        // one salt per call, shared across its lines
        assert_eq!(calls[0].1, calls[1].1);
        let salt: u32 = calls[0].1.parse().unwrap();
        assert!(SALT_RANGE.contains(&salt));
    }

    #[tokio::test]
    async fn test_blank_lines_and_crlf_are_preserved() {
        let client = client(ScriptedBackend::default(), RetryConfig::disabled());
        let outcome = client
            .translate("a\r\n\r\n  \nb", LanguageCode::Zh, LanguageCode::En)
            .await;

        assert_eq!(outcome.value, "[en] a\r\n\r\n  \n[en] b");
        assert_eq!(client.backend().calls().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_line_falls_back_to_original() {
        let backend = ScriptedBackend::with_script(vec![
            Ok("first".to_string()),
            Err(TranslationError::Api {
                code: "54001".to_string(),
                message: "Invalid Sign".to_string(),
            }),
        ]);
        let client = client(backend, fast_retry(3));
        let outcome = client
            .translate("eins\nzwei", LanguageCode::De, LanguageCode::En)
            .await;

        assert_eq!(outcome.value, "first\nzwei");
        assert!(!outcome.succeeded);
        // invalid sign is not retried
        assert_eq!(client.backend().calls().len(), 2);
    }

    #[tokio::test]
    async fn test_retryable_error_is_retried() {
        let backend = ScriptedBackend::with_script(vec![
            Err(TranslationError::Api {
                code: "54003".to_string(),
                message: "Invalid Access Limit".to_string(),
            }),
            Ok("hello".to_string()),
        ]);
        let client = client(backend, fast_retry(2));
        let outcome = client
            .translate("こんにちは", LanguageCode::Jp, LanguageCode::En)
            .await;

        assert_eq!(outcome, TranslationOutcome::translated("hello".to_string()));
        assert_eq!(client.backend().calls().len(), 2);
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let failures = (0..5)
            .map(|_| {
                Err(TranslationError::Api {
                    code: "52001".to_string(),
                    message: "TIMEOUT".to_string(),
                })
            })
            .collect();
        let client = client(ScriptedBackend::with_script(failures), fast_retry(2));
        let outcome = client
            .translate("text", LanguageCode::En, LanguageCode::Zh)
            .await;

        assert_eq!(outcome, TranslationOutcome::fallback("text"));
        assert_eq!(client.backend().calls().len(), 3);
    }

    #[test]
    fn test_sign_matches_documented_example() {
        let credentials = Credentials::new("2015063000000001", "12345678");
        assert_eq!(
            BaiduBackend::sign(&credentials, "apple", "1435660288"),
            "f89f9594663708c1605f3d736d01d2d4"
        );
    }

    #[test]
    fn test_extract_translation() {
        let ok: BaiduResponse = serde_json::from_str(
            r#"{"from":"en","to":"zh","trans_result":[{"src":"apple","dst":"苹果"}]}"#,
        )
        .unwrap();
        assert_eq!(extract_translation(ok).unwrap(), "苹果");

        let empty: BaiduResponse = serde_json::from_str(r#"{"trans_result":[]}"#).unwrap();
        assert!(matches!(
            extract_translation(empty),
            Err(TranslationError::EmptyResult)
        ));

        let failed: BaiduResponse =
            serde_json::from_str(r#"{"error_code":54003,"error_msg":"Invalid Access Limit"}"#)
                .unwrap();
        match extract_translation(failed) {
            Err(TranslationError::Api { code, message }) => {
                assert_eq!(code, "54003");
                assert_eq!(message, "Invalid Access Limit");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rate_limiter_spaces_requests() {
        let limiter = RateLimiter::new(50.0);
        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(39));
    }
}
