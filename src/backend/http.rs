//! HTTP 翻译后端
//!
//! 按 LibreTranslate 的 JSON 线格式与本地或远程翻译服务通信，
//! 是本 crate 自带的唯一具体后端实现；其余后端由使用方实现
//! [`TranslationBackend`](super::TranslationBackend) 接入。

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::TranslationBackend;
use crate::error::{TranslationError, TranslationResult};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

/// LibreTranslate 线格式的 HTTP 后端
pub struct HttpBackend {
    id: String,
    url: String,
    api_key: Option<String>,
    client: reqwest::blocking::Client,
}

impl HttpBackend {
    /// 构造后端实例
    ///
    /// `id` 决定注册表中的标识与语言代码映射列，通常为 `"libre"`。
    pub fn new(id: &str, url: &str, api_key: Option<String>) -> TranslationResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            id: id.to_string(),
            url: url.to_string(),
            api_key,
            client,
        })
    }
}

impl TranslationBackend for HttpBackend {
    fn id(&self) -> &str {
        &self.id
    }

    fn translate(
        &self,
        text: &str,
        source_code: &str,
        target_code: &str,
    ) -> TranslationResult<String> {
        debug!("HTTP 后端 {} 请求: {} → {}", self.id, source_code, target_code);
        let request = TranslateRequest {
            q: text,
            source: source_code,
            target: target_code,
            format: "text",
            api_key: self.api_key.as_deref(),
        };
        let response = self.client.post(&self.url).json(&request).send()?;
        if !response.status().is_success() {
            return Err(TranslationError::BackendError {
                backend: self.id.clone(),
                message: format!("HTTP {}", response.status()),
            });
        }
        let body: TranslateResponse = response.json()?;
        Ok(body.translated_text)
    }
}
