//! reqwest adapters for the VK API and long-poll ports.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use vkpoll_core::{
    errors::Error,
    ports::{ApiCaller, HttpText, LongPollTransport, Params},
    Result,
};

/// `POST {base}/method/{name}` with the token and API version in the form body.
#[derive(Clone, Debug)]
pub struct VkApiClient {
    access_token: String,
    api_version: String,
    base_url: String,
    http: reqwest::Client,
}

impl VkApiClient {
    pub fn new(
        access_token: impl Into<String>,
        api_version: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::External(format!("vk client build error: {e}")))?;
        Ok(Self {
            access_token: access_token.into(),
            api_version: api_version.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn method_url(&self, method: &str) -> String {
        format!("{}/method/{method}", self.base_url)
    }
}

#[async_trait]
impl ApiCaller for VkApiClient {
    async fn call(&self, method: &str, params: Params) -> Result<Value> {
        let mut form: Params = Vec::with_capacity(params.len() + 2);
        form.push(("access_token", self.access_token.clone()));
        form.push(("v", self.api_version.clone()));
        form.extend(params);

        let resp = self
            .http
            .post(self.method_url(method))
            .form(&form)
            .send()
            .await
            .map_err(|e| Error::External(format!("vk request error ({method}): {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::External(format!(
                "vk {method} failed: {status} {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        let v: Value = resp
            .json()
            .await
            .map_err(|e| Error::External(format!("vk json error ({method}): {e}")))?;

        unwrap_envelope(v)
    }
}

/// `{"response": ...}` → the payload; `{"error": {...}}` → [`Error::Api`].
pub fn unwrap_envelope(mut v: Value) -> Result<Value> {
    if let Some(err) = v.get("error") {
        let code = err.get("error_code").and_then(Value::as_i64).unwrap_or(0);
        let message = err
            .get("error_msg")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        return Err(Error::Api { code, message });
    }

    match v.get_mut("response") {
        Some(resp) => Ok(resp.take()),
        None => Err(Error::External(
            "vk response has neither `response` nor `error`".to_string(),
        )),
    }
}

/// Long-poll GET. The per-request timeout comes from the session.
#[derive(Clone, Debug, Default)]
pub struct ReqwestLongPollTransport {
    http: reqwest::Client,
}

impl ReqwestLongPollTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl LongPollTransport for ReqwestLongPollTransport {
    async fn get_text(&self, url: &str, query: Params, timeout: Duration) -> Result<HttpText> {
        let resp = self
            .http
            .get(url)
            .query(&query)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| Error::External(format!("long-poll request error: {e}")))?;

        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| Error::External(format!("long-poll body error: {e}")))?;

        Ok(HttpText { status, body })
    }
}
