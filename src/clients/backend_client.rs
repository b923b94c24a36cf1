/// 后端 API 客户端
///
/// 封装健康检查和查重接口
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::error::ItemError;
use crate::services::DuplicateIndex;

/// 查重接口返回
#[derive(Debug, Deserialize)]
struct DuplicateResponse {
    #[serde(rename = "isDuplicate", default)]
    is_duplicate: bool,
}

/// 后端客户端
#[derive(Debug, Clone)]
pub struct BackendClient {
    base_url: String,
    http: reqwest::Client,
}

impl BackendClient {
    /// 创建新的后端客户端，所有请求使用同一个超时
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// 健康检查，非 2xx 视为失败
    pub async fn health(&self) -> Result<(), reqwest::Error> {
        let endpoint = format!("{}/health", self.base_url);
        self.http
            .get(&endpoint)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// 查询链接是否已存在于后端
    pub async fn is_duplicate(&self, url: &str) -> Result<bool, ItemError> {
        let endpoint = format!("{}/api/check-duplicate", self.base_url);
        let to_err = |source| ItemError::Backend {
            endpoint: endpoint.clone(),
            source,
        };

        let response: DuplicateResponse = self
            .http
            .post(&endpoint)
            .json(&json!({ "url": url }))
            .send()
            .await
            .map_err(to_err)?
            .error_for_status()
            .map_err(to_err)?
            .json()
            .await
            .map_err(to_err)?;

        debug!("查重结果 {} -> {}", url, response.is_duplicate);
        Ok(response.is_duplicate)
    }
}

#[async_trait]
impl DuplicateIndex for BackendClient {
    async fn check_duplicate(&self, url: &str) -> Result<bool, ItemError> {
        self.is_duplicate(url).await
    }
}
