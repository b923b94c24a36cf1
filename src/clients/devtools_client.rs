/// 浏览器调试接口客户端
///
/// 只使用 HTTP JSON 接口：列出标签页、新建标签页、关闭标签页
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::ItemError;

/// `/json` 返回的标签页信息
#[derive(Debug, Clone, Deserialize)]
pub struct TabInfo {
    pub id: String,
    #[serde(default)]
    pub url: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// 调试接口客户端
#[derive(Debug, Clone)]
pub struct DevToolsClient {
    base_url: String,
    http: reqwest::Client,
}

impl DevToolsClient {
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

    /// 列出所有标签页，同时用作调试端口存活探测
    pub async fn list_tabs(&self) -> Result<Vec<TabInfo>, ItemError> {
        let endpoint = format!("{}/json", self.base_url);
        let to_err = |source| ItemError::Control {
            endpoint: endpoint.clone(),
            source,
        };

        let tabs: Vec<TabInfo> = self
            .http
            .get(&endpoint)
            .send()
            .await
            .map_err(to_err)?
            .error_for_status()
            .map_err(to_err)?
            .json()
            .await
            .map_err(to_err)?;

        debug!("当前共有 {} 个标签页", tabs.len());
        Ok(tabs)
    }

    /// 新建标签页并打开指定链接
    ///
    /// 链接整体百分号编码后放进查询串，浏览器端会解码；
    /// 不编码的话 `#` 之后的部分会被当成请求自身的片段丢掉
    pub async fn open_tab(&self, url: &str) -> Result<TabInfo, ItemError> {
        let endpoint = format!(
            "{}/json/new?{}",
            self.base_url,
            urlencoding::encode(url)
        );
        let to_err = |source| ItemError::Control {
            endpoint: format!("{}/json/new", self.base_url),
            source,
        };

        let tab: TabInfo = self
            .http
            .post(&endpoint)
            .send()
            .await
            .map_err(to_err)?
            .error_for_status()
            .map_err(to_err)?
            .json()
            .await
            .map_err(to_err)?;

        debug!("已新建标签页 {} -> {}", tab.id, url);
        Ok(tab)
    }

    /// 关闭标签页
    pub async fn close_tab(&self, tab_id: &str) -> Result<(), ItemError> {
        let endpoint = format!("{}/json/close/{}", self.base_url, tab_id);
        let to_err = |source| ItemError::Control {
            endpoint: endpoint.clone(),
            source,
        };

        self.http
            .post(&endpoint)
            .send()
            .await
            .map_err(to_err)?
            .error_for_status()
            .map_err(to_err)?;

        debug!("已关闭标签页 {}", tab_id);
        Ok(())
    }
}
