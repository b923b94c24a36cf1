//! 提取触发服务 - 业务能力层
//!
//! 两种触发方式：
//! - `DevToolsTrigger`：通过浏览器调试接口新开标签页，让扩展自动提取
//! - `HelperScriptTrigger`：调用外部辅助脚本（备用）
//!
//! 两者都不判断数据是否真正保存，验证交给流程层

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::clients::DevToolsClient;
use crate::error::ItemError;
use crate::infrastructure::Shutdown;
use crate::services::ExtractionTrigger;

/// 调试接口触发
///
/// 新建标签页是临界区，同一时间只有一个任务在操作标签页列表；
/// 标签页打开之后的等待可以并行
pub struct DevToolsTrigger {
    client: DevToolsClient,
    tab_lock: Mutex<()>,
    extraction_wait: Duration,
}

impl DevToolsTrigger {
    pub fn new(client: DevToolsClient, extraction_wait: Duration) -> Self {
        Self {
            client,
            tab_lock: Mutex::new(()),
            extraction_wait,
        }
    }
}

#[async_trait]
impl ExtractionTrigger for DevToolsTrigger {
    fn name(&self) -> &'static str {
        "DevTools"
    }

    async fn trigger(&self, url: &str, shutdown: &Shutdown) -> Result<(), ItemError> {
        let tab = {
            let _guard = shutdown.guard(self.tab_lock.lock()).await?;
            let tabs = shutdown.guard(self.client.list_tabs()).await??;
            debug!("打开新标签页前共有 {} 个标签页", tabs.len());
            shutdown.guard(self.client.open_tab(url)).await??
        };

        // 等待扩展完成提取
        let waited = shutdown.sleep(self.extraction_wait).await;

        if let Err(e) = self.client.close_tab(&tab.id).await {
            warn!("关闭标签页 {} 失败: {}", tab.id, e);
        }

        waited?;
        Ok(())
    }
}

/// 临时文件序号，避免并发任务写同一个文件
static TEMP_FILE_SEQ: AtomicU64 = AtomicU64::new(0);

/// 辅助脚本触发
///
/// 把单个链接写入临时 CSV，以它为参数运行脚本，退出码 0 视为成功
pub struct HelperScriptTrigger {
    script: PathBuf,
    temp_dir: PathBuf,
    timeout: Duration,
}

impl HelperScriptTrigger {
    pub fn new(script: impl Into<PathBuf>, temp_dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            script: script.into(),
            temp_dir: temp_dir.into(),
            timeout,
        }
    }

    fn temp_input_path(&self) -> PathBuf {
        let seq = TEMP_FILE_SEQ.fetch_add(1, Ordering::Relaxed);
        self.temp_dir.join(format!(
            "single_url_{}_{}.csv",
            chrono::Local::now().timestamp_millis(),
            seq
        ))
    }

    async fn run_script(&self, input: &Path, shutdown: &Shutdown) -> Result<(), ItemError> {
        let mut child = Command::new(&self.script)
            .arg(input)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        let waited = shutdown
            .guard(tokio::time::timeout(self.timeout, child.wait()))
            .await?;

        let status = match waited {
            Ok(status) => status?,
            Err(_) => {
                if let Err(e) = child.kill().await {
                    debug!("结束超时的辅助脚本失败: {}", e);
                }
                return Err(ItemError::Timeout(self.timeout.as_secs()));
            }
        };

        if status.success() {
            Ok(())
        } else {
            Err(ItemError::Helper(format!("退出码 {:?}", status.code())))
        }
    }
}

#[async_trait]
impl ExtractionTrigger for HelperScriptTrigger {
    fn name(&self) -> &'static str {
        "辅助脚本"
    }

    fn is_available(&self) -> bool {
        self.script.is_file()
    }

    async fn trigger(&self, url: &str, shutdown: &Shutdown) -> Result<(), ItemError> {
        let input = self.temp_input_path();
        tokio::fs::write(&input, format!("{}\n", url)).await?;

        let result = self.run_script(&input, shutdown).await;

        if let Err(e) = tokio::fs::remove_file(&input).await {
            debug!("删除临时文件 {} 失败: {}", input.display(), e);
        }

        result
    }
}
