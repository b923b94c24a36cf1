//! 进度快照服务 - 业务能力层
//!
//! 只负责"把当前状态写到磁盘"，每次完整覆盖。
//! 先写临时文件再 rename，中途崩溃不会破坏上一份快照

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::LedgerError;
use crate::models::{ProgressSnapshot, RunStats};

/// 进度快照服务
#[derive(Debug, Clone)]
pub struct ProgressLedger {
    path: PathBuf,
}

impl ProgressLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 读取上一次运行留下的快照（不存在或无法解析时返回 None）
    pub async fn load_previous(&self) -> Option<ProgressSnapshot> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) => {
                debug!("没有可用的历史进度 ({}): {}", self.path.display(), e);
                return None;
            }
        };

        match serde_json::from_str::<ProgressSnapshot>(&content) {
            Ok(snapshot) => {
                info!(
                    "📂 上次运行进度 ({}): 已处理 {}/{}，成功 {}，失败 {}，跳过 {}",
                    snapshot.last_update.format("%Y-%m-%d %H:%M:%S"),
                    snapshot.stats.processed,
                    snapshot.stats.total,
                    snapshot.stats.successful,
                    snapshot.stats.failed,
                    snapshot.stats.skipped
                );
                Some(snapshot)
            }
            Err(e) => {
                warn!("⚠️ 无法解析历史进度文件 {}: {}", self.path.display(), e);
                None
            }
        }
    }

    /// 覆盖写入快照
    pub async fn checkpoint(&self, config: &Config, stats: &RunStats) -> Result<(), LedgerError> {
        let snapshot = ProgressSnapshot::capture(config, stats);
        let json = serde_json::to_vec_pretty(&snapshot)?;

        let tmp = self.temp_path();
        let io_err = |source| LedgerError::Io {
            path: self.path.clone(),
            source,
        };

        let mut file = fs::File::create(&tmp).await.map_err(io_err)?;
        file.write_all(&json).await.map_err(io_err)?;
        file.sync_all().await.map_err(io_err)?;
        drop(file);

        if let Err(source) = fs::rename(&tmp, &self.path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(io_err(source));
        }

        debug!(
            "💾 进度已保存: {} ({}/{})",
            self.path.display(),
            stats.processed,
            stats.total
        );
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "progress.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
