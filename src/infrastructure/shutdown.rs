//! 停止协调器 - 基础设施层
//!
//! 持有进程内唯一的取消令牌，信号处理只负责置位，不做任何清理。
//! 所有挂起点（请求、等待、间隔）都通过这里等待，
//! 一旦收到停止信号立即返回 `ShutdownRequested`

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::ShutdownRequested;

/// 停止协调器
///
/// clone 出来的实例共享同一个令牌
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    token: CancellationToken,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// 请求停止
    pub fn request(&self) {
        self.token.cancel();
    }

    pub fn is_requested(&self) -> bool {
        self.token.is_cancelled()
    }

    /// 已收到停止信号时返回错误，供挂起点前检查
    pub fn check(&self) -> Result<(), ShutdownRequested> {
        if self.is_requested() {
            Err(ShutdownRequested)
        } else {
            Ok(())
        }
    }

    /// 可中断的等待
    pub async fn sleep(&self, duration: Duration) -> Result<(), ShutdownRequested> {
        self.check()?;
        if duration.is_zero() {
            return Ok(());
        }
        tokio::select! {
            _ = self.token.cancelled() => Err(ShutdownRequested),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }

    /// 运行 future，收到停止信号时放弃它
    pub async fn guard<F: Future>(&self, fut: F) -> Result<F::Output, ShutdownRequested> {
        self.check()?;
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(ShutdownRequested),
            output = fut => Ok(output),
        }
    }

    /// 安装 SIGINT / SIGTERM 处理
    pub fn install_signal_handlers(&self) -> std::io::Result<()> {
        #[cfg(unix)]
        let mut terminate =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

        let shutdown = self.clone();
        tokio::spawn(async move {
            #[cfg(unix)]
            let signal_name = tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    if let Err(e) = result {
                        warn!("监听 Ctrl-C 失败: {}", e);
                        return;
                    }
                    "SIGINT"
                }
                _ = terminate.recv() => "SIGTERM",
            };

            #[cfg(not(unix))]
            let signal_name = match tokio::signal::ctrl_c().await {
                Ok(()) => "Ctrl-C",
                Err(e) => {
                    warn!("监听 Ctrl-C 失败: {}", e);
                    return;
                }
            };

            info!("🛑 收到信号 {}，正在优雅退出...", signal_name);
            shutdown.request();
        });

        Ok(())
    }
}
