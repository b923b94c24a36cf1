//! 应用生命周期 - 编排层
//!
//! 一次运行的完整过程：
//!
//! ```text
//! 准备目录 → 读取历史进度 → 依赖检查 → 初始快照 → 读取链接
//!     → 启动浏览器 → 分批处理 → 关闭浏览器 → 最终快照 → 汇总
//! ```
//!
//! 无论正常结束、中途停止还是致命错误，浏览器都会被关闭，最终快照都会写入

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info, warn};

use crate::browser::{BrowserSupervisor, LaunchOptions};
use crate::clients::{BackendClient, DevToolsClient};
use crate::config::Config;
use crate::error::{AppError, AppResult, DependencyError, SupervisorError};
use crate::infrastructure::Shutdown;
use crate::models::stats::format_duration;
use crate::models::{load_urls_from_csv, RunStats};
use crate::orchestrator::batch_processor::BatchScheduler;
use crate::services::{
    DependencyGate, DevToolsTrigger, ExtractionTrigger, HelperScriptTrigger, ProgressLedger,
};
use crate::utils::logging;
use crate::workflow::ItemFlow;

/// 运行结束状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// 所有链接都已处理
    Completed,
    /// 收到停止信号提前结束
    Interrupted,
}

/// 应用主结构
pub struct App {
    config: Arc<Config>,
    shutdown: Shutdown,
    ledger: ProgressLedger,
    log_file: PathBuf,
}

impl App {
    /// 初始化应用（日志系统）
    pub fn initialize(config: Config, shutdown: Shutdown) -> Result<Self> {
        let log_file = logging::log_file_path(&config.log_dir);
        logging::init(&log_file)?;

        log_startup(&config, &log_file);

        let ledger = ProgressLedger::new(&config.progress_file);
        Ok(Self {
            config: Arc::new(config),
            shutdown,
            ledger,
            log_file,
        })
    }

    pub fn log_file(&self) -> &Path {
        &self.log_file
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> AppResult<RunStatus> {
        let mut stats = RunStats::new(0);
        let mut supervisor: Option<BrowserSupervisor> = None;

        let result = self.execute(&mut stats, &mut supervisor).await;

        // 收尾：关闭浏览器 + 最终快照，任何退出路径都要执行
        if let Some(supervisor) = supervisor.as_mut() {
            supervisor.stop().await;
        }
        if let Err(e) = self.ledger.checkpoint(&self.config, &stats).await {
            error!("❌ 保存最终进度失败: {}", e);
        }

        print_final_stats(&stats, &self.config, &self.log_file);

        match result {
            Ok(()) | Err(AppError::Supervisor(SupervisorError::Interrupted))
                if self.shutdown.is_requested() =>
            {
                warn!("🛑 运行被中断");
                Ok(RunStatus::Interrupted)
            }
            Ok(()) => Ok(RunStatus::Completed),
            Err(e) => {
                error!("❌ 运行失败: {}", e);
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        stats: &mut RunStats,
        supervisor: &mut Option<BrowserSupervisor>,
    ) -> AppResult<()> {
        let config = &self.config;

        prepare_workspace(config).await?;
        self.ledger.load_previous().await;

        // 依赖检查
        let backend = BackendClient::new(&config.backend_url, config.http_timeout()).map_err(
            |source| DependencyError::BackendUnavailable {
                url: config.backend_url.clone(),
                source,
            },
        )?;
        let report = DependencyGate::new(config, &backend).check().await?;

        // 初始快照，中途中断也能留下记录
        self.ledger.checkpoint(config, stats).await?;

        let urls = load_urls_from_csv(&config.csv_file).await?;
        *stats = RunStats::new(urls.len());

        // 启动浏览器
        let options = LaunchOptions::from_config(config, report.browser_binary);
        let supervisor = supervisor.insert(BrowserSupervisor::new(options));
        supervisor.start(&self.shutdown).await?;

        let devtools = DevToolsClient::new(config.devtools_url(), config.http_timeout()).map_err(
            |_| SupervisorError::ControlEndpointUnreachable {
                endpoint: config.devtools_url(),
            },
        )?;
        let primary: Arc<dyn ExtractionTrigger> =
            Arc::new(DevToolsTrigger::new(devtools, config.extraction_timeout()));

        let helper = HelperScriptTrigger::new(
            &config.helper_script,
            &config.temp_dir,
            config.extraction_timeout(),
        );
        let fallback: Option<Arc<dyn ExtractionTrigger>> = if helper.is_available() {
            info!("✓ 备用辅助脚本可用: {}", config.helper_script.display());
            Some(Arc::new(helper))
        } else {
            warn!(
                "⚠️ 未找到辅助脚本 {}，只使用调试接口",
                config.helper_script.display()
            );
            None
        };

        let flow = Arc::new(ItemFlow::new(
            config.clone(),
            Arc::new(backend),
            primary,
            fallback,
        ));
        let scheduler = BatchScheduler::new(config.clone(), flow, self.ledger.clone());
        scheduler.run(&urls, stats, &self.shutdown).await;

        Ok(())
    }
}

/// 创建运行所需目录
async fn prepare_workspace(config: &Config) -> std::io::Result<()> {
    for dir in [&config.log_dir, &config.temp_dir, &config.user_data_dir] {
        tokio::fs::create_dir_all(dir).await?;
    }
    Ok(())
}

// ========== 日志辅助函数 ==========

fn log_startup(config: &Config, log_file: &Path) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 批量链接提取模式");
    info!("📄 链接文件: {}", config.csv_file.display());
    info!("🌐 后端服务: {}", config.backend_url);
    info!(
        "📊 每批 {} 个 | 最大并发 {} | 最多尝试 {} 次",
        config.batch_size, config.max_workers, config.max_retries
    );
    info!("📝 日志文件: {}", log_file.display());
    info!("{}", "=".repeat(60));
}

fn print_final_stats(stats: &RunStats, config: &Config, log_file: &Path) {
    let now = chrono::Local::now();
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!("完成时间: {}", now.format("%Y-%m-%d %H:%M:%S"));
    info!("总耗时: {}", format_duration(stats.elapsed(now)));
    info!("{}", "=".repeat(60));
    info!("📄 总链接数: {}", stats.total);
    info!("✓ 已处理: {}", stats.processed);
    info!("✅ 成功: {}", stats.successful);
    info!("⏭️ 跳过(已存在): {}", stats.skipped);
    info!("❌ 失败: {}", stats.failed);
    if stats.aborted > 0 {
        info!("🛑 中途放弃: {}", stats.aborted);
    }
    info!("📈 成功率: {:.1}%", stats.success_rate());

    if !stats.errors.is_empty() {
        info!("{}", "─".repeat(60));
        info!("失败链接:");
        for record in &stats.errors {
            info!("  - {}: {}", record.url, record.error);
        }
    }

    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file.display());
    info!("进度已保存至: {}", config.progress_file.display());
}
