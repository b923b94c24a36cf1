//! 批量链接调度器 - 编排层
//!
//! ## 职责
//!
//! 1. **分批**：按 `batch_size` 把链接切成连续的批次，批次之间严格串行
//! 2. **并发控制**：批内用 Semaphore 限制同时处理的链接数
//! 3. **错峰启动**：相邻任务启动间隔 `tab_delay`
//! 4. **统计**：任务完成一个记一个，统计只在这里写
//! 5. **进度快照**：已处理数量每跨过一个间隔就写一次快照
//!
//! 收到停止信号后不再开始新批次，也不再启动新任务

use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::infrastructure::Shutdown;
use crate::models::stats::format_duration;
use crate::models::{ItemOutcome, RunStats};
use crate::services::ProgressLedger;
use crate::workflow::{ItemCtx, ItemFlow};

/// 调度结果
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScheduleReport {
    /// 每个已开始批次实际启动的任务数
    pub batch_sizes: Vec<usize>,
    /// 是否因停止信号提前结束
    pub interrupted: bool,
}

/// 批次处理结果
#[derive(Debug, Default)]
struct BatchResult {
    success: usize,
    skipped: usize,
    failed: usize,
    aborted: usize,
}

impl BatchResult {
    fn count(&mut self, outcome: &ItemOutcome) {
        match outcome {
            ItemOutcome::Succeeded => self.success += 1,
            ItemOutcome::SkippedDuplicate => self.skipped += 1,
            ItemOutcome::Failed(_) => self.failed += 1,
            ItemOutcome::Aborted => self.aborted += 1,
        }
    }

    fn total(&self) -> usize {
        self.success + self.skipped + self.failed + self.aborted
    }
}

/// 批量链接调度器
pub struct BatchScheduler {
    config: Arc<Config>,
    flow: Arc<ItemFlow>,
    ledger: ProgressLedger,
}

impl BatchScheduler {
    pub fn new(config: Arc<Config>, flow: Arc<ItemFlow>, ledger: ProgressLedger) -> Self {
        Self {
            config,
            flow,
            ledger,
        }
    }

    /// 处理全部链接
    pub async fn run(
        &self,
        urls: &[String],
        stats: &mut RunStats,
        shutdown: &Shutdown,
    ) -> ScheduleReport {
        let batch_size = self.config.batch_size.max(1);
        let total = urls.len();
        let total_batches = total.div_ceil(batch_size);
        let mut report = ScheduleReport::default();
        let mut last_checkpoint = stats.processed;

        log_urls_loaded(total, batch_size, self.config.max_workers);

        for (batch_idx, batch) in urls.chunks(batch_size).enumerate() {
            if shutdown.is_requested() {
                warn!("🛑 收到停止信号，不再开始新批次");
                report.interrupted = true;
                break;
            }

            let batch_num = batch_idx + 1;
            let batch_start = batch_idx * batch_size;
            log_batch_start(
                batch_num,
                total_batches,
                batch_start + 1,
                batch_start + batch.len(),
                total,
            );

            let (started, result) = self
                .process_batch(batch, batch_start, total, stats, &mut last_checkpoint, shutdown)
                .await;
            report.batch_sizes.push(started);

            log_batch_complete(batch_num, &result);
            log_progress(stats);

            if batch_num < total_batches && shutdown.sleep(self.config.batch_delay()).await.is_err() {
                report.interrupted = true;
                break;
            }
        }

        if shutdown.is_requested() {
            report.interrupted = true;
        }
        report
    }

    /// 处理单个批次，返回实际启动的任务数
    async fn process_batch(
        &self,
        batch: &[String],
        batch_start: usize,
        total: usize,
        stats: &mut RunStats,
        last_checkpoint: &mut usize,
        shutdown: &Shutdown,
    ) -> (usize, BatchResult) {
        let semaphore = Arc::new(Semaphore::new(self.config.max_workers.max(1)));
        let mut tasks = FuturesUnordered::new();

        for (offset, url) in batch.iter().enumerate() {
            // 错峰启动，避免同时打开太多标签页
            if offset > 0 && shutdown.sleep(self.config.tab_delay()).await.is_err() {
                break;
            }
            if shutdown.is_requested() {
                break;
            }

            let permit = match shutdown.guard(semaphore.clone().acquire_owned()).await {
                Ok(Ok(permit)) => permit,
                Ok(Err(e)) => {
                    error!("获取并发许可失败: {}", e);
                    break;
                }
                Err(_) => break,
            };

            let ctx = ItemCtx::new(url.clone(), batch_start + offset + 1, total);
            let flow = self.flow.clone();
            let task_shutdown = shutdown.clone();
            let handle = tokio::spawn(async move {
                let _permit = permit;
                flow.run(&ctx, &task_shutdown).await
            });

            let url = url.clone();
            tasks.push(async move { (url, handle.await) });
        }

        let started = tasks.len();
        if started < batch.len() {
            warn!(
                "🛑 收到停止信号，本批还有 {} 个链接未开始",
                batch.len() - started
            );
        }

        // 逐个收集完成的任务
        let mut result = BatchResult::default();
        while let Some((url, joined)) = tasks.next().await {
            let outcome = joined.unwrap_or_else(|e| {
                error!("任务执行失败 ({}): {}", url, e);
                ItemOutcome::Failed(format!("任务执行失败: {}", e))
            });

            stats.record(&url, &outcome);
            result.count(&outcome);

            if stats.processed >= *last_checkpoint + self.config.progress_save_interval.max(1) {
                *last_checkpoint = stats.processed;
                if let Err(e) = self.ledger.checkpoint(&self.config, stats).await {
                    error!("❌ 保存进度失败: {}", e);
                }
            }
        }

        (started, result)
    }
}

// ========== 日志辅助函数 ==========

/// 记录链接加载信息
///
/// # 参数
/// - `total`: 待处理链接总数
/// - `batch_size`: 每批链接数
/// - `max_workers`: 批内最大并发数
fn log_urls_loaded(total: usize, batch_size: usize, max_workers: usize) {
    info!("✓ 共 {} 个待处理的链接", total);
    info!("📋 每批 {} 个，批内最多 {} 个并发", batch_size, max_workers);
    info!("💡 每批完成后再开始下一批\n");
}

/// 记录批次开始信息
///
/// # 参数
/// - `batch_num`: 批次编号，从 1 开始
/// - `total_batches`: 批次总数
/// - `start`: 本批第一个链接的序号
/// - `end`: 本批最后一个链接的序号
/// - `total`: 链接总数
fn log_batch_start(batch_num: usize, total_batches: usize, start: usize, end: usize, total: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始处理第 {}/{} 批", batch_num, total_batches);
    info!("📄 本批链接: {}-{} / 共 {} 个", start, end, total);
    info!("{}", "=".repeat(60));
}

/// 记录批次完成信息
///
/// # 参数
/// - `batch_num`: 批次编号
/// - `result`: 本批各类结果的计数
fn log_batch_complete(batch_num: usize, result: &BatchResult) {
    info!("\n{}", "─".repeat(60));
    info!(
        "✓ 第 {} 批完成: 成功 {}/{}，跳过 {}，失败 {}",
        batch_num,
        result.success,
        result.total(),
        result.skipped,
        result.failed
    );
    if result.aborted > 0 {
        info!("🛑 中途放弃: {}", result.aborted);
    }
    info!("{}", "─".repeat(60));
}

/// 记录总体进度
fn log_progress(stats: &RunStats) {
    let eta = stats
        .eta(chrono::Local::now())
        .map(format_duration)
        .unwrap_or_else(|| "--:--:--".to_string());
    info!(
        "📊 进度: {}/{} ({:.1}%) | ✅ {} | ❌ {} | ⏭️ {} | 预计剩余: {}",
        stats.processed,
        stats.total,
        stats.percentage(),
        stats.successful,
        stats.failed,
        stats.skipped,
        eta
    );
}
