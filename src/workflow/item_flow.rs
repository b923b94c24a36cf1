//! 链接处理流程 - 流程层
//!
//! 核心职责：定义"一个链接"的完整处理流程
//!
//! 流程顺序：
//! 1. 查重 → 已存在则跳过（不消耗重试次数）
//! 2. 主触发（调试接口）→ 等待 → 查重验证
//! 3. 主触发失败或未验证通过 → 备用触发（辅助脚本）→ 等待 → 查重验证
//! 4. 未成功 → 等待重试间隔，回到 2；次数用尽记为失败
//!
//! 成功的唯一依据是后端查重返回已存在，触发动作本身的返回值不可信。
//! 查重请求出错时按"未重复"处理：宁可重复提取，也不让后端抖动卡住整批任务

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{ItemError, ShutdownRequested};
use crate::infrastructure::Shutdown;
use crate::models::ItemOutcome;
use crate::services::{DuplicateIndex, ExtractionTrigger};
use crate::workflow::item_ctx::ItemCtx;

/// 链接处理流程
///
/// - 不持有浏览器进程
/// - 只依赖业务能力（查重、触发）
/// - 每个挂起点都会检查停止信号
pub struct ItemFlow {
    index: Arc<dyn DuplicateIndex>,
    primary: Arc<dyn ExtractionTrigger>,
    fallback: Option<Arc<dyn ExtractionTrigger>>,
    config: Arc<Config>,
}

impl ItemFlow {
    pub fn new(
        config: Arc<Config>,
        index: Arc<dyn DuplicateIndex>,
        primary: Arc<dyn ExtractionTrigger>,
        fallback: Option<Arc<dyn ExtractionTrigger>>,
    ) -> Self {
        Self {
            index,
            primary,
            fallback,
            config,
        }
    }

    /// 处理单个链接，返回最终结果
    pub async fn run(&self, ctx: &ItemCtx, shutdown: &Shutdown) -> ItemOutcome {
        match self.process(ctx, shutdown).await {
            Ok(outcome) => outcome,
            Err(ShutdownRequested) => {
                info!("{} 🛑 收到停止信号，放弃处理", ctx);
                ItemOutcome::Aborted
            }
        }
    }

    async fn process(
        &self,
        ctx: &ItemCtx,
        shutdown: &Shutdown,
    ) -> Result<ItemOutcome, ShutdownRequested> {
        info!("{} 开始处理", ctx);

        if self.is_duplicate(ctx, shutdown).await? {
            info!("{} ⏭️ 后端已存在，跳过", ctx);
            return Ok(ItemOutcome::SkippedDuplicate);
        }

        let max_retries = self.config.max_retries;
        for attempt in 1..=max_retries {
            shutdown.check()?;
            debug!("{} 第 {}/{} 次尝试", ctx, attempt, max_retries);

            if self.attempt(ctx, shutdown).await? {
                return Ok(ItemOutcome::Succeeded);
            }

            if attempt < max_retries {
                let delay = self.config.retry_delay(attempt);
                info!("{} 🔁 {:.1} 秒后重试...", ctx, delay.as_secs_f64());
                shutdown.sleep(delay).await?;
            }
        }

        let reason = format!("Failed after {} attempts", max_retries);
        error!("{} ❌ {}", ctx, reason);
        Ok(ItemOutcome::Failed(reason))
    }

    /// 一次尝试：依次使用主触发和备用触发，任意一个验证通过即成功
    async fn attempt(&self, ctx: &ItemCtx, shutdown: &Shutdown) -> Result<bool, ShutdownRequested> {
        let triggers = std::iter::once(&self.primary).chain(self.fallback.iter());

        for trigger in triggers {
            if !trigger.is_available() {
                debug!("{} {} 不可用，跳过", ctx, trigger.name());
                continue;
            }

            match trigger.trigger(&ctx.url, shutdown).await {
                Ok(()) => {
                    if self.verify(ctx, shutdown).await? {
                        info!("{} ✓ 提取成功 (通过 {})", ctx, trigger.name());
                        return Ok(true);
                    }
                    warn!(
                        "{} ⚠️ {} 触发完成，但后端没有查到数据",
                        ctx,
                        trigger.name()
                    );
                }
                Err(ItemError::Shutdown(e)) => return Err(e),
                Err(e) => warn!("{} ⚠️ {} 触发失败: {}", ctx, trigger.name(), e),
            }
        }

        Ok(false)
    }

    /// 等待片刻后重新查重，查到即视为提取成功
    async fn verify(&self, ctx: &ItemCtx, shutdown: &Shutdown) -> Result<bool, ShutdownRequested> {
        shutdown.sleep(self.config.verify_delay()).await?;
        self.is_duplicate(ctx, shutdown).await
    }

    /// 查重，请求失败时按未重复处理
    async fn is_duplicate(
        &self,
        ctx: &ItemCtx,
        shutdown: &Shutdown,
    ) -> Result<bool, ShutdownRequested> {
        match shutdown.guard(self.index.check_duplicate(&ctx.url)).await? {
            Ok(is_duplicate) => Ok(is_duplicate),
            Err(e) => {
                debug!("{} 查重失败，按未重复处理: {}", ctx, e);
                Ok(false)
            }
        }
    }
}
