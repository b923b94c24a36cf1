//! 业务能力层
//!
//! 每个服务只描述"我能做什么"，只处理单个链接，不关心流程顺序

pub mod dependency_gate;
pub mod extraction;
pub mod progress_ledger;

use async_trait::async_trait;

use crate::error::ItemError;
use crate::infrastructure::Shutdown;

pub use dependency_gate::{DependencyGate, GateReport};
pub use extraction::{DevToolsTrigger, HelperScriptTrigger};
pub use progress_ledger::ProgressLedger;

/// 查重能力：后端是否已经保存过这个链接
#[async_trait]
pub trait DuplicateIndex: Send + Sync {
    async fn check_duplicate(&self, url: &str) -> Result<bool, ItemError>;
}

/// 触发提取的能力
///
/// 返回 `Ok(())` 只代表触发动作本身完成，不代表数据已经保存
#[async_trait]
pub trait ExtractionTrigger: Send + Sync {
    /// 用于日志
    fn name(&self) -> &'static str;

    /// 当前是否可用
    fn is_available(&self) -> bool {
        true
    }

    async fn trigger(&self, url: &str, shutdown: &Shutdown) -> Result<(), ItemError>;
}
