//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `app` - 应用生命周期
//! - 依赖检查、浏览器启动与关闭
//! - 初始 / 最终进度快照
//! - 输出最终统计
//!
//! ### `batch_processor` - 批量调度
//! - 分批、批内并发（Semaphore）、错峰启动
//! - 唯一写入 `RunStats` 的地方
//!
//! ## 层次关系
//!
//! ```text
//! app (一次运行)
//!     ↓
//! batch_processor (处理 Vec<String>)
//!     ↓
//! workflow::ItemFlow (处理单个链接)
//!     ↓
//! services (能力层：查重 / 触发 / 进度快照)
//!     ↓
//! clients + infrastructure (HTTP 客户端、停止信号)
//! ```

pub mod app;
pub mod batch_processor;

pub use app::{App, RunStatus};
pub use batch_processor::{BatchScheduler, ScheduleReport};
