//! # Batch URL Processor
//!
//! 批量打开链接，由浏览器扩展提取页面数据并写入后端，
//! 以后端查重结果作为提取成功的依据
//!
//! ## 架构设计
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 停止信号（`Shutdown`），所有挂起点都可以被它打断
//! - `browser/` - 浏览器进程管理（`BrowserSupervisor`），唯一接触进程的模块
//! - `clients/` - 后端和浏览器调试接口的 HTTP 客户端
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个链接
//! - `DependencyGate` - 启动前依赖检查
//! - `DevToolsTrigger` / `HelperScriptTrigger` - 触发提取
//! - `ProgressLedger` - 进度快照
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个链接"的完整处理流程
//! - `ItemCtx` - 上下文封装（序号 + 链接）
//! - `ItemFlow` - 流程编排（查重 → 触发 → 验证 → 重试）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/app` - 一次运行的生命周期
//! - `orchestrator/batch_processor` - 分批调度和并发控制
//!
//! ## 模块结构

pub mod browser;
pub mod cli;
pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::{Config, RetryPolicy};
pub use error::{AppError, AppResult};
pub use infrastructure::Shutdown;
pub use models::{ItemOutcome, RunStats};
pub use orchestrator::{App, BatchScheduler, RunStatus};
pub use workflow::{ItemCtx, ItemFlow};
