//! 错误类型
//!
//! 按照影响范围划分：
//! - `ConfigError` / `SourceError` / `DependencyError` / `SupervisorError`：致命，直接终止本次运行
//! - `ItemError`：可恢复，只影响单个链接，重试耗尽后记入统计
//! - `ShutdownRequested`：不是错误，只是协作式退出的标记

use std::path::PathBuf;

use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    #[error("输入文件错误: {0}")]
    Source(#[from] SourceError),
    #[error("依赖检查失败: {0}")]
    Dependency(#[from] DependencyError),
    #[error("浏览器进程错误: {0}")]
    Supervisor(#[from] SupervisorError),
    #[error("进度文件错误: {0}")]
    Ledger(#[from] LedgerError),
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("无法读取配置文件 {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("无法解析配置文件 {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 不合法")]
    EnvVarParseFailed { var_name: String, value: String },
    #[error("配置项不合法: {0}")]
    Invalid(String),
}

/// 链接列表读取错误
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("无法读取 CSV 文件 {path}: {source}")]
    Read { path: PathBuf, source: csv::Error },
    #[error("CSV 文件中没有找到任何链接: {path}")]
    EmptySource { path: PathBuf },
}

/// 启动前的依赖检查错误
#[derive(Debug, Error)]
pub enum DependencyError {
    #[error("后端服务不可用 ({url}): {source}")]
    BackendUnavailable { url: String, source: reqwest::Error },
    #[error("CSV 文件不存在: {path}")]
    SourceMissing { path: PathBuf },
    #[error("找不到可用的浏览器, 已尝试: {}", tried.join(", "))]
    BrowserNotFound { tried: Vec<String> },
    #[error("浏览器扩展 manifest.json 不存在: {path}")]
    ExtensionMissing { path: PathBuf },
}

/// 浏览器进程管理错误
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("无法启动浏览器 {binary}: {source}")]
    Launch {
        binary: String,
        source: std::io::Error,
    },
    #[error("浏览器调试端口不可访问: {endpoint}")]
    ControlEndpointUnreachable { endpoint: String },
    #[error("浏览器已在运行, 每次运行只允许一个实例")]
    AlreadyStarted,
    #[error("启动期间收到停止信号")]
    Interrupted,
}

/// 单个链接处理错误（可重试）
#[derive(Debug, Error)]
pub enum ItemError {
    #[error("后端请求失败 ({endpoint}): {source}")]
    Backend {
        endpoint: String,
        source: reqwest::Error,
    },
    #[error("浏览器控制接口请求失败 ({endpoint}): {source}")]
    Control {
        endpoint: String,
        source: reqwest::Error,
    },
    #[error("辅助脚本执行失败: {0}")]
    Helper(String),
    #[error("操作超时 ({0} 秒)")]
    Timeout(u64),
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Shutdown(#[from] ShutdownRequested),
}

/// 进度文件写入错误
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("进度序列化失败: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("进度文件写入失败 ({path}): {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// 协作式停止标记
///
/// 挂起点发现停止信号后返回它，调用方据此进入 `Aborted`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("收到停止信号")]
pub struct ShutdownRequested;

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
