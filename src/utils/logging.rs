/// 日志工具模块
///
/// 控制台和日志文件同时输出，日志文件以时间戳命名
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// 生成本次运行的日志文件路径
///
/// # 参数
/// - `log_dir`: 日志目录
///
/// # 返回
/// `batch_extraction_<时间戳>.log` 形式的完整路径
pub fn log_file_path(log_dir: &Path) -> PathBuf {
    log_dir.join(format!(
        "batch_extraction_{}.log",
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    ))
}

/// 初始化日志文件
///
/// 写入文件头，已有内容会被覆盖
///
/// # 参数
/// - `log_file_path`: 日志文件路径，父目录不存在时自动创建
///
/// # 返回
/// 目录或文件无法写入时返回错误
pub fn init_log_file(log_file_path: &Path) -> Result<()> {
    if let Some(parent) = log_file_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("无法创建日志目录: {}", parent.display()))?;
    }
    let log_header = format!(
        "{}\n批量链接提取日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)
        .with_context(|| format!("无法写入日志文件: {}", log_file_path.display()))?;
    Ok(())
}

/// 初始化日志系统
///
/// `RUST_LOG` 控制级别，默认 info；重复初始化时静默忽略
///
/// # 参数
/// - `log_file_path`: 日志文件路径，控制台之外的第二个输出
pub fn init(log_file_path: &Path) -> Result<()> {
    init_log_file(log_file_path)?;

    let file = OpenOptions::new()
        .append(true)
        .open(log_file_path)
        .with_context(|| format!("无法打开日志文件: {}", log_file_path.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_name_has_timestamp() {
        let path = log_file_path(Path::new("logs"));
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("batch_extraction_"));
        assert!(name.ends_with(".log"));
        assert_eq!(path.parent(), Some(Path::new("logs")));
    }

    #[test]
    fn test_init_writes_header_and_tolerates_reinit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("run.log");

        init(&path).unwrap();
        init(&path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("批量链接提取日志"));
    }
}
