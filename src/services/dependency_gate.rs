//! 依赖检查服务 - 业务能力层
//!
//! 在启动浏览器之前按顺序检查：后端、CSV 文件、浏览器、扩展。
//! 任意一项失败都直接终止

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info};

use crate::clients::BackendClient;
use crate::config::Config;
use crate::error::DependencyError;

/// 备选浏览器名称，按顺序尝试
const FALLBACK_BROWSERS: &[&str] = &["google-chrome-stable", "chromium", "chromium-browser"];

/// 依赖检查结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateReport {
    /// 实际可用的浏览器
    pub browser_binary: String,
}

/// 依赖检查
pub struct DependencyGate<'a> {
    config: &'a Config,
    backend: &'a BackendClient,
}

impl<'a> DependencyGate<'a> {
    pub fn new(config: &'a Config, backend: &'a BackendClient) -> Self {
        Self { config, backend }
    }

    /// 执行全部检查
    pub async fn check(&self) -> Result<GateReport, DependencyError> {
        info!("🔍 正在检查依赖...");

        self.check_backend().await?;
        info!("✓ 后端服务正常: {}", self.backend.base_url());

        check_source(&self.config.csv_file)?;

        let candidates = browser_candidates(&self.config.chrome_binary);
        let browser_binary = find_browser_binary(&candidates)
            .await
            .ok_or_else(|| DependencyError::BrowserNotFound {
                tried: candidates.clone(),
            })?;
        info!("✓ 找到浏览器: {}", browser_binary);

        check_extension(&self.config.extension_path)?;

        info!("✓ 所有依赖检查通过");
        Ok(GateReport { browser_binary })
    }

    async fn check_backend(&self) -> Result<(), DependencyError> {
        self.backend
            .health()
            .await
            .map_err(|source| DependencyError::BackendUnavailable {
                url: self.backend.base_url().to_string(),
                source,
            })
    }
}

/// 检查 CSV 文件存在
pub fn check_source(path: &Path) -> Result<(), DependencyError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(DependencyError::SourceMissing {
            path: path.to_path_buf(),
        })
    }
}

/// 检查扩展目录下的 manifest.json
pub fn check_extension(extension_path: &Path) -> Result<PathBuf, DependencyError> {
    let manifest = extension_path.join("manifest.json");
    if manifest.is_file() {
        Ok(manifest)
    } else {
        Err(DependencyError::ExtensionMissing { path: manifest })
    }
}

/// 配置的浏览器优先，其次是备选列表（去重）
pub fn browser_candidates(configured: &str) -> Vec<String> {
    let mut candidates = vec![configured.to_string()];
    for name in FALLBACK_BROWSERS {
        if !candidates.iter().any(|c| c == name) {
            candidates.push(name.to_string());
        }
    }
    candidates
}

/// 返回第一个能响应 `--version` 的浏览器
pub async fn find_browser_binary(candidates: &[String]) -> Option<String> {
    for binary in candidates {
        let status = Command::new(binary)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) if status.success() => return Some(binary.clone()),
            Ok(status) => debug!("{} --version 退出码: {:?}", binary, status.code()),
            Err(e) => debug!("{} 不可用: {}", binary, e),
        }
    }
    None
}
