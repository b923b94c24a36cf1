//! 命令行参数
//!
//! 命令行参数优先级最高，覆盖配置文件和环境变量

use std::path::PathBuf;

use clap::Parser;

use crate::config::Config;

#[derive(Debug, Parser)]
#[command(
    name = "batch_url_processor",
    about = "批量打开链接，通过浏览器扩展提取数据并写入后端"
)]
pub struct Cli {
    /// 链接列表 CSV 文件
    pub csv_file: Option<PathBuf>,

    /// 配置文件（TOML）
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// 每批链接数量
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// 批内最大并发数
    #[arg(long)]
    pub max_workers: Option<usize>,

    /// 单个链接提取等待时间（秒）
    #[arg(long)]
    pub timeout: Option<u64>,

    /// 每个链接最多尝试次数
    #[arg(long)]
    pub retries: Option<u32>,

    /// 浏览器可执行文件
    #[arg(long)]
    pub chrome_binary: Option<String>,

    /// 后端服务地址
    #[arg(long)]
    pub backend_url: Option<String>,

    /// 进度快照文件
    #[arg(long)]
    pub progress_file: Option<PathBuf>,
}

impl Cli {
    /// 把命令行参数写入配置
    pub fn apply(&self, config: &mut Config) {
        if let Some(csv_file) = &self.csv_file {
            config.csv_file = csv_file.clone();
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(max_workers) = self.max_workers {
            config.max_workers = max_workers;
        }
        if let Some(timeout) = self.timeout {
            config.extraction_timeout_secs = timeout;
        }
        if let Some(retries) = self.retries {
            config.max_retries = retries;
        }
        if let Some(chrome_binary) = &self.chrome_binary {
            config.chrome_binary = chrome_binary.clone();
        }
        if let Some(backend_url) = &self.backend_url {
            config.backend_url = backend_url.clone();
        }
        if let Some(progress_file) = &self.progress_file {
            config.progress_file = progress_file.clone();
        }
    }

    /// 按优先级构建最终配置：默认值 → 配置文件 → 环境变量 → 命令行
    pub fn load_config(&self) -> anyhow::Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;
        self.apply(&mut config);
        config.validate()?;
        Ok(config)
    }
}
