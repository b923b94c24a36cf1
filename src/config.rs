use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// 重试间隔策略
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetryPolicy {
    /// 固定间隔
    #[default]
    Fixed,
    /// 每次翻倍，上限 60 秒
    Exponential,
}

/// 程序配置
///
/// 运行开始前构建一次，运行期间只读
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 链接列表 CSV 文件
    pub csv_file: PathBuf,
    /// 后端服务地址
    pub backend_url: String,
    /// 进度快照文件
    pub progress_file: PathBuf,
    /// 日志目录
    pub log_dir: PathBuf,
    /// 临时文件目录
    pub temp_dir: PathBuf,

    // --- 处理参数 ---
    /// 每批链接数量
    pub batch_size: usize,
    /// 批内最大并发数
    pub max_workers: usize,
    /// 相邻任务启动间隔（秒）
    pub tab_delay_secs: f64,
    /// 单个链接提取等待时间（秒）
    pub extraction_timeout_secs: u64,
    /// 每个链接最多尝试次数
    pub max_retries: u32,
    /// 重试间隔（秒）
    pub retry_delay_secs: f64,
    pub retry_policy: RetryPolicy,
    /// 触发提取后等待多久再去后端验证（秒）
    pub verify_delay_secs: f64,
    /// 批次之间的停顿（秒）
    pub batch_delay_secs: f64,
    /// 后端和调试端口请求超时（秒）
    pub http_timeout_secs: u64,

    // --- 浏览器配置 ---
    pub chrome_binary: String,
    /// 扩展目录（包含 manifest.json）
    pub extension_path: PathBuf,
    /// 专用的浏览器用户目录
    pub user_data_dir: PathBuf,
    /// 浏览器调试端口
    pub devtools_port: u16,
    /// 浏览器启动后等待多久再探测调试端口（秒）
    pub browser_startup_delay_secs: f64,
    /// 优雅退出的最长等待时间（秒）
    pub browser_stop_timeout_secs: u64,
    /// 备用触发脚本
    pub helper_script: PathBuf,

    /// 每处理多少个链接保存一次进度
    pub progress_save_interval: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            csv_file: PathBuf::from("links.csv"),
            backend_url: "http://localhost:5001".to_string(),
            progress_file: PathBuf::from("batch_progress.json"),
            log_dir: PathBuf::from("logs"),
            temp_dir: PathBuf::from("temp"),
            batch_size: 5,
            max_workers: 3,
            tab_delay_secs: 2.0,
            extraction_timeout_secs: 30,
            max_retries: 3,
            retry_delay_secs: 5.0,
            retry_policy: RetryPolicy::Fixed,
            verify_delay_secs: 2.0,
            batch_delay_secs: 3.0,
            http_timeout_secs: 5,
            chrome_binary: "google-chrome".to_string(),
            extension_path: PathBuf::from("./"),
            user_data_dir: PathBuf::from("./temp/chrome_batch_profile"),
            devtools_port: 9222,
            browser_startup_delay_secs: 5.0,
            browser_stop_timeout_secs: 10,
            helper_script: PathBuf::from("./tab_opener.sh"),
            progress_save_interval: 10,
        }
    }
}

impl Config {
    /// 加载配置：默认值 → TOML 文件（可选）→ 环境变量
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match config_file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    /// 从 TOML 文件读取，缺省字段使用默认值
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// 用环境变量覆盖
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Some(v) = env_parse("CSV_FILE")? {
            self.csv_file = v;
        }
        if let Ok(v) = std::env::var("BACKEND_URL") {
            self.backend_url = v;
        }
        if let Some(v) = env_parse("PROGRESS_FILE")? {
            self.progress_file = v;
        }
        if let Some(v) = env_parse("BATCH_SIZE")? {
            self.batch_size = v;
        }
        if let Some(v) = env_parse("MAX_WORKERS")? {
            self.max_workers = v;
        }
        if let Some(v) = env_parse("EXTRACTION_TIMEOUT")? {
            self.extraction_timeout_secs = v;
        }
        if let Some(v) = env_parse("MAX_RETRIES")? {
            self.max_retries = v;
        }
        if let Some(v) = env_parse("RETRY_DELAY")? {
            self.retry_delay_secs = v;
        }
        if let Ok(v) = std::env::var("CHROME_BINARY") {
            self.chrome_binary = v;
        }
        if let Some(v) = env_parse("DEVTOOLS_PORT")? {
            self.devtools_port = v;
        }
        Ok(())
    }

    /// 校验不变量
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size < 1 {
            return Err(ConfigError::Invalid("batch_size 必须 >= 1".to_string()));
        }
        if self.max_workers < 1 {
            return Err(ConfigError::Invalid("max_workers 必须 >= 1".to_string()));
        }
        if self.backend_url.trim().is_empty() {
            return Err(ConfigError::Invalid("backend_url 不能为空".to_string()));
        }
        if self.chrome_binary.trim().is_empty() {
            return Err(ConfigError::Invalid("chrome_binary 不能为空".to_string()));
        }
        for (name, secs) in [
            ("tab_delay_secs", self.tab_delay_secs),
            ("retry_delay_secs", self.retry_delay_secs),
            ("verify_delay_secs", self.verify_delay_secs),
            ("batch_delay_secs", self.batch_delay_secs),
            ("browser_startup_delay_secs", self.browser_startup_delay_secs),
        ] {
            // 必须能换算成 Duration
            if Duration::try_from_secs_f64(secs).is_err() {
                return Err(ConfigError::Invalid(format!(
                    "{} 必须是非负且有限的秒数, 当前值: {}",
                    name, secs
                )));
            }
        }
        Ok(())
    }

    pub fn tab_delay(&self) -> Duration {
        Duration::from_secs_f64(self.tab_delay_secs)
    }

    pub fn extraction_timeout(&self) -> Duration {
        Duration::from_secs(self.extraction_timeout_secs)
    }

    pub fn verify_delay(&self) -> Duration {
        Duration::from_secs_f64(self.verify_delay_secs)
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_secs_f64(self.batch_delay_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn browser_startup_delay(&self) -> Duration {
        Duration::from_secs_f64(self.browser_startup_delay_secs)
    }

    pub fn browser_stop_timeout(&self) -> Duration {
        Duration::from_secs(self.browser_stop_timeout_secs)
    }

    /// 第 `attempt` 次失败后的等待时间（attempt 从 1 开始）
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let base = Duration::from_secs_f64(self.retry_delay_secs);
        match self.retry_policy {
            RetryPolicy::Fixed => base,
            RetryPolicy::Exponential => {
                let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
                base.saturating_mul(factor).min(Duration::from_secs(60))
            }
        }
    }

    /// 浏览器调试接口地址
    pub fn devtools_url(&self) -> String {
        format!("http://localhost:{}", self.devtools_port)
    }
}

fn env_parse<T: std::str::FromStr>(var_name: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(var_name) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
            }),
        Err(_) => Ok(None),
    }
}
