//! 浏览器进程管理
//!
//! 状态机：`NotStarted → Running → StoppingGraceful → Stopped`
//!
//! - `start()`：带扩展启动浏览器，等待片刻后探测调试端口，探测成功才进入 Running
//! - `stop()`：先请求优雅退出，超时后强制结束；幂等

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

use crate::clients::DevToolsClient;
use crate::config::Config;
use crate::error::SupervisorError;
use crate::infrastructure::Shutdown;

/// 浏览器生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserState {
    NotStarted,
    Running,
    StoppingGraceful,
    Stopped,
}

/// 被管理的浏览器进程
#[derive(Debug)]
pub struct BrowserHandle {
    pub pid: Option<u32>,
    pub control_endpoint: String,
    pub state: BrowserState,
}

/// 浏览器启动参数
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub binary: String,
    pub extension_path: PathBuf,
    pub user_data_dir: PathBuf,
    pub devtools_port: u16,
    pub startup_delay: Duration,
    pub stop_timeout: Duration,
    pub ready_check_timeout: Duration,
}

impl LaunchOptions {
    pub fn from_config(config: &Config, binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            extension_path: config.extension_path.clone(),
            user_data_dir: config.user_data_dir.clone(),
            devtools_port: config.devtools_port,
            startup_delay: config.browser_startup_delay(),
            stop_timeout: config.browser_stop_timeout(),
            ready_check_timeout: config.http_timeout(),
        }
    }

    /// 浏览器命令行参数
    pub fn args(&self) -> std::io::Result<Vec<String>> {
        Ok(vec![
            format!("--load-extension={}", absolute(&self.extension_path)?.display()),
            format!("--user-data-dir={}", absolute(&self.user_data_dir)?.display()),
            "--no-first-run".to_string(),
            "--no-default-browser-check".to_string(),
            "--disable-web-security".to_string(),
            "--disable-features=VizDisplayCompositor".to_string(),
            format!("--remote-debugging-port={}", self.devtools_port),
            "--new-window".to_string(),
        ])
    }

    fn control_endpoint(&self) -> String {
        format!("http://localhost:{}", self.devtools_port)
    }
}

fn absolute(path: &Path) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// 浏览器进程管理器
///
/// 每次运行只管理一个浏览器实例，其他模块不直接接触进程
pub struct BrowserSupervisor {
    options: LaunchOptions,
    handle: BrowserHandle,
    child: Option<Child>,
}

impl BrowserSupervisor {
    pub fn new(options: LaunchOptions) -> Self {
        let handle = BrowserHandle {
            pid: None,
            control_endpoint: options.control_endpoint(),
            state: BrowserState::NotStarted,
        };
        Self {
            options,
            handle,
            child: None,
        }
    }

    pub fn state(&self) -> BrowserState {
        self.handle.state
    }

    pub fn handle(&self) -> &BrowserHandle {
        &self.handle
    }

    /// 启动浏览器并确认调试端口可用
    pub async fn start(&mut self, shutdown: &Shutdown) -> Result<(), SupervisorError> {
        if self.handle.state != BrowserState::NotStarted {
            return Err(SupervisorError::AlreadyStarted);
        }

        info!("🚀 正在启动浏览器（加载扩展）...");
        let launch_err = |source| SupervisorError::Launch {
            binary: self.options.binary.clone(),
            source,
        };
        let args = self.options.args().map_err(launch_err)?;
        debug!("启动参数: {} {:?}", self.options.binary, args);

        let child = Command::new(&self.options.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(launch_err)?;
        let pid = child.id();
        self.child = Some(child);

        // 等待浏览器启动
        if shutdown.sleep(self.options.startup_delay).await.is_err() {
            self.discard_child().await;
            return Err(SupervisorError::Interrupted);
        }

        if self.endpoint_ready().await {
            self.handle.pid = pid;
            self.handle.state = BrowserState::Running;
            info!("✓ 浏览器已启动 (PID: {:?})", pid);
            Ok(())
        } else {
            error!("❌ 浏览器调试端口不可访问: {}", self.handle.control_endpoint);
            self.discard_child().await;
            Err(SupervisorError::ControlEndpointUnreachable {
                endpoint: self.handle.control_endpoint.clone(),
            })
        }
    }

    /// 探测调试端口
    async fn endpoint_ready(&self) -> bool {
        let client = match DevToolsClient::new(&self.handle.control_endpoint, self.options.ready_check_timeout)
        {
            Ok(client) => client,
            Err(e) => {
                warn!("创建调试接口客户端失败: {}", e);
                return false;
            }
        };
        match client.list_tabs().await {
            Ok(_) => true,
            Err(e) => {
                debug!("调试端口探测失败: {}", e);
                false
            }
        }
    }

    /// 启动失败时清理进程，状态保持 NotStarted
    async fn discard_child(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill().await {
                debug!("结束启动失败的浏览器进程: {}", e);
            }
        }
    }

    /// 停止浏览器，多次调用安全
    pub async fn stop(&mut self) {
        if self.handle.state == BrowserState::Stopped {
            return;
        }

        let Some(mut child) = self.child.take() else {
            self.handle.state = BrowserState::Stopped;
            return;
        };

        info!("🛑 正在关闭浏览器...");
        self.handle.state = BrowserState::StoppingGraceful;

        if let Err(e) = request_terminate(&mut child) {
            warn!("发送退出信号失败: {}", e);
        }

        let deadline = Instant::now() + self.options.stop_timeout;
        let exited = loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    debug!("浏览器退出: {:?}", status);
                    break true;
                }
                Ok(None) if Instant::now() < deadline => sleep(Duration::from_millis(100)).await,
                Ok(None) => break false,
                Err(e) => {
                    warn!("查询浏览器进程状态失败: {}", e);
                    break false;
                }
            }
        };

        if exited {
            info!("✓ 浏览器已正常关闭");
        } else {
            warn!("⚠️ 浏览器未能正常退出，强制结束...");
            if let Err(e) = child.kill().await {
                warn!("强制结束浏览器失败: {}", e);
            }
        }

        self.handle.pid = None;
        self.handle.state = BrowserState::Stopped;
    }
}

#[cfg(unix)]
fn request_terminate(child: &mut Child) -> std::io::Result<()> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    match child.id() {
        Some(pid) => kill(Pid::from_raw(pid as i32), Signal::SIGTERM).map_err(std::io::Error::from),
        None => Ok(()),
    }
}

#[cfg(not(unix))]
fn request_terminate(child: &mut Child) -> std::io::Result<()> {
    child.start_kill()
}
