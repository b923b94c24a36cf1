use std::process::ExitCode;

use anyhow::Result;
use batch_url_processor::cli::Cli;
use batch_url_processor::infrastructure::Shutdown;
use batch_url_processor::orchestrator::{App, RunStatus};
use clap::Parser;

/// 被用户中断时的退出码
const EXIT_INTERRUPTED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(RunStatus::Completed) => ExitCode::SUCCESS,
        Ok(RunStatus::Interrupted) => ExitCode::from(EXIT_INTERRUPTED),
        Err(e) => {
            eprintln!("❌ {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<RunStatus> {
    // 加载配置
    let cli = Cli::parse();
    let config = cli.load_config()?;

    let shutdown = Shutdown::new();
    shutdown.install_signal_handlers()?;

    // 初始化并运行应用
    let app = App::initialize(config, shutdown)?;
    Ok(app.run().await?)
}
