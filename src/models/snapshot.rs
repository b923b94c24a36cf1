use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::models::stats::RunStats;

/// 进度快照：写入磁盘的完整状态，每次覆盖上一份
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub last_update: DateTime<Local>,
    pub stats: RunStats,
    pub config: Config,
}

impl ProgressSnapshot {
    pub fn capture(config: &Config, stats: &RunStats) -> Self {
        Self {
            last_update: Local::now(),
            stats: stats.clone(),
            config: config.clone(),
        }
    }
}
