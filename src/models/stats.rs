//! 运行统计与单个链接的处理结果

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// 单个链接的最终结果，每个链接只产生一次
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// 提取成功（后端验证通过）
    Succeeded,
    /// 后端已存在，跳过
    SkippedDuplicate,
    /// 重试耗尽
    Failed(String),
    /// 收到停止信号，中途放弃
    Aborted,
}

/// 失败记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub url: String,
    pub error: String,
}

/// 运行统计
///
/// 只由批次调度器写入；`processed = successful + failed + skipped`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub total: usize,
    pub processed: usize,
    pub successful: usize,
    pub failed: usize,
    pub skipped: usize,
    /// 因停止信号放弃的链接，不计入 processed
    pub aborted: usize,
    pub start_time: Option<DateTime<Local>>,
    pub errors: Vec<FailureRecord>,
}

impl RunStats {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            start_time: Some(Local::now()),
            ..Default::default()
        }
    }

    /// 计入一个链接的最终结果
    pub fn record(&mut self, url: &str, outcome: &ItemOutcome) {
        match outcome {
            ItemOutcome::Succeeded => {
                self.successful += 1;
                self.processed += 1;
            }
            ItemOutcome::SkippedDuplicate => {
                self.skipped += 1;
                self.processed += 1;
            }
            ItemOutcome::Failed(reason) => {
                self.failed += 1;
                self.processed += 1;
                self.errors.push(FailureRecord {
                    url: url.to_string(),
                    error: reason.clone(),
                });
            }
            ItemOutcome::Aborted => {
                self.aborted += 1;
            }
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.processed == self.successful + self.failed + self.skipped
    }

    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.processed)
    }

    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.processed as f64 / self.total as f64 * 100.0
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.processed == 0 {
            0.0
        } else {
            self.successful as f64 / self.processed as f64 * 100.0
        }
    }

    /// 已运行时长
    pub fn elapsed(&self, now: DateTime<Local>) -> chrono::Duration {
        self.start_time
            .map(|start| now - start)
            .unwrap_or_else(chrono::Duration::zero)
    }

    /// 按平均耗时估算剩余时间
    pub fn eta(&self, now: DateTime<Local>) -> Option<chrono::Duration> {
        if self.processed == 0 || self.start_time.is_none() {
            return None;
        }
        let per_item = self.elapsed(now).num_milliseconds() as f64 / self.processed as f64;
        Some(chrono::Duration::milliseconds(
            (per_item * self.remaining() as f64) as i64,
        ))
    }
}

/// 把时长格式化为 H:MM:SS
pub fn format_duration(duration: chrono::Duration) -> String {
    let secs = duration.num_seconds().max(0);
    format!("{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}
