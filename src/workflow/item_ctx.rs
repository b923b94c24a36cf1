//! 链接处理上下文
//!
//! 封装"我正在处理第几个链接"这一信息

use std::fmt::Display;

/// 链接处理上下文
#[derive(Debug, Clone)]
pub struct ItemCtx {
    pub url: String,
    /// 全局序号（从1开始，仅用于日志）
    pub index: usize,
    pub total: usize,
}

impl ItemCtx {
    pub fn new(url: String, index: usize, total: usize) -> Self {
        Self { url, index, total }
    }

    /// 链接最后一段，通常是经纪人 ID
    pub fn agent_id(&self) -> &str {
        self.url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.url)
    }
}

impl Display for ItemCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[链接 {}/{}] {}", self.index, self.total, self.agent_id())
    }
}
