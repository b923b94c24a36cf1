use std::collections::HashSet;
use std::path::Path;

use tokio::fs;

use crate::error::SourceError;

/// 表头中包含这些关键字（不区分大小写）的列被认为是链接列
const URL_COLUMN_INDICATORS: &[&str] = &["url", "link", "address", "page", "realtor"];

/// 判断字段是否像一个链接
pub fn looks_like_url(field: &str) -> bool {
    let field = field.trim().to_ascii_lowercase();
    field.starts_with("http://") || field.starts_with("https://")
}

/// 从 CSV 文件加载链接列表
pub async fn load_urls_from_csv(csv_path: &Path) -> Result<Vec<String>, SourceError> {
    tracing::info!("📁 正在读取链接列表: {}", csv_path.display());

    let content = fs::read(csv_path).await.map_err(|e| SourceError::Read {
        path: csv_path.to_path_buf(),
        source: e.into(),
    })?;

    let urls = parse_urls(&content).map_err(|source| SourceError::Read {
        path: csv_path.to_path_buf(),
        source,
    })?;

    if urls.is_empty() {
        return Err(SourceError::EmptySource {
            path: csv_path.to_path_buf(),
        });
    }

    tracing::info!("✓ 共读取 {} 个链接", urls.len());
    Ok(urls)
}

/// 解析 CSV 内容
///
/// 第一行第一列是链接时视为无表头，读取每行第一列；
/// 否则第一行是表头，按关键字选择链接列（找不到时用第一列）
pub fn parse_urls(content: &[u8]) -> Result<Vec<String>, csv::Error> {
    let content = content.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(content);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content);

    let mut records = reader.records();
    let first = match records.next() {
        Some(record) => record?,
        None => return Ok(Vec::new()),
    };

    let headerless = first.get(0).is_some_and(looks_like_url);
    let column = if headerless {
        0
    } else {
        detect_url_column(first.iter())
    };
    tracing::debug!("CSV 无表头: {}, 链接列: {}", headerless, column);

    let mut seen = HashSet::new();
    let mut urls = Vec::new();

    let mut push = |value: Option<&str>| {
        if let Some(url) = value.map(str::trim).filter(|v| !v.is_empty()) {
            if seen.insert(url.to_string()) {
                urls.push(url.to_string());
            }
        }
    };

    if headerless {
        push(first.get(column));
    }
    for record in records {
        let record = record?;
        push(record.get(column));
    }

    Ok(urls)
}

/// 根据表头找到链接列
pub fn detect_url_column<'a>(headers: impl IntoIterator<Item = &'a str>) -> usize {
    headers
        .into_iter()
        .position(|name| {
            let name = name.to_lowercase();
            URL_COLUMN_INDICATORS
                .iter()
                .any(|indicator| name.contains(indicator))
        })
        .unwrap_or(0)
}
