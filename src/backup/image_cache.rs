//! 图片缓存协作方契约
//!
//! 备份引擎不自己抓取或存储图片，只通过这个窄接口访问缓存服务：
//! materialize（确保已缓存并取回字节）、list_all（枚举缓存全集）、
//! restore（批量写回）、stats（统计）。

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::Serialize;
use thiserror::Error;

/// 图片缓存协作方调用失败
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ImageCacheError(pub String);

/// 一张已缓存的图片：缓存文件名 + 原始字节
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedImage {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// 缓存统计信息
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub count: u64,
    pub total_size: u64,
}

/// 批量写回的结果；部分失败以数据形式返回，不作为错误
#[derive(Debug, Clone, Default)]
pub struct CacheRestoreSummary {
    pub restored: u64,
    pub failed: Vec<String>,
}

#[async_trait::async_trait]
pub trait ImageCache: Send + Sync {
    /// 确保 url 对应的图片已缓存，返回其字节内容
    async fn materialize(&self, url: &str) -> Result<Vec<u8>, ImageCacheError>;

    /// 返回当前缓存的全部图片
    async fn list_all(&self) -> Result<Vec<CachedImage>, ImageCacheError>;

    /// 将一批图片写回缓存
    async fn restore(
        &self,
        images: Vec<CachedImage>,
    ) -> Result<CacheRestoreSummary, ImageCacheError>;

    /// 缓存统计
    async fn stats(&self) -> Result<CacheStats, ImageCacheError>;
}

/// 由 URL 推导缓存文件名
///
/// 去掉协议前缀后把路径字符折叠为文件名安全字符，截断到 120 字符。
pub fn cache_filename(url: &str) -> String {
    let trimmed = url
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    let mut name: String = trimmed
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    name.truncate(120);
    name
}

/// 进程内图片缓存
///
/// 以预置的 URL → 字节 数据源模拟抓取，用于测试和单机部署；
/// 生产环境的抓取/存储/淘汰由外部缓存服务实现。
#[derive(Default)]
pub struct MemoryImageCache {
    source: HashMap<String, Vec<u8>>,
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryImageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以预置数据源构造：source 中的 URL 可被 materialize 成功抓取
    pub fn with_source(source: HashMap<String, Vec<u8>>) -> Self {
        Self {
            source,
            entries: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait::async_trait]
impl ImageCache for MemoryImageCache {
    async fn materialize(&self, url: &str) -> Result<Vec<u8>, ImageCacheError> {
        let filename = cache_filename(url);
        if let Some(bytes) = self.entries.read().get(&filename) {
            return Ok(bytes.clone());
        }

        let bytes = self
            .source
            .get(url)
            .cloned()
            .ok_or_else(|| ImageCacheError(format!("图片源不可达: {}", url)))?;

        self.entries.write().insert(filename, bytes.clone());
        Ok(bytes)
    }

    async fn list_all(&self) -> Result<Vec<CachedImage>, ImageCacheError> {
        let entries = self.entries.read();
        let mut images: Vec<CachedImage> = entries
            .iter()
            .map(|(filename, bytes)| CachedImage {
                filename: filename.clone(),
                bytes: bytes.clone(),
            })
            .collect();
        images.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(images)
    }

    async fn restore(
        &self,
        images: Vec<CachedImage>,
    ) -> Result<CacheRestoreSummary, ImageCacheError> {
        let mut entries = self.entries.write();
        let mut summary = CacheRestoreSummary::default();
        for image in images {
            entries.insert(image.filename, image.bytes);
            summary.restored += 1;
        }
        Ok(summary)
    }

    async fn stats(&self) -> Result<CacheStats, ImageCacheError> {
        let entries = self.entries.read();
        Ok(CacheStats {
            count: entries.len() as u64,
            total_size: entries.values().map(|b| b.len() as u64).sum(),
        })
    }
}
