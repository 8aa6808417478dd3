//! 备份/恢复引擎
//!
//! 导出：加载账号数据图 → 提取图片引用 → 分批并发缓存 → 打包为单个 zip 档案。
//! 导入：解析上传档案 → 校验 → 在事务内重建关系数据（ID 重映射）→ 尽力恢复图片缓存。

pub mod archive;
pub mod document;
pub mod error;
pub mod export;
pub mod graph;
pub mod image_cache;
pub mod import;
pub mod progress;

pub use archive::{read_archive, ParsedArchive, ARCHIVE_CONTENT_TYPE};
pub use error::BackupError;
pub use export::{build_backup, BackupPayload, IMAGE_BATCH_SIZE};
pub use image_cache::{CacheStats, CachedImage, ImageCache, MemoryImageCache};
pub use import::{restore_backup, RestoreReport};
pub use progress::{BackupProgress, ProgressSink};
