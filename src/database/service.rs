//! 数据服务层
//!
//! 供上层（HTTP 路由等）调用的门面。引擎内部的类型化错误在这里
//! 转换为面向调用方的载荷。

use std::sync::Arc;

use sea_orm::DatabaseConnection;
use serde::Serialize;

use crate::backup::archive::read_archive;
use crate::backup::error::BackupError;
use crate::backup::export::{build_backup, BackupPayload};
use crate::backup::image_cache::{CacheStats, ImageCache};
use crate::backup::import::{restore_backup, RestoreReport};
use crate::backup::progress::ProgressSink;

/// 导入失败时返回的错误载荷
#[derive(Debug, Clone, Serialize)]
pub struct BackupFailure {
    pub message: String,
    #[serde(rename = "error", skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl From<BackupError> for BackupFailure {
    fn from(err: BackupError) -> Self {
        let detail = match &err {
            BackupError::RestoreFailed(db_err) => Some(db_err.to_string()),
            _ => None,
        };
        Self {
            message: err.to_string(),
            detail,
        }
    }
}

/// 导出指定账号的备份档案（下载触发器）
pub async fn export_backup(
    db: &DatabaseConnection,
    cache: &Arc<dyn ImageCache>,
    user_id: i64,
    progress: Option<&ProgressSink>,
) -> Result<BackupPayload, String> {
    log::info!("开始导出账号 {} 的备份", user_id);
    build_backup(db, cache, user_id, progress)
        .await
        .map_err(|e| format!("导出备份失败: {}", e))
}

/// 导入上传的备份档案并恢复到指定账号（上传触发器）
pub async fn import_backup(
    db: &DatabaseConnection,
    cache: &Arc<dyn ImageCache>,
    user_id: i64,
    data: &[u8],
) -> Result<RestoreReport, BackupFailure> {
    log::info!("开始导入账号 {} 的备份（{} 字节）", user_id, data.len());

    // 解析与校验在任何数据库写入之前完成
    let parsed = read_archive(data).map_err(BackupFailure::from)?;

    restore_backup(db, cache, user_id, parsed)
        .await
        .map_err(BackupFailure::from)
}

/// 获取图片缓存统计信息
pub async fn cache_stats(cache: &Arc<dyn ImageCache>) -> Result<CacheStats, String> {
    cache
        .stats()
        .await
        .map_err(|e| format!("获取图片缓存统计失败: {}", e))
}
