//! 备份/恢复引擎错误分类

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackupError {
    /// 加载数据图时账号不存在
    #[error("账号不存在: {0}")]
    NotFound(i64),

    /// 导出流水线失败（数据加载、序列化或打包 I/O）
    #[error("备份构建失败: {0}")]
    BuildFailed(String),

    /// 上传的档案无法作为容器打开或遍历
    #[error("备份档案已损坏: {0}")]
    CorruptArchive(String),

    /// 档案可以打开，但缺少必需段或数据条目格式错误
    #[error("备份档案内容无效: {0}")]
    InvalidArchive(String),

    /// 关系数据恢复失败，事务已回滚
    #[error("数据恢复失败: {0}")]
    RestoreFailed(sea_orm::DbErr),
}
