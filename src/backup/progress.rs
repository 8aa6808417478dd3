//! 备份进度通知
//!
//! 单向通知通道：阶段名 + 计数 + 百分比 + 消息。
//! 没有背压，消费方跟不上只会错过中间通知，不会阻塞流水线。

use serde::Serialize;

/// 备份流水线的阶段名
pub mod stage {
    pub const DATA_FETCH: &str = "data-fetch";
    pub const IMAGE_COLLECTION: &str = "image-collection";
    pub const IMAGE_CACHING: &str = "image-caching";
    pub const PACKAGING: &str = "packaging";
    pub const COMPLETE: &str = "complete";
}

/// 进度载荷
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupProgress {
    pub stage: String,
    pub current: u64,
    pub total: u64,
    pub percent: f64,
    pub message: String,
}

impl BackupProgress {
    pub fn new(stage: impl Into<String>, current: u64, total: u64) -> Self {
        let total_safe = total.max(1);
        let percent = (current as f64 / total_safe as f64) * 100.0;
        Self {
            stage: stage.into(),
            current,
            total,
            percent: percent.min(100.0),
            message: String::new(),
        }
    }

    pub fn with_message(mut self, msg: impl Into<String>) -> Self {
        self.message = msg.into();
        self
    }
}

/// 可选的进度回调
pub type ProgressSink = dyn Fn(BackupProgress) + Send + Sync;

/// 回调存在时发送进度通知，否则为空操作
pub fn notify(sink: Option<&ProgressSink>, progress: BackupProgress) {
    if let Some(sink) = sink {
        sink(progress);
    }
}
