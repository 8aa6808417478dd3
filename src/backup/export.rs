//! 备份导出流水线
//!
//! 加载数据图 → 提取图片 URL → 分批并发物化 → 读取缓存全集 →
//! 组装文档与清单 → 打包为 zip 字节流，全程上报阶段进度。

use std::collections::BTreeSet;
use std::sync::Arc;

use sea_orm::DatabaseConnection;
use tokio::task::JoinSet;

use crate::backup::archive::{self, ARCHIVE_CONTENT_TYPE};
use crate::backup::document::{self, BackupDocument};
use crate::backup::error::BackupError;
use crate::backup::graph;
use crate::backup::image_cache::ImageCache;
use crate::backup::progress::{notify, stage, BackupProgress, ProgressSink};

/// 每批并发物化的图片数量上限
pub const IMAGE_BATCH_SIZE: usize = 5;

/// 导出结果：可直接作为下载响应的档案载荷
#[derive(Debug, Clone)]
pub struct BackupPayload {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
    /// 物化失败、因此缺席于档案的图片 URL
    pub failed_urls: Vec<String>,
}

/// 为指定账号构建完整备份档案
///
/// 单个图片物化失败只会让该图片缺席，不会中止导出；
/// 数据加载与打包失败则中止整个构建。
pub async fn build_backup(
    db: &DatabaseConnection,
    cache: &Arc<dyn ImageCache>,
    user_id: i64,
    progress: Option<&ProgressSink>,
) -> Result<BackupPayload, BackupError> {
    // 1. 加载数据图
    let graph = graph::load_user_graph(db, user_id).await?;
    notify(
        progress,
        BackupProgress::new(stage::DATA_FETCH, 1, 1).with_message(format!(
            "账号数据加载完成：{} 个游戏库记录，{} 个电影库记录",
            graph.user_games.len(),
            graph.user_movies.len()
        )),
    );

    // 2. 提取图片引用
    let urls = graph::collect_image_urls(&graph);
    notify(
        progress,
        BackupProgress::new(stage::IMAGE_COLLECTION, 1, 1)
            .with_message(format!("共发现 {} 个图片地址", urls.len())),
    );

    // 3. 分批并发物化
    let failed_urls = materialize_in_batches(cache, &urls, progress).await;

    // 4. 读取缓存全集（含此前运行已缓存的图片，档案有意收录全部）
    let images = cache
        .list_all()
        .await
        .map_err(|e| BackupError::BuildFailed(format!("读取图片缓存失败: {}", e)))?;

    // 5. 组装数据文档
    let backup_document = BackupDocument::assemble(&graph, images.len());

    // 6. 组装清单
    let metadata = backup_document
        .metadata
        .as_ref()
        .expect("assemble 总是写入 metadata");
    let manifest = document::render_manifest(metadata);

    // 7. 流式打包
    let bytes = archive::write_archive(&backup_document, &manifest, &images, progress)?;
    notify(
        progress,
        BackupProgress::new(stage::COMPLETE, 1, 1).with_message("备份打包完成"),
    );

    log::info!(
        "账号 {} 备份完成：{} 字节，{} 张图片，{} 个图片地址物化失败",
        user_id,
        bytes.len(),
        images.len(),
        failed_urls.len()
    );

    let filename = format!(
        "media-vault-backup-{}.zip",
        chrono::Local::now().format("%Y-%m-%d")
    );

    Ok(BackupPayload {
        filename,
        content_type: ARCHIVE_CONTENT_TYPE,
        bytes,
        failed_urls,
    })
}

/// 把 URL 集合切成固定大小的批次并发物化
///
/// 批内并发、批间严格串行：第 n+1 批在第 n 批全部落定（成功或失败）
/// 之前不会开始。返回物化失败的 URL 列表。
async fn materialize_in_batches(
    cache: &Arc<dyn ImageCache>,
    urls: &BTreeSet<String>,
    progress: Option<&ProgressSink>,
) -> Vec<String> {
    let urls: Vec<String> = urls.iter().cloned().collect();
    let total = urls.len() as u64;
    let mut cached = 0u64;
    let mut failed = Vec::new();

    for batch in urls.chunks(IMAGE_BATCH_SIZE) {
        let mut tasks = JoinSet::new();
        for url in batch {
            let cache = Arc::clone(cache);
            let url = url.clone();
            tasks.spawn(async move {
                let outcome = cache.materialize(&url).await.map(|_| ());
                (url, outcome)
            });
        }

        // 等待本批全部落定后才进入下一批
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(()))) => cached += 1,
                Ok((url, Err(e))) => {
                    log::warn!("图片物化失败，档案中将缺少该图片: {} ({})", url, e);
                    failed.push(url);
                }
                Err(e) => log::warn!("图片物化任务异常退出: {}", e),
            }
        }

        notify(
            progress,
            BackupProgress::new(stage::IMAGE_CACHING, cached, total)
                .with_message(format!("已缓存 {}/{} 张图片", cached, total)),
        );
    }

    failed
}
