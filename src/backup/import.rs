//! 备份恢复流水线
//!
//! 先清除目标账号的旧数据与全库媒体目录（独立提交），再在单个事务内
//! 重建档案中的关系数据：媒体条目以新 ID 重建，库记录通过旧 ID → 新 ID
//! 映射表翻译引用，凭据强制绑定目标账号。事务提交后尽力恢复图片缓存。

use std::collections::HashMap;
use std::sync::Arc;

use sea_orm::{ConnectionTrait, DatabaseConnection, TransactionTrait};
use serde::Serialize;

use crate::backup::archive::ParsedArchive;
use crate::backup::error::BackupError;
use crate::backup::image_cache::{CachedImage, ImageCache};
use crate::database::repository::{
    credentials_repository::CredentialsRepository, games_repository::GamesRepository,
    movies_repository::MoviesRepository, users_repository::UsersRepository,
};

/// 恢复结果计数报告
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreReport {
    pub games_restored: u64,
    pub movies_restored: u64,
    pub user_games_restored: u64,
    pub user_movies_restored: u64,
    pub credentials_restored: u64,
    pub images_restored: u64,
    /// 因引用的媒体条目缺席档案而被丢弃的库记录数
    pub entries_skipped: u64,
    /// 图片缓存恢复的失败信息；关系数据恢复成功时不会因此报错
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_restore_error: Option<String>,
}

/// 将解析后的档案恢复到目标账号
pub async fn restore_backup(
    db: &DatabaseConnection,
    cache: &Arc<dyn ImageCache>,
    user_id: i64,
    parsed: ParsedArchive,
) -> Result<RestoreReport, BackupError> {
    // 目标账号必须存在
    UsersRepository::find_by_id(db, user_id)
        .await
        .map_err(BackupError::RestoreFailed)?
        .ok_or(BackupError::NotFound(user_id))?;

    // 阶段一：清除旧数据，独立提交。
    // 之后的重建失败只回滚重建本身，这里删掉的数据不会被找回。
    let txn = db.begin().await.map_err(BackupError::RestoreFailed)?;
    clear_existing(&txn, user_id)
        .await
        .map_err(BackupError::RestoreFailed)?;
    txn.commit().await.map_err(BackupError::RestoreFailed)?;

    // 阶段二：在单个事务内重建关系数据
    let txn = db.begin().await.map_err(BackupError::RestoreFailed)?;
    let mut report = match apply_restore(&txn, user_id, &parsed).await {
        Ok(report) => {
            txn.commit().await.map_err(BackupError::RestoreFailed)?;
            report
        }
        Err(e) => {
            let _ = txn.rollback().await;
            return Err(e);
        }
    };

    log::info!(
        "账号 {} 关系数据恢复完成：{} 个游戏，{} 部电影，{} + {} 条库记录，{} 份凭据，跳过 {} 条",
        user_id,
        report.games_restored,
        report.movies_restored,
        report.user_games_restored,
        report.user_movies_restored,
        report.credentials_restored,
        report.entries_skipped
    );

    // 提交之后：尽力恢复图片缓存，失败只记录在报告里
    if !parsed.images.is_empty() {
        let images: Vec<CachedImage> = parsed
            .images
            .into_iter()
            .map(|image| CachedImage {
                filename: image.filename,
                bytes: image.bytes,
            })
            .collect();

        match cache.restore(images).await {
            Ok(summary) => {
                report.images_restored = summary.restored;
                if !summary.failed.is_empty() {
                    report.image_restore_error =
                        Some(format!("{} 张图片写回缓存失败", summary.failed.len()));
                }
            }
            Err(e) => {
                log::warn!("图片缓存恢复失败（关系数据已恢复）: {}", e);
                report.image_restore_error = Some(e.to_string());
            }
        }
    }

    Ok(report)
}

/// 删除目标账号的库记录与凭据，并清空全库媒体目录
///
/// 媒体目录的删除不限于目标账号引用的条目，而是两张目录表整体清空，
/// 与既有档案格式的恢复语义保持一致。
async fn clear_existing<C>(db: &C, user_id: i64) -> Result<(), sea_orm::DbErr>
where
    C: ConnectionTrait,
{
    GamesRepository::delete_user_games_by_user(db, user_id).await?;
    MoviesRepository::delete_user_movies_by_user(db, user_id).await?;
    CredentialsRepository::delete_by_user(db, user_id).await?;
    GamesRepository::delete_all(db).await?;
    MoviesRepository::delete_all(db).await?;
    Ok(())
}

/// 在事务内重建档案携带的关系数据
async fn apply_restore<C>(
    txn: &C,
    user_id: i64,
    parsed: &ParsedArchive,
) -> Result<RestoreReport, BackupError>
where
    C: ConnectionTrait,
{
    let mut report = RestoreReport::default();

    // 覆盖账号资料的标量字段
    UsersRepository::overwrite_profile(txn, user_id, parsed.user.to_profile_update())
        .await
        .map_err(BackupError::RestoreFailed)?;

    // 重建媒体目录，记录旧 ID → 新 ID 映射（仅本次恢复内有效）
    let mut game_id_map: HashMap<i64, i64> = HashMap::new();
    for game in &parsed.document.games {
        let new_id = GamesRepository::insert(txn, game.to_insert())
            .await
            .map_err(BackupError::RestoreFailed)?;
        game_id_map.insert(game.id, new_id);
        report.games_restored += 1;
    }

    let mut movie_id_map: HashMap<i64, i64> = HashMap::new();
    for movie in &parsed.document.movies {
        let new_id = MoviesRepository::insert(txn, movie.to_insert())
            .await
            .map_err(BackupError::RestoreFailed)?;
        movie_id_map.insert(movie.id, new_id);
        report.movies_restored += 1;
    }

    // 重建库记录：引用经映射表翻译；没有映射的记录静默跳过，绝不悬挂
    for entry in &parsed.document.user_games {
        match game_id_map.get(&entry.game_id) {
            Some(&new_game_id) => {
                GamesRepository::insert_user_game(txn, entry.to_insert(user_id, new_game_id))
                    .await
                    .map_err(BackupError::RestoreFailed)?;
                report.user_games_restored += 1;
            }
            None => {
                log::warn!("档案中缺少游戏条目 {}，跳过其库记录", entry.game_id);
                report.entries_skipped += 1;
            }
        }
    }

    for entry in &parsed.document.user_movies {
        match movie_id_map.get(&entry.movie_id) {
            Some(&new_movie_id) => {
                MoviesRepository::insert_user_movie(txn, entry.to_insert(user_id, new_movie_id))
                    .await
                    .map_err(BackupError::RestoreFailed)?;
                report.user_movies_restored += 1;
            }
            None => {
                log::warn!("档案中缺少电影条目 {}，跳过其库记录", entry.movie_id);
                report.entries_skipped += 1;
            }
        }
    }

    // 重建凭据，强制绑定目标账号
    for credential in &parsed.credentials {
        CredentialsRepository::insert(txn, credential.to_insert(user_id))
            .await
            .map_err(BackupError::RestoreFailed)?;
        report.credentials_restored += 1;
    }

    Ok(report)
}
