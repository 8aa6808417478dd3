//! 游戏数据仓库
//!
//! 覆盖两张表：全局共享的 games 目录表和账号层面的 user_games 关联表。
//! 方法对连接类型做了泛化，既可以在普通连接上调用，也可以在事务中调用。

use crate::database::dto::{InsertGameData, InsertUserGameData};
use crate::entity::prelude::*;
use crate::entity::{games, user_games};
use sea_orm::*;

/// 游戏数据仓库
pub struct GamesRepository;

impl GamesRepository {
    // ==================== 目录 CRUD 操作 ====================

    /// 插入游戏目录记录，返回新分配的 ID
    pub async fn insert<C>(db: &C, game: InsertGameData) -> Result<i64, DbErr>
    where
        C: ConnectionTrait,
    {
        let now = chrono::Utc::now().timestamp();

        let game_active = games::ActiveModel {
            id: NotSet,
            title: Set(game.title),
            cover_url: Set(game.cover_url),
            banner_url: Set(game.banner_url),
            screenshot_urls: Set(game.screenshot_urls),
            developer: Set(game.developer),
            release_date: Set(game.release_date),
            summary: Set(game.summary),
            created_at: Set(Some(now)),
            updated_at: Set(Some(now)),
        };

        let result = game_active.insert(db).await?;
        Ok(result.id)
    }

    /// 根据 ID 查询游戏
    pub async fn find_by_id<C>(db: &C, id: i64) -> Result<Option<games::Model>, DbErr>
    where
        C: ConnectionTrait,
    {
        Games::find_by_id(id).one(db).await
    }

    /// 获取全部游戏目录
    pub async fn find_all<C>(db: &C) -> Result<Vec<games::Model>, DbErr>
    where
        C: ConnectionTrait,
    {
        Games::find().order_by_asc(games::Column::Id).all(db).await
    }

    /// 清空游戏目录表
    pub async fn delete_all<C>(db: &C) -> Result<u64, DbErr>
    where
        C: ConnectionTrait,
    {
        Ok(Games::delete_many().exec(db).await?.rows_affected)
    }

    /// 获取游戏总数
    pub async fn count<C>(db: &C) -> Result<u64, DbErr>
    where
        C: ConnectionTrait,
    {
        Games::find().count(db).await
    }

    // ==================== 用户游戏库操作 ====================

    /// 插入用户游戏库记录，返回新分配的 ID
    pub async fn insert_user_game<C>(db: &C, entry: InsertUserGameData) -> Result<i64, DbErr>
    where
        C: ConnectionTrait,
    {
        let now = chrono::Utc::now().timestamp();

        let entry_active = user_games::ActiveModel {
            id: NotSet,
            user_id: Set(entry.user_id),
            game_id: Set(entry.game_id),
            status: Set(entry.status),
            rating: Set(entry.rating),
            notes: Set(entry.notes),
            platform: Set(entry.platform),
            created_at: Set(Some(now)),
            updated_at: Set(Some(now)),
        };

        let result = entry_active.insert(db).await?;
        Ok(result.id)
    }

    /// 获取指定账号的全部游戏库记录（连同对应的目录记录）
    pub async fn find_user_games_with_games<C>(
        db: &C,
        user_id: i64,
    ) -> Result<Vec<(user_games::Model, Option<games::Model>)>, DbErr>
    where
        C: ConnectionTrait,
    {
        UserGames::find()
            .filter(user_games::Column::UserId.eq(user_id))
            .find_also_related(Games)
            .order_by_asc(user_games::Column::Id)
            .all(db)
            .await
    }

    /// 删除指定账号的全部游戏库记录
    pub async fn delete_user_games_by_user<C>(db: &C, user_id: i64) -> Result<u64, DbErr>
    where
        C: ConnectionTrait,
    {
        Ok(UserGames::delete_many()
            .filter(user_games::Column::UserId.eq(user_id))
            .exec(db)
            .await?
            .rows_affected)
    }

    /// 获取指定账号的游戏库记录数
    pub async fn count_user_games<C>(db: &C, user_id: i64) -> Result<u64, DbErr>
    where
        C: ConnectionTrait,
    {
        UserGames::find()
            .filter(user_games::Column::UserId.eq(user_id))
            .count(db)
            .await
    }
}
