//! 电影数据仓库
//!
//! 与 GamesRepository 对称：movies 目录表 + user_movies 关联表。

use crate::database::dto::{InsertMovieData, InsertUserMovieData};
use crate::entity::prelude::*;
use crate::entity::{movies, user_movies};
use sea_orm::*;

/// 电影数据仓库
pub struct MoviesRepository;

impl MoviesRepository {
    // ==================== 目录 CRUD 操作 ====================

    /// 插入电影目录记录，返回新分配的 ID
    pub async fn insert<C>(db: &C, movie: InsertMovieData) -> Result<i64, DbErr>
    where
        C: ConnectionTrait,
    {
        let now = chrono::Utc::now().timestamp();

        let movie_active = movies::ActiveModel {
            id: NotSet,
            title: Set(movie.title),
            cover_url: Set(movie.cover_url),
            backdrop_url: Set(movie.backdrop_url),
            artwork_urls: Set(movie.artwork_urls),
            director: Set(movie.director),
            release_date: Set(movie.release_date),
            summary: Set(movie.summary),
            created_at: Set(Some(now)),
            updated_at: Set(Some(now)),
        };

        let result = movie_active.insert(db).await?;
        Ok(result.id)
    }

    /// 根据 ID 查询电影
    pub async fn find_by_id<C>(db: &C, id: i64) -> Result<Option<movies::Model>, DbErr>
    where
        C: ConnectionTrait,
    {
        Movies::find_by_id(id).one(db).await
    }

    /// 获取全部电影目录
    pub async fn find_all<C>(db: &C) -> Result<Vec<movies::Model>, DbErr>
    where
        C: ConnectionTrait,
    {
        Movies::find().order_by_asc(movies::Column::Id).all(db).await
    }

    /// 清空电影目录表
    pub async fn delete_all<C>(db: &C) -> Result<u64, DbErr>
    where
        C: ConnectionTrait,
    {
        Ok(Movies::delete_many().exec(db).await?.rows_affected)
    }

    /// 获取电影总数
    pub async fn count<C>(db: &C) -> Result<u64, DbErr>
    where
        C: ConnectionTrait,
    {
        Movies::find().count(db).await
    }

    // ==================== 用户电影库操作 ====================

    /// 插入用户电影库记录，返回新分配的 ID
    pub async fn insert_user_movie<C>(db: &C, entry: InsertUserMovieData) -> Result<i64, DbErr>
    where
        C: ConnectionTrait,
    {
        let now = chrono::Utc::now().timestamp();

        let entry_active = user_movies::ActiveModel {
            id: NotSet,
            user_id: Set(entry.user_id),
            movie_id: Set(entry.movie_id),
            status: Set(entry.status),
            rating: Set(entry.rating),
            notes: Set(entry.notes),
            created_at: Set(Some(now)),
            updated_at: Set(Some(now)),
        };

        let result = entry_active.insert(db).await?;
        Ok(result.id)
    }

    /// 获取指定账号的全部电影库记录（连同对应的目录记录）
    pub async fn find_user_movies_with_movies<C>(
        db: &C,
        user_id: i64,
    ) -> Result<Vec<(user_movies::Model, Option<movies::Model>)>, DbErr>
    where
        C: ConnectionTrait,
    {
        UserMovies::find()
            .filter(user_movies::Column::UserId.eq(user_id))
            .find_also_related(Movies)
            .order_by_asc(user_movies::Column::Id)
            .all(db)
            .await
    }

    /// 删除指定账号的全部电影库记录
    pub async fn delete_user_movies_by_user<C>(db: &C, user_id: i64) -> Result<u64, DbErr>
    where
        C: ConnectionTrait,
    {
        Ok(UserMovies::delete_many()
            .filter(user_movies::Column::UserId.eq(user_id))
            .exec(db)
            .await?
            .rows_affected)
    }

    /// 获取指定账号的电影库记录数
    pub async fn count_user_movies<C>(db: &C, user_id: i64) -> Result<u64, DbErr>
    where
        C: ConnectionTrait,
    {
        UserMovies::find()
            .filter(user_movies::Column::UserId.eq(user_id))
            .count(db)
            .await
    }
}
