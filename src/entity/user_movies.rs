//! 用户电影库实体
//!
//! user_movies 是账号与电影目录之间的关联表，结构与 user_games 对称
//! （电影没有 platform 字段）。

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_movies")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    // === 关联 ===
    pub user_id: i64,
    pub movie_id: i64,

    // === 追踪状态 ===
    #[sea_orm(column_type = "Text")]
    pub status: String,
    pub rating: Option<f64>,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,

    // === 时间戳 ===
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    Users,
    #[sea_orm(
        belongs_to = "super::movies::Entity",
        from = "Column::MovieId",
        to = "super::movies::Column::Id"
    )]
    Movies,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::movies::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Movies.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
