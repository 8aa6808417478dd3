//! 账号实体
//!
//! users 表保存账号身份信息和偏好设置。
//! 备份/恢复只覆盖偏好相关的标量字段，id、password_hash 与 created_at 不受影响。

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    // === 身份 ===
    #[sea_orm(column_type = "Text")]
    pub email: String,
    #[sea_orm(column_type = "Text")]
    #[serde(skip_serializing)]
    pub password_hash: String,

    // === 偏好字段 ===
    #[sea_orm(column_type = "Text", nullable)]
    pub first_name: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub last_name: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub avatar_url: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub timezone: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub theme_preference: Option<String>,

    // === 时间戳 ===
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::user_games::Entity")]
    UserGames,
    #[sea_orm(has_many = "super::user_movies::Entity")]
    UserMovies,
    #[sea_orm(has_many = "super::api_credentials::Entity")]
    ApiCredentials,
}

impl Related<super::user_games::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserGames.def()
    }
}

impl Related<super::user_movies::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserMovies.def()
    }
}

impl Related<super::api_credentials::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ApiCredentials.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
