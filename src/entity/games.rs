//! 游戏目录实体
//!
//! games 表是全局共享的媒体目录，不属于任何单一账号；
//! 账号层面的状态（进度、评分等）在 user_games 关联表中。

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::url_list::UrlList;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "games")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    // === 图片资源 ===
    #[sea_orm(column_type = "Text", nullable)]
    pub cover_url: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub banner_url: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub screenshot_urls: Option<UrlList>,

    // === 元数据 ===
    #[sea_orm(column_type = "Text", nullable)]
    pub developer: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub release_date: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub summary: Option<String>,

    // === 时间戳 ===
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::user_games::Entity")]
    UserGames,
}

impl Related<super::user_games::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserGames.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
