//! 电影目录实体
//!
//! movies 表与 games 表对称，同样是全局共享目录。

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::url_list::UrlList;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "movies")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    // === 图片资源 ===
    #[sea_orm(column_type = "Text", nullable)]
    pub cover_url: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub backdrop_url: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub artwork_urls: Option<UrlList>,

    // === 元数据 ===
    #[sea_orm(column_type = "Text", nullable)]
    pub director: Option<String>,
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
    #[sea_orm(has_many = "super::user_movies::Entity")]
    UserMovies,
}

impl Related<super::user_movies::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserMovies.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
