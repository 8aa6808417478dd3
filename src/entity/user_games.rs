//! 用户游戏库实体
//!
//! user_games 是账号与游戏目录之间的关联表，承载账号层面的追踪状态。
//! 每条记录的 game_id 必须指向 games 表中的有效记录。

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_games")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    // === 关联 ===
    pub user_id: i64,
    pub game_id: i64,

    // === 追踪状态 ===
    #[sea_orm(column_type = "Text")]
    pub status: String,
    pub rating: Option<f64>,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub platform: Option<String>,

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
        belongs_to = "super::games::Entity",
        from = "Column::GameId",
        to = "super::games::Column::Id"
    )]
    Games,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::games::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Games.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
