//! 数据实体模块
//!
//! 包含所有 SeaORM 实体定义和 JSON 数据结构。

pub mod prelude;

// === JSON 数据结构（嵌入媒体表的 JSON 列）===
pub mod url_list;

// === SeaORM 实体（对应数据库表）===
pub mod api_credentials;
pub mod games;
pub mod movies;
pub mod user_games;
pub mod user_movies;
pub mod users;
