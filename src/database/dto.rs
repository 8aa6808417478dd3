//! 数据传输对象 (DTO)
//!
//! 仓库层插入/更新操作使用的结构定义。

use crate::entity::url_list::UrlList;
use serde::{Deserialize, Serialize};

/// 用于创建账号的数据结构
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InsertUserData {
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
    pub timezone: Option<String>,
    pub theme_preference: Option<String>,
}

/// 账号资料的标量字段覆盖
///
/// 只包含备份档案携带的偏好字段；id、password_hash、created_at 不在其中。
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
    pub timezone: Option<String>,
    pub theme_preference: Option<String>,
}

/// 用于插入游戏目录记录的数据结构
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InsertGameData {
    pub title: String,
    pub cover_url: Option<String>,
    pub banner_url: Option<String>,
    pub screenshot_urls: Option<UrlList>,
    pub developer: Option<String>,
    pub release_date: Option<String>,
    pub summary: Option<String>,
}

/// 用于插入电影目录记录的数据结构
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InsertMovieData {
    pub title: String,
    pub cover_url: Option<String>,
    pub backdrop_url: Option<String>,
    pub artwork_urls: Option<UrlList>,
    pub director: Option<String>,
    pub release_date: Option<String>,
    pub summary: Option<String>,
}

/// 用于插入用户游戏库记录的数据结构
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InsertUserGameData {
    pub user_id: i64,
    pub game_id: i64,
    pub status: String,
    pub rating: Option<f64>,
    pub notes: Option<String>,
    pub platform: Option<String>,
}

/// 用于插入用户电影库记录的数据结构
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InsertUserMovieData {
    pub user_id: i64,
    pub movie_id: i64,
    pub status: String,
    pub rating: Option<f64>,
    pub notes: Option<String>,
}

/// 用于插入外部 API 凭据的数据结构
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InsertCredentialData {
    pub user_id: i64,
    pub provider: String,
    pub api_key: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_at: Option<i64>,
    pub is_active: i32,
}
