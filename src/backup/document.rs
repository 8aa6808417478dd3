//! 备份档案数据文档
//!
//! 档案内数据条目（backup-data.json）的结构定义。字段名统一为 camelCase，
//! 与既有档案保持跨实现兼容。ID 以 i64 原样写入 JSON；
//! 以双精度浮点解析该文档的消费方在 2^53 以上会丢失精度。

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::backup::graph::UserDataGraph;
use crate::database::dto::{
    InsertCredentialData, InsertGameData, InsertMovieData, InsertUserGameData,
    InsertUserMovieData, ProfileUpdate,
};
use crate::entity::url_list::UrlList;
use crate::entity::{api_credentials, games, movies, user_games, user_movies, users};

/// 档案格式版本
pub const ARCHIVE_FORMAT_VERSION: &str = "1.0";

/// 元数据块：格式版本、创建时间与各类条目计数
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupMetadata {
    pub version: String,
    pub created: String,
    pub total_games: u64,
    pub total_movies: u64,
    pub user_games_count: u64,
    pub user_movies_count: u64,
    pub total_images: u64,
}

/// 账号资料段
///
/// 仅标量偏好字段；password_hash 永不入档。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfileData {
    pub id: i64,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
    pub timezone: Option<String>,
    pub theme_preference: Option<String>,
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
}

impl From<&users::Model> for UserProfileData {
    fn from(user: &users::Model) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            avatar_url: user.avatar_url.clone(),
            timezone: user.timezone.clone(),
            theme_preference: user.theme_preference.clone(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

impl UserProfileData {
    /// 恢复时用于覆盖目标账号资料的标量字段
    pub fn to_profile_update(&self) -> ProfileUpdate {
        ProfileUpdate {
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            avatar_url: self.avatar_url.clone(),
            timezone: self.timezone.clone(),
            theme_preference: self.theme_preference.clone(),
        }
    }
}

/// 游戏目录条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameData {
    pub id: i64,
    pub title: String,
    pub cover_url: Option<String>,
    pub banner_url: Option<String>,
    #[serde(default)]
    pub screenshot_urls: Vec<String>,
    pub developer: Option<String>,
    pub release_date: Option<String>,
    pub summary: Option<String>,
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
}

impl From<&games::Model> for GameData {
    fn from(game: &games::Model) -> Self {
        Self {
            id: game.id,
            title: game.title.clone(),
            cover_url: game.cover_url.clone(),
            banner_url: game.banner_url.clone(),
            screenshot_urls: game
                .screenshot_urls
                .clone()
                .map(|urls| urls.0)
                .unwrap_or_default(),
            developer: game.developer.clone(),
            release_date: game.release_date.clone(),
            summary: game.summary.clone(),
            created_at: game.created_at,
            updated_at: game.updated_at,
        }
    }
}

impl GameData {
    pub fn to_insert(&self) -> InsertGameData {
        InsertGameData {
            title: self.title.clone(),
            cover_url: self.cover_url.clone(),
            banner_url: self.banner_url.clone(),
            screenshot_urls: if self.screenshot_urls.is_empty() {
                None
            } else {
                Some(UrlList(self.screenshot_urls.clone()))
            },
            developer: self.developer.clone(),
            release_date: self.release_date.clone(),
            summary: self.summary.clone(),
        }
    }
}

/// 电影目录条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieData {
    pub id: i64,
    pub title: String,
    pub cover_url: Option<String>,
    pub backdrop_url: Option<String>,
    #[serde(default)]
    pub artwork_urls: Vec<String>,
    pub director: Option<String>,
    pub release_date: Option<String>,
    pub summary: Option<String>,
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
}

impl From<&movies::Model> for MovieData {
    fn from(movie: &movies::Model) -> Self {
        Self {
            id: movie.id,
            title: movie.title.clone(),
            cover_url: movie.cover_url.clone(),
            backdrop_url: movie.backdrop_url.clone(),
            artwork_urls: movie
                .artwork_urls
                .clone()
                .map(|urls| urls.0)
                .unwrap_or_default(),
            director: movie.director.clone(),
            release_date: movie.release_date.clone(),
            summary: movie.summary.clone(),
            created_at: movie.created_at,
            updated_at: movie.updated_at,
        }
    }
}

impl MovieData {
    pub fn to_insert(&self) -> InsertMovieData {
        InsertMovieData {
            title: self.title.clone(),
            cover_url: self.cover_url.clone(),
            backdrop_url: self.backdrop_url.clone(),
            artwork_urls: if self.artwork_urls.is_empty() {
                None
            } else {
                Some(UrlList(self.artwork_urls.clone()))
            },
            director: self.director.clone(),
            release_date: self.release_date.clone(),
            summary: self.summary.clone(),
        }
    }
}

/// 用户游戏库条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserGameData {
    pub id: i64,
    pub user_id: i64,
    pub game_id: i64,
    pub status: String,
    pub rating: Option<f64>,
    pub notes: Option<String>,
    pub platform: Option<String>,
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
}

impl From<&user_games::Model> for UserGameData {
    fn from(entry: &user_games::Model) -> Self {
        Self {
            id: entry.id,
            user_id: entry.user_id,
            game_id: entry.game_id,
            status: entry.status.clone(),
            rating: entry.rating,
            notes: entry.notes.clone(),
            platform: entry.platform.clone(),
            created_at: entry.created_at,
            updated_at: entry.updated_at,
        }
    }
}

impl UserGameData {
    /// 转换为插入数据；game_id 已经过 ID 重映射，user_id 强制为目标账号
    pub fn to_insert(&self, user_id: i64, game_id: i64) -> InsertUserGameData {
        InsertUserGameData {
            user_id,
            game_id,
            status: self.status.clone(),
            rating: self.rating,
            notes: self.notes.clone(),
            platform: self.platform.clone(),
        }
    }
}

/// 用户电影库条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserMovieData {
    pub id: i64,
    pub user_id: i64,
    pub movie_id: i64,
    pub status: String,
    pub rating: Option<f64>,
    pub notes: Option<String>,
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
}

impl From<&user_movies::Model> for UserMovieData {
    fn from(entry: &user_movies::Model) -> Self {
        Self {
            id: entry.id,
            user_id: entry.user_id,
            movie_id: entry.movie_id,
            status: entry.status.clone(),
            rating: entry.rating,
            notes: entry.notes.clone(),
            created_at: entry.created_at,
            updated_at: entry.updated_at,
        }
    }
}

impl UserMovieData {
    pub fn to_insert(&self, user_id: i64, movie_id: i64) -> InsertUserMovieData {
        InsertUserMovieData {
            user_id,
            movie_id,
            status: self.status.clone(),
            rating: self.rating,
            notes: self.notes.clone(),
        }
    }
}

/// 外部 API 凭据条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCredentialData {
    pub id: i64,
    pub user_id: i64,
    pub provider: String,
    pub api_key: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_at: Option<i64>,
    pub is_active: bool,
}

impl From<&api_credentials::Model> for ApiCredentialData {
    fn from(credential: &api_credentials::Model) -> Self {
        Self {
            id: credential.id,
            user_id: credential.user_id,
            provider: credential.provider.clone(),
            api_key: credential.api_key.clone(),
            access_token: credential.access_token.clone(),
            refresh_token: credential.refresh_token.clone(),
            expires_at: credential.expires_at,
            is_active: credential.is_active != 0,
        }
    }
}

impl ApiCredentialData {
    pub fn to_insert(&self, user_id: i64) -> InsertCredentialData {
        InsertCredentialData {
            user_id,
            provider: self.provider.clone(),
            api_key: self.api_key.clone(),
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
            expires_at: self.expires_at,
            is_active: if self.is_active { 1 } else { 0 },
        }
    }
}

/// 数据图文档：档案中唯一的结构化数据条目
///
/// metadata 与 user 建模为 Option，解析器据此校验必需段是否在场；
/// 导出侧组装时总是写入 Some。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupDocument {
    pub metadata: Option<BackupMetadata>,
    pub user: Option<UserProfileData>,
    #[serde(default)]
    pub games: Vec<GameData>,
    #[serde(default)]
    pub movies: Vec<MovieData>,
    #[serde(default)]
    pub user_games: Vec<UserGameData>,
    #[serde(default)]
    pub user_movies: Vec<UserMovieData>,
    #[serde(default)]
    pub api_credentials: Vec<ApiCredentialData>,
}

impl BackupDocument {
    /// 从数据图组装完整文档
    pub fn assemble(graph: &UserDataGraph, image_count: usize) -> Self {
        let metadata = BackupMetadata {
            version: ARCHIVE_FORMAT_VERSION.to_string(),
            created: Utc::now().to_rfc3339(),
            total_games: graph.games.len() as u64,
            total_movies: graph.movies.len() as u64,
            user_games_count: graph.user_games.len() as u64,
            user_movies_count: graph.user_movies.len() as u64,
            total_images: image_count as u64,
        };

        Self {
            metadata: Some(metadata),
            user: Some(UserProfileData::from(&graph.user)),
            games: graph.games.iter().map(GameData::from).collect(),
            movies: graph.movies.iter().map(MovieData::from).collect(),
            user_games: graph.user_games.iter().map(UserGameData::from).collect(),
            user_movies: graph.user_movies.iter().map(UserMovieData::from).collect(),
            api_credentials: graph
                .credentials
                .iter()
                .map(ApiCredentialData::from)
                .collect(),
        }
    }
}

/// 渲染人类可读的清单文本（元数据块的纯文本摘要）
pub fn render_manifest(metadata: &BackupMetadata) -> String {
    format!(
        "MediaVault Backup Archive\n\
         =========================\n\
         Format version: {}\n\
         Created: {}\n\
         Games: {}\n\
         Movies: {}\n\
         Library entries (games): {}\n\
         Library entries (movies): {}\n\
         Cached images: {}\n",
        metadata.version,
        metadata.created,
        metadata.total_games,
        metadata.total_movies,
        metadata.user_games_count,
        metadata.user_movies_count,
        metadata.total_images,
    )
}
