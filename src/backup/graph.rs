//! 数据图加载与图片引用提取

use std::collections::{BTreeMap, BTreeSet};

use sea_orm::DatabaseConnection;

use crate::backup::error::BackupError;
use crate::database::repository::{
    credentials_repository::CredentialsRepository, games_repository::GamesRepository,
    movies_repository::MoviesRepository, users_repository::UsersRepository,
};
use crate::entity::{api_credentials, games, movies, user_games, user_movies, users};

/// 一个账号的完整关系数据图
///
/// 媒体目录列表只包含该账号库记录实际引用到的条目（按 ID 去重）。
#[derive(Debug, Clone)]
pub struct UserDataGraph {
    pub user: users::Model,
    pub games: Vec<games::Model>,
    pub movies: Vec<movies::Model>,
    pub user_games: Vec<user_games::Model>,
    pub user_movies: Vec<user_movies::Model>,
    pub credentials: Vec<api_credentials::Model>,
}

/// 加载指定账号的完整数据图（只读）
pub async fn load_user_graph(
    db: &DatabaseConnection,
    user_id: i64,
) -> Result<UserDataGraph, BackupError> {
    let user = UsersRepository::find_by_id(db, user_id)
        .await
        .map_err(|e| BackupError::BuildFailed(format!("查询账号失败: {}", e)))?
        .ok_or(BackupError::NotFound(user_id))?;

    let game_rows = GamesRepository::find_user_games_with_games(db, user_id)
        .await
        .map_err(|e| BackupError::BuildFailed(format!("查询游戏库失败: {}", e)))?;
    let movie_rows = MoviesRepository::find_user_movies_with_movies(db, user_id)
        .await
        .map_err(|e| BackupError::BuildFailed(format!("查询电影库失败: {}", e)))?;
    let credentials = CredentialsRepository::find_by_user(db, user_id)
        .await
        .map_err(|e| BackupError::BuildFailed(format!("查询 API 凭据失败: {}", e)))?;

    let mut games_by_id: BTreeMap<i64, games::Model> = BTreeMap::new();
    let mut user_games = Vec::with_capacity(game_rows.len());
    for (entry, game) in game_rows {
        if let Some(game) = game {
            games_by_id.entry(game.id).or_insert(game);
        }
        user_games.push(entry);
    }

    let mut movies_by_id: BTreeMap<i64, movies::Model> = BTreeMap::new();
    let mut user_movies = Vec::with_capacity(movie_rows.len());
    for (entry, movie) in movie_rows {
        if let Some(movie) = movie {
            movies_by_id.entry(movie.id).or_insert(movie);
        }
        user_movies.push(entry);
    }

    Ok(UserDataGraph {
        user,
        games: games_by_id.into_values().collect(),
        movies: movies_by_id.into_values().collect(),
        user_games,
        user_movies,
        credentials,
    })
}

/// 汇总数据图引用的全部外部图片 URL
///
/// 纯函数：头像 + 每个游戏的封面/横幅/截图 + 每部电影的封面/背景/剧照。
/// 结果去重且顺序稳定；None 与空字符串字段跳过。
pub fn collect_image_urls(graph: &UserDataGraph) -> BTreeSet<String> {
    let mut urls = BTreeSet::new();

    insert_url(&mut urls, graph.user.avatar_url.as_deref());

    for game in &graph.games {
        insert_url(&mut urls, game.cover_url.as_deref());
        insert_url(&mut urls, game.banner_url.as_deref());
        if let Some(screenshots) = &game.screenshot_urls {
            for url in screenshots.iter() {
                insert_url(&mut urls, Some(url));
            }
        }
    }

    for movie in &graph.movies {
        insert_url(&mut urls, movie.cover_url.as_deref());
        insert_url(&mut urls, movie.backdrop_url.as_deref());
        if let Some(artworks) = &movie.artwork_urls {
            for url in artworks.iter() {
                insert_url(&mut urls, Some(url));
            }
        }
    }

    urls
}

fn insert_url(urls: &mut BTreeSet<String>, url: Option<&str>) {
    if let Some(url) = url {
        if !url.is_empty() {
            urls.insert(url.to_string());
        }
    }
}
