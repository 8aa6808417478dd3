//! 预导入模块
//!
//! 提供常用类型的快捷导入。

// === SeaORM 实体 ===
pub use super::api_credentials::Entity as ApiCredentials;
pub use super::games::Entity as Games;
pub use super::movies::Entity as Movies;
pub use super::user_games::Entity as UserGames;
pub use super::user_movies::Entity as UserMovies;
pub use super::users::Entity as Users;
