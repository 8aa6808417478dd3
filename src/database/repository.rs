pub mod credentials_repository;
pub mod games_repository;
pub mod movies_repository;
pub mod users_repository;
