use sea_orm::{ConnectionTrait, DatabaseBackend, Statement};
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::TransactionTrait;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let conn = manager.get_connection();

        // 开启事务，保证所有建表操作的原子性
        let txn = conn.begin().await?;

        create_baseline_schema(&txn).await?;

        txn.commit().await?;

        println!("[MIGRATION] v1 baseline schema created successfully");
        Ok(())
    }
}

/// 创建基线表结构
///
/// 账号（users）、共享媒体目录（games / movies）、
/// 用户媒体库关联（user_games / user_movies）、外部 API 凭据（api_credentials）。
async fn create_baseline_schema<C>(conn: &C) -> Result<(), DbErr>
where
    C: ConnectionTrait,
{
    // 1. 账号表
    conn.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        r#"CREATE TABLE "users" (
            "id" INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
            "email" TEXT NOT NULL UNIQUE,
            "password_hash" TEXT NOT NULL,
            "first_name" TEXT,
            "last_name" TEXT,
            "avatar_url" TEXT,
            "timezone" TEXT,
            "theme_preference" TEXT,
            "created_at" INTEGER DEFAULT (strftime('%s', 'now')),
            "updated_at" INTEGER DEFAULT (strftime('%s', 'now'))
        )"#,
    ))
    .await?;

    // 2. 游戏目录表（全局共享，不属于任何单一账号）
    conn.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        r#"CREATE TABLE "games" (
            "id" INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
            "title" TEXT NOT NULL,
            "cover_url" TEXT,
            "banner_url" TEXT,
            "screenshot_urls" TEXT,
            "developer" TEXT,
            "release_date" TEXT,
            "summary" TEXT,
            "created_at" INTEGER DEFAULT (strftime('%s', 'now')),
            "updated_at" INTEGER DEFAULT (strftime('%s', 'now'))
        )"#,
    ))
    .await?;

    // 3. 电影目录表
    conn.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        r#"CREATE TABLE "movies" (
            "id" INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
            "title" TEXT NOT NULL,
            "cover_url" TEXT,
            "backdrop_url" TEXT,
            "artwork_urls" TEXT,
            "director" TEXT,
            "release_date" TEXT,
            "summary" TEXT,
            "created_at" INTEGER DEFAULT (strftime('%s', 'now')),
            "updated_at" INTEGER DEFAULT (strftime('%s', 'now'))
        )"#,
    ))
    .await?;

    // 4. 用户游戏库关联表
    conn.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        r#"CREATE TABLE "user_games" (
            "id" INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
            "user_id" INTEGER NOT NULL,
            "game_id" INTEGER NOT NULL,
            "status" TEXT NOT NULL DEFAULT 'backlog',
            "rating" REAL,
            "notes" TEXT,
            "platform" TEXT,
            "created_at" INTEGER DEFAULT (strftime('%s', 'now')),
            "updated_at" INTEGER DEFAULT (strftime('%s', 'now')),
            FOREIGN KEY("user_id") REFERENCES "users"("id") ON DELETE CASCADE,
            FOREIGN KEY("game_id") REFERENCES "games"("id") ON DELETE CASCADE
        )"#,
    ))
    .await?;

    // 5. 用户电影库关联表
    conn.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        r#"CREATE TABLE "user_movies" (
            "id" INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
            "user_id" INTEGER NOT NULL,
            "movie_id" INTEGER NOT NULL,
            "status" TEXT NOT NULL DEFAULT 'backlog',
            "rating" REAL,
            "notes" TEXT,
            "created_at" INTEGER DEFAULT (strftime('%s', 'now')),
            "updated_at" INTEGER DEFAULT (strftime('%s', 'now')),
            FOREIGN KEY("user_id") REFERENCES "users"("id") ON DELETE CASCADE,
            FOREIGN KEY("movie_id") REFERENCES "movies"("id") ON DELETE CASCADE
        )"#,
    ))
    .await?;

    // 6. 外部 API 凭据表（每账号每提供方唯一）
    conn.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        r#"CREATE TABLE "api_credentials" (
            "id" INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
            "user_id" INTEGER NOT NULL,
            "provider" TEXT NOT NULL,
            "api_key" TEXT,
            "access_token" TEXT,
            "refresh_token" TEXT,
            "expires_at" INTEGER,
            "is_active" INTEGER NOT NULL DEFAULT 1,
            FOREIGN KEY("user_id") REFERENCES "users"("id") ON DELETE CASCADE,
            UNIQUE("user_id", "provider")
        )"#,
    ))
    .await?;

    // 7. 常用查询索引
    for sql in [
        r#"CREATE INDEX "idx_user_games_user_id" ON "user_games"("user_id")"#,
        r#"CREATE INDEX "idx_user_movies_user_id" ON "user_movies"("user_id")"#,
        r#"CREATE INDEX "idx_api_credentials_user_id" ON "api_credentials"("user_id")"#,
    ] {
        conn.execute(Statement::from_string(DatabaseBackend::Sqlite, sql))
            .await?;
    }

    Ok(())
}
