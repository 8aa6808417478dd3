//! 账号数据仓库

use crate::database::dto::{InsertUserData, ProfileUpdate};
use crate::entity::prelude::*;
use crate::entity::users;
use sea_orm::*;

/// 账号数据仓库
pub struct UsersRepository;

impl UsersRepository {
    /// 创建账号
    pub async fn insert<C>(db: &C, data: InsertUserData) -> Result<i64, DbErr>
    where
        C: ConnectionTrait,
    {
        let now = chrono::Utc::now().timestamp();

        let user = users::ActiveModel {
            id: NotSet,
            email: Set(data.email),
            password_hash: Set(data.password_hash),
            first_name: Set(data.first_name),
            last_name: Set(data.last_name),
            avatar_url: Set(data.avatar_url),
            timezone: Set(data.timezone),
            theme_preference: Set(data.theme_preference),
            created_at: Set(Some(now)),
            updated_at: Set(Some(now)),
        };

        let result = user.insert(db).await?;
        Ok(result.id)
    }

    /// 根据 ID 查询账号
    pub async fn find_by_id<C>(db: &C, id: i64) -> Result<Option<users::Model>, DbErr>
    where
        C: ConnectionTrait,
    {
        Users::find_by_id(id).one(db).await
    }

    /// 根据邮箱查询账号
    pub async fn find_by_email<C>(db: &C, email: &str) -> Result<Option<users::Model>, DbErr>
    where
        C: ConnectionTrait,
    {
        Users::find()
            .filter(users::Column::Email.eq(email))
            .one(db)
            .await
    }

    /// 用给定的标量字段覆盖账号资料
    ///
    /// 只覆盖偏好字段；id、password_hash 与 created_at 保持不变。
    pub async fn overwrite_profile<C>(
        db: &C,
        user_id: i64,
        profile: ProfileUpdate,
    ) -> Result<users::Model, DbErr>
    where
        C: ConnectionTrait,
    {
        let user = Users::find_by_id(user_id)
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound(format!("账号 {} 不存在", user_id)))?;

        let now = chrono::Utc::now().timestamp();

        let mut active: users::ActiveModel = user.into();
        active.email = Set(profile.email);
        active.first_name = Set(profile.first_name);
        active.last_name = Set(profile.last_name);
        active.avatar_url = Set(profile.avatar_url);
        active.timezone = Set(profile.timezone);
        active.theme_preference = Set(profile.theme_preference);
        active.updated_at = Set(Some(now));

        active.update(db).await
    }
}
