//! 外部 API 凭据仓库

use crate::database::dto::InsertCredentialData;
use crate::entity::api_credentials;
use crate::entity::prelude::*;
use sea_orm::*;

/// 外部 API 凭据仓库
pub struct CredentialsRepository;

impl CredentialsRepository {
    /// 插入凭据记录，返回新分配的 ID
    ///
    /// (user_id, provider) 冲突时由数据库唯一约束报错。
    pub async fn insert<C>(db: &C, credential: InsertCredentialData) -> Result<i64, DbErr>
    where
        C: ConnectionTrait,
    {
        let credential_active = api_credentials::ActiveModel {
            id: NotSet,
            user_id: Set(credential.user_id),
            provider: Set(credential.provider),
            api_key: Set(credential.api_key),
            access_token: Set(credential.access_token),
            refresh_token: Set(credential.refresh_token),
            expires_at: Set(credential.expires_at),
            is_active: Set(credential.is_active),
        };

        let result = credential_active.insert(db).await?;
        Ok(result.id)
    }

    /// 获取指定账号的全部凭据（按提供方排序）
    pub async fn find_by_user<C>(
        db: &C,
        user_id: i64,
    ) -> Result<Vec<api_credentials::Model>, DbErr>
    where
        C: ConnectionTrait,
    {
        ApiCredentials::find()
            .filter(api_credentials::Column::UserId.eq(user_id))
            .order_by_asc(api_credentials::Column::Provider)
            .all(db)
            .await
    }

    /// 获取指定账号指定提供方的凭据
    pub async fn find_by_user_and_provider<C>(
        db: &C,
        user_id: i64,
        provider: &str,
    ) -> Result<Option<api_credentials::Model>, DbErr>
    where
        C: ConnectionTrait,
    {
        ApiCredentials::find()
            .filter(api_credentials::Column::UserId.eq(user_id))
            .filter(api_credentials::Column::Provider.eq(provider))
            .one(db)
            .await
    }

    /// 删除指定账号的全部凭据
    pub async fn delete_by_user<C>(db: &C, user_id: i64) -> Result<u64, DbErr>
    where
        C: ConnectionTrait,
    {
        Ok(ApiCredentials::delete_many()
            .filter(api_credentials::Column::UserId.eq(user_id))
            .exec(db)
            .await?
            .rows_affected)
    }
}
