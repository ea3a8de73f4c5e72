//! 用户与代理仓储

use async_trait::async_trait;
use sqlx::PgPool;

use super::traits::AgentRepositoryTrait;
use crate::error::Result;
use crate::models::{AgentProfile, User};

/// 用户与代理资料仓储（只读）
pub struct AgentRepository {
    pool: PgPool,
}

impl AgentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_user(&self, id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, email, role FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn get_agent_profile(&self, user_id: i64) -> Result<Option<AgentProfile>> {
        let profile = sqlx::query_as::<_, AgentProfile>(
            r#"
            SELECT user_id, commission_rate, bank_account_name, bank_account_number,
                   bank_ifsc, upi_id, is_active
            FROM agent_profiles
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }
}

#[async_trait]
impl AgentRepositoryTrait for AgentRepository {
    async fn get_user(&self, id: i64) -> Result<Option<User>> {
        self.get_user(id).await
    }

    async fn get_agent_profile(&self, user_id: i64) -> Result<Option<AgentProfile>> {
        self.get_agent_profile(user_id).await
    }
}
