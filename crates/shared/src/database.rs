//! PostgreSQL 连接池
//!
//! 会话统一使用 UTC 时区，并按配置设置语句超时。迁移脚本在编译期嵌入。

use std::time::Duration;

use sqlx::Executor;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{info, instrument, warn};

use crate::config::DatabaseConfig;
use crate::error::{Result, SharedError};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// 建立连接池并校验连通性
    #[instrument(skip_all, fields(max = config.max_connections))]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let session_sql = session_setup_sql(config.statement_timeout_seconds);

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
            .after_connect(move |conn, _meta| {
                let sql = session_sql.clone();
                Box::pin(async move {
                    conn.execute(sql.as_str()).await?;
                    Ok(())
                })
            })
            .connect(&config.url)
            .await?;

        info!(
            min = config.min_connections,
            statement_timeout_secs = config.statement_timeout_seconds,
            "Database pool ready"
        );
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 就绪探针使用的连通性检查
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, "Database health check failed");
                SharedError::from(e)
            })?;
        Ok(())
    }

    /// 应用尚未执行的迁移
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await?;
        info!(
            migrations = MIGRATOR.iter().count(),
            "Database schema up to date"
        );
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database pool closed");
    }
}

fn session_setup_sql(statement_timeout_seconds: u64) -> String {
    if statement_timeout_seconds == 0 {
        "SET TIME ZONE 'UTC'".to_string()
    } else {
        format!(
            "SET TIME ZONE 'UTC'; SET statement_timeout = '{}s'",
            statement_timeout_seconds
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_setup_with_timeout() {
        assert_eq!(
            session_setup_sql(15),
            "SET TIME ZONE 'UTC'; SET statement_timeout = '15s'"
        );
    }

    #[test]
    fn test_session_setup_without_timeout() {
        assert_eq!(session_setup_sql(0), "SET TIME ZONE 'UTC'");
    }

    #[tokio::test]
    #[ignore = "需要 PostgreSQL"]
    async fn test_connect_and_migrate() {
        let mut config = DatabaseConfig::default();
        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.url = url;
        }
        let db = Database::connect(&config).await.unwrap();
        db.run_migrations().await.unwrap();
        db.health_check().await.unwrap();

        let tz: String = sqlx::query_scalar("SHOW TIME ZONE")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(tz, "UTC");
    }
}
