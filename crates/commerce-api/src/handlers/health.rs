//! 健康检查
//!
//! 存活探针只反映进程状态；就绪探针检查数据库连接

use academy_shared::database::Database;
use axum::{Json, extract::State, http::StatusCode};
use serde_json::{Value, json};

use crate::state::AppState;

const SERVICE_NAME: &str = "commerce-api";

/// GET /health
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": SERVICE_NAME
    }))
}

/// GET /ready
pub async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let database = match Database::from_pool(state.pool.clone()).health_check().await {
        Ok(()) => None,
        Err(e) => Some(e.code()),
    };
    (readiness_status(database), Json(readiness_body(database)))
}

fn readiness_status(database_error: Option<&str>) -> StatusCode {
    if database_error.is_none() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

fn readiness_body(database_error: Option<&str>) -> Value {
    json!({
        "status": if database_error.is_none() { "ok" } else { "degraded" },
        "service": SERVICE_NAME,
        "checks": {
            "database": database_error.unwrap_or("ok")
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use academy_shared::error::SharedError;

    #[test]
    fn test_readiness_reports_database_error_code() {
        let code = SharedError::Database(sqlx::Error::PoolTimedOut).code();
        assert_eq!(readiness_status(Some(code)), StatusCode::SERVICE_UNAVAILABLE);

        let body = readiness_body(Some(code));
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["checks"]["database"], "DATABASE_ERROR");
    }

    #[test]
    fn test_readiness_ok() {
        assert_eq!(readiness_status(None), StatusCode::OK);
        assert_eq!(readiness_body(None)["checks"]["database"], "ok");
    }
}
