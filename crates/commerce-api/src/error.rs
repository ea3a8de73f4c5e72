//! HTTP 层错误类型定义
//!
//! 业务错误来自 commerce-service，此处只负责映射状态码和统一响应体

use academy_commerce::CommerceError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// HTTP 层错误类型
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Missing or invalid caller identity: {0}")]
    Unauthorized(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Commerce(#[from] CommerceError),
}

impl ApiError {
    /// 返回对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Commerce(err) => commerce_status(err),
        }
    }

    /// 返回错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Commerce(err) => err.error_code(),
        }
    }
}

fn commerce_status(err: &CommerceError) -> StatusCode {
    use CommerceError::*;

    match err {
        Validation(_)
        | CouponInactive(_)
        | CouponExpired(_)
        | CouponUsageLimitReached(_)
        | CouponCourseRestricted(_)
        | CouponUserRestricted(_)
        | CouponTypeInactive(_)
        | CourseNotAvailable { .. }
        | InvalidAmount(_)
        | MissingBankDetails(_)
        | InsufficientBalance { .. } => StatusCode::BAD_REQUEST,

        InvalidSignature => StatusCode::UNAUTHORIZED,

        CouponNotFound(_)
        | CouponTypeNotFound(_)
        | CourseNotFound(_)
        | AgentNotFound(_)
        | PaymentNotFound(_)
        | PayoutNotFound(_) => StatusCode::NOT_FOUND,

        CouponCodeExists(_) | InvalidPaymentStatus { .. } | InvalidPayoutStatus { .. } => {
            StatusCode::CONFLICT
        }

        Gateway(_) => StatusCode::BAD_GATEWAY,

        Database(_) | Serialization(_) | Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 系统级错误只返回通用提示，详细信息仅记录日志
        let message = match &self {
            Self::Commerce(e) if !e.is_business_error() => {
                tracing::error!(error = %e, code = e.error_code(), "Request failed");
                if e.is_retryable() {
                    "Service temporarily unavailable, please retry later".to_string()
                } else {
                    "Internal server error".to_string()
                }
            }
            other => other.to_string(),
        };

        let body = json!({
            "success": false,
            "code": self.error_code(),
            "message": message,
            "data": serde_json::Value::Null
        });

        (status, axum::Json(body)).into_response()
    }
}

/// 从 validator 错误转换
impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn cases() -> Vec<(ApiError, StatusCode, &'static str)> {
        vec![
            (ApiError::Unauthorized("x-user-id".into()), StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            (ApiError::Validation("code".into()), StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            (
                CommerceError::CouponExpired("SAVE20".into()).into(),
                StatusCode::BAD_REQUEST,
                "COUPON_EXPIRED",
            ),
            (
                CommerceError::CouponUserRestricted("SAVE20".into()).into(),
                StatusCode::BAD_REQUEST,
                "COUPON_USER_RESTRICTED",
            ),
            (
                CommerceError::CouponNotFound("NOPE".into()).into(),
                StatusCode::NOT_FOUND,
                "COUPON_NOT_FOUND",
            ),
            (
                CommerceError::InsufficientBalance {
                    available: Decimal::from(10),
                    minimum: Decimal::from(500),
                }
                .into(),
                StatusCode::BAD_REQUEST,
                "INSUFFICIENT_BALANCE",
            ),
            (CommerceError::InvalidSignature.into(), StatusCode::UNAUTHORIZED, "INVALID_SIGNATURE"),
            (
                CommerceError::CouponCodeExists("SAVE20".into()).into(),
                StatusCode::CONFLICT,
                "COUPON_CODE_EXISTS",
            ),
            (
                CommerceError::InvalidPayoutStatus {
                    payout_id: 1,
                    current_status: "completed".into(),
                }
                .into(),
                StatusCode::CONFLICT,
                "INVALID_PAYOUT_STATUS",
            ),
            (
                CommerceError::Gateway("timeout".into()).into(),
                StatusCode::BAD_GATEWAY,
                "GATEWAY_ERROR",
            ),
            (
                CommerceError::Database(sqlx::Error::PoolTimedOut).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
            ),
        ]
    }

    #[test]
    fn test_status_and_code_mapping() {
        for (err, status, code) in cases() {
            assert_eq!(err.status_code(), status, "status for {err:?}");
            assert_eq!(err.error_code(), code, "code for {err:?}");
        }
    }

    #[tokio::test]
    async fn test_internal_detail_is_hidden() {
        let response =
            ApiError::from(CommerceError::Internal("pool exhausted at 10.0.0.3".into()))
                .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = http_body_util::BodyExt::collect(response.into_body())
            .await
            .unwrap()
            .to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "INTERNAL_ERROR");
        assert!(!body["message"].as_str().unwrap().contains("10.0.0.3"));
    }

    #[tokio::test]
    async fn test_gateway_failure_asks_for_retry() {
        let response =
            ApiError::from(CommerceError::Gateway("connect to 10.0.0.9 refused".into()))
                .into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let bytes = http_body_util::BodyExt::collect(response.into_body())
            .await
            .unwrap()
            .to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["code"], "GATEWAY_ERROR");
        assert_eq!(
            body["message"],
            "Service temporarily unavailable, please retry later"
        );
    }

    #[tokio::test]
    async fn test_business_message_is_exposed() {
        let response = ApiError::from(CommerceError::CouponInactive("SAVE20".into())).into_response();
        let bytes = http_body_util::BodyExt::collect(response.into_body())
            .await
            .unwrap()
            .to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["message"], "Coupon is inactive: SAVE20");
    }
}
