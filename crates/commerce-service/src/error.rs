//! 交易服务错误类型
//!
//! 定义优惠券、结算、佣金、提现流程中的业务错误和系统错误

use rust_decimal::Decimal;
use thiserror::Error;

/// 交易服务错误类型
#[derive(Debug, Error)]
pub enum CommerceError {
    // === 优惠券相关错误 ===
    #[error("Coupon not found: {0}")]
    CouponNotFound(String),

    #[error("Coupon is inactive: {0}")]
    CouponInactive(String),

    #[error("Coupon is expired or not yet valid: {0}")]
    CouponExpired(String),

    #[error("Coupon usage limit reached: {0}")]
    CouponUsageLimitReached(String),

    #[error("Coupon is not valid for this course: {0}")]
    CouponCourseRestricted(String),

    #[error("Coupon is not valid for this user: {0}")]
    CouponUserRestricted(String),

    #[error("Coupon code already exists: {0}")]
    CouponCodeExists(String),

    #[error("Coupon type not found: {0}")]
    CouponTypeNotFound(i64),

    #[error("Coupon type is inactive: {0}")]
    CouponTypeInactive(i64),

    // === 课程 / 用户 ===
    #[error("Course not found: {0}")]
    CourseNotFound(i64),

    #[error("Course is not available for purchase: course_id={course_id}, status={status}")]
    CourseNotAvailable { course_id: i64, status: String },

    #[error("Agent not found: {0}")]
    AgentNotFound(i64),

    // === 支付相关错误 ===
    #[error("Payment not found: {0}")]
    PaymentNotFound(String),

    #[error("Payment status does not allow this operation: payment_id={payment_id}, current_status={current_status}")]
    InvalidPaymentStatus {
        payment_id: i64,
        current_status: String,
    },

    #[error("Invalid payment signature")]
    InvalidSignature,

    #[error("Payable amount must be positive, got {0}")]
    InvalidAmount(Decimal),

    #[error("Payment gateway error: {0}")]
    Gateway(String),

    // === 佣金 / 提现 ===
    #[error("Agent has no bank account or UPI details: {0}")]
    MissingBankDetails(i64),

    #[error("Insufficient balance for payout: available {available}, minimum {minimum}")]
    InsufficientBalance { available: Decimal, minimum: Decimal },

    #[error("Payout not found: {0}")]
    PayoutNotFound(i64),

    #[error("Payout status does not allow this operation: payout_id={payout_id}, current_status={current_status}")]
    InvalidPayoutStatus {
        payout_id: i64,
        current_status: String,
    },

    // === 系统错误 ===
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Validation failed: {0}")]
    Validation(String),
}

/// 交易服务 Result 类型别名
pub type Result<T> = std::result::Result<T, CommerceError>;

impl CommerceError {
    /// 检查是否为可重试的错误
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Gateway(_))
    }

    /// 检查是否为业务错误（非系统错误）
    pub fn is_business_error(&self) -> bool {
        !matches!(
            self,
            Self::Database(_) | Self::Serialization(_) | Self::Internal(_) | Self::Gateway(_)
        )
    }

    /// 是否为优惠券校验失败
    pub fn is_coupon_rejection(&self) -> bool {
        matches!(
            self,
            Self::CouponNotFound(_)
                | Self::CouponInactive(_)
                | Self::CouponExpired(_)
                | Self::CouponUsageLimitReached(_)
                | Self::CouponCourseRestricted(_)
                | Self::CouponUserRestricted(_)
        )
    }

    /// 获取错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::CouponNotFound(_) => "COUPON_NOT_FOUND",
            Self::CouponInactive(_) => "COUPON_INACTIVE",
            Self::CouponExpired(_) => "COUPON_EXPIRED",
            Self::CouponUsageLimitReached(_) => "COUPON_USAGE_LIMIT_REACHED",
            Self::CouponCourseRestricted(_) => "COUPON_COURSE_RESTRICTED",
            Self::CouponUserRestricted(_) => "COUPON_USER_RESTRICTED",
            Self::CouponCodeExists(_) => "COUPON_CODE_EXISTS",
            Self::CouponTypeNotFound(_) => "COUPON_TYPE_NOT_FOUND",
            Self::CouponTypeInactive(_) => "COUPON_TYPE_INACTIVE",
            Self::CourseNotFound(_) => "COURSE_NOT_FOUND",
            Self::CourseNotAvailable { .. } => "COURSE_NOT_AVAILABLE",
            Self::AgentNotFound(_) => "AGENT_NOT_FOUND",
            Self::PaymentNotFound(_) => "PAYMENT_NOT_FOUND",
            Self::InvalidPaymentStatus { .. } => "INVALID_PAYMENT_STATUS",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::Gateway(_) => "GATEWAY_ERROR",
            Self::MissingBankDetails(_) => "MISSING_BANK_DETAILS",
            Self::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            Self::PayoutNotFound(_) => "PAYOUT_NOT_FOUND",
            Self::InvalidPayoutStatus { .. } => "INVALID_PAYOUT_STATUS",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Validation(_) => "VALIDATION_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_is_retryable() {
        assert!(CommerceError::Gateway("timeout".to_string()).is_retryable());
        assert!(!CommerceError::CouponNotFound("X".to_string()).is_retryable());
        assert!(!CommerceError::InvalidSignature.is_retryable());
    }

    #[test]
    fn test_error_is_business_error() {
        assert!(CommerceError::CouponExpired("SAVE10".to_string()).is_business_error());
        assert!(
            CommerceError::InsufficientBalance {
                available: Decimal::from(100),
                minimum: Decimal::from(500),
            }
            .is_business_error()
        );
        assert!(!CommerceError::Internal("boom".to_string()).is_business_error());
    }

    #[test]
    fn test_coupon_rejection_classification() {
        assert!(CommerceError::CouponUserRestricted("A".to_string()).is_coupon_rejection());
        assert!(!CommerceError::CouponCodeExists("A".to_string()).is_coupon_rejection());
    }

    #[test]
    fn test_error_code() {
        assert_eq!(
            CommerceError::CouponUsageLimitReached("A".to_string()).error_code(),
            "COUPON_USAGE_LIMIT_REACHED"
        );
        assert_eq!(
            CommerceError::InsufficientBalance {
                available: Decimal::ZERO,
                minimum: Decimal::ONE,
            }
            .error_code(),
            "INSUFFICIENT_BALANCE"
        );
    }

    #[test]
    fn test_error_display() {
        let err = CommerceError::CourseNotAvailable {
            course_id: 7,
            status: "draft".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Course is not available for purchase: course_id=7, status=draft"
        );
    }
}
