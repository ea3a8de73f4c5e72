//! 请求 DTO 定义
//!
//! 请求体统一 camelCase，字段级约束由 validator 校验，业务约束由服务层校验

use academy_commerce::dto::{AgentCouponInput, NewCouponInput, NewCouponTypeInput};
use academy_commerce::models::{CommissionStatus, CouponFilter, DiscountType, PaymentChannel};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use validator::Validate;

/// 校验优惠券
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ValidateCouponBody {
    #[validate(length(min = 1, max = 64, message = "coupon code must be 1-64 characters"))]
    pub code: String,
    pub course_id: Option<i64>,
    /// 缺省时使用调用方身份
    pub user_id: Option<i64>,
}

/// 管理员创建优惠券
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCouponRequest {
    #[validate(length(min = 1, max = 64, message = "coupon code must be 1-64 characters"))]
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    #[validate(range(min = 1, message = "usage limit must be at least 1"))]
    pub usage_limit: Option<i32>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub course_ids: Vec<i64>,
    #[serde(default)]
    #[validate(length(max = 1000))]
    pub user_ids: Vec<i64>,
}

impl From<CreateCouponRequest> for NewCouponInput {
    fn from(req: CreateCouponRequest) -> Self {
        Self {
            code: req.code,
            discount_type: req.discount_type,
            discount_value: req.discount_value,
            valid_from: req.valid_from,
            valid_until: req.valid_until,
            usage_limit: req.usage_limit,
            description: req.description,
            course_ids: req.course_ids,
            user_ids: req.user_ids,
        }
    }
}

/// 代理基于模板创建优惠券
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAgentCouponRequest {
    pub coupon_type_id: i64,
    #[validate(length(min = 1, max = 32, message = "suffix must be 1-32 characters"))]
    pub suffix: Option<String>,
    pub discount_value: Decimal,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
}

impl From<CreateAgentCouponRequest> for AgentCouponInput {
    fn from(req: CreateAgentCouponRequest) -> Self {
        Self {
            coupon_type_id: req.coupon_type_id,
            suffix: req.suffix,
            discount_value: req.discount_value,
            valid_from: req.valid_from,
            valid_until: req.valid_until,
            description: req.description,
        }
    }
}

/// 创建优惠券模板
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCouponTypeRequest {
    #[validate(length(min = 1, max = 200, message = "name must be 1-200 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 20, message = "code prefix must be 1-20 characters"))]
    pub code_prefix: String,
    pub discount_type: DiscountType,
    pub min_value: Decimal,
    pub max_value: Decimal,
    #[validate(range(min = 1, message = "usage limit must be at least 1"))]
    pub default_usage_limit: Option<i32>,
}

impl From<CreateCouponTypeRequest> for NewCouponTypeInput {
    fn from(req: CreateCouponTypeRequest) -> Self {
        Self {
            name: req.name,
            code_prefix: req.code_prefix,
            discount_type: req.discount_type,
            min_value: req.min_value,
            max_value: req.max_value,
            default_usage_limit: req.default_usage_limit,
        }
    }
}

/// 整体替换课程限制
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceCoursesRequest {
    #[validate(length(max = 500))]
    pub course_ids: Vec<i64>,
}

/// 追加用户指定
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AssignUsersRequest {
    #[validate(length(min = 1, max = 1000, message = "user list must contain 1-1000 ids"))]
    pub user_ids: Vec<i64>,
}

/// 优惠券列表查询
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponListQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
    pub created_by: Option<i64>,
    #[serde(default)]
    pub active_only: bool,
}

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    20
}

impl From<CouponListQuery> for CouponFilter {
    fn from(query: CouponListQuery) -> Self {
        Self {
            created_by: query.created_by,
            active_only: query.active_only,
            page: query.page.max(1),
            page_size: query.page_size.clamp(1, 100),
        }
    }
}

/// 发起结算（学员为调用方）
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutBody {
    pub course_id: i64,
    pub channel: PaymentChannel,
    #[validate(length(max = 64))]
    pub coupon_code: Option<String>,
}

/// 网关支付成功回调
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPaymentBody {
    #[validate(length(min = 1, max = 100))]
    pub gateway_order_id: String,
    #[validate(length(min = 1, max = 100))]
    pub gateway_payment_id: String,
    #[validate(length(min = 1, max = 256))]
    pub signature: String,
}

/// 网关支付失败回调
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FailPaymentBody {
    #[validate(length(min = 1, max = 100))]
    pub gateway_order_id: String,
    #[validate(length(min = 1, max = 500, message = "reason must be 1-500 characters"))]
    pub reason: String,
}

/// 佣金列表查询
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionQuery {
    pub status: Option<CommissionStatus>,
}

/// 代理申请提现
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RequestPayoutBody {
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

/// 提现列表查询
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutListQuery {
    pub agent_id: Option<i64>,
}

/// 完成打款
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProcessPayoutRequest {
    #[validate(length(min = 1, max = 200, message = "transfer reference must be 1-200 characters"))]
    pub reference: String,
}

/// 驳回提现
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RejectPayoutRequest {
    #[validate(length(max = 500))]
    pub note: Option<String>,
}
