//! 服务层数据传输对象
//!
//! 定义服务层与外部交互使用的 DTO，与内部领域模型解耦

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{Coupon, Currency, DiscountType, Payment, PaymentChannel, PaymentStatus};
use crate::service::order_calculator::OrderAmounts;

/// 管理员创建优惠券
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCouponInput {
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    #[serde(default)]
    pub usage_limit: Option<i32>,
    #[serde(default)]
    pub description: Option<String>,
    /// 为空表示不限课程
    #[serde(default)]
    pub course_ids: Vec<i64>,
    /// 为空表示不限用户
    #[serde(default)]
    pub user_ids: Vec<i64>,
}

/// 代理基于模板创建优惠券
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCouponInput {
    pub coupon_type_id: i64,
    /// 券码后缀，缺省时随机生成
    #[serde(default)]
    pub suffix: Option<String>,
    pub discount_value: Decimal,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    #[serde(default)]
    pub description: Option<String>,
}

/// 创建优惠券模板
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCouponTypeInput {
    pub name: String,
    pub code_prefix: String,
    pub discount_type: DiscountType,
    pub min_value: Decimal,
    pub max_value: Decimal,
    #[serde(default)]
    pub default_usage_limit: Option<i32>,
}

/// 优惠券详情，包含课程限制和用户指定数量
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponDetail {
    #[serde(flatten)]
    pub coupon: Coupon,
    pub course_ids: Vec<i64>,
    pub assigned_user_count: i64,
}

/// 分页结果
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}

/// 发起结算
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub user_id: i64,
    pub course_id: i64,
    pub channel: PaymentChannel,
    #[serde(default)]
    pub coupon_code: Option<String>,
}

/// 结算会话，前端据此拉起网关支付
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    pub payment_id: i64,
    pub gateway_order_id: String,
    pub gateway_key_id: String,
    pub currency: Currency,
    /// 最小货币单位金额
    pub amount_minor: i64,
    pub amounts: OrderAmounts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
}

/// 网关支付回调
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPaymentRequest {
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub signature: String,
}

/// 支付回执
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceipt {
    pub payment_id: i64,
    pub status: PaymentStatus,
    pub course_id: i64,
    pub currency: Currency,
    pub final_amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commission_amount: Option<Decimal>,
}

impl From<&Payment> for PaymentReceipt {
    fn from(payment: &Payment) -> Self {
        Self {
            payment_id: payment.id,
            status: payment.status,
            course_id: payment.course_id,
            currency: payment.currency,
            final_amount: payment.final_amount,
            invoice_number: payment.invoice_number.clone(),
            commission_amount: payment.commission_amount,
        }
    }
}
