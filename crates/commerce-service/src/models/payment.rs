//! 支付记录

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::enums::{Currency, PaymentChannel, PaymentStatus};

/// 支付记录
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: i64,
    pub user_id: i64,
    pub course_id: i64,
    pub channel: PaymentChannel,
    pub currency: Currency,
    /// 基础价格
    pub amount: Decimal,
    pub tax: Decimal,
    pub discount: Decimal,
    pub final_amount: Decimal,
    #[sqlx(default)]
    pub coupon_id: Option<i64>,
    #[sqlx(default)]
    pub agent_id: Option<i64>,
    #[sqlx(default)]
    pub commission_amount: Option<Decimal>,
    pub commission_paid: bool,
    pub status: PaymentStatus,
    pub gateway_order_id: String,
    #[sqlx(default)]
    pub gateway_payment_id: Option<String>,
    #[sqlx(default)]
    pub invoice_number: Option<String>,
    #[sqlx(default)]
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 待写入的支付记录（状态固定为 pending）
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub user_id: i64,
    pub course_id: i64,
    pub channel: PaymentChannel,
    pub currency: Currency,
    pub amount: Decimal,
    pub tax: Decimal,
    pub discount: Decimal,
    pub final_amount: Decimal,
    pub coupon_id: Option<i64>,
    pub gateway_order_id: String,
}
