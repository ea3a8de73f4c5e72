//! 佣金与提现实体

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::enums::{CommissionStatus, PayoutStatus};

/// 佣金记录
///
/// 每笔支付至多一条（payment_id 唯一）
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Commission {
    pub id: i64,
    pub payment_id: i64,
    pub course_id: i64,
    pub student_id: i64,
    pub coupon_id: i64,
    pub agent_id: i64,
    pub sale_amount: Decimal,
    pub commission_rate: Decimal,
    pub commission_amount: Decimal,
    pub status: CommissionStatus,
    #[sqlx(default)]
    pub payout_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    #[sqlx(default)]
    pub paid_at: Option<DateTime<Utc>>,
}

/// 待写入的佣金记录
#[derive(Debug, Clone)]
pub struct NewCommission {
    pub payment_id: i64,
    pub course_id: i64,
    pub student_id: i64,
    pub coupon_id: i64,
    pub agent_id: i64,
    pub sale_amount: Decimal,
    pub commission_rate: Decimal,
    pub commission_amount: Decimal,
}

/// 代理佣金余额
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentBalance {
    /// 待结算且未申请提现
    pub pending: Decimal,
    /// 已申请提现、等待处理
    pub requested: Decimal,
    /// 已打款
    pub paid: Decimal,
}

/// 提现申请
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Payout {
    pub id: i64,
    pub agent_id: i64,
    pub amount: Decimal,
    pub status: PayoutStatus,
    pub bank_snapshot: Value,
    #[sqlx(default)]
    pub reference: Option<String>,
    #[sqlx(default)]
    pub note: Option<String>,
    pub requested_at: DateTime<Utc>,
    #[sqlx(default)]
    pub processed_at: Option<DateTime<Utc>>,
}
