//! 课程与用户实体

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::enums::{CourseStatus, PaymentChannel, UserRole};

/// 课程
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub price_inr: Decimal,
    pub price_usd: Decimal,
    pub status: CourseStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Course {
    /// 按渠道取基础价格：国内 INR，海外 USD
    pub fn price_for(&self, channel: PaymentChannel) -> Decimal {
        match channel {
            PaymentChannel::Domestic => self.price_inr,
            PaymentChannel::Foreign => self.price_usd,
        }
    }
}

/// 用户
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: UserRole,
}
