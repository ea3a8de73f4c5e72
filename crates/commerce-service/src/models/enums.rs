//! 交易服务枚举类型定义
//!
//! 所有枚举都支持数据库（sqlx）和 JSON（serde）序列化

use serde::{Deserialize, Serialize};

/// 优惠类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountType {
    /// 按百分比折扣，取值 0-100
    Percentage,
    /// 固定金额减免
    FixedAmount,
}

/// 支付渠道
///
/// 国内渠道以 INR 计价并征收 GST，海外渠道以 USD 计价且不含税
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentChannel {
    #[default]
    Domestic,
    Foreign,
}

impl PaymentChannel {
    /// 渠道对应的结算币种
    pub fn currency(&self) -> Currency {
        match self {
            Self::Domestic => Currency::Inr,
            Self::Foreign => Currency::Usd,
        }
    }

    /// 发票号中的渠道标识
    pub fn invoice_flag(&self) -> char {
        match self {
            Self::Domestic => 'D',
            Self::Foreign => 'F',
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Domestic => "DOMESTIC",
            Self::Foreign => "FOREIGN",
        }
    }
}

/// 结算币种
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "varchar", rename_all = "UPPERCASE")]
pub enum Currency {
    Inr,
    Usd,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inr => "INR",
            Self::Usd => "USD",
        }
    }
}

/// 课程状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum CourseStatus {
    #[default]
    Draft,
    Upcoming,
    Open,
    Ongoing,
    Completed,
    Archived,
}

impl CourseStatus {
    /// 只有即将开课、报名中、进行中的课程可以购买
    pub fn is_purchasable(&self) -> bool {
        matches!(self, Self::Upcoming | Self::Open | Self::Ongoing)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Upcoming => "upcoming",
            Self::Open => "open",
            Self::Ongoing => "ongoing",
            Self::Completed => "completed",
            Self::Archived => "archived",
        }
    }
}

/// 用户角色
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    Student,
    Agent,
    Admin,
}

/// 支付状态
///
/// 状态流转：pending -> completed | failed，completed -> refunded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        }
    }
}

/// 佣金状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum CommissionStatus {
    /// 待结算
    #[default]
    Pending,
    /// 已随提现打款
    Paid,
}

/// 提现状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum PayoutStatus {
    #[default]
    Pending,
    Completed,
    Rejected,
}

impl PayoutStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
        }
    }
}
