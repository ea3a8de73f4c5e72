//! 优惠券相关实体定义
//!
//! 包含优惠券、优惠券模板（类型）、课程限制与用户指定

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::enums::DiscountType;

/// 优惠券
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub id: i64,
    /// 券码，统一存储为大写
    pub code: String,
    #[sqlx(default)]
    pub coupon_type_id: Option<i64>,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    /// 可用次数上限（null 表示不限）
    #[sqlx(default)]
    pub usage_limit: Option<i32>,
    pub current_usage_count: i32,
    pub is_active: bool,
    /// 创建人用户 ID（管理员或代理）
    pub created_by: i64,
    #[sqlx(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Coupon {
    /// 是否处于有效期内（含边界）
    pub fn is_within_validity(&self, now: DateTime<Utc>) -> bool {
        now >= self.valid_from && now <= self.valid_until
    }

    /// 是否已达到使用上限
    pub fn is_exhausted(&self) -> bool {
        match self.usage_limit {
            Some(limit) => self.current_usage_count >= limit,
            None => false,
        }
    }

    /// 折扣条款
    pub fn terms(&self) -> DiscountTerms {
        DiscountTerms {
            discount_type: self.discount_type,
            value: self.discount_value,
        }
    }
}

/// 折扣条款，供订单计算使用
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountTerms {
    pub discount_type: DiscountType,
    pub value: Decimal,
}

/// 优惠券来源
///
/// 在校验阶段确定，后续的计算和佣金记录直接据此分支
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CouponOrigin {
    /// 代理创建且配置了佣金比例
    #[serde(rename_all = "camelCase")]
    Agent {
        agent_id: i64,
        commission_rate: Decimal,
    },
    /// 管理员创建，或代理未配置佣金比例
    Admin,
}

impl CouponOrigin {
    pub fn commission_rate(&self) -> Option<Decimal> {
        match self {
            Self::Agent {
                commission_rate, ..
            } => Some(*commission_rate),
            Self::Admin => None,
        }
    }

    pub fn agent_id(&self) -> Option<i64> {
        match self {
            Self::Agent { agent_id, .. } => Some(*agent_id),
            Self::Admin => None,
        }
    }
}

/// 优惠券用户指定记录
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CouponAssignment {
    pub coupon_id: i64,
    pub user_id: i64,
    pub is_used: bool,
    #[sqlx(default)]
    pub used_at: Option<DateTime<Utc>>,
}

/// 优惠券模板
///
/// 代理只能基于启用中的模板创建优惠券，折扣值须落在 [min_value, max_value] 内
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CouponType {
    pub id: i64,
    pub name: String,
    pub code_prefix: String,
    pub discount_type: DiscountType,
    pub min_value: Decimal,
    pub max_value: Decimal,
    #[sqlx(default)]
    pub default_usage_limit: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CouponType {
    pub fn allows_value(&self, value: Decimal) -> bool {
        value >= self.min_value && value <= self.max_value
    }
}

/// 待写入的优惠券
#[derive(Debug, Clone)]
pub struct NewCoupon {
    pub code: String,
    pub coupon_type_id: Option<i64>,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub usage_limit: Option<i32>,
    pub created_by: i64,
    pub description: Option<String>,
}

/// 待写入的优惠券模板
#[derive(Debug, Clone)]
pub struct NewCouponType {
    pub name: String,
    pub code_prefix: String,
    pub discount_type: DiscountType,
    pub min_value: Decimal,
    pub max_value: Decimal,
    pub default_usage_limit: Option<i32>,
}

/// 优惠券列表过滤条件
#[derive(Debug, Clone, Default)]
pub struct CouponFilter {
    pub created_by: Option<i64>,
    pub active_only: bool,
    pub page: i64,
    pub page_size: i64,
}

impl CouponFilter {
    pub fn offset(&self) -> i64 {
        (self.page.max(1) - 1) * self.limit()
    }

    pub fn limit(&self) -> i64 {
        self.page_size.clamp(1, 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn coupon(usage_limit: Option<i32>, used: i32) -> Coupon {
        let now = Utc::now();
        Coupon {
            id: 1,
            code: "SAVE20".to_string(),
            coupon_type_id: None,
            discount_type: DiscountType::Percentage,
            discount_value: Decimal::from(20),
            valid_from: now - Duration::days(1),
            valid_until: now + Duration::days(1),
            usage_limit,
            current_usage_count: used,
            is_active: true,
            created_by: 1,
            description: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_exhausted() {
        assert!(!coupon(None, 1000).is_exhausted());
        assert!(!coupon(Some(5), 4).is_exhausted());
        assert!(coupon(Some(5), 5).is_exhausted());
    }

    #[test]
    fn test_validity_window_inclusive() {
        let c = coupon(None, 0);
        assert!(c.is_within_validity(c.valid_from));
        assert!(c.is_within_validity(c.valid_until));
        assert!(!c.is_within_validity(c.valid_until + Duration::seconds(1)));
        assert!(!c.is_within_validity(c.valid_from - Duration::seconds(1)));
    }

    #[test]
    fn test_origin_accessors() {
        let origin = CouponOrigin::Agent {
            agent_id: 9,
            commission_rate: Decimal::from(10),
        };
        assert_eq!(origin.agent_id(), Some(9));
        assert_eq!(origin.commission_rate(), Some(Decimal::from(10)));
        assert_eq!(CouponOrigin::Admin.commission_rate(), None);
    }

    #[test]
    fn test_filter_paging() {
        let filter = CouponFilter {
            page: 3,
            page_size: 20,
            ..Default::default()
        };
        assert_eq!(filter.offset(), 40);
        assert_eq!(CouponFilter::default().limit(), 1);
    }
}
