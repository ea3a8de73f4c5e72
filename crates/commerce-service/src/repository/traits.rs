//! 仓储 Trait 定义
//!
//! 定义仓储接口，便于服务层依赖抽象而非具体实现，支持 mock 测试

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::error::Result;
use crate::models::{
    AgentBalance, AgentProfile, Commission, CommissionStatus, Coupon, CouponAssignment,
    CouponFilter, CouponType, Course, NewCommission, NewCoupon, NewCouponType, NewPayment,
    Payment, PaymentChannel, Payout, User,
};

/// 提现申请的认领结果
#[derive(Debug, Clone)]
pub enum PayoutClaim {
    /// 已创建提现并认领全部可用佣金
    Created(Payout),
    /// 可用佣金低于最低提现额，未做任何修改
    BelowMinimum { available: Decimal },
}

/// 优惠券仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CouponRepositoryTrait: Send + Sync {
    // 优惠券
    async fn find_by_code(&self, code: &str) -> Result<Option<Coupon>>;
    async fn get_coupon(&self, id: i64) -> Result<Option<Coupon>>;
    async fn list_coupons(&self, filter: &CouponFilter) -> Result<(Vec<Coupon>, i64)>;
    async fn create_coupon(&self, coupon: &NewCoupon) -> Result<Coupon>;
    /// 优惠券与课程限制、用户指定在同一事务中写入
    async fn create_coupon_with_scope(
        &self,
        coupon: &NewCoupon,
        course_ids: &[i64],
        user_ids: &[i64],
    ) -> Result<Coupon>;
    async fn deactivate(&self, id: i64) -> Result<bool>;

    // 使用次数
    async fn try_redeem(&self, id: i64) -> Result<bool>;

    // 课程限制
    async fn list_course_ids(&self, coupon_id: i64) -> Result<Vec<i64>>;
    async fn replace_course_ids(&self, coupon_id: i64, course_ids: &[i64]) -> Result<()>;

    // 用户指定
    async fn count_assignments(&self, coupon_id: i64) -> Result<i64>;
    async fn get_assignment(
        &self,
        coupon_id: i64,
        user_id: i64,
    ) -> Result<Option<CouponAssignment>>;
    async fn assign_users(&self, coupon_id: i64, user_ids: &[i64]) -> Result<u64>;
    async fn consume_assignment(&self, coupon_id: i64, user_id: i64) -> Result<bool>;

    // 模板
    async fn get_coupon_type(&self, id: i64) -> Result<Option<CouponType>>;
    async fn list_coupon_types(&self) -> Result<Vec<CouponType>>;
    async fn create_coupon_type(&self, coupon_type: &NewCouponType) -> Result<CouponType>;
}

/// 课程仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CourseRepositoryTrait: Send + Sync {
    async fn get_course(&self, id: i64) -> Result<Option<Course>>;
}

/// 用户与代理仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AgentRepositoryTrait: Send + Sync {
    async fn get_user(&self, id: i64) -> Result<Option<User>>;
    async fn get_agent_profile(&self, user_id: i64) -> Result<Option<AgentProfile>>;
}

/// 支付仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentRepositoryTrait: Send + Sync {
    async fn create_payment(&self, payment: &NewPayment) -> Result<Payment>;
    async fn get_payment(&self, id: i64) -> Result<Option<Payment>>;
    async fn get_by_gateway_order(&self, gateway_order_id: &str) -> Result<Option<Payment>>;

    /// pending/failed -> completed，状态不符时返回 None
    ///
    /// 网关允许对同一订单在失败后再次付款，已失败的支付仍可凭有效签名完成
    async fn mark_completed(
        &self,
        id: i64,
        gateway_payment_id: &str,
        invoice_number: &str,
    ) -> Result<Option<Payment>>;

    /// pending -> failed，状态不符时返回 None
    async fn mark_failed(&self, id: i64, reason: &str) -> Result<Option<Payment>>;

    /// 原子递增发票序号并返回新值
    async fn next_invoice_sequence(
        &self,
        financial_year: &str,
        channel: PaymentChannel,
    ) -> Result<i64>;
}

/// 佣金仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommissionRepositoryTrait: Send + Sync {
    async fn find_by_payment(&self, payment_id: i64) -> Result<Option<Commission>>;

    /// 单事务写入佣金并回填支付记录的代理与佣金字段
    async fn create_with_payment_update(&self, commission: &NewCommission) -> Result<Commission>;

    async fn list_by_agent(
        &self,
        agent_id: i64,
        status: Option<CommissionStatus>,
    ) -> Result<Vec<Commission>>;
    async fn balance(&self, agent_id: i64) -> Result<AgentBalance>;
}

/// 提现仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PayoutRepositoryTrait: Send + Sync {
    /// 单事务认领代理全部可用佣金并创建提现
    async fn create_claiming_commissions(
        &self,
        agent_id: i64,
        bank_snapshot: Value,
        note: Option<String>,
        minimum: Decimal,
    ) -> Result<PayoutClaim>;

    async fn get_payout(&self, id: i64) -> Result<Option<Payout>>;
    async fn list_payouts(&self, agent_id: Option<i64>) -> Result<Vec<Payout>>;

    /// pending -> completed，同时结清关联佣金，状态不符时返回 None
    async fn complete(&self, id: i64, reference: &str) -> Result<Option<Payout>>;

    /// pending -> rejected，同时释放关联佣金，状态不符时返回 None
    async fn reject(&self, id: i64, note: Option<String>) -> Result<Option<Payout>>;
}
