//! 佣金记录
//!
//! 支付成功后为代理来源的优惠券记录佣金。
//! 非代理来源或代理未配置佣金比例时静默跳过，同一笔支付至多记录一次。

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use academy_shared::observability::metrics;

use crate::error::{CommerceError, Result};
use crate::models::{Commission, CouponOrigin, NewCommission};
use crate::repository::{AgentRepositoryTrait, CommissionRepositoryTrait, CouponRepositoryTrait};
use crate::service::coupon_validator::resolve_origin;
use crate::service::order_calculator::commission_for;

/// 佣金记录输入
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordCommissionInput {
    pub payment_id: i64,
    pub course_id: i64,
    pub student_id: i64,
    pub coupon_id: i64,
    /// 实收金额（应付金额）
    pub sale_amount: Decimal,
}

/// 佣金记录器
pub struct CommissionRecorder {
    coupon_repo: Arc<dyn CouponRepositoryTrait>,
    agent_repo: Arc<dyn AgentRepositoryTrait>,
    commission_repo: Arc<dyn CommissionRepositoryTrait>,
}

impl CommissionRecorder {
    pub fn new(
        coupon_repo: Arc<dyn CouponRepositoryTrait>,
        agent_repo: Arc<dyn AgentRepositoryTrait>,
        commission_repo: Arc<dyn CommissionRepositoryTrait>,
    ) -> Self {
        Self {
            coupon_repo,
            agent_repo,
            commission_repo,
        }
    }

    /// 记录佣金
    ///
    /// 返回 `Ok(None)` 表示该优惠券不产生佣金，支付记录保持不变
    #[instrument(skip(self, input), fields(payment_id = input.payment_id, coupon_id = input.coupon_id))]
    pub async fn record(&self, input: &RecordCommissionInput) -> Result<Option<Commission>> {
        let coupon = self
            .coupon_repo
            .get_coupon(input.coupon_id)
            .await?
            .ok_or_else(|| CommerceError::CouponNotFound(input.coupon_id.to_string()))?;

        let CouponOrigin::Agent {
            agent_id,
            commission_rate,
        } = resolve_origin(self.agent_repo.as_ref(), coupon.created_by).await?
        else {
            debug!(created_by = coupon.created_by, "Coupon creator earns no commission");
            return Ok(None);
        };

        if let Some(existing) = self.commission_repo.find_by_payment(input.payment_id).await? {
            debug!(commission_id = existing.id, "Commission already recorded");
            return Ok(Some(existing));
        }

        let commission = self
            .commission_repo
            .create_with_payment_update(&NewCommission {
                payment_id: input.payment_id,
                course_id: input.course_id,
                student_id: input.student_id,
                coupon_id: input.coupon_id,
                agent_id,
                sale_amount: input.sale_amount,
                commission_rate,
                commission_amount: commission_for(input.sale_amount, commission_rate),
            })
            .await?;

        metrics::record_commission();
        info!(
            commission_id = commission.id,
            agent_id = agent_id,
            amount = %commission.commission_amount,
            "Commission recorded"
        );

        Ok(Some(commission))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AgentProfile, CommissionStatus, Coupon, DiscountType, User, UserRole};
    use crate::repository::{
        MockAgentRepositoryTrait, MockCommissionRepositoryTrait, MockCouponRepositoryTrait,
    };
    use chrono::{Duration, Utc};

    fn coupon(created_by: i64) -> Coupon {
        let now = Utc::now();
        Coupon {
            id: 3,
            code: "AGT10".to_string(),
            coupon_type_id: Some(1),
            discount_type: DiscountType::Percentage,
            discount_value: Decimal::from(10),
            valid_from: now - Duration::days(1),
            valid_until: now + Duration::days(1),
            usage_limit: None,
            current_usage_count: 1,
            is_active: true,
            created_by,
            description: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn input() -> RecordCommissionInput {
        RecordCommissionInput {
            payment_id: 100,
            course_id: 7,
            student_id: 55,
            coupon_id: 3,
            sale_amount: Decimal::from(980),
        }
    }

    fn agents(role: UserRole, rate: Option<Decimal>) -> MockAgentRepositoryTrait {
        let mut repo = MockAgentRepositoryTrait::new();
        repo.expect_get_user().returning(move |id| {
            Ok(Some(User {
                id,
                name: "creator".to_string(),
                email: "creator@example.com".to_string(),
                role,
            }))
        });
        repo.expect_get_agent_profile().returning(move |id| {
            Ok(Some(AgentProfile {
                user_id: id,
                commission_rate: rate,
                bank_account_name: None,
                bank_account_number: None,
                bank_ifsc: None,
                upi_id: None,
                is_active: true,
            }))
        });
        repo
    }

    fn coupons(created_by: i64) -> MockCouponRepositoryTrait {
        let mut repo = MockCouponRepositoryTrait::new();
        repo.expect_get_coupon()
            .returning(move |_| Ok(Some(coupon(created_by))));
        repo
    }

    fn stored(new: &NewCommission) -> Commission {
        Commission {
            id: 1,
            payment_id: new.payment_id,
            course_id: new.course_id,
            student_id: new.student_id,
            coupon_id: new.coupon_id,
            agent_id: new.agent_id,
            sale_amount: new.sale_amount,
            commission_rate: new.commission_rate,
            commission_amount: new.commission_amount,
            status: CommissionStatus::Pending,
            payout_id: None,
            created_at: Utc::now(),
            paid_at: None,
        }
    }

    #[tokio::test]
    async fn test_records_agent_commission() {
        let mut commissions = MockCommissionRepositoryTrait::new();
        commissions.expect_find_by_payment().returning(|_| Ok(None));
        commissions
            .expect_create_with_payment_update()
            .withf(|new| {
                new.agent_id == 42
                    && new.commission_rate == Decimal::from(10)
                    && new.commission_amount == Decimal::from(98)
            })
            .times(1)
            .returning(|new| Ok(stored(new)));

        let recorder = CommissionRecorder::new(
            Arc::new(coupons(42)),
            Arc::new(agents(UserRole::Agent, Some(Decimal::from(10)))),
            Arc::new(commissions),
        );

        let commission = recorder.record(&input()).await.unwrap().unwrap();
        assert_eq!(commission.commission_amount, Decimal::from(98));
        assert_eq!(commission.status, CommissionStatus::Pending);
    }

    #[tokio::test]
    async fn test_admin_coupon_is_noop() {
        let mut commissions = MockCommissionRepositoryTrait::new();
        commissions.expect_create_with_payment_update().never();

        let recorder = CommissionRecorder::new(
            Arc::new(coupons(1)),
            Arc::new(agents(UserRole::Admin, None)),
            Arc::new(commissions),
        );

        assert!(recorder.record(&input()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_agent_without_rate_is_noop() {
        let mut commissions = MockCommissionRepositoryTrait::new();
        commissions.expect_create_with_payment_update().never();

        let recorder = CommissionRecorder::new(
            Arc::new(coupons(42)),
            Arc::new(agents(UserRole::Agent, None)),
            Arc::new(commissions),
        );

        assert!(recorder.record(&input()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_existing_commission_is_returned() {
        let mut commissions = MockCommissionRepositoryTrait::new();
        commissions.expect_find_by_payment().returning(|payment_id| {
            Ok(Some(stored(&NewCommission {
                payment_id,
                course_id: 7,
                student_id: 55,
                coupon_id: 3,
                agent_id: 42,
                sale_amount: Decimal::from(980),
                commission_rate: Decimal::from(10),
                commission_amount: Decimal::from(98),
            })))
        });
        commissions.expect_create_with_payment_update().never();

        let recorder = CommissionRecorder::new(
            Arc::new(coupons(42)),
            Arc::new(agents(UserRole::Agent, Some(Decimal::from(10)))),
            Arc::new(commissions),
        );

        let commission = recorder.record(&input()).await.unwrap().unwrap();
        assert_eq!(commission.payment_id, 100);
    }

    #[tokio::test]
    async fn test_missing_coupon_is_error() {
        let mut coupon_repo = MockCouponRepositoryTrait::new();
        coupon_repo.expect_get_coupon().returning(|_| Ok(None));

        let recorder = CommissionRecorder::new(
            Arc::new(coupon_repo),
            Arc::new(MockAgentRepositoryTrait::new()),
            Arc::new(MockCommissionRepositoryTrait::new()),
        );

        let err = recorder.record(&input()).await.unwrap_err();
        assert!(matches!(err, CommerceError::CouponNotFound(_)));
    }
}
