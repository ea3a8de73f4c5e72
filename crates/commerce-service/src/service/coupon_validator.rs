//! 优惠券校验
//!
//! 校验顺序固定，命中第一条失败即返回：
//! 1. 券码不存在 -> 2. 已停用 -> 3. 不在有效期 -> 4. 次数用尽 -> 5. 课程限制 -> 6. 用户限制
//!
//! 校验只读，不修改任何状态。通过后同时确定优惠券来源（代理 / 管理员）。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use academy_shared::observability::metrics;

use crate::error::{CommerceError, Result};
use crate::models::{CouponOrigin, DiscountTerms, UserRole};
use crate::repository::{AgentRepositoryTrait, CouponRepositoryTrait};

/// 校验请求
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateCouponRequest {
    pub code: String,
    #[serde(default)]
    pub course_id: Option<i64>,
    #[serde(default)]
    pub user_id: Option<i64>,
}

/// 校验通过的优惠券
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedCoupon {
    pub coupon_id: i64,
    pub code: String,
    pub terms: DiscountTerms,
    pub origin: CouponOrigin,
}

/// 根据创建人解析优惠券来源
///
/// 创建人是代理且配置了佣金比例时为 Agent，其余情况均为 Admin
pub async fn resolve_origin(
    agent_repo: &dyn AgentRepositoryTrait,
    created_by: i64,
) -> Result<CouponOrigin> {
    let Some(creator) = agent_repo.get_user(created_by).await? else {
        return Ok(CouponOrigin::Admin);
    };
    if creator.role != UserRole::Agent {
        return Ok(CouponOrigin::Admin);
    }

    let rate = agent_repo
        .get_agent_profile(created_by)
        .await?
        .and_then(|profile| profile.commission_rate);

    Ok(match rate {
        Some(commission_rate) => CouponOrigin::Agent {
            agent_id: created_by,
            commission_rate,
        },
        None => CouponOrigin::Admin,
    })
}

/// 优惠券校验器
pub struct CouponValidator {
    coupon_repo: Arc<dyn CouponRepositoryTrait>,
    agent_repo: Arc<dyn AgentRepositoryTrait>,
}

impl CouponValidator {
    pub fn new(
        coupon_repo: Arc<dyn CouponRepositoryTrait>,
        agent_repo: Arc<dyn AgentRepositoryTrait>,
    ) -> Self {
        Self {
            coupon_repo,
            agent_repo,
        }
    }

    /// 校验优惠券并记录结果指标
    #[instrument(skip(self, request), fields(code = %request.code))]
    pub async fn validate(
        &self,
        request: &ValidateCouponRequest,
        now: DateTime<Utc>,
    ) -> Result<ValidatedCoupon> {
        let result = self.check(request, now).await;
        match &result {
            Ok(validated) => {
                metrics::record_coupon_validation("valid");
                debug!(coupon_id = validated.coupon_id, "Coupon accepted");
            }
            Err(e) if e.is_coupon_rejection() => {
                metrics::record_coupon_validation(e.error_code());
                debug!(reason = e.error_code(), "Coupon rejected");
            }
            Err(_) => metrics::record_coupon_validation("error"),
        }
        result
    }

    async fn check(
        &self,
        request: &ValidateCouponRequest,
        now: DateTime<Utc>,
    ) -> Result<ValidatedCoupon> {
        let code = request.code.trim().to_uppercase();

        let coupon = self
            .coupon_repo
            .find_by_code(&code)
            .await?
            .ok_or_else(|| CommerceError::CouponNotFound(code.clone()))?;

        if !coupon.is_active {
            return Err(CommerceError::CouponInactive(coupon.code));
        }

        if !coupon.is_within_validity(now) {
            return Err(CommerceError::CouponExpired(coupon.code));
        }

        if coupon.is_exhausted() {
            return Err(CommerceError::CouponUsageLimitReached(coupon.code));
        }

        let course_ids = self.coupon_repo.list_course_ids(coupon.id).await?;
        if !course_ids.is_empty() {
            let allowed = request
                .course_id
                .is_some_and(|course_id| course_ids.contains(&course_id));
            if !allowed {
                return Err(CommerceError::CouponCourseRestricted(coupon.code));
            }
        }

        if self.coupon_repo.count_assignments(coupon.id).await? > 0 {
            let assignment = match request.user_id {
                Some(user_id) => self.coupon_repo.get_assignment(coupon.id, user_id).await?,
                None => None,
            };
            if !assignment.is_some_and(|a| !a.is_used) {
                return Err(CommerceError::CouponUserRestricted(coupon.code));
            }
        }

        let origin = resolve_origin(self.agent_repo.as_ref(), coupon.created_by).await?;

        Ok(ValidatedCoupon {
            coupon_id: coupon.id,
            terms: coupon.terms(),
            code: coupon.code,
            origin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AgentProfile, Coupon, CouponAssignment, DiscountType, User};
    use crate::repository::{MockAgentRepositoryTrait, MockCouponRepositoryTrait};
    use chrono::Duration;
    use mockall::predicate::eq;
    use rust_decimal::Decimal;

    fn coupon(now: DateTime<Utc>) -> Coupon {
        Coupon {
            id: 11,
            code: "SAVE20".to_string(),
            coupon_type_id: None,
            discount_type: DiscountType::Percentage,
            discount_value: Decimal::from(20),
            valid_from: now - Duration::days(1),
            valid_until: now + Duration::days(30),
            usage_limit: Some(10),
            current_usage_count: 3,
            is_active: true,
            created_by: 1,
            description: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn request(course_id: Option<i64>, user_id: Option<i64>) -> ValidateCouponRequest {
        ValidateCouponRequest {
            code: " save20 ".to_string(),
            course_id,
            user_id,
        }
    }

    fn user(id: i64, role: UserRole) -> User {
        User {
            id,
            name: format!("user-{}", id),
            email: format!("user{}@example.com", id),
            role,
        }
    }

    fn coupon_repo_with(
        coupon: Option<Coupon>,
        course_ids: Vec<i64>,
        assignments: i64,
        assignment: Option<CouponAssignment>,
    ) -> MockCouponRepositoryTrait {
        let mut repo = MockCouponRepositoryTrait::new();
        repo.expect_find_by_code()
            .with(eq("SAVE20"))
            .returning(move |_| Ok(coupon.clone()));
        repo.expect_list_course_ids()
            .returning(move |_| Ok(course_ids.clone()));
        repo.expect_count_assignments()
            .returning(move |_| Ok(assignments));
        repo.expect_get_assignment()
            .returning(move |_, _| Ok(assignment.clone()));
        repo
    }

    fn admin_creator() -> MockAgentRepositoryTrait {
        let mut repo = MockAgentRepositoryTrait::new();
        repo.expect_get_user()
            .returning(|id| Ok(Some(user(id, UserRole::Admin))));
        repo
    }

    fn validator(
        coupon_repo: MockCouponRepositoryTrait,
        agent_repo: MockAgentRepositoryTrait,
    ) -> CouponValidator {
        CouponValidator::new(Arc::new(coupon_repo), Arc::new(agent_repo))
    }

    #[tokio::test]
    async fn test_valid_admin_coupon() {
        let now = Utc::now();
        let v = validator(coupon_repo_with(Some(coupon(now)), vec![], 0, None), admin_creator());

        let validated = v.validate(&request(Some(5), Some(9)), now).await.unwrap();
        assert_eq!(validated.coupon_id, 11);
        assert_eq!(validated.code, "SAVE20");
        assert_eq!(validated.terms.discount_type, DiscountType::Percentage);
        assert_eq!(validated.origin, CouponOrigin::Admin);
    }

    #[tokio::test]
    async fn test_unknown_code() {
        let now = Utc::now();
        let v = validator(coupon_repo_with(None, vec![], 0, None), admin_creator());

        let err = v.validate(&request(None, None), now).await.unwrap_err();
        assert!(matches!(err, CommerceError::CouponNotFound(code) if code == "SAVE20"));
    }

    #[tokio::test]
    async fn test_inactive_checked_before_expiry() {
        let now = Utc::now();
        let mut c = coupon(now);
        c.is_active = false;
        c.valid_until = now - Duration::days(1);
        let v = validator(coupon_repo_with(Some(c), vec![], 0, None), admin_creator());

        let err = v.validate(&request(None, None), now).await.unwrap_err();
        assert!(matches!(err, CommerceError::CouponInactive(_)));
    }

    #[tokio::test]
    async fn test_expired_and_not_yet_valid() {
        let now = Utc::now();

        let mut expired = coupon(now);
        expired.valid_until = now - Duration::seconds(1);
        let v = validator(coupon_repo_with(Some(expired), vec![], 0, None), admin_creator());
        let err = v.validate(&request(None, None), now).await.unwrap_err();
        assert!(matches!(err, CommerceError::CouponExpired(_)));

        let mut future = coupon(now);
        future.valid_from = now + Duration::hours(1);
        let v = validator(coupon_repo_with(Some(future), vec![], 0, None), admin_creator());
        let err = v.validate(&request(None, None), now).await.unwrap_err();
        assert!(matches!(err, CommerceError::CouponExpired(_)));
    }

    #[tokio::test]
    async fn test_usage_limit_reached() {
        let now = Utc::now();
        let mut c = coupon(now);
        c.current_usage_count = 10;
        let v = validator(coupon_repo_with(Some(c), vec![5], 0, None), admin_creator());

        let err = v.validate(&request(Some(5), None), now).await.unwrap_err();
        assert!(matches!(err, CommerceError::CouponUsageLimitReached(_)));
    }

    #[tokio::test]
    async fn test_course_restriction() {
        let now = Utc::now();

        let v = validator(coupon_repo_with(Some(coupon(now)), vec![1, 2], 0, None), admin_creator());
        let err = v.validate(&request(Some(3), None), now).await.unwrap_err();
        assert!(matches!(err, CommerceError::CouponCourseRestricted(_)));

        let v = validator(coupon_repo_with(Some(coupon(now)), vec![1, 2], 0, None), admin_creator());
        let err = v.validate(&request(None, None), now).await.unwrap_err();
        assert!(matches!(err, CommerceError::CouponCourseRestricted(_)));

        let v = validator(coupon_repo_with(Some(coupon(now)), vec![1, 2], 0, None), admin_creator());
        assert!(v.validate(&request(Some(2), None), now).await.is_ok());
    }

    #[tokio::test]
    async fn test_user_restriction() {
        let now = Utc::now();
        let assigned = |is_used| CouponAssignment {
            coupon_id: 11,
            user_id: 9,
            is_used,
            used_at: None,
        };

        let v = validator(coupon_repo_with(Some(coupon(now)), vec![], 1, None), admin_creator());
        let err = v.validate(&request(None, Some(8)), now).await.unwrap_err();
        assert!(matches!(err, CommerceError::CouponUserRestricted(_)));

        let v = validator(coupon_repo_with(Some(coupon(now)), vec![], 1, None), admin_creator());
        let err = v.validate(&request(None, None), now).await.unwrap_err();
        assert!(matches!(err, CommerceError::CouponUserRestricted(_)));

        let v = validator(
            coupon_repo_with(Some(coupon(now)), vec![], 1, Some(assigned(true))),
            admin_creator(),
        );
        let err = v.validate(&request(None, Some(9)), now).await.unwrap_err();
        assert!(matches!(err, CommerceError::CouponUserRestricted(_)));

        let v = validator(
            coupon_repo_with(Some(coupon(now)), vec![], 1, Some(assigned(false))),
            admin_creator(),
        );
        assert!(v.validate(&request(None, Some(9)), now).await.is_ok());
    }

    #[tokio::test]
    async fn test_agent_origin_with_rate() {
        let now = Utc::now();
        let mut c = coupon(now);
        c.created_by = 42;

        let mut agents = MockAgentRepositoryTrait::new();
        agents
            .expect_get_user()
            .returning(|id| Ok(Some(user(id, UserRole::Agent))));
        agents.expect_get_agent_profile().returning(|id| {
            Ok(Some(AgentProfile {
                user_id: id,
                commission_rate: Some(Decimal::from(10)),
                bank_account_name: None,
                bank_account_number: None,
                bank_ifsc: None,
                upi_id: None,
                is_active: true,
            }))
        });

        let v = validator(coupon_repo_with(Some(c), vec![], 0, None), agents);
        let validated = v.validate(&request(None, None), now).await.unwrap();
        assert_eq!(
            validated.origin,
            CouponOrigin::Agent {
                agent_id: 42,
                commission_rate: Decimal::from(10),
            }
        );
    }

    #[tokio::test]
    async fn test_agent_without_rate_is_admin_origin() {
        let mut agents = MockAgentRepositoryTrait::new();
        agents
            .expect_get_user()
            .returning(|id| Ok(Some(user(id, UserRole::Agent))));
        agents.expect_get_agent_profile().returning(|_| Ok(None));

        let origin = resolve_origin(&agents, 42).await.unwrap();
        assert_eq!(origin, CouponOrigin::Admin);
    }
}
