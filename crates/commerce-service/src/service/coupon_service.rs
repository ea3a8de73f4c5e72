//! 优惠券管理服务
//!
//! 管理员直接创建优惠券；代理只能基于启用中的模板创建，券码为模板前缀加后缀，
//! 折扣类型与默认使用上限继承自模板。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distr::Alphanumeric;
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

use crate::error::{CommerceError, Result};
use crate::models::{
    Coupon, CouponFilter, CouponType, DiscountType, NewCoupon, NewCouponType, UserRole,
};
use crate::repository::{AgentRepositoryTrait, CouponRepositoryTrait, CourseRepositoryTrait};
use crate::service::dto::{
    AgentCouponInput, CouponDetail, NewCouponInput, NewCouponTypeInput, Page,
};

const MAX_CODE_LEN: usize = 64;
const GENERATED_SUFFIX_LEN: usize = 6;
const GENERATE_ATTEMPTS: usize = 3;

/// 规范化券码：去除首尾空白并转为大写
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

fn validate_code(code: &str) -> Result<()> {
    if code.is_empty() || code.len() > MAX_CODE_LEN {
        return Err(CommerceError::Validation(format!(
            "coupon code must be 1-{} characters",
            MAX_CODE_LEN
        )));
    }
    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(CommerceError::Validation(
            "coupon code may only contain letters, digits, '-' and '_'".to_string(),
        ));
    }
    Ok(())
}

fn validate_discount(discount_type: DiscountType, value: Decimal) -> Result<()> {
    if value <= Decimal::ZERO {
        return Err(CommerceError::Validation(
            "discount value must be positive".to_string(),
        ));
    }
    if discount_type == DiscountType::Percentage && value > Decimal::ONE_HUNDRED {
        return Err(CommerceError::Validation(
            "percentage discount cannot exceed 100".to_string(),
        ));
    }
    Ok(())
}

fn random_suffix() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_SUFFIX_LEN)
        .map(char::from)
        .collect::<String>()
        .to_uppercase()
}

/// 优惠券管理服务
pub struct CouponService {
    coupon_repo: Arc<dyn CouponRepositoryTrait>,
    course_repo: Arc<dyn CourseRepositoryTrait>,
    agent_repo: Arc<dyn AgentRepositoryTrait>,
}

impl CouponService {
    pub fn new(
        coupon_repo: Arc<dyn CouponRepositoryTrait>,
        course_repo: Arc<dyn CourseRepositoryTrait>,
        agent_repo: Arc<dyn AgentRepositoryTrait>,
    ) -> Self {
        Self {
            coupon_repo,
            course_repo,
            agent_repo,
        }
    }

    /// 管理员创建优惠券，可同时设置课程限制和用户指定
    #[instrument(skip(self, input), fields(code = %input.code))]
    pub async fn create_admin_coupon(
        &self,
        admin_id: i64,
        input: NewCouponInput,
    ) -> Result<CouponDetail> {
        let code = normalize_code(&input.code);
        validate_code(&code)?;
        validate_discount(input.discount_type, input.discount_value)?;
        self.validate_window_and_limit(&input.valid_from, &input.valid_until, input.usage_limit)?;

        if !input.course_ids.is_empty() {
            self.ensure_courses_exist(&input.course_ids).await?;
        }

        let course_ids = dedup(input.course_ids);
        let user_ids = dedup(input.user_ids);
        let coupon = self
            .coupon_repo
            .create_coupon_with_scope(
                &NewCoupon {
                    code,
                    coupon_type_id: None,
                    discount_type: input.discount_type,
                    discount_value: input.discount_value,
                    valid_from: input.valid_from,
                    valid_until: input.valid_until,
                    usage_limit: input.usage_limit,
                    created_by: admin_id,
                    description: input.description,
                },
                &course_ids,
                &user_ids,
            )
            .await?;

        info!(
            coupon_id = coupon.id,
            admin_id = admin_id,
            courses = course_ids.len(),
            users = user_ids.len(),
            "Admin coupon created"
        );

        Ok(CouponDetail {
            coupon,
            assigned_user_count: user_ids.len() as i64,
            course_ids,
        })
    }

    /// 代理基于模板创建优惠券
    #[instrument(skip(self, input), fields(coupon_type_id = input.coupon_type_id))]
    pub async fn create_agent_coupon(
        &self,
        agent_id: i64,
        input: AgentCouponInput,
    ) -> Result<Coupon> {
        self.ensure_active_agent(agent_id).await?;

        let template = self
            .coupon_repo
            .get_coupon_type(input.coupon_type_id)
            .await?
            .ok_or(CommerceError::CouponTypeNotFound(input.coupon_type_id))?;
        if !template.is_active {
            return Err(CommerceError::CouponTypeInactive(template.id));
        }

        if !template.allows_value(input.discount_value) {
            return Err(CommerceError::Validation(format!(
                "discount value must be between {} and {}",
                template.min_value, template.max_value
            )));
        }
        validate_discount(template.discount_type, input.discount_value)?;
        self.validate_window_and_limit(
            &input.valid_from,
            &input.valid_until,
            template.default_usage_limit,
        )?;

        let fixed_suffix = input.suffix.as_deref().map(normalize_code);
        let attempts = if fixed_suffix.is_some() {
            1
        } else {
            GENERATE_ATTEMPTS
        };

        let mut last_err = None;
        for _ in 0..attempts {
            let suffix = fixed_suffix.clone().unwrap_or_else(random_suffix);
            let code = format!("{}{}", template.code_prefix, suffix);
            validate_code(&code)?;

            let result = self
                .coupon_repo
                .create_coupon(&NewCoupon {
                    code,
                    coupon_type_id: Some(template.id),
                    discount_type: template.discount_type,
                    discount_value: input.discount_value,
                    valid_from: input.valid_from,
                    valid_until: input.valid_until,
                    usage_limit: template.default_usage_limit,
                    created_by: agent_id,
                    description: input.description.clone(),
                })
                .await;

            match result {
                Ok(coupon) => {
                    info!(
                        coupon_id = coupon.id,
                        agent_id = agent_id,
                        code = %coupon.code,
                        "Agent coupon created"
                    );
                    return Ok(coupon);
                }
                Err(CommerceError::CouponCodeExists(code)) => {
                    warn!(code = %code, "Coupon code collision");
                    last_err = Some(CommerceError::CouponCodeExists(code));
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_err.unwrap_or_else(|| {
            CommerceError::Internal("coupon code generation exhausted".to_string())
        }))
    }

    /// 整体替换课程限制，空列表取消限制
    #[instrument(skip(self, course_ids))]
    pub async fn set_course_restrictions(
        &self,
        coupon_id: i64,
        course_ids: Vec<i64>,
    ) -> Result<Vec<i64>> {
        self.require_coupon(coupon_id).await?;
        let course_ids = dedup(course_ids);
        self.ensure_courses_exist(&course_ids).await?;

        self.coupon_repo
            .replace_course_ids(coupon_id, &course_ids)
            .await?;

        info!(coupon_id = coupon_id, courses = course_ids.len(), "Course restrictions updated");
        Ok(course_ids)
    }

    /// 追加用户指定，返回新增数量
    #[instrument(skip(self, user_ids))]
    pub async fn assign_users(&self, coupon_id: i64, user_ids: Vec<i64>) -> Result<u64> {
        self.require_coupon(coupon_id).await?;
        let user_ids = dedup(user_ids);
        if user_ids.is_empty() {
            return Ok(0);
        }

        let added = self.coupon_repo.assign_users(coupon_id, &user_ids).await?;
        info!(coupon_id = coupon_id, added = added, "Coupon users assigned");
        Ok(added)
    }

    #[instrument(skip(self))]
    pub async fn deactivate(&self, coupon_id: i64) -> Result<()> {
        if !self.coupon_repo.deactivate(coupon_id).await? {
            return Err(CommerceError::CouponNotFound(coupon_id.to_string()));
        }
        info!(coupon_id = coupon_id, "Coupon deactivated");
        Ok(())
    }

    pub async fn get(&self, coupon_id: i64) -> Result<CouponDetail> {
        let coupon = self.require_coupon(coupon_id).await?;
        let course_ids = self.coupon_repo.list_course_ids(coupon_id).await?;
        let assigned_user_count = self.coupon_repo.count_assignments(coupon_id).await?;

        Ok(CouponDetail {
            coupon,
            course_ids,
            assigned_user_count,
        })
    }

    pub async fn list(&self, filter: CouponFilter) -> Result<Page<Coupon>> {
        let (items, total) = self.coupon_repo.list_coupons(&filter).await?;
        Ok(Page {
            items,
            total,
            page: filter.page.max(1),
            page_size: filter.limit(),
        })
    }

    pub async fn list_coupon_types(&self) -> Result<Vec<CouponType>> {
        self.coupon_repo.list_coupon_types().await
    }

    #[instrument(skip(self, input), fields(prefix = %input.code_prefix))]
    pub async fn create_coupon_type(&self, input: NewCouponTypeInput) -> Result<CouponType> {
        let code_prefix = normalize_code(&input.code_prefix);
        validate_code(&code_prefix)?;
        if input.name.trim().is_empty() {
            return Err(CommerceError::Validation("name is required".to_string()));
        }
        if input.min_value > input.max_value {
            return Err(CommerceError::Validation(
                "min value cannot exceed max value".to_string(),
            ));
        }
        validate_discount(input.discount_type, input.min_value)?;
        validate_discount(input.discount_type, input.max_value)?;
        if input.default_usage_limit.is_some_and(|limit| limit <= 0) {
            return Err(CommerceError::Validation(
                "usage limit must be positive".to_string(),
            ));
        }

        let created = self
            .coupon_repo
            .create_coupon_type(&NewCouponType {
                name: input.name.trim().to_string(),
                code_prefix,
                discount_type: input.discount_type,
                min_value: input.min_value,
                max_value: input.max_value,
                default_usage_limit: input.default_usage_limit,
            })
            .await?;

        info!(coupon_type_id = created.id, "Coupon type created");
        Ok(created)
    }

    // ==================== 私有方法 ====================

    async fn require_coupon(&self, coupon_id: i64) -> Result<Coupon> {
        self.coupon_repo
            .get_coupon(coupon_id)
            .await?
            .ok_or_else(|| CommerceError::CouponNotFound(coupon_id.to_string()))
    }

    async fn ensure_courses_exist(&self, course_ids: &[i64]) -> Result<()> {
        for &course_id in course_ids {
            if self.course_repo.get_course(course_id).await?.is_none() {
                return Err(CommerceError::CourseNotFound(course_id));
            }
        }
        Ok(())
    }

    async fn ensure_active_agent(&self, agent_id: i64) -> Result<()> {
        let is_agent = self
            .agent_repo
            .get_user(agent_id)
            .await?
            .is_some_and(|user| user.role == UserRole::Agent);
        let is_active = is_agent
            && self
                .agent_repo
                .get_agent_profile(agent_id)
                .await?
                .is_some_and(|profile| profile.is_active);

        if !is_active {
            return Err(CommerceError::AgentNotFound(agent_id));
        }
        Ok(())
    }

    fn validate_window_and_limit(
        &self,
        valid_from: &DateTime<Utc>,
        valid_until: &DateTime<Utc>,
        usage_limit: Option<i32>,
    ) -> Result<()> {
        if valid_from > valid_until {
            return Err(CommerceError::Validation(
                "validFrom must not be after validUntil".to_string(),
            ));
        }
        if usage_limit.is_some_and(|limit| limit <= 0) {
            return Err(CommerceError::Validation(
                "usage limit must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn dedup(mut ids: Vec<i64>) -> Vec<i64> {
    ids.sort_unstable();
    ids.dedup();
    ids
}
