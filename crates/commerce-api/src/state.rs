//! 应用状态定义
//!
//! 包含 Axum 路由共享的应用状态

use std::sync::Arc;

use academy_commerce::gateway::PaymentGateway;
use academy_commerce::repository::{
    AgentRepository, CommissionRepository, CouponRepository, CourseRepository, PaymentRepository,
    PayoutRepository,
};
use academy_commerce::{
    CheckoutService, CommissionRecorder, CouponService, CouponValidator, OrderCalculator,
    PayoutService,
};
use academy_shared::config::CommerceConfig;
use sqlx::PgPool;

/// Axum 应用共享状态
///
/// 服务实例通过 Arc 在 handler 间共享
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL 连接池（就绪探针使用）
    pub pool: PgPool,
    pub coupons: Arc<CouponService>,
    pub validator: Arc<CouponValidator>,
    pub checkout: Arc<CheckoutService>,
    pub payouts: Arc<PayoutService>,
}

impl AppState {
    /// 基于连接池装配仓储与服务
    pub fn new(pool: PgPool, commerce: &CommerceConfig, gateway: Arc<dyn PaymentGateway>) -> Self {
        let coupon_repo = Arc::new(CouponRepository::new(pool.clone()));
        let course_repo = Arc::new(CourseRepository::new(pool.clone()));
        let agent_repo = Arc::new(AgentRepository::new(pool.clone()));
        let payment_repo = Arc::new(PaymentRepository::new(pool.clone()));
        let commission_repo = Arc::new(CommissionRepository::new(pool.clone()));
        let payout_repo = Arc::new(PayoutRepository::new(pool.clone()));

        let validator = Arc::new(CouponValidator::new(
            coupon_repo.clone(),
            agent_repo.clone(),
        ));
        let recorder = Arc::new(CommissionRecorder::new(
            coupon_repo.clone(),
            agent_repo.clone(),
            commission_repo.clone(),
        ));

        let coupons = Arc::new(CouponService::new(
            coupon_repo.clone(),
            course_repo.clone(),
            agent_repo.clone(),
        ));
        let checkout = Arc::new(CheckoutService::new(
            course_repo,
            coupon_repo,
            payment_repo,
            validator.clone(),
            OrderCalculator::new(commerce.gst_rate),
            commerce.invoice_prefix.clone(),
            recorder,
            gateway,
        ));
        let payouts = Arc::new(PayoutService::new(
            agent_repo,
            commission_repo,
            payout_repo,
            commerce.min_payout_amount,
        ));

        Self {
            pool,
            coupons,
            validator,
            checkout,
            payouts,
        }
    }
}
