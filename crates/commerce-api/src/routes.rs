//! 路由配置模块
//!
//! 定义所有 REST API 端点的路由映射

use axum::{
    Router, middleware,
    routing::{get, post, put},
};

use crate::{handlers, middleware::require_caller, state::AppState};

/// 无需调用方身份的路由
///
/// 包含优惠券校验和带签名的支付确认
fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/coupons/validate", post(handlers::coupon::validate_coupon))
        .route("/checkout/confirm", post(handlers::checkout::confirm_payment))
}

/// 优惠券管理路由
fn coupon_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/coupons",
            get(handlers::coupon::list_coupons).post(handlers::coupon::create_coupon),
        )
        .route("/coupons/{id}", get(handlers::coupon::get_coupon))
        .route(
            "/coupons/{id}/deactivate",
            post(handlers::coupon::deactivate_coupon),
        )
        .route(
            "/coupons/{id}/courses",
            put(handlers::coupon::replace_coupon_courses),
        )
        .route(
            "/coupons/{id}/users",
            put(handlers::coupon::assign_coupon_users),
        )
        .route(
            "/coupon-types",
            get(handlers::coupon::list_coupon_types).post(handlers::coupon::create_coupon_type),
        )
}

/// 结算与支付查询路由
fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/checkout", post(handlers::checkout::initiate_checkout))
        .route("/checkout/fail", post(handlers::checkout::fail_payment))
        .route("/payments/{id}", get(handlers::checkout::get_payment))
}

/// 代理自助路由
///
/// 包含代理优惠券、佣金、余额和提现申请
fn agent_routes() -> Router<AppState> {
    Router::new()
        .route("/agent/coupons", post(handlers::coupon::create_agent_coupon))
        .route(
            "/agent/commissions",
            get(handlers::commission::list_commissions),
        )
        .route("/agent/balance", get(handlers::commission::get_balance))
        .route(
            "/agent/payouts",
            get(handlers::payout::list_my_payouts).post(handlers::payout::request_payout),
        )
}

/// 提现处理路由
fn payout_routes() -> Router<AppState> {
    Router::new()
        .route("/payouts", get(handlers::payout::list_payouts))
        .route(
            "/payouts/{id}/process",
            post(handlers::payout::process_payout),
        )
        .route("/payouts/{id}/reject", post(handlers::payout::reject_payout))
}

/// 构建 `/api/v1` 下的全部路由
pub fn api_routes() -> Router<AppState> {
    let protected = Router::new()
        .merge(coupon_routes())
        .merge(checkout_routes())
        .merge(agent_routes())
        .merge(payout_routes())
        .route_layer(middleware::from_fn(require_caller));

    Router::new().merge(public_routes()).merge(protected)
}

/// 构建完整应用路由（不含可观测性等外层中间件）
pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api_routes())
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .with_state(state)
}
