//! 提现 API 处理器
//!
//! 代理申请与查看本人提现；管理员查看全部、完成打款或驳回

use academy_commerce::models::Payout;
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::info;
use validator::Validate;

use crate::dto::{
    ApiResponse, PayoutListQuery, ProcessPayoutRequest, RejectPayoutRequest, RequestPayoutBody,
};
use crate::error::Result;
use crate::middleware::CallerId;
use crate::state::AppState;

/// 代理申请提现
///
/// POST /api/v1/agent/payouts
pub async fn request_payout(
    State(state): State<AppState>,
    Extension(CallerId(agent_id)): Extension<CallerId>,
    body: Option<Json<RequestPayoutBody>>,
) -> Result<(StatusCode, Json<ApiResponse<Payout>>)> {
    let req = body.map(|Json(b)| b).unwrap_or_default();
    req.validate()?;

    let payout = state.payouts.request_payout(agent_id, req.note).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(payout))))
}

/// GET /api/v1/agent/payouts
pub async fn list_my_payouts(
    State(state): State<AppState>,
    Extension(CallerId(agent_id)): Extension<CallerId>,
) -> Result<Json<ApiResponse<Vec<Payout>>>> {
    let payouts = state.payouts.list_payouts(Some(agent_id)).await?;
    Ok(Json(ApiResponse::success(payouts)))
}

/// GET /api/v1/payouts
pub async fn list_payouts(
    State(state): State<AppState>,
    Query(query): Query<PayoutListQuery>,
) -> Result<Json<ApiResponse<Vec<Payout>>>> {
    let payouts = state.payouts.list_payouts(query.agent_id).await?;
    Ok(Json(ApiResponse::success(payouts)))
}

/// 完成打款
///
/// POST /api/v1/payouts/{id}/process
pub async fn process_payout(
    State(state): State<AppState>,
    Extension(CallerId(operator)): Extension<CallerId>,
    Path(id): Path<i64>,
    Json(req): Json<ProcessPayoutRequest>,
) -> Result<Json<ApiResponse<Payout>>> {
    req.validate()?;
    let payout = state.payouts.process_payout(id, &req.reference).await?;
    info!(payout_id = id, operator = operator, "Payout processed via API");
    Ok(Json(ApiResponse::success(payout)))
}

/// 驳回提现
///
/// POST /api/v1/payouts/{id}/reject
pub async fn reject_payout(
    State(state): State<AppState>,
    Extension(CallerId(operator)): Extension<CallerId>,
    Path(id): Path<i64>,
    body: Option<Json<RejectPayoutRequest>>,
) -> Result<Json<ApiResponse<Payout>>> {
    let req = body.map(|Json(b)| b).unwrap_or_default();
    req.validate()?;
    let payout = state.payouts.reject_payout(id, req.note).await?;
    info!(payout_id = id, operator = operator, "Payout rejected via API");
    Ok(Json(ApiResponse::success(payout)))
}
