//! 代理佣金 API 处理器

use academy_commerce::models::{AgentBalance, Commission};
use axum::{
    Extension, Json,
    extract::{Query, State},
};

use crate::dto::{ApiResponse, CommissionQuery};
use crate::error::Result;
use crate::middleware::CallerId;
use crate::state::AppState;

/// GET /api/v1/agent/commissions
pub async fn list_commissions(
    State(state): State<AppState>,
    Extension(CallerId(agent_id)): Extension<CallerId>,
    Query(query): Query<CommissionQuery>,
) -> Result<Json<ApiResponse<Vec<Commission>>>> {
    let commissions = state
        .payouts
        .list_commissions(agent_id, query.status)
        .await?;
    Ok(Json(ApiResponse::success(commissions)))
}

/// GET /api/v1/agent/balance
pub async fn get_balance(
    State(state): State<AppState>,
    Extension(CallerId(agent_id)): Extension<CallerId>,
) -> Result<Json<ApiResponse<AgentBalance>>> {
    let balance = state.payouts.balance(agent_id).await?;
    Ok(Json(ApiResponse::success(balance)))
}
