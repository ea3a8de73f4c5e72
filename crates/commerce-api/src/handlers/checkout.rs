//! 结算 API 处理器
//!
//! 确认回调由网关签名保护，不要求调用方身份；发起、标记失败和查询只对支付所属学员开放

use academy_commerce::dto::{
    CheckoutRequest, CheckoutSession, ConfirmPaymentRequest, PaymentReceipt,
};
use academy_commerce::{CommerceError, Payment};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use validator::Validate;

use crate::dto::{ApiResponse, CheckoutBody, ConfirmPaymentBody, FailPaymentBody};
use crate::error::Result;
use crate::middleware::CallerId;
use crate::state::AppState;

/// 发起结算
///
/// POST /api/v1/checkout
pub async fn initiate_checkout(
    State(state): State<AppState>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Json(req): Json<CheckoutBody>,
) -> Result<(StatusCode, Json<ApiResponse<CheckoutSession>>)> {
    req.validate()?;

    let session = state
        .checkout
        .initiate(
            CheckoutRequest {
                user_id,
                course_id: req.course_id,
                channel: req.channel,
                coupon_code: req.coupon_code,
            },
            Utc::now(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(session))))
}

/// 确认支付
///
/// POST /api/v1/checkout/confirm
pub async fn confirm_payment(
    State(state): State<AppState>,
    Json(req): Json<ConfirmPaymentBody>,
) -> Result<Json<ApiResponse<PaymentReceipt>>> {
    req.validate()?;

    let receipt = state
        .checkout
        .confirm(
            ConfirmPaymentRequest {
                gateway_order_id: req.gateway_order_id,
                gateway_payment_id: req.gateway_payment_id,
                signature: req.signature,
            },
            Utc::now(),
        )
        .await?;

    Ok(Json(ApiResponse::success(receipt)))
}

/// 支付失败
///
/// POST /api/v1/checkout/fail
pub async fn fail_payment(
    State(state): State<AppState>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Json(req): Json<FailPaymentBody>,
) -> Result<Json<ApiResponse<PaymentReceipt>>> {
    req.validate()?;
    let receipt = state
        .checkout
        .fail(user_id, &req.gateway_order_id, &req.reason)
        .await?;
    Ok(Json(ApiResponse::success(receipt)))
}

/// 查询本人的支付记录
///
/// GET /api/v1/payments/{id}
pub async fn get_payment(
    State(state): State<AppState>,
    Extension(CallerId(user_id)): Extension<CallerId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Payment>>> {
    let payment = state.checkout.get_payment(id).await?;
    // 他人的支付按不存在处理
    if payment.user_id != user_id {
        return Err(CommerceError::PaymentNotFound(id.to_string()).into());
    }
    Ok(Json(ApiResponse::success(payment)))
}
