//! 优惠券 API 处理器
//!
//! 覆盖优惠券校验、管理员维护、模板维护和代理自助创建

use academy_commerce::dto::CouponDetail;
use academy_commerce::models::{Coupon, CouponType};
use academy_commerce::service::{ValidateCouponRequest, ValidatedCoupon};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
};
use chrono::Utc;
use tracing::info;
use validator::Validate;

use crate::dto::{
    ApiResponse, AssignUsersRequest, AssignedUsersDto, CouponListQuery, CreateAgentCouponRequest,
    CreateCouponRequest, CreateCouponTypeRequest, PageResponse, ReplaceCoursesRequest,
    ValidateCouponBody,
};
use crate::error::Result;
use crate::middleware::{CallerId, caller_from_headers};
use crate::state::AppState;

/// 校验优惠券
///
/// POST /api/v1/coupons/validate
///
/// 请求体未指定用户时使用调用方身份（可匿名）
pub async fn validate_coupon(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ValidateCouponBody>,
) -> Result<Json<ApiResponse<ValidatedCoupon>>> {
    req.validate()?;

    let user_id = match req.user_id {
        Some(id) => Some(id),
        None => caller_from_headers(&headers)?.map(|CallerId(id)| id),
    };

    let validated = state
        .validator
        .validate(
            &ValidateCouponRequest {
                code: req.code,
                course_id: req.course_id,
                user_id,
            },
            Utc::now(),
        )
        .await?;

    Ok(Json(ApiResponse::success(validated)))
}

/// 分页查询优惠券
///
/// GET /api/v1/coupons
pub async fn list_coupons(
    State(state): State<AppState>,
    Query(query): Query<CouponListQuery>,
) -> Result<Json<ApiResponse<PageResponse<Coupon>>>> {
    let page = state.coupons.list(query.into()).await?;
    Ok(Json(ApiResponse::success(page.into())))
}

/// 管理员创建优惠券
///
/// POST /api/v1/coupons
pub async fn create_coupon(
    State(state): State<AppState>,
    Extension(CallerId(admin_id)): Extension<CallerId>,
    Json(req): Json<CreateCouponRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CouponDetail>>)> {
    req.validate()?;

    let detail = state
        .coupons
        .create_admin_coupon(admin_id, req.into())
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(detail))))
}

/// 优惠券详情
///
/// GET /api/v1/coupons/{id}
pub async fn get_coupon(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<CouponDetail>>> {
    let detail = state.coupons.get(id).await?;
    Ok(Json(ApiResponse::success(detail)))
}

/// 停用优惠券
///
/// POST /api/v1/coupons/{id}/deactivate
pub async fn deactivate_coupon(
    State(state): State<AppState>,
    Extension(CallerId(operator)): Extension<CallerId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>> {
    state.coupons.deactivate(id).await?;
    info!(coupon_id = id, operator = operator, "Coupon deactivated via API");
    Ok(Json(ApiResponse::<()>::success_empty()))
}

/// 整体替换课程限制
///
/// PUT /api/v1/coupons/{id}/courses
pub async fn replace_coupon_courses(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<ReplaceCoursesRequest>,
) -> Result<Json<ApiResponse<Vec<i64>>>> {
    req.validate()?;
    let course_ids = state
        .coupons
        .set_course_restrictions(id, req.course_ids)
        .await?;
    Ok(Json(ApiResponse::success(course_ids)))
}

/// 追加用户指定
///
/// PUT /api/v1/coupons/{id}/users
pub async fn assign_coupon_users(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<AssignUsersRequest>,
) -> Result<Json<ApiResponse<AssignedUsersDto>>> {
    req.validate()?;
    let added = state.coupons.assign_users(id, req.user_ids).await?;
    Ok(Json(ApiResponse::success(AssignedUsersDto {
        coupon_id: id,
        added,
    })))
}

/// GET /api/v1/coupon-types
pub async fn list_coupon_types(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<CouponType>>>> {
    let types = state.coupons.list_coupon_types().await?;
    Ok(Json(ApiResponse::success(types)))
}

/// POST /api/v1/coupon-types
pub async fn create_coupon_type(
    State(state): State<AppState>,
    Json(req): Json<CreateCouponTypeRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CouponType>>)> {
    req.validate()?;
    let coupon_type = state.coupons.create_coupon_type(req.into()).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(coupon_type))))
}

/// 代理基于模板创建优惠券
///
/// POST /api/v1/agent/coupons
pub async fn create_agent_coupon(
    State(state): State<AppState>,
    Extension(CallerId(agent_id)): Extension<CallerId>,
    Json(req): Json<CreateAgentCouponRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Coupon>>)> {
    req.validate()?;
    let coupon = state
        .coupons
        .create_agent_coupon(agent_id, req.into())
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(coupon))))
}
