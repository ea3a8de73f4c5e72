//! 路由层测试
//!
//! 只覆盖不触达数据库的路径：探活、调用方身份校验和请求体校验

use std::sync::Arc;

use academy_commerce::RazorpayGateway;
use academy_shared::config::{CommerceConfig, GatewayConfig};
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use commerce_api::{routes, state::AppState};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use sqlx::PgPool;
use tower::ServiceExt;

fn test_app() -> Router {
    let pool = PgPool::connect_lazy("postgres://localhost/unused").unwrap();
    let gateway = Arc::new(
        RazorpayGateway::new(&GatewayConfig {
            key_id: "rzp_test_key".to_string(),
            key_secret: "rzp_test_secret".to_string(),
            ..GatewayConfig::default()
        })
        .unwrap(),
    );
    routes::app(AppState::new(pool, &CommerceConfig::default(), gateway))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_is_public() {
    let response = test_app()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "commerce-api");
}

#[tokio::test]
async fn test_protected_route_requires_caller() {
    let response = test_app()
        .oneshot(
            Request::get("/api/v1/agent/balance")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_malformed_caller_is_rejected() {
    for value in ["abc", "0", "-7"] {
        let response = test_app()
            .oneshot(
                Request::get("/api/v1/payouts")
                    .header("x-user-id", value)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "x-user-id={value}");
    }
}

#[tokio::test]
async fn test_validate_rejects_empty_code_before_lookup() {
    let response = test_app()
        .oneshot(
            Request::post("/api/v1/coupons/validate")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({ "code": "", "courseId": 3 }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["data"].is_null());
}

#[tokio::test]
async fn test_validate_rejects_malformed_caller_header() {
    let response = test_app()
        .oneshot(
            Request::post("/api/v1/coupons/validate")
                .header(header::CONTENT_TYPE, "application/json")
                .header("x-user-id", "not-a-number")
                .body(Body::from(json!({ "code": "SAVE20" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_fail_payment_requires_caller() {
    let response = test_app()
        .oneshot(
            Request::post("/api/v1/checkout/fail")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({ "gatewayOrderId": "order_abc", "reason": "cancelled" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let response = test_app()
        .oneshot(
            Request::get("/api/v1/nowhere")
                .header("x-user-id", "5")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
