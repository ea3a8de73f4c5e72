//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集与导出。
//! 指标通过独立的 HTTP 端口暴露，供 Prometheus 抓取。

use anyhow::Result;
use axum::{Router, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info};

use super::ObservabilityConfig;

/// Metrics 资源守卫
pub struct MetricsHandle {
    _server_handle: tokio::task::JoinHandle<()>,
}

/// 初始化 Prometheus 指标导出
///
/// 启动一个独立的 HTTP 服务器在指定端口暴露 `/metrics` 端点。
pub async fn init(config: &ObservabilityConfig) -> Result<MetricsHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    register_common_metrics(&config.service_name);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
    let server_handle = start_metrics_server(addr, handle).await?;

    Ok(MetricsHandle {
        _server_handle: server_handle,
    })
}

/// 注册通用指标描述，出现在 /metrics 的 HELP 注释中
fn register_common_metrics(service_name: &str) {
    metrics::describe_counter!("http_requests_total", "Total number of HTTP requests");
    metrics::describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );

    metrics::describe_counter!(
        "coupon_validations_total",
        "Coupon validations by outcome"
    );
    metrics::describe_counter!("checkouts_total", "Checkout sessions by channel and status");
    metrics::describe_counter!(
        "payments_confirmed_total",
        "Payments confirmed by channel"
    );
    metrics::describe_histogram!(
        "payment_confirmation_duration_seconds",
        "Payment confirmation duration in seconds"
    );
    metrics::describe_counter!("commissions_recorded_total", "Commissions recorded");
    metrics::describe_counter!("payouts_total", "Payout operations by action and status");

    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
}

/// 启动指标 HTTP 服务器
async fn start_metrics_server(
    addr: SocketAddr,
    handle: PrometheusHandle,
) -> Result<tokio::task::JoinHandle<()>> {
    let app = Router::new()
        .route("/metrics", get(move || std::future::ready(handle.render())))
        .route("/health", get(|| async { "OK" }));

    let listener = TcpListener::bind(addr).await?;
    info!("Metrics server listening on {}", addr);

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Metrics server error: {}", e);
        }
    });

    Ok(server_handle)
}

// ============================================================================
// 便捷的指标记录函数
// ============================================================================

/// 记录 HTTP 请求
#[inline]
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let status_str = status.to_string();
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str.clone()
    )
    .increment(1);

    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str
    )
    .record(duration_secs);
}

/// 记录优惠券校验结果（outcome 为 "valid" 或错误码）
#[inline]
pub fn record_coupon_validation(outcome: &str) {
    metrics::counter!(
        "coupon_validations_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// 记录结算会话
#[inline]
pub fn record_checkout(channel: &str, status: &str) {
    metrics::counter!(
        "checkouts_total",
        "channel" => channel.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// 记录支付确认
#[inline]
pub fn record_payment_confirmed(channel: &str, duration_secs: f64) {
    metrics::counter!(
        "payments_confirmed_total",
        "channel" => channel.to_string()
    )
    .increment(1);

    metrics::histogram!(
        "payment_confirmation_duration_seconds",
        "channel" => channel.to_string()
    )
    .record(duration_secs);
}

/// 记录佣金入账
///
/// 不带代理标签，代理 ID 只出现在日志中
#[inline]
pub fn record_commission() {
    metrics::counter!("commissions_recorded_total").increment(1);
}

/// 记录提现操作（action: request / process / reject）
#[inline]
pub fn record_payout(action: &str, status: &str) {
    metrics::counter!(
        "payouts_total",
        "action" => action.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}
