//! Razorpay 兼容的 HTTP 网关客户端

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::{info, warn};

use academy_shared::config::GatewayConfig;

use super::{GatewayOrder, PaymentGateway, verify_payment_signature};
use crate::error::{CommerceError, Result};
use crate::models::Currency;

/// 基于 `/v1/orders` 接口的网关客户端，使用 key id / secret 做 Basic 认证
pub struct RazorpayGateway {
    client: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

impl RazorpayGateway {
    /// 未配置 key secret 时拒绝创建
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        if config.key_secret.trim().is_empty() {
            return Err(CommerceError::Validation(
                "gateway.key_secret must be configured".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| CommerceError::Gateway(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
        })
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    async fn create_order(
        &self,
        amount_minor: i64,
        currency: Currency,
        receipt: &str,
    ) -> Result<GatewayOrder> {
        let url = format!("{}/v1/orders", self.base_url);
        let body = json!({
            "amount": amount_minor,
            "currency": currency.as_str(),
            "receipt": receipt,
        });

        let resp = self
            .client
            .post(&url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&body)
            .send()
            .await
            .map_err(|e| CommerceError::Gateway(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status = %status, body = %text, "Gateway order creation rejected");
            return Err(CommerceError::Gateway(format!(
                "order creation failed with status {}",
                status
            )));
        }

        let order: GatewayOrder = resp
            .json()
            .await
            .map_err(|e| CommerceError::Gateway(format!("malformed order response: {}", e)))?;

        info!(order_id = %order.id, amount = order.amount, "Gateway order created");
        Ok(order)
    }

    fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        verify_payment_signature(&self.key_secret, order_id, payment_id, signature)
    }

    fn key_id(&self) -> String {
        self.key_id.clone()
    }
}
