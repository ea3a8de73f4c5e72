//! 支付网关
//!
//! 结算流程只依赖两项能力：创建网关订单、校验支付回调签名

mod razorpay;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::{CommerceError, Result};
use crate::models::Currency;

pub use razorpay::RazorpayGateway;

/// 网关订单
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayOrder {
    /// 网关侧订单号
    pub id: String,
    /// 最小货币单位金额（paise / cents）
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub receipt: Option<String>,
}

/// 支付网关接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// 创建网关订单，金额为最小货币单位
    async fn create_order(
        &self,
        amount_minor: i64,
        currency: Currency,
        receipt: &str,
    ) -> Result<GatewayOrder>;

    /// 校验支付回调签名
    fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool;

    /// 前端拉起支付所需的公钥
    fn key_id(&self) -> String;
}

/// 将金额换算为最小货币单位（两位小数，四舍五入）
pub fn to_minor_units(amount: Decimal) -> Result<i64> {
    (amount * Decimal::ONE_HUNDRED)
        .round()
        .to_i64()
        .ok_or_else(|| CommerceError::Internal(format!("amount out of range: {}", amount)))
}

/// HMAC-SHA256(`order_id|payment_id`, secret) 的十六进制编码
pub fn sign_payment(secret: &str, order_id: &str, payment_id: &str) -> Result<String> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| CommerceError::Internal(format!("invalid signing key: {}", e)))?;
    mac.update(format!("{}|{}", order_id, payment_id).as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// 常量时间比较签名，空密钥一律不通过
pub fn verify_payment_signature(
    secret: &str,
    order_id: &str,
    payment_id: &str,
    signature: &str,
) -> bool {
    if secret.is_empty() {
        return false;
    }
    let Ok(expected) = hex::decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(format!("{}|{}", order_id, payment_id).as_bytes());
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_minor_units() {
        assert_eq!(to_minor_units(Decimal::new(98000, 2)).unwrap(), 98000);
        assert_eq!(to_minor_units(Decimal::new(1999, 2)).unwrap(), 1999);
        assert_eq!(to_minor_units(Decimal::from(1500)).unwrap(), 150000);
    }

    #[test]
    fn test_signature_roundtrip() {
        let signature = sign_payment("secret", "order_1", "pay_1").unwrap();
        assert_eq!(signature.len(), 64);
        assert!(verify_payment_signature("secret", "order_1", "pay_1", &signature));
    }

    #[test]
    fn test_signature_rejects_tampering() {
        let signature = sign_payment("secret", "order_1", "pay_1").unwrap();
        assert!(!verify_payment_signature("secret", "order_1", "pay_2", &signature));
        assert!(!verify_payment_signature("other", "order_1", "pay_1", &signature));
        assert!(!verify_payment_signature("secret", "order_1", "pay_1", "not-hex"));
    }

    #[test]
    fn test_empty_secret_never_verifies() {
        // HMAC 接受空密钥，任何人都能算出同样的签名
        let forged = sign_payment("", "order_1", "pay_1").unwrap();
        assert!(!verify_payment_signature("", "order_1", "pay_1", &forged));
    }
}
