//! 代理资料

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// 代理资料
///
/// 佣金比例为空时，代理创建的优惠券按管理员券处理，不产生佣金
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AgentProfile {
    pub user_id: i64,
    #[sqlx(default)]
    pub commission_rate: Option<Decimal>,
    #[sqlx(default)]
    pub bank_account_name: Option<String>,
    #[sqlx(default)]
    pub bank_account_number: Option<String>,
    #[sqlx(default)]
    pub bank_ifsc: Option<String>,
    #[sqlx(default)]
    pub upi_id: Option<String>,
    pub is_active: bool,
}

impl AgentProfile {
    /// 是否具备收款信息（完整银行账户或 UPI）
    pub fn has_payout_details(&self) -> bool {
        let filled = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        let bank = filled(&self.bank_account_name)
            && filled(&self.bank_account_number)
            && filled(&self.bank_ifsc);
        bank || filled(&self.upi_id)
    }

    /// 提现时固化的收款信息快照
    pub fn bank_snapshot(&self) -> Value {
        json!({
            "accountName": self.bank_account_name,
            "accountNumber": self.bank_account_number,
            "ifsc": self.bank_ifsc,
            "upiId": self.upi_id,
        })
    }
}
