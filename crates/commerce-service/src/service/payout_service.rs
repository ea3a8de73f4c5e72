//! 代理佣金与提现服务
//!
//! 提现申请一次性认领该代理所有未申请的待结算佣金；处理完成时佣金置为已结算，
//! 驳回时佣金释放回可提现余额。

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

use academy_shared::observability::metrics;

use crate::error::{CommerceError, Result};
use crate::models::{
    AgentBalance, AgentProfile, Commission, CommissionStatus, Payout, PayoutStatus, UserRole,
};
use crate::repository::{
    AgentRepositoryTrait, CommissionRepositoryTrait, PayoutClaim, PayoutRepositoryTrait,
};

/// 佣金与提现服务
pub struct PayoutService {
    agent_repo: Arc<dyn AgentRepositoryTrait>,
    commission_repo: Arc<dyn CommissionRepositoryTrait>,
    payout_repo: Arc<dyn PayoutRepositoryTrait>,
    min_payout_amount: Decimal,
}

impl PayoutService {
    pub fn new(
        agent_repo: Arc<dyn AgentRepositoryTrait>,
        commission_repo: Arc<dyn CommissionRepositoryTrait>,
        payout_repo: Arc<dyn PayoutRepositoryTrait>,
        min_payout_amount: Decimal,
    ) -> Self {
        Self {
            agent_repo,
            commission_repo,
            payout_repo,
            min_payout_amount,
        }
    }

    pub async fn list_commissions(
        &self,
        agent_id: i64,
        status: Option<CommissionStatus>,
    ) -> Result<Vec<Commission>> {
        self.commission_repo.list_by_agent(agent_id, status).await
    }

    pub async fn balance(&self, agent_id: i64) -> Result<AgentBalance> {
        self.commission_repo.balance(agent_id).await
    }

    /// 申请提现
    #[instrument(skip(self, note))]
    pub async fn request_payout(&self, agent_id: i64, note: Option<String>) -> Result<Payout> {
        let profile = self.require_agent(agent_id).await?;
        if !profile.has_payout_details() {
            metrics::record_payout("request", "missing_bank_details");
            return Err(CommerceError::MissingBankDetails(agent_id));
        }

        let claim = self
            .payout_repo
            .create_claiming_commissions(
                agent_id,
                profile.bank_snapshot(),
                note,
                self.min_payout_amount,
            )
            .await?;

        match claim {
            PayoutClaim::Created(payout) => {
                metrics::record_payout("request", "created");
                info!(
                    payout_id = payout.id,
                    amount = %payout.amount,
                    "Payout requested"
                );
                Ok(payout)
            }
            PayoutClaim::BelowMinimum { available } => {
                metrics::record_payout("request", "insufficient_balance");
                Err(CommerceError::InsufficientBalance {
                    available,
                    minimum: self.min_payout_amount,
                })
            }
        }
    }

    /// 完成打款
    #[instrument(skip(self, reference))]
    pub async fn process_payout(&self, payout_id: i64, reference: &str) -> Result<Payout> {
        self.require_pending(payout_id).await?;

        let payout = match self.payout_repo.complete(payout_id, reference).await? {
            Some(payout) => payout,
            None => return Err(self.status_conflict(payout_id).await),
        };

        metrics::record_payout("process", "completed");
        info!(
            payout_id = payout.id,
            agent_id = payout.agent_id,
            amount = %payout.amount,
            "Payout completed"
        );
        Ok(payout)
    }

    /// 驳回提现，佣金回到可提现余额
    #[instrument(skip(self, note))]
    pub async fn reject_payout(&self, payout_id: i64, note: Option<String>) -> Result<Payout> {
        self.require_pending(payout_id).await?;

        let payout = match self.payout_repo.reject(payout_id, note).await? {
            Some(payout) => payout,
            None => return Err(self.status_conflict(payout_id).await),
        };

        metrics::record_payout("reject", "rejected");
        info!(payout_id = payout.id, agent_id = payout.agent_id, "Payout rejected");
        Ok(payout)
    }

    pub async fn list_payouts(&self, agent_id: Option<i64>) -> Result<Vec<Payout>> {
        self.payout_repo.list_payouts(agent_id).await
    }

    // ==================== 私有方法 ====================

    async fn require_agent(&self, agent_id: i64) -> Result<AgentProfile> {
        let is_agent = self
            .agent_repo
            .get_user(agent_id)
            .await?
            .is_some_and(|user| user.role == UserRole::Agent);
        if !is_agent {
            return Err(CommerceError::AgentNotFound(agent_id));
        }

        self.agent_repo
            .get_agent_profile(agent_id)
            .await?
            .ok_or(CommerceError::AgentNotFound(agent_id))
    }

    async fn require_pending(&self, payout_id: i64) -> Result<Payout> {
        let payout = self
            .payout_repo
            .get_payout(payout_id)
            .await?
            .ok_or(CommerceError::PayoutNotFound(payout_id))?;

        if payout.status != PayoutStatus::Pending {
            return Err(CommerceError::InvalidPayoutStatus {
                payout_id,
                current_status: payout.status.as_str().to_string(),
            });
        }
        Ok(payout)
    }

    /// 条件更新未命中：提现已被并发处理
    async fn status_conflict(&self, payout_id: i64) -> CommerceError {
        warn!(payout_id = payout_id, "Payout changed concurrently");
        match self.payout_repo.get_payout(payout_id).await {
            Ok(Some(current)) => CommerceError::InvalidPayoutStatus {
                payout_id,
                current_status: current.status.as_str().to_string(),
            },
            Ok(None) => CommerceError::PayoutNotFound(payout_id),
            Err(e) => e,
        }
    }
}
