//! 提现仓储
//!
//! 认领、结清、释放佣金均在单个事务内完成，并对相关佣金行加锁

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::{PgConnection, PgPool};

use super::traits::{PayoutClaim, PayoutRepositoryTrait};
use crate::error::Result;
use crate::models::Payout;

const PAYOUT_COLUMNS: &str = r#"
    id, agent_id, amount, status, bank_snapshot, reference, note, requested_at, processed_at
"#;

/// 提现仓储
pub struct PayoutRepository {
    pool: PgPool,
}

impl PayoutRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 认领代理全部可用佣金并创建提现
    ///
    /// 可用佣金指 pending 且未挂在任何提现上的记录。合计低于 minimum 时回滚并返回 BelowMinimum
    pub async fn create_claiming_commissions(
        &self,
        agent_id: i64,
        bank_snapshot: Value,
        note: Option<String>,
        minimum: Decimal,
    ) -> Result<PayoutClaim> {
        let mut tx = self.pool.begin().await?;

        let claimable: Vec<(i64, Decimal)> = sqlx::query_as(
            r#"
            SELECT id, commission_amount
            FROM commissions
            WHERE agent_id = $1 AND status = 'pending' AND payout_id IS NULL
            ORDER BY id
            FOR UPDATE
            "#,
        )
        .bind(agent_id)
        .fetch_all(&mut *tx)
        .await?;

        let available: Decimal = claimable.iter().map(|(_, amount)| *amount).sum();
        if claimable.is_empty() || available < minimum {
            tx.rollback().await?;
            return Ok(PayoutClaim::BelowMinimum { available });
        }

        let insert_sql = format!(
            r#"
            INSERT INTO payouts (agent_id, amount, status, bank_snapshot, note)
            VALUES ($1, $2, 'pending', $3, $4)
            RETURNING {}
            "#,
            PAYOUT_COLUMNS
        );
        let payout = sqlx::query_as::<_, Payout>(&insert_sql)
            .bind(agent_id)
            .bind(available)
            .bind(&bank_snapshot)
            .bind(&note)
            .fetch_one(&mut *tx)
            .await?;

        let ids: Vec<i64> = claimable.iter().map(|(id, _)| *id).collect();
        sqlx::query("UPDATE commissions SET payout_id = $1 WHERE id = ANY($2)")
            .bind(payout.id)
            .bind(&ids)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(PayoutClaim::Created(payout))
    }

    pub async fn get_payout(&self, id: i64) -> Result<Option<Payout>> {
        let sql = format!("SELECT {} FROM payouts WHERE id = $1", PAYOUT_COLUMNS);
        let payout = sqlx::query_as::<_, Payout>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(payout)
    }

    pub async fn list_payouts(&self, agent_id: Option<i64>) -> Result<Vec<Payout>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM payouts
            WHERE ($1::BIGINT IS NULL OR agent_id = $1)
            ORDER BY requested_at DESC, id DESC
            "#,
            PAYOUT_COLUMNS
        );
        let payouts = sqlx::query_as::<_, Payout>(&sql)
            .bind(agent_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(payouts)
    }

    /// 完成提现：佣金置为 paid，对应支付记录 commission_paid = true
    pub async fn complete(&self, id: i64, reference: &str) -> Result<Option<Payout>> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            UPDATE payouts
            SET status = 'completed', reference = $2, processed_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING {}
            "#,
            PAYOUT_COLUMNS
        );
        let Some(payout) = sqlx::query_as::<_, Payout>(&sql)
            .bind(id)
            .bind(reference)
            .fetch_optional(&mut *tx)
            .await?
        else {
            tx.rollback().await?;
            return Ok(None);
        };

        Self::settle_commissions_in_tx(&mut tx, payout.id).await?;

        tx.commit().await?;
        Ok(Some(payout))
    }

    async fn settle_commissions_in_tx(tx: &mut PgConnection, payout_id: i64) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE commissions
            SET status = 'paid', paid_at = NOW()
            WHERE payout_id = $1 AND status = 'pending'
            "#,
        )
        .bind(payout_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE payments
            SET commission_paid = TRUE, updated_at = NOW()
            WHERE id IN (SELECT payment_id FROM commissions WHERE payout_id = $1)
            "#,
        )
        .bind(payout_id)
        .execute(&mut *tx)
        .await?;

        Ok(())
    }

    /// 驳回提现：释放佣金，可在下次申请中重新认领
    pub async fn reject(&self, id: i64, note: Option<String>) -> Result<Option<Payout>> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            UPDATE payouts
            SET status = 'rejected', note = COALESCE($2, note), processed_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING {}
            "#,
            PAYOUT_COLUMNS
        );
        let Some(payout) = sqlx::query_as::<_, Payout>(&sql)
            .bind(id)
            .bind(&note)
            .fetch_optional(&mut *tx)
            .await?
        else {
            tx.rollback().await?;
            return Ok(None);
        };

        sqlx::query(
            "UPDATE commissions SET payout_id = NULL WHERE payout_id = $1 AND status = 'pending'",
        )
        .bind(payout.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(payout))
    }
}

#[async_trait]
impl PayoutRepositoryTrait for PayoutRepository {
    async fn create_claiming_commissions(
        &self,
        agent_id: i64,
        bank_snapshot: Value,
        note: Option<String>,
        minimum: Decimal,
    ) -> Result<PayoutClaim> {
        self.create_claiming_commissions(agent_id, bank_snapshot, note, minimum)
            .await
    }

    async fn get_payout(&self, id: i64) -> Result<Option<Payout>> {
        self.get_payout(id).await
    }

    async fn list_payouts(&self, agent_id: Option<i64>) -> Result<Vec<Payout>> {
        self.list_payouts(agent_id).await
    }

    async fn complete(&self, id: i64, reference: &str) -> Result<Option<Payout>> {
        self.complete(id, reference).await
    }

    async fn reject(&self, id: i64, note: Option<String>) -> Result<Option<Payout>> {
        self.reject(id, note).await
    }
}
