//! 佣金仓储
//!
//! 佣金写入与支付记录回填在同一事务内完成

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;

use super::payment_repo::PaymentRepository;
use super::traits::CommissionRepositoryTrait;
use crate::error::Result;
use crate::models::{AgentBalance, Commission, CommissionStatus, NewCommission};

const COMMISSION_COLUMNS: &str = r#"
    id, payment_id, course_id, student_id, coupon_id, agent_id, sale_amount,
    commission_rate, commission_amount, status, payout_id, created_at, paid_at
"#;

/// 佣金仓储
pub struct CommissionRepository {
    pool: PgPool,
}

impl CommissionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_payment(&self, payment_id: i64) -> Result<Option<Commission>> {
        let sql = format!(
            "SELECT {} FROM commissions WHERE payment_id = $1",
            COMMISSION_COLUMNS
        );
        let commission = sqlx::query_as::<_, Commission>(&sql)
            .bind(payment_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(commission)
    }

    /// 写入佣金并回填支付记录
    ///
    /// payment_id 唯一约束保证每笔支付至多一条佣金；并发写入时落败方直接返回已存在的记录，
    /// 且不会再次修改支付记录
    pub async fn create_with_payment_update(&self, commission: &NewCommission) -> Result<Commission> {
        let mut tx = self.pool.begin().await?;

        let insert_sql = format!(
            r#"
            INSERT INTO commissions (payment_id, course_id, student_id, coupon_id, agent_id,
                                     sale_amount, commission_rate, commission_amount, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'pending')
            ON CONFLICT (payment_id) DO NOTHING
            RETURNING {}
            "#,
            COMMISSION_COLUMNS
        );
        let inserted = sqlx::query_as::<_, Commission>(&insert_sql)
            .bind(commission.payment_id)
            .bind(commission.course_id)
            .bind(commission.student_id)
            .bind(commission.coupon_id)
            .bind(commission.agent_id)
            .bind(commission.sale_amount)
            .bind(commission.commission_rate)
            .bind(commission.commission_amount)
            .fetch_optional(&mut *tx)
            .await?;

        let result = match inserted {
            Some(created) => {
                PaymentRepository::set_commission_in_tx(
                    &mut tx,
                    created.payment_id,
                    created.agent_id,
                    created.commission_amount,
                )
                .await?;
                created
            }
            None => {
                let select_sql = format!(
                    "SELECT {} FROM commissions WHERE payment_id = $1",
                    COMMISSION_COLUMNS
                );
                sqlx::query_as::<_, Commission>(&select_sql)
                    .bind(commission.payment_id)
                    .fetch_one(&mut *tx)
                    .await?
            }
        };

        tx.commit().await?;
        Ok(result)
    }

    pub async fn list_by_agent(
        &self,
        agent_id: i64,
        status: Option<CommissionStatus>,
    ) -> Result<Vec<Commission>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM commissions
            WHERE agent_id = $1 AND ($2::VARCHAR IS NULL OR status = $2)
            ORDER BY created_at DESC, id DESC
            "#,
            COMMISSION_COLUMNS
        );
        let commissions = sqlx::query_as::<_, Commission>(&sql)
            .bind(agent_id)
            .bind(status)
            .fetch_all(&self.pool)
            .await?;

        Ok(commissions)
    }

    /// 按状态汇总代理佣金
    pub async fn balance(&self, agent_id: i64) -> Result<AgentBalance> {
        let (pending, requested, paid): (Decimal, Decimal, Decimal) = sqlx::query_as(
            r#"
            SELECT
                COALESCE(SUM(commission_amount)
                    FILTER (WHERE status = 'pending' AND payout_id IS NULL), 0),
                COALESCE(SUM(commission_amount)
                    FILTER (WHERE status = 'pending' AND payout_id IS NOT NULL), 0),
                COALESCE(SUM(commission_amount) FILTER (WHERE status = 'paid'), 0)
            FROM commissions
            WHERE agent_id = $1
            "#,
        )
        .bind(agent_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(AgentBalance {
            pending,
            requested,
            paid,
        })
    }
}

#[async_trait]
impl CommissionRepositoryTrait for CommissionRepository {
    async fn find_by_payment(&self, payment_id: i64) -> Result<Option<Commission>> {
        self.find_by_payment(payment_id).await
    }

    async fn create_with_payment_update(&self, commission: &NewCommission) -> Result<Commission> {
        self.create_with_payment_update(commission).await
    }

    async fn list_by_agent(
        &self,
        agent_id: i64,
        status: Option<CommissionStatus>,
    ) -> Result<Vec<Commission>> {
        self.list_by_agent(agent_id, status).await
    }

    async fn balance(&self, agent_id: i64) -> Result<AgentBalance> {
        self.balance(agent_id).await
    }
}
