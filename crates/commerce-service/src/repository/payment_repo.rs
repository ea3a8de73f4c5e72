//! 支付仓储
//!
//! 提供支付记录和发票序号的数据访问，状态流转均为条件更新

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use super::traits::PaymentRepositoryTrait;
use crate::error::Result;
use crate::models::{NewPayment, Payment, PaymentChannel};

const PAYMENT_COLUMNS: &str = r#"
    id, user_id, course_id, channel, currency, amount, tax, discount, final_amount,
    coupon_id, agent_id, commission_amount, commission_paid, status, gateway_order_id,
    gateway_payment_id, invoice_number, failure_reason, created_at, updated_at
"#;

/// 支付仓储
pub struct PaymentRepository {
    pool: PgPool,
}

impl PaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 创建 pending 状态的支付记录
    pub async fn create_payment(&self, payment: &NewPayment) -> Result<Payment> {
        let sql = format!(
            r#"
            INSERT INTO payments (user_id, course_id, channel, currency, amount, tax, discount,
                                  final_amount, coupon_id, gateway_order_id, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 'pending')
            RETURNING {}
            "#,
            PAYMENT_COLUMNS
        );
        let created = sqlx::query_as::<_, Payment>(&sql)
            .bind(payment.user_id)
            .bind(payment.course_id)
            .bind(payment.channel)
            .bind(payment.currency)
            .bind(payment.amount)
            .bind(payment.tax)
            .bind(payment.discount)
            .bind(payment.final_amount)
            .bind(payment.coupon_id)
            .bind(&payment.gateway_order_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(created)
    }

    pub async fn get_payment(&self, id: i64) -> Result<Option<Payment>> {
        let sql = format!("SELECT {} FROM payments WHERE id = $1", PAYMENT_COLUMNS);
        let payment = sqlx::query_as::<_, Payment>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(payment)
    }

    pub async fn get_by_gateway_order(&self, gateway_order_id: &str) -> Result<Option<Payment>> {
        let sql = format!(
            "SELECT {} FROM payments WHERE gateway_order_id = $1",
            PAYMENT_COLUMNS
        );
        let payment = sqlx::query_as::<_, Payment>(&sql)
            .bind(gateway_order_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(payment)
    }

    pub async fn mark_completed(
        &self,
        id: i64,
        gateway_payment_id: &str,
        invoice_number: &str,
    ) -> Result<Option<Payment>> {
        let sql = format!(
            r#"
            UPDATE payments
            SET status = 'completed', gateway_payment_id = $2, invoice_number = $3,
                failure_reason = NULL, updated_at = NOW()
            WHERE id = $1 AND status IN ('pending', 'failed')
            RETURNING {}
            "#,
            PAYMENT_COLUMNS
        );
        let payment = sqlx::query_as::<_, Payment>(&sql)
            .bind(id)
            .bind(gateway_payment_id)
            .bind(invoice_number)
            .fetch_optional(&self.pool)
            .await?;

        Ok(payment)
    }

    pub async fn mark_failed(&self, id: i64, reason: &str) -> Result<Option<Payment>> {
        let sql = format!(
            r#"
            UPDATE payments
            SET status = 'failed', failure_reason = $2, updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING {}
            "#,
            PAYMENT_COLUMNS
        );
        let payment = sqlx::query_as::<_, Payment>(&sql)
            .bind(id)
            .bind(reason)
            .fetch_optional(&self.pool)
            .await?;

        Ok(payment)
    }

    pub async fn next_invoice_sequence(
        &self,
        financial_year: &str,
        channel: PaymentChannel,
    ) -> Result<i64> {
        let mut conn = self.pool.acquire().await?;
        Self::next_invoice_sequence_in_tx(&mut conn, financial_year, channel).await
    }

    /// 按 (财年, 渠道) 原子递增发票序号，首次使用时从 1 开始
    pub async fn next_invoice_sequence_in_tx(
        tx: &mut PgConnection,
        financial_year: &str,
        channel: PaymentChannel,
    ) -> Result<i64> {
        let value: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO invoice_sequences (financial_year, channel, last_value)
            VALUES ($1, $2, 1)
            ON CONFLICT (financial_year, channel)
            DO UPDATE SET last_value = invoice_sequences.last_value + 1, updated_at = NOW()
            RETURNING last_value
            "#,
        )
        .bind(financial_year)
        .bind(channel)
        .fetch_one(tx)
        .await?;

        Ok(value)
    }

    /// 在事务中回填支付记录的代理佣金信息
    pub async fn set_commission_in_tx(
        tx: &mut PgConnection,
        payment_id: i64,
        agent_id: i64,
        commission_amount: Decimal,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE payments
            SET agent_id = $2, commission_amount = $3, commission_paid = FALSE,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(payment_id)
        .bind(agent_id)
        .bind(commission_amount)
        .execute(tx)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl PaymentRepositoryTrait for PaymentRepository {
    async fn create_payment(&self, payment: &NewPayment) -> Result<Payment> {
        self.create_payment(payment).await
    }

    async fn get_payment(&self, id: i64) -> Result<Option<Payment>> {
        self.get_payment(id).await
    }

    async fn get_by_gateway_order(&self, gateway_order_id: &str) -> Result<Option<Payment>> {
        self.get_by_gateway_order(gateway_order_id).await
    }

    async fn mark_completed(
        &self,
        id: i64,
        gateway_payment_id: &str,
        invoice_number: &str,
    ) -> Result<Option<Payment>> {
        self.mark_completed(id, gateway_payment_id, invoice_number)
            .await
    }

    async fn mark_failed(&self, id: i64, reason: &str) -> Result<Option<Payment>> {
        self.mark_failed(id, reason).await
    }

    async fn next_invoice_sequence(
        &self,
        financial_year: &str,
        channel: PaymentChannel,
    ) -> Result<i64> {
        self.next_invoice_sequence(financial_year, channel).await
    }
}
