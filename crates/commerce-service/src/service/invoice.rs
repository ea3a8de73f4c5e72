//! 发票号生成
//!
//! 格式：`{prefix}/{财年}/{渠道标识}/{五位序号}`，例如 `INV/2024-25/D/00042`。
//! 财年按印度惯例从 4 月 1 日起算，以 IST 日期判定。序号按 (财年, 渠道) 由存储原子递增。

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Utc};
use tracing::debug;

use crate::error::{CommerceError, Result};
use crate::models::PaymentChannel;
use crate::repository::PaymentRepositoryTrait;

const IST_OFFSET_SECONDS: i32 = 5 * 3600 + 30 * 60;

/// 财年标识，例如 2024-04-01 至 2025-03-31 为 `2024-25`
pub fn financial_year(date: NaiveDate) -> String {
    let start = if date.month() >= 4 {
        date.year()
    } else {
        date.year() - 1
    };
    format!("{}-{:02}", start, (start + 1).rem_euclid(100))
}

/// 以 IST 日期计算财年
pub fn financial_year_at(now: DateTime<Utc>) -> Result<String> {
    let ist = FixedOffset::east_opt(IST_OFFSET_SECONDS)
        .ok_or_else(|| CommerceError::Internal("invalid IST offset".to_string()))?;
    Ok(financial_year(now.with_timezone(&ist).date_naive()))
}

/// 发票号
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceNumber {
    pub prefix: String,
    pub financial_year: String,
    pub channel: PaymentChannel,
    pub sequence: i64,
}

impl fmt::Display for InvoiceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{:05}",
            self.prefix,
            self.financial_year,
            self.channel.invoice_flag(),
            self.sequence
        )
    }
}

/// 发票号分配器
pub struct InvoiceNumberAllocator {
    payment_repo: Arc<dyn PaymentRepositoryTrait>,
    prefix: String,
}

impl InvoiceNumberAllocator {
    pub fn new(payment_repo: Arc<dyn PaymentRepositoryTrait>, prefix: impl Into<String>) -> Self {
        Self {
            payment_repo,
            prefix: prefix.into(),
        }
    }

    pub async fn allocate(
        &self,
        channel: PaymentChannel,
        now: DateTime<Utc>,
    ) -> Result<InvoiceNumber> {
        let financial_year = financial_year_at(now)?;
        let sequence = self
            .payment_repo
            .next_invoice_sequence(&financial_year, channel)
            .await?;

        let invoice = InvoiceNumber {
            prefix: self.prefix.clone(),
            financial_year,
            channel,
            sequence,
        };
        debug!(invoice_number = %invoice, "Invoice number allocated");
        Ok(invoice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MockPaymentRepositoryTrait;
    use chrono::TimeZone;
    use mockall::predicate::eq;

    #[test]
    fn test_financial_year_boundaries() {
        let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();
        assert_eq!(financial_year(d(2024, 4, 1)), "2024-25");
        assert_eq!(financial_year(d(2025, 3, 31)), "2024-25");
        assert_eq!(financial_year(d(2025, 1, 15)), "2024-25");
        assert_eq!(financial_year(d(1999, 12, 31)), "1999-00");
    }

    #[test]
    fn test_financial_year_uses_ist_date() {
        // 2025-03-31 19:00 UTC 已是 IST 4 月 1 日
        let now = Utc.with_ymd_and_hms(2025, 3, 31, 19, 0, 0).unwrap();
        assert_eq!(financial_year_at(now).unwrap(), "2025-26");
        let earlier = Utc.with_ymd_and_hms(2025, 3, 31, 18, 0, 0).unwrap();
        assert_eq!(financial_year_at(earlier).unwrap(), "2024-25");
    }

    #[test]
    fn test_invoice_number_format() {
        let invoice = InvoiceNumber {
            prefix: "INV".to_string(),
            financial_year: "2024-25".to_string(),
            channel: PaymentChannel::Foreign,
            sequence: 42,
        };
        assert_eq!(invoice.to_string(), "INV/2024-25/F/00042");
    }

    #[tokio::test]
    async fn test_allocate_uses_channel_and_financial_year() {
        let mut repo = MockPaymentRepositoryTrait::new();
        repo.expect_next_invoice_sequence()
            .with(eq("2024-25"), eq(PaymentChannel::Domestic))
            .times(1)
            .returning(|_, _| Ok(7));

        let allocator = InvoiceNumberAllocator::new(Arc::new(repo), "ACAD");
        let now = Utc.with_ymd_and_hms(2024, 11, 2, 10, 0, 0).unwrap();
        let invoice = allocator
            .allocate(PaymentChannel::Domestic, now)
            .await
            .unwrap();

        assert_eq!(invoice.to_string(), "ACAD/2024-25/D/00007");
    }
}
