//! 订单金额计算
//!
//! 纯计算，不访问存储：
//! - 税额：国内渠道按 GST 税率征收，海外渠道为 0
//! - 折扣：固定金额直接减免，百分比按基础价格计算
//! - 应付金额：基础价格 + 税额 - 折扣，不做下限截断
//! - 佣金：应付金额 × 佣金比例 / 100
//!
//! 所有金额保留两位小数，中点远离零舍入

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::models::{DiscountTerms, DiscountType, PaymentChannel};

/// 金额统一舍入到两位小数
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// 按比例计算佣金
pub fn commission_for(sale_amount: Decimal, rate: Decimal) -> Decimal {
    round_money(sale_amount * rate / Decimal::ONE_HUNDRED)
}

/// 计算输入
#[derive(Debug, Clone)]
pub struct OrderInput {
    pub base_price: Decimal,
    pub channel: PaymentChannel,
    pub discount: Option<DiscountTerms>,
    /// 仅代理来源的优惠券携带
    pub commission_rate: Option<Decimal>,
}

/// 计算结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderAmounts {
    pub base_price: Decimal,
    pub tax: Decimal,
    pub discount: Decimal,
    pub final_amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commission: Option<Decimal>,
}

/// 订单计算器
#[derive(Debug, Clone)]
pub struct OrderCalculator {
    gst_rate: Decimal,
}

impl OrderCalculator {
    pub fn new(gst_rate: Decimal) -> Self {
        Self { gst_rate }
    }

    pub fn gst_rate(&self) -> Decimal {
        self.gst_rate
    }

    pub fn calculate(&self, input: &OrderInput) -> OrderAmounts {
        let base = input.base_price;

        let tax = match input.channel {
            PaymentChannel::Domestic => round_money(base * self.gst_rate / Decimal::ONE_HUNDRED),
            PaymentChannel::Foreign => Decimal::ZERO,
        };

        let discount = match input.discount {
            Some(terms) => match terms.discount_type {
                DiscountType::FixedAmount => round_money(terms.value),
                DiscountType::Percentage => {
                    round_money(base * terms.value / Decimal::ONE_HUNDRED)
                }
            },
            None => Decimal::ZERO,
        };

        let final_amount = base + tax - discount;
        let commission = input
            .commission_rate
            .map(|rate| commission_for(final_amount, rate));

        OrderAmounts {
            base_price: base,
            tax,
            discount,
            final_amount,
            commission,
        }
    }
}

impl Default for OrderCalculator {
    fn default() -> Self {
        Self::new(Decimal::from(18))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn input(
        base: &str,
        channel: PaymentChannel,
        discount: Option<(DiscountType, &str)>,
        rate: Option<&str>,
    ) -> OrderInput {
        OrderInput {
            base_price: dec(base),
            channel,
            discount: discount.map(|(discount_type, value)| DiscountTerms {
                discount_type,
                value: dec(value),
            }),
            commission_rate: rate.map(dec),
        }
    }

    #[test]
    fn test_domestic_percentage_discount() {
        let amounts = OrderCalculator::default().calculate(&input(
            "1000",
            PaymentChannel::Domestic,
            Some((DiscountType::Percentage, "20")),
            None,
        ));
        assert_eq!(amounts.tax, dec("180"));
        assert_eq!(amounts.discount, dec("200"));
        assert_eq!(amounts.final_amount, dec("980"));
        assert_eq!(amounts.commission, None);
    }

    #[test]
    fn test_foreign_fixed_discount_has_no_tax() {
        let amounts = OrderCalculator::default().calculate(&input(
            "2000",
            PaymentChannel::Foreign,
            Some((DiscountType::FixedAmount, "500")),
            None,
        ));
        assert_eq!(amounts.tax, Decimal::ZERO);
        assert_eq!(amounts.discount, dec("500"));
        assert_eq!(amounts.final_amount, dec("1500"));
    }

    #[test]
    fn test_commission_on_final_amount() {
        let amounts = OrderCalculator::default().calculate(&input(
            "1000",
            PaymentChannel::Domestic,
            Some((DiscountType::Percentage, "20")),
            Some("10"),
        ));
        assert_eq!(amounts.commission, Some(dec("98.00")));
    }

    #[test]
    fn test_no_coupon() {
        let amounts =
            OrderCalculator::default().calculate(&input("499", PaymentChannel::Domestic, None, None));
        assert_eq!(amounts.tax, dec("89.82"));
        assert_eq!(amounts.discount, Decimal::ZERO);
        assert_eq!(amounts.final_amount, dec("588.82"));
    }

    #[test]
    fn test_final_amount_is_not_clamped() {
        let amounts = OrderCalculator::default().calculate(&input(
            "100",
            PaymentChannel::Foreign,
            Some((DiscountType::FixedAmount, "150")),
            None,
        ));
        assert_eq!(amounts.final_amount, dec("-50"));
    }

    #[test]
    fn test_custom_gst_rate_and_rounding() {
        let calculator = OrderCalculator::new(dec("12.5"));
        let amounts = calculator.calculate(&input(
            "99.99",
            PaymentChannel::Domestic,
            Some((DiscountType::Percentage, "15")),
            Some("7.5"),
        ));
        // 12.49875 -> 12.50, 14.9985 -> 15.00
        assert_eq!(amounts.tax, dec("12.50"));
        assert_eq!(amounts.discount, dec("15.00"));
        assert_eq!(amounts.final_amount, dec("97.49"));
        // 7.311750 -> 7.31
        assert_eq!(amounts.commission, Some(dec("7.31")));
    }

    #[test]
    fn test_round_money_midpoint_away_from_zero() {
        assert_eq!(round_money(dec("2.345")), dec("2.35"));
        assert_eq!(round_money(dec("-2.345")), dec("-2.35"));
        assert_eq!(commission_for(dec("1500"), dec("12.5")), dec("187.50"));
    }
}
