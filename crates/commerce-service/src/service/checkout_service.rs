//! 结算服务
//!
//! 串联优惠券校验、金额计算、网关下单和佣金记录：
//!
//! 1. 发起：课程可售 -> 校验优惠券 -> 计算金额 -> 网关下单 -> 写入 pending 支付
//! 2. 确认：校验签名 -> 分配发票号 -> pending/failed 置为 completed -> 占用优惠券次数
//!    -> 消耗用户指定 -> 记录佣金
//!
//! 状态到 completed 的条件更新决定唯一的确认方，后续副作用只由该方执行。
//! 确认时资金已到账，优惠券占用与佣金记录失败只记录日志，不回滚支付。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use academy_shared::observability::metrics;

use crate::error::{CommerceError, Result};
use crate::gateway::{PaymentGateway, to_minor_units};
use crate::models::{NewPayment, Payment, PaymentStatus};
use crate::repository::{CouponRepositoryTrait, CourseRepositoryTrait, PaymentRepositoryTrait};
use crate::service::commission_recorder::{CommissionRecorder, RecordCommissionInput};
use crate::service::coupon_validator::{CouponValidator, ValidateCouponRequest};
use crate::service::dto::{CheckoutRequest, CheckoutSession, ConfirmPaymentRequest, PaymentReceipt};
use crate::service::invoice::InvoiceNumberAllocator;
use crate::service::order_calculator::{OrderCalculator, OrderInput};

/// 结算服务
pub struct CheckoutService {
    course_repo: Arc<dyn CourseRepositoryTrait>,
    coupon_repo: Arc<dyn CouponRepositoryTrait>,
    payment_repo: Arc<dyn PaymentRepositoryTrait>,
    validator: Arc<CouponValidator>,
    calculator: OrderCalculator,
    invoices: InvoiceNumberAllocator,
    recorder: Arc<CommissionRecorder>,
    gateway: Arc<dyn PaymentGateway>,
}

impl CheckoutService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        course_repo: Arc<dyn CourseRepositoryTrait>,
        coupon_repo: Arc<dyn CouponRepositoryTrait>,
        payment_repo: Arc<dyn PaymentRepositoryTrait>,
        validator: Arc<CouponValidator>,
        calculator: OrderCalculator,
        invoice_prefix: impl Into<String>,
        recorder: Arc<CommissionRecorder>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        let invoices = InvoiceNumberAllocator::new(payment_repo.clone(), invoice_prefix);
        Self {
            course_repo,
            coupon_repo,
            payment_repo,
            validator,
            calculator,
            invoices,
            recorder,
            gateway,
        }
    }

    /// 发起结算
    #[instrument(skip(self, request), fields(user_id = request.user_id, course_id = request.course_id))]
    pub async fn initiate(
        &self,
        request: CheckoutRequest,
        now: DateTime<Utc>,
    ) -> Result<CheckoutSession> {
        let course = self
            .course_repo
            .get_course(request.course_id)
            .await?
            .ok_or(CommerceError::CourseNotFound(request.course_id))?;
        if !course.status.is_purchasable() {
            return Err(CommerceError::CourseNotAvailable {
                course_id: course.id,
                status: course.status.as_str().to_string(),
            });
        }

        let coupon_code = request
            .coupon_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty());

        let validated = match coupon_code {
            Some(code) => Some(
                self.validator
                    .validate(
                        &ValidateCouponRequest {
                            code: code.to_string(),
                            course_id: Some(course.id),
                            user_id: Some(request.user_id),
                        },
                        now,
                    )
                    .await?,
            ),
            None => None,
        };

        let channel = request.channel;
        let amounts = self.calculator.calculate(&OrderInput {
            base_price: course.price_for(channel),
            channel,
            discount: validated.as_ref().map(|v| v.terms),
            commission_rate: validated.as_ref().and_then(|v| v.origin.commission_rate()),
        });

        if amounts.final_amount <= Decimal::ZERO {
            metrics::record_checkout(channel.as_str(), "rejected");
            return Err(CommerceError::InvalidAmount(amounts.final_amount));
        }

        let currency = channel.currency();
        let amount_minor = to_minor_units(amounts.final_amount)?;
        let receipt = format!("rcpt_{}", Uuid::now_v7().simple());
        let order = self
            .gateway
            .create_order(amount_minor, currency, &receipt)
            .await?;

        let payment = self
            .payment_repo
            .create_payment(&NewPayment {
                user_id: request.user_id,
                course_id: course.id,
                channel,
                currency,
                amount: amounts.base_price,
                tax: amounts.tax,
                discount: amounts.discount,
                final_amount: amounts.final_amount,
                coupon_id: validated.as_ref().map(|v| v.coupon_id),
                gateway_order_id: order.id.clone(),
            })
            .await?;

        metrics::record_checkout(channel.as_str(), "initiated");
        info!(
            payment_id = payment.id,
            gateway_order_id = %order.id,
            final_amount = %amounts.final_amount,
            currency = currency.as_str(),
            "Checkout initiated"
        );

        Ok(CheckoutSession {
            payment_id: payment.id,
            gateway_order_id: order.id,
            gateway_key_id: self.gateway.key_id(),
            currency,
            amount_minor,
            amounts,
            coupon_code: validated.map(|v| v.code),
        })
    }

    /// 确认支付
    ///
    /// 对已完成的支付重复确认直接返回回执
    #[instrument(skip(self, request), fields(gateway_order_id = %request.gateway_order_id))]
    pub async fn confirm(
        &self,
        request: ConfirmPaymentRequest,
        now: DateTime<Utc>,
    ) -> Result<PaymentReceipt> {
        let payment = self.require_by_order(&request.gateway_order_id).await?;

        match payment.status {
            PaymentStatus::Completed => {
                info!(payment_id = payment.id, "Payment already confirmed");
                return Ok(PaymentReceipt::from(&payment));
            }
            PaymentStatus::Refunded => {
                return Err(CommerceError::InvalidPaymentStatus {
                    payment_id: payment.id,
                    current_status: payment.status.as_str().to_string(),
                });
            }
            // 失败后用户可对同一订单重新付款
            PaymentStatus::Pending | PaymentStatus::Failed => {}
        }

        if !self.gateway.verify_signature(
            &request.gateway_order_id,
            &request.gateway_payment_id,
            &request.signature,
        ) {
            warn!(payment_id = payment.id, "Payment signature mismatch");
            return Err(CommerceError::InvalidSignature);
        }

        let invoice = self.invoices.allocate(payment.channel, now).await?;
        let Some(completed) = self
            .payment_repo
            .mark_completed(payment.id, &request.gateway_payment_id, &invoice.to_string())
            .await?
        else {
            // 并发确认时由另一方完成
            let current = self.require_by_order(&request.gateway_order_id).await?;
            if current.status == PaymentStatus::Completed {
                return Ok(PaymentReceipt::from(&current));
            }
            return Err(CommerceError::InvalidPaymentStatus {
                payment_id: current.id,
                current_status: current.status.as_str().to_string(),
            });
        };

        let mut receipt = PaymentReceipt::from(&completed);

        if let Some(coupon_id) = completed.coupon_id {
            self.redeem_coupon(coupon_id, completed.user_id, completed.id)
                .await;

            match self
                .recorder
                .record(&RecordCommissionInput {
                    payment_id: completed.id,
                    course_id: completed.course_id,
                    student_id: completed.user_id,
                    coupon_id,
                    sale_amount: completed.final_amount,
                })
                .await
            {
                Ok(Some(commission)) => {
                    receipt.commission_amount = Some(commission.commission_amount);
                }
                Ok(None) => {}
                Err(e) => {
                    error!(payment_id = completed.id, error = %e, "Failed to record commission");
                }
            }
        }

        let elapsed = (now - completed.created_at).num_milliseconds().max(0) as f64 / 1000.0;
        metrics::record_payment_confirmed(completed.channel.as_str(), elapsed);
        metrics::record_checkout(completed.channel.as_str(), "completed");
        info!(
            payment_id = completed.id,
            invoice_number = %invoice,
            "Payment confirmed"
        );

        Ok(receipt)
    }

    /// 标记支付失败（pending -> failed），重复标记直接返回
    ///
    /// 只有支付所属用户可以标记，他人的订单按不存在处理
    #[instrument(skip(self, reason))]
    pub async fn fail(
        &self,
        user_id: i64,
        gateway_order_id: &str,
        reason: &str,
    ) -> Result<PaymentReceipt> {
        let payment = self.require_by_order(gateway_order_id).await?;
        if payment.user_id != user_id {
            warn!(payment_id = payment.id, caller = user_id, "Fail requested by non-owner");
            return Err(CommerceError::PaymentNotFound(gateway_order_id.to_string()));
        }

        match payment.status {
            PaymentStatus::Failed => return Ok(PaymentReceipt::from(&payment)),
            PaymentStatus::Pending => {}
            other => {
                return Err(CommerceError::InvalidPaymentStatus {
                    payment_id: payment.id,
                    current_status: other.as_str().to_string(),
                });
            }
        }

        let failed = self
            .payment_repo
            .mark_failed(payment.id, reason)
            .await?
            .ok_or_else(|| CommerceError::InvalidPaymentStatus {
                payment_id: payment.id,
                current_status: "changed concurrently".to_string(),
            })?;

        metrics::record_checkout(failed.channel.as_str(), "failed");
        info!(payment_id = failed.id, reason = %reason, "Payment marked failed");
        Ok(PaymentReceipt::from(&failed))
    }

    pub async fn get_payment(&self, payment_id: i64) -> Result<Payment> {
        self.payment_repo
            .get_payment(payment_id)
            .await?
            .ok_or_else(|| CommerceError::PaymentNotFound(payment_id.to_string()))
    }

    // ==================== 私有方法 ====================

    async fn require_by_order(&self, gateway_order_id: &str) -> Result<Payment> {
        self.payment_repo
            .get_by_gateway_order(gateway_order_id)
            .await?
            .ok_or_else(|| CommerceError::PaymentNotFound(gateway_order_id.to_string()))
    }

    /// 占用优惠券次数并消耗用户指定，失败只记录日志
    async fn redeem_coupon(&self, coupon_id: i64, user_id: i64, payment_id: i64) {
        match self.coupon_repo.try_redeem(coupon_id).await {
            Ok(true) => {}
            Ok(false) => warn!(
                coupon_id = coupon_id,
                payment_id = payment_id,
                "Coupon usage limit reached concurrently, payment kept"
            ),
            Err(e) => error!(coupon_id = coupon_id, error = %e, "Failed to redeem coupon"),
        }

        if let Err(e) = self.coupon_repo.consume_assignment(coupon_id, user_id).await {
            error!(coupon_id = coupon_id, user_id = user_id, error = %e, "Failed to consume coupon assignment");
        }
    }
}
