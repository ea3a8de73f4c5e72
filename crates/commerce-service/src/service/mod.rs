//! 服务层
//!
//! 实现交易业务逻辑，协调仓储层和支付网关。
//!
//! ## 模块结构
//!
//! - `dto`: 数据传输对象定义
//! - `order_calculator`: 订单金额计算（纯计算）
//! - `coupon_validator`: 优惠券校验（只读）
//! - `commission_recorder`: 支付成功后的佣金记录
//! - `invoice`: 发票号生成
//! - `coupon_service`: 优惠券与模板管理
//! - `checkout_service`: 结算发起、支付确认与失败
//! - `payout_service`: 代理佣金查询与提现

pub mod checkout_service;
pub mod commission_recorder;
pub mod coupon_service;
pub mod coupon_validator;
pub mod dto;
pub mod invoice;
pub mod order_calculator;
pub mod payout_service;

pub use checkout_service::CheckoutService;
pub use commission_recorder::{CommissionRecorder, RecordCommissionInput};
pub use coupon_service::CouponService;
pub use coupon_validator::{CouponValidator, ValidateCouponRequest, ValidatedCoupon};
pub use dto::*;
pub use invoice::{InvoiceNumber, InvoiceNumberAllocator};
pub use order_calculator::{OrderAmounts, OrderCalculator, OrderInput};
pub use payout_service::PayoutService;
