//! HTTP 请求处理器模块
//!
//! 处理器只做参数校验与转换，业务逻辑全部委托给服务层

pub mod checkout;
pub mod commission;
pub mod coupon;
pub mod health;
pub mod payout;
