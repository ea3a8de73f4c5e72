//! 课程交易服务
//!
//! 覆盖课程购买的完整链路：优惠券校验、订单计算、网关结算、代理佣金与提现。
//!
//! ## 核心功能
//!
//! - **优惠券校验**：按固定顺序校验券码、状态、有效期、次数、课程与用户限制
//! - **订单计算**：基础价格、GST 税额、折扣、应付金额与佣金预估
//! - **结算**：创建网关订单，校验支付签名，分配发票号
//! - **佣金记录**：代理来源的优惠券在支付成功后产生佣金
//! - **提现**：代理申请提现，管理员打款或驳回
//!
//! ## 模块结构
//!
//! - `models`: 领域模型定义
//! - `error`: 错误类型定义
//! - `repository`: 数据库仓储层
//! - `gateway`: 支付网关
//! - `service`: 业务服务层

pub mod error;
pub mod gateway;
pub mod models;
pub mod repository;
pub mod service;

pub use error::{CommerceError, Result};
pub use gateway::{GatewayOrder, PaymentGateway, RazorpayGateway};
pub use models::*;
pub use repository::{
    AgentRepository, CommissionRepository, CouponRepository, CourseRepository, PaymentRepository,
    PayoutRepository,
};
pub use service::{
    CheckoutService, CommissionRecorder, CouponService, CouponValidator, OrderCalculator,
    PayoutService, dto,
};
