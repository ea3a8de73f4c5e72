//! 交易服务领域模型
//!
//! 包含优惠券、课程、代理、支付、佣金和提现等实体

pub mod agent;
pub mod commission;
pub mod coupon;
pub mod course;
pub mod enums;
pub mod payment;

// 重新导出常用类型
pub use agent::AgentProfile;
pub use commission::{AgentBalance, Commission, NewCommission, Payout};
pub use coupon::{
    Coupon, CouponAssignment, CouponFilter, CouponOrigin, CouponType, DiscountTerms, NewCoupon,
    NewCouponType,
};
pub use course::{Course, User};
pub use enums::{
    CommissionStatus, CourseStatus, Currency, DiscountType, PaymentChannel, PaymentStatus,
    PayoutStatus, UserRole,
};
pub use payment::{NewPayment, Payment};
