//! HTTP 层 DTO 模块
//!
//! 包含所有请求和响应的数据传输对象

pub mod request;
pub mod response;

pub use request::{
    AssignUsersRequest, CheckoutBody, CommissionQuery, ConfirmPaymentBody,
    CreateAgentCouponRequest, CreateCouponRequest, CreateCouponTypeRequest, CouponListQuery,
    FailPaymentBody, PayoutListQuery, ProcessPayoutRequest, RejectPayoutRequest,
    ReplaceCoursesRequest, RequestPayoutBody, ValidateCouponBody,
};
pub use response::{ApiResponse, AssignedUsersDto, PageResponse};
