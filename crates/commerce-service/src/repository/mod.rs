//! 数据库仓储层
//!
//! 提供所有实体的数据访问接口，封装 SQL 操作细节。
//!
//! ## 设计原则
//!
//! - 仓储只负责数据持久化，不包含业务逻辑
//! - 计数、序号、状态流转使用条件更新或单事务完成，避免先读后写
//! - 定义 trait 接口以支持 mock 测试

mod agent_repo;
mod commission_repo;
mod coupon_repo;
mod course_repo;
mod payment_repo;
mod payout_repo;
mod traits;

pub use agent_repo::AgentRepository;
pub use commission_repo::CommissionRepository;
pub use coupon_repo::CouponRepository;
pub use course_repo::CourseRepository;
pub use payment_repo::PaymentRepository;
pub use payout_repo::PayoutRepository;
pub use traits::*;
