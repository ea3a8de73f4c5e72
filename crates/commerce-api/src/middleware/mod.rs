//! 中间件模块
//!
//! 调用方身份由上游认证层通过请求头传入，此处只做解析与校验

mod caller;

pub use caller::{CALLER_HEADER, CallerId, caller_from_headers, require_caller};
