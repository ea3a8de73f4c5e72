//! 调用方身份中间件
//!
//! 从 `x-user-id` 请求头解析调用方用户 ID 并注入请求扩展

use axum::{
    body::Body,
    http::{HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::ApiError;

/// 上游认证层写入的用户 ID 请求头
pub const CALLER_HEADER: &str = "x-user-id";

/// 当前调用方
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerId(pub i64);

/// 解析调用方身份
///
/// 请求头缺失返回 `Ok(None)`，格式非法返回错误
pub fn caller_from_headers(headers: &HeaderMap) -> Result<Option<CallerId>, ApiError> {
    let Some(value) = headers.get(CALLER_HEADER) else {
        return Ok(None);
    };

    value
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|id| *id > 0)
        .map(|id| Some(CallerId(id)))
        .ok_or_else(|| ApiError::Unauthorized(format!("malformed {} header", CALLER_HEADER)))
}

/// 要求调用方身份的路由中间件
pub async fn require_caller(mut request: Request<Body>, next: Next) -> Response {
    match caller_from_headers(request.headers()) {
        Ok(Some(caller)) => {
            request.extensions_mut().insert(caller);
            next.run(request).await
        }
        Ok(None) => {
            ApiError::Unauthorized(format!("missing {} header", CALLER_HEADER)).into_response()
        }
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: Option<&'static str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(v) = value {
            headers.insert(CALLER_HEADER, HeaderValue::from_static(v));
        }
        headers
    }

    #[test]
    fn test_parse_caller() {
        assert_eq!(caller_from_headers(&headers(Some("42"))).unwrap(), Some(CallerId(42)));
        assert_eq!(caller_from_headers(&headers(Some(" 7 "))).unwrap(), Some(CallerId(7)));
        assert_eq!(caller_from_headers(&headers(None)).unwrap(), None);
    }

    #[test]
    fn test_reject_malformed_caller() {
        assert!(caller_from_headers(&headers(Some("abc"))).is_err());
        assert!(caller_from_headers(&headers(Some("0"))).is_err());
        assert!(caller_from_headers(&headers(Some("-3"))).is_err());
    }
}
