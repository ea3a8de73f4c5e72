//! 可观测性模块集成测试
//!
//! 测试 metrics、middleware 和配置的公开接口。

// ============================================================================
// 指标记录测试
// ============================================================================

mod metrics_tests {
    use academy_shared::observability::metrics::{
        record_checkout, record_commission, record_coupon_validation, record_http_request,
        record_payment_confirmed, record_payout,
    };

    // 未安装 recorder 时所有记录函数都应是空操作

    #[test]
    fn test_record_http_request() {
        record_http_request("GET", "/api/v1/coupons", 200, 0.05);
        record_http_request("POST", "/api/v1/checkout", 201, 0.12);
        record_http_request("POST", "/api/v1/checkout/confirm", 401, 0.01);
        record_http_request("POST", "/api/v1/payouts/{id}/process", 409, 0.03);
        record_http_request("GET", "/ready", 503, 0.25);
    }

    #[test]
    fn test_record_commerce_events() {
        record_coupon_validation("valid");
        record_coupon_validation("COUPON_EXPIRED");
        record_checkout("WEB", "initiated");
        record_checkout("MOBILE_APP", "rejected");
        record_payment_confirmed("WEB", 1.5);
        record_commission();
        record_payout("request", "created");
        record_payout("process", "completed");
    }

    #[test]
    fn test_metrics_with_edge_cases() {
        record_http_request("", "", 0, 0.0);
        record_checkout("", "");
        record_payment_confirmed("WEB", f64::MAX);
    }
}

// ============================================================================
// 中间件测试
// ============================================================================

mod middleware_tests {
    use academy_shared::observability::middleware::{REQUEST_ID_HEADER, RequestId};

    #[test]
    fn test_request_id_creation() {
        let id = RequestId("test-id-123".to_string());
        assert_eq!(id.as_str(), "test-id-123");
    }

    #[test]
    fn test_request_id_clone() {
        let id1 = RequestId("original".to_string());
        let id2 = id1.clone();
        assert_eq!(id1.as_str(), id2.as_str());
    }

    #[test]
    fn test_request_id_header_name() {
        assert_eq!(REQUEST_ID_HEADER, "x-request-id");
    }
}

// ============================================================================
// 配置测试
// ============================================================================

mod config_tests {
    use academy_shared::observability::ObservabilityConfig;

    #[test]
    fn test_default_config() {
        let config = ObservabilityConfig::default();
        assert_eq!(config.service_name, "unknown-service");
        assert_eq!(config.metrics_port, 9090);
        assert_eq!(config.log_level, "info");
        assert!(!config.json_logs);
    }

    #[test]
    fn test_with_service_name() {
        let config = ObservabilityConfig::default().with_service_name("commerce-api");
        assert_eq!(config.service_name, "commerce-api");
        assert_eq!(config.metrics_port, 9090);
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: ObservabilityConfig =
            serde_json::from_str(r#"{"metrics_port": 0, "json_logs": true}"#).unwrap();

        assert_eq!(config.metrics_port, 0);
        assert!(config.json_logs);
        assert_eq!(config.log_level, "info");
    }
}

// ============================================================================
// Guard 测试
// ============================================================================

mod guard_tests {
    use academy_shared::observability::ObservabilityGuard;

    #[test]
    fn test_empty_guard() {
        let guard = ObservabilityGuard::empty();
        drop(guard);
    }
}
