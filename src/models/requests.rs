//! Request DTOs for the offline cache API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Request body for PUT /cache
///
/// # Fields
/// - `key`: The cache key to store the data under
/// - `data`: Any JSON value
/// - `ttl_ms`: Optional TTL in milliseconds (no expiry if not specified)
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The cache key
    pub key: String,
    /// The payload to store
    pub data: Value,
    /// Optional TTL in milliseconds
    #[serde(default)]
    pub ttl_ms: Option<u64>,
}

impl SetRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.key.is_empty() {
            return Some("Key cannot be empty".to_string());
        }
        if self.key.len() > MAX_KEY_LENGTH {
            return Some(format!(
                "Key exceeds maximum length of {} bytes",
                MAX_KEY_LENGTH
            ));
        }
        None
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_ms.map(Duration::from_millis)
    }
}

/// Request body for PUT /connectivity
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectivityRequest {
    /// Whether the host is online
    pub online: bool,
    /// Optional network quality descriptor ("4g", "3g", ...)
    #[serde(default)]
    pub connection_type: Option<String>,
}

/// Query string for GET /api/*path
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiQuery {
    /// Bypass the cache and fetch from upstream
    #[serde(default)]
    pub refresh: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_request_deserialize() {
        let json = r#"{"key": "dash-metrics", "data": {"orders": 3}}"#;
        let req: SetRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.key, "dash-metrics");
        assert_eq!(req.data["orders"], 3);
        assert!(req.ttl().is_none());
    }

    #[test]
    fn test_set_request_with_ttl() {
        let json = r#"{"key": "test", "data": null, "ttl_ms": 5000}"#;
        let req: SetRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.ttl(), Some(Duration::from_secs(5)));
        assert!(req.data.is_null());
    }

    #[test]
    fn test_validate_empty_key() {
        let req = SetRequest {
            key: "".to_string(),
            data: Value::Null,
            ttl_ms: None,
        };
        assert!(req.validate().is_some());
    }

    #[test]
    fn test_validate_long_key() {
        let req = SetRequest {
            key: "x".repeat(MAX_KEY_LENGTH + 1),
            data: Value::Null,
            ttl_ms: None,
        };
        assert!(req.validate().is_some());
    }

    #[test]
    fn test_validate_valid_request() {
        let req = SetRequest {
            key: "valid_key".to_string(),
            data: Value::Bool(true),
            ttl_ms: Some(60),
        };
        assert!(req.validate().is_none());
    }

    #[test]
    fn test_connectivity_request_defaults() {
        let req: ConnectivityRequest = serde_json::from_str(r#"{"online": false}"#).unwrap();
        assert!(!req.online);
        assert!(req.connection_type.is_none());
    }
}
