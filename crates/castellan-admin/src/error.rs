use std::time::Duration;

use kafka_protocol::ResponseError;
use thiserror::Error;

/// Result type for admin operations.
pub type Result<T> = std::result::Result<T, AdminError>;

/// Errors surfaced by admin operations.
///
/// Broker responses can report failure per topic, per partition or per
/// filter while the response envelope itself decodes cleanly; those embedded
/// codes become [`AdminError::ErrorCode`] so callers never mistake transport
/// success for operation success.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Config(#[from] castellan_core::ConfigError),

    #[error(transparent)]
    Tls(#[from] castellan_core::TlsError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connecting to {addr} timed out after {timeout:?}")]
    DialTimeout { addr: String, timeout: Duration },

    #[error("protocol encode error: {message}")]
    Encode { message: String },

    #[error("protocol decode error: {message}")]
    Decode { message: String },

    #[error("correlation mismatch: sent {expected}, received {actual}")]
    CorrelationMismatch { expected: i32, actual: i32 },

    #[error("response of {size} bytes exceeds the {limit} byte limit")]
    ResponseTooLarge { size: usize, limit: usize },

    #[error("broker does not support {api} versions {min}..={max}")]
    UnsupportedVersion {
        api: &'static str,
        min: i16,
        max: i16,
    },

    #[error("SASL authentication failed: {0}")]
    SaslAuthentication(String),

    /// Non-zero error code embedded in an otherwise-successful response
    #[error("{api} failed for '{resource}': {reason}")]
    ErrorCode {
        api: &'static str,
        resource: String,
        reason: String,
    },

    #[error("no controller broker could be resolved")]
    NoController,

    #[error("no available brokers at [{}]", attempted.join(", "))]
    NoAvailableBrokers { attempted: Vec<String> },

    /// The topic does not exist in the cluster's full topic listing
    #[error("topic '{topic}' could not be found")]
    TopicMissing { topic: String },

    /// A string-typed ACL field does not map to any protocol enumeration
    #[error("unknown {field}: '{value}'")]
    UnknownAclToken { field: &'static str, value: String },
}

impl AdminError {
    /// True when the error means "no such topic", as opposed to a transport
    /// or protocol failure. Callers branch on this to treat absence as a
    /// normal outcome.
    pub fn is_topic_missing(&self) -> bool {
        matches!(self, AdminError::TopicMissing { .. })
    }

    pub(crate) fn encode<E: std::fmt::Display>(err: E) -> Self {
        AdminError::Encode {
            message: err.to_string(),
        }
    }

    pub(crate) fn decode<E: std::fmt::Display>(err: E) -> Self {
        AdminError::Decode {
            message: err.to_string(),
        }
    }

    /// Build an [`AdminError::ErrorCode`] from an embedded response code,
    /// preferring the broker-supplied message when one is present.
    pub(crate) fn error_code(
        api: &'static str,
        resource: impl Into<String>,
        code: i16,
        message: Option<&str>,
    ) -> Self {
        let reason = match message {
            Some(msg) if !msg.is_empty() => msg.to_string(),
            _ => describe_error_code(code),
        };
        AdminError::ErrorCode {
            api,
            resource: resource.into(),
            reason,
        }
    }
}

/// Human-readable name for a Kafka protocol error code.
pub(crate) fn describe_error_code(code: i16) -> String {
    match ResponseError::try_from_code(code) {
        Some(err) => err.to_string(),
        None => format!("error code {code}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_missing_is_distinguishable() {
        let err = AdminError::TopicMissing {
            topic: "events".to_string(),
        };
        assert!(err.is_topic_missing());
        assert!(err.to_string().contains("events"));

        let err = AdminError::NoController;
        assert!(!err.is_topic_missing());
    }

    #[test]
    fn error_code_prefers_broker_message() {
        let err = AdminError::error_code("AlterConfigs", "events", 44, Some("policy says no"));
        assert!(err.to_string().contains("policy says no"));
    }

    #[test]
    fn error_code_falls_back_to_code_name() {
        let err = AdminError::error_code("CreateTopics", "events", 36, None);
        // 36 = TOPIC_ALREADY_EXISTS
        let rendered = err.to_string();
        assert!(rendered.contains("CreateTopics"));
        assert!(rendered.contains("events"));
        assert!(!rendered.contains("error code 36"));
    }

    #[test]
    fn unknown_code_is_still_reported() {
        assert_eq!(describe_error_code(32000), "error code 32000");
    }

    #[test]
    fn no_available_brokers_names_every_address() {
        let err = AdminError::NoAvailableBrokers {
            attempted: vec!["bad:1".to_string(), "worse:2".to_string()],
        };
        let rendered = err.to_string();
        assert!(rendered.contains("bad:1"));
        assert!(rendered.contains("worse:2"));
    }
}
