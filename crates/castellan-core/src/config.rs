//! Cluster connection configuration.
//!
//! [`ConnectionConfig`] is the caller-facing description of how to reach a
//! Kafka cluster: bootstrap addresses, the mutation timeout, TLS material
//! and SASL credentials. [`ConnectionConfig::derive_client_settings`] turns
//! it into validated [`ClientSettings`]; anything that can fail without
//! touching the network (missing bootstrap list, unparseable certificates)
//! fails right there.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tls::{build_client_config, CertificateSource, ClientIdentity, TlsError};

/// Client identifier reported to brokers in every request header.
pub const CLIENT_ID: &str = "castellan-admin";

/// Default mutation timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Configuration errors, detected before any network call
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no bootstrap servers configured")]
    NoBootstrapServers,

    #[error(transparent)]
    Tls(#[from] TlsError),
}

/// How to reach a Kafka cluster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Bootstrap broker addresses (`host:port`), tried in order
    pub bootstrap_servers: Vec<String>,

    /// Timeout in seconds applied to mutation requests (create/alter/delete)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Whether broker connections use TLS
    #[serde(default)]
    pub tls_enabled: bool,

    /// Skip server certificate verification (test clusters only)
    #[serde(default)]
    pub insecure_skip_verify: bool,

    /// Trusted CA certificate; platform roots are used when absent
    #[serde(default)]
    pub ca_certificate: Option<CertificateSource>,

    /// Client certificate and key for mutual TLS
    #[serde(default)]
    pub client_identity: Option<ClientIdentity>,

    /// SASL/PLAIN username
    #[serde(default)]
    pub sasl_username: Option<String>,

    /// SASL/PLAIN password
    #[serde(default)]
    pub sasl_password: Option<String>,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl ConnectionConfig {
    /// Create a configuration for the given bootstrap addresses
    pub fn new(bootstrap_servers: Vec<String>) -> Self {
        Self {
            bootstrap_servers,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            tls_enabled: false,
            insecure_skip_verify: false,
            ca_certificate: None,
            client_identity: None,
            sasl_username: None,
            sasl_password: None,
        }
    }

    /// Set the mutation timeout
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Enable TLS
    pub fn with_tls(mut self, enabled: bool) -> Self {
        self.tls_enabled = enabled;
        self
    }

    /// Trust the given CA certificate
    pub fn with_ca_certificate(mut self, source: CertificateSource) -> Self {
        self.ca_certificate = Some(source);
        self
    }

    /// Present the given client identity (mutual TLS)
    pub fn with_client_identity(mut self, identity: ClientIdentity) -> Self {
        self.client_identity = Some(identity);
        self
    }

    /// Set SASL/PLAIN credentials
    pub fn with_sasl(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.sasl_username = Some(username.into());
        self.sasl_password = Some(password.into());
        self
    }

    /// SASL is enabled iff a username or a password is non-empty.
    pub fn sasl_enabled(&self) -> bool {
        let non_empty = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        non_empty(&self.sasl_username) || non_empty(&self.sasl_password)
    }

    /// Mutation timeout as a [`Duration`]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate the configuration and resolve all credential sources.
    ///
    /// Fails when the bootstrap list is empty or, with TLS enabled, when any
    /// certificate or key cannot be loaded and parsed. Performs no network
    /// I/O.
    pub fn derive_client_settings(&self) -> Result<ClientSettings, ConfigError> {
        if self.bootstrap_servers.is_empty() {
            return Err(ConfigError::NoBootstrapServers);
        }

        let tls = if self.tls_enabled {
            let config = build_client_config(
                self.ca_certificate.as_ref(),
                self.client_identity.as_ref(),
                self.insecure_skip_verify,
            )?;
            Some(Arc::new(config))
        } else {
            None
        };

        let sasl = if self.sasl_enabled() {
            Some(SaslCredentials {
                username: self.sasl_username.clone().unwrap_or_default(),
                password: self.sasl_password.clone().unwrap_or_default(),
            })
        } else {
            None
        };

        Ok(ClientSettings {
            client_id: CLIENT_ID.to_string(),
            dial_timeout: self.timeout(),
            request_timeout: self.timeout(),
            sasl,
            tls,
        })
    }
}

/// SASL/PLAIN credentials
#[derive(Clone, PartialEq, Eq)]
pub struct SaslCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for SaslCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaslCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Validated per-connection settings derived from a [`ConnectionConfig`].
#[derive(Clone)]
pub struct ClientSettings {
    /// Client identifier sent in every request header
    pub client_id: String,

    /// Timeout for establishing broker connections
    pub dial_timeout: Duration,

    /// Timeout carried inside mutation request bodies
    pub request_timeout: Duration,

    /// SASL/PLAIN credentials, when authentication is enabled
    pub sasl: Option<SaslCredentials>,

    /// Prepared TLS configuration, when TLS is enabled
    pub tls: Option<Arc<rustls::ClientConfig>>,
}

impl std::fmt::Debug for ClientSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSettings")
            .field("client_id", &self.client_id)
            .field("dial_timeout", &self.dial_timeout)
            .field("request_timeout", &self.request_timeout)
            .field("sasl", &self.sasl)
            .field("tls", &self.tls.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> ConnectionConfig {
        ConnectionConfig::new(vec!["localhost:9092".to_string()])
    }

    #[test]
    fn empty_bootstrap_list_is_rejected() {
        let err = ConnectionConfig::new(vec![])
            .derive_client_settings()
            .unwrap_err();
        assert!(matches!(err, ConfigError::NoBootstrapServers));
    }

    #[test]
    fn default_settings_fix_client_id_and_timeout() {
        let settings = base_config().derive_client_settings().unwrap();
        assert_eq!(settings.client_id, CLIENT_ID);
        assert_eq!(settings.request_timeout, Duration::from_secs(120));
        assert!(settings.sasl.is_none());
        assert!(settings.tls.is_none());
    }

    #[test]
    fn sasl_enabled_iff_either_credential_is_non_empty() {
        assert!(!base_config().sasl_enabled());

        let mut config = base_config();
        config.sasl_username = Some("admin".to_string());
        assert!(config.sasl_enabled());

        let mut config = base_config();
        config.sasl_password = Some("hunter2".to_string());
        assert!(config.sasl_enabled());

        let mut config = base_config();
        config.sasl_username = Some(String::new());
        config.sasl_password = Some(String::new());
        assert!(!config.sasl_enabled());
    }

    #[test]
    fn sasl_credentials_carry_over() {
        let settings = base_config()
            .with_sasl("admin", "hunter2")
            .derive_client_settings()
            .unwrap();
        let sasl = settings.sasl.unwrap();
        assert_eq!(sasl.username, "admin");
        assert_eq!(sasl.password, "hunter2");
    }

    #[test]
    fn sasl_credentials_redact_password_in_debug() {
        let sasl = SaslCredentials {
            username: "admin".to_string(),
            password: "hunter2".to_string(),
        };
        let rendered = format!("{:?}", sasl);
        assert!(rendered.contains("admin"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn tls_with_broken_certificate_fails_at_derivation() {
        let mut config = base_config().with_tls(true);
        config.ca_certificate = Some(CertificateSource::Pem {
            content: "not a certificate".to_string(),
        });
        let err = config.derive_client_settings().unwrap_err();
        assert!(matches!(err, ConfigError::Tls(_)));
    }

    #[test]
    fn tls_skip_verify_builds_without_material() {
        let _ = rustls::crypto::ring::default_provider().install_default();
        let mut config = base_config().with_tls(true);
        config.insecure_skip_verify = true;
        let settings = config.derive_client_settings().unwrap();
        assert!(settings.tls.is_some());
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: ConnectionConfig =
            serde_json::from_str(r#"{"bootstrap_servers":["broker-1:9092"]}"#).unwrap();
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert!(!config.tls_enabled);
        assert!(config.ca_certificate.is_none());
    }
}
