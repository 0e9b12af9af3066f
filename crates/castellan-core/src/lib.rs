//! Core building blocks for the Castellan Kafka administrative client:
//! cluster connection configuration and TLS/SASL material.
//!
//! Everything here is network-free. [`config::ConnectionConfig`] describes
//! how to reach a cluster; deriving [`config::ClientSettings`] from it
//! validates the description (bootstrap list, certificates, keys) without
//! opening a socket. The actual broker transport lives in
//! `castellan-admin`.

pub mod config;
pub mod tls;

pub use config::{ClientSettings, ConfigError, ConnectionConfig, SaslCredentials, CLIENT_ID};
pub use tls::{CertificateSource, ClientIdentity, PrivateKeySource, TlsError};
