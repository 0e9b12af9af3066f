//! TLS material for broker connections.
//!
//! Certificates and private keys can be supplied either as in-memory PEM
//! content (handed over by an embedding tool) or as file paths. Each
//! credential is a tagged source resolved exactly once, when the client
//! settings are derived. A broken certificate fails configuration, not the
//! first admin call hours later.
//!
//! # Example
//!
//! ```rust,ignore
//! use castellan_core::tls::{build_client_config, CertificateSource, ClientIdentity};
//!
//! let config = build_client_config(
//!     Some(&CertificateSource::File { path: "ca.crt".into() }),
//!     Some(&ClientIdentity::Files {
//!         cert_path: "client.crt".into(),
//!         key_path: "client.key".into(),
//!     }),
//!     false,
//! )?;
//! ```

use std::io::{self, BufReader, Cursor};
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;

pub use rustls::pki_types::{CertificateDer, PrivateKeyDer};
pub use rustls::ClientConfig;

/// TLS-related errors
#[derive(Debug, Error)]
pub enum TlsError {
    /// Certificate file not found or unreadable
    #[error("failed to read certificate file '{path}': {source}")]
    CertificateRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Private key file not found or unreadable
    #[error("failed to read private key file '{path}': {source}")]
    KeyRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Invalid certificate format
    #[error("invalid certificate: {0}")]
    InvalidCertificate(String),

    /// Invalid private key format
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    /// Root store construction failed
    #[error("certificate chain error: {0}")]
    CertificateChain(String),

    /// TLS handshake failed
    #[error("TLS handshake failed: {0}")]
    Handshake(String),

    /// Configuration error
    #[error("TLS configuration error: {0}")]
    Config(String),
}

impl From<rustls::Error> for TlsError {
    fn from(err: rustls::Error) -> Self {
        TlsError::Config(err.to_string())
    }
}

/// Result type for TLS operations
pub type TlsResult<T> = std::result::Result<T, TlsError>;

// ============================================================================
// Credential Sources
// ============================================================================

/// Where a certificate comes from: in-memory PEM content or a PEM file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CertificateSource {
    /// Load from a PEM file
    File { path: PathBuf },
    /// Load from a PEM string
    Pem { content: String },
}

/// Where a private key comes from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PrivateKeySource {
    /// Load from a PEM file
    File { path: PathBuf },
    /// Load from a PEM string
    Pem { content: String },
}

/// Client certificate plus matching private key, for mutual TLS.
///
/// Either both halves are in-memory PEM or both are file paths; the two
/// forms mirror how embedding tools hand credentials over.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientIdentity {
    /// In-memory PEM certificate and key
    Pem { cert: String, key: String },
    /// Certificate and key PEM files
    Files { cert_path: PathBuf, key_path: PathBuf },
}

impl ClientIdentity {
    /// Load and parse both halves of the identity.
    pub fn load(&self) -> TlsResult<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>)> {
        let (cert_source, key_source) = match self {
            ClientIdentity::Pem { cert, key } => (
                CertificateSource::Pem {
                    content: cert.clone(),
                },
                PrivateKeySource::Pem {
                    content: key.clone(),
                },
            ),
            ClientIdentity::Files {
                cert_path,
                key_path,
            } => (
                CertificateSource::File {
                    path: cert_path.clone(),
                },
                PrivateKeySource::File {
                    path: key_path.clone(),
                },
            ),
        };

        let certs = load_certificates(&cert_source)?;
        let key = load_private_key(&key_source)?;
        Ok((certs, key))
    }
}

// ============================================================================
// Certificate Loading
// ============================================================================

/// Load certificates from a source
pub fn load_certificates(source: &CertificateSource) -> TlsResult<Vec<CertificateDer<'static>>> {
    match source {
        CertificateSource::File { path } => {
            let data = std::fs::read(path).map_err(|e| TlsError::CertificateRead {
                path: path.clone(),
                source: e,
            })?;
            parse_pem_certificates(&data)
        }
        CertificateSource::Pem { content } => parse_pem_certificates(content.as_bytes()),
    }
}

fn parse_pem_certificates(data: &[u8]) -> TlsResult<Vec<CertificateDer<'static>>> {
    let mut reader = BufReader::new(Cursor::new(data));
    let certs: Vec<CertificateDer<'static>> = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| TlsError::InvalidCertificate(format!("failed to parse PEM: {}", e)))?;

    if certs.is_empty() {
        return Err(TlsError::InvalidCertificate(
            "no certificates found in PEM data".to_string(),
        ));
    }

    Ok(certs)
}

/// Load a private key from a source
pub fn load_private_key(source: &PrivateKeySource) -> TlsResult<PrivateKeyDer<'static>> {
    match source {
        PrivateKeySource::File { path } => {
            let data = std::fs::read(path).map_err(|e| TlsError::KeyRead {
                path: path.clone(),
                source: e,
            })?;
            parse_pem_private_key(&data)
        }
        PrivateKeySource::Pem { content } => parse_pem_private_key(content.as_bytes()),
    }
}

fn parse_pem_private_key(data: &[u8]) -> TlsResult<PrivateKeyDer<'static>> {
    let mut reader = BufReader::new(Cursor::new(data));

    rustls_pemfile::private_key(&mut reader)
        .map_err(|e| TlsError::InvalidPrivateKey(format!("failed to parse PEM: {}", e)))?
        .ok_or_else(|| TlsError::InvalidPrivateKey("no private key found in PEM data".to_string()))
}

// ============================================================================
// Client Configuration
// ============================================================================

/// Build a rustls `ClientConfig` for broker connections.
///
/// The trusted-root pool comes from the CA source when one is given,
/// otherwise from the platform's native root store. A client identity, when
/// present, enables mutual TLS. `insecure_skip_verify` disables server
/// certificate verification entirely and is only meant for test clusters.
pub fn build_client_config(
    ca_certificate: Option<&CertificateSource>,
    client_identity: Option<&ClientIdentity>,
    insecure_skip_verify: bool,
) -> TlsResult<ClientConfig> {
    let root_store = if insecure_skip_verify {
        tracing::warn!("server certificate verification is disabled");
        // Verification is replaced below; the pool is never consulted.
        rustls::RootCertStore::empty()
    } else if let Some(ca_source) = ca_certificate {
        let ca_certs = load_certificates(ca_source)?;
        let mut store = rustls::RootCertStore::empty();
        for cert in ca_certs {
            store
                .add(cert)
                .map_err(|e| TlsError::CertificateChain(format!("failed to add root CA: {}", e)))?;
        }
        store
    } else {
        let mut store = rustls::RootCertStore::empty();
        let native_certs = rustls_native_certs::load_native_certs();
        for cert in native_certs.certs {
            let _ = store.add(cert);
        }
        store
    };

    let identity = client_identity.map(ClientIdentity::load).transpose()?;

    let config = match (identity, insecure_skip_verify) {
        (Some((certs, key)), false) => ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_client_auth_cert(certs, key)
            .map_err(|e| TlsError::Config(format!("invalid client cert/key: {}", e)))?,
        (Some((certs, key)), true) => ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(NoCertificateVerification))
            .with_client_auth_cert(certs, key)
            .map_err(|e| TlsError::Config(format!("invalid client cert/key: {}", e)))?,
        (None, false) => ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth(),
        (None, true) => ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(NoCertificateVerification))
            .with_no_client_auth(),
    };

    Ok(config)
}

// ============================================================================
// Connector
// ============================================================================

/// TLS connector for broker connections
pub struct TlsConnector {
    inner: tokio_rustls::TlsConnector,
}

impl TlsConnector {
    /// Wrap a prepared client configuration
    pub fn new(config: Arc<ClientConfig>) -> Self {
        Self {
            inner: tokio_rustls::TlsConnector::from(config),
        }
    }

    /// Run the TLS handshake over an established stream
    pub async fn connect<IO>(&self, stream: IO, server_name: &str) -> TlsResult<TlsClientStream<IO>>
    where
        IO: AsyncRead + AsyncWrite + Unpin,
    {
        let name: rustls::pki_types::ServerName<'static> = server_name
            .to_string()
            .try_into()
            .map_err(|_| TlsError::Config(format!("invalid server name: {}", server_name)))?;

        let tls_stream = self
            .inner
            .connect(name, stream)
            .await
            .map_err(|e| TlsError::Handshake(e.to_string()))?;

        Ok(TlsClientStream { inner: tls_stream })
    }
}

impl std::fmt::Debug for TlsConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsConnector").finish()
    }
}

/// Client-side TLS stream
pub struct TlsClientStream<IO = TcpStream> {
    inner: tokio_rustls::client::TlsStream<IO>,
}

impl<IO> AsyncRead for TlsClientStream<IO>
where
    IO: AsyncRead + AsyncWrite + Unpin,
{
    fn poll_read(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> std::task::Poll<io::Result<()>> {
        std::pin::Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl<IO> AsyncWrite for TlsClientStream<IO>
where
    IO: AsyncRead + AsyncWrite + Unpin,
{
    fn poll_write(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &[u8],
    ) -> std::task::Poll<io::Result<usize>> {
        std::pin::Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<io::Result<()>> {
        std::pin::Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<io::Result<()>> {
        std::pin::Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

/// Certificate verifier that accepts any certificate.
/// Installed only when `insecure_skip_verify` is set.
#[derive(Debug)]
struct NoCertificateVerification;

impl rustls::client::danger::ServerCertVerifier for NoCertificateVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        vec![
            rustls::SignatureScheme::ECDSA_NISTP256_SHA256,
            rustls::SignatureScheme::ECDSA_NISTP384_SHA384,
            rustls::SignatureScheme::ECDSA_NISTP521_SHA512,
            rustls::SignatureScheme::RSA_PSS_SHA256,
            rustls::SignatureScheme::RSA_PSS_SHA384,
            rustls::SignatureScheme::RSA_PSS_SHA512,
            rustls::SignatureScheme::RSA_PKCS1_SHA256,
            rustls::SignatureScheme::RSA_PKCS1_SHA384,
            rustls::SignatureScheme::RSA_PKCS1_SHA512,
            rustls::SignatureScheme::ED25519,
        ]
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rustls::client::ResolvesClientCert as _;
    use std::io::Write;

    fn install_provider() {
        let _ = rustls::crypto::ring::default_provider().install_default();
    }

    fn self_signed_pem(common_name: &str) -> (String, String) {
        let mut params = rcgen::CertificateParams::new(vec![common_name.to_string()]).unwrap();
        params.distinguished_name = rcgen::DistinguishedName::new();
        params
            .distinguished_name
            .push(rcgen::DnType::CommonName, common_name);
        let key_pair = rcgen::KeyPair::generate().unwrap();
        let cert = params.self_signed(&key_pair).unwrap();
        (cert.pem(), key_pair.serialize_pem())
    }

    #[test]
    fn load_certificates_from_pem() {
        let (cert_pem, _) = self_signed_pem("broker.test.local");
        let certs = load_certificates(&CertificateSource::Pem { content: cert_pem }).unwrap();
        assert_eq!(certs.len(), 1);
        assert!(!certs[0].as_ref().is_empty());
    }

    #[test]
    fn load_certificates_from_file() {
        let (cert_pem, _) = self_signed_pem("broker.test.local");
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(cert_pem.as_bytes()).unwrap();

        let certs = load_certificates(&CertificateSource::File {
            path: file.path().to_path_buf(),
        })
        .unwrap();
        assert_eq!(certs.len(), 1);
    }

    #[test]
    fn missing_certificate_file_names_the_path() {
        let err = load_certificates(&CertificateSource::File {
            path: "/nonexistent/ca.crt".into(),
        })
        .unwrap_err();
        assert!(matches!(err, TlsError::CertificateRead { .. }));
        assert!(err.to_string().contains("/nonexistent/ca.crt"));
    }

    #[test]
    fn garbage_pem_is_rejected() {
        let err = load_certificates(&CertificateSource::Pem {
            content: "not a certificate".to_string(),
        })
        .unwrap_err();
        assert!(matches!(err, TlsError::InvalidCertificate(_)));
    }

    #[test]
    fn load_private_key_from_pem() {
        let (_, key_pem) = self_signed_pem("broker.test.local");
        let key = load_private_key(&PrivateKeySource::Pem { content: key_pem }).unwrap();
        assert!(!key.secret_der().is_empty());
    }

    #[test]
    fn client_identity_pem_roundtrip() {
        let (cert_pem, key_pem) = self_signed_pem("client.test.local");
        let identity = ClientIdentity::Pem {
            cert: cert_pem,
            key: key_pem,
        };
        let (certs, _key) = identity.load().unwrap();
        assert_eq!(certs.len(), 1);
    }

    #[test]
    fn client_identity_from_files() {
        let (cert_pem, key_pem) = self_signed_pem("client.test.local");
        let mut cert_file = tempfile::NamedTempFile::new().unwrap();
        cert_file.write_all(cert_pem.as_bytes()).unwrap();
        let mut key_file = tempfile::NamedTempFile::new().unwrap();
        key_file.write_all(key_pem.as_bytes()).unwrap();

        let identity = ClientIdentity::Files {
            cert_path: cert_file.path().to_path_buf(),
            key_path: key_file.path().to_path_buf(),
        };
        let (certs, _key) = identity.load().unwrap();
        assert_eq!(certs.len(), 1);
    }

    #[test]
    fn build_config_with_ca_and_identity() {
        install_provider();
        let (ca_pem, _) = self_signed_pem("ca.test.local");
        let (cert_pem, key_pem) = self_signed_pem("client.test.local");

        let config = build_client_config(
            Some(&CertificateSource::Pem { content: ca_pem }),
            Some(&ClientIdentity::Pem {
                cert: cert_pem,
                key: key_pem,
            }),
            false,
        )
        .unwrap();
        assert!(config.client_auth_cert_resolver.has_certs());
    }

    #[test]
    fn build_config_skip_verify_needs_no_roots() {
        install_provider();
        let config = build_client_config(None, None, true).unwrap();
        assert!(!config.client_auth_cert_resolver.has_certs());
    }

    #[test]
    fn build_config_with_broken_identity_fails() {
        install_provider();
        let err = build_client_config(
            None,
            Some(&ClientIdentity::Pem {
                cert: "bogus".to_string(),
                key: "bogus".to_string(),
            }),
            true,
        )
        .unwrap_err();
        assert!(matches!(err, TlsError::InvalidCertificate(_)));
    }

    #[test]
    fn certificate_source_serde_tagging() {
        let source = CertificateSource::File {
            path: "/etc/kafka/ca.crt".into(),
        };
        let json = serde_json::to_string(&source).unwrap();
        assert!(json.contains("\"type\":\"file\""));
    }
}
