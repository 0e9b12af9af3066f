//! A single broker connection.
//!
//! Opening a connection runs the full client handshake: TCP dial (bounded
//! by the dial timeout), optional TLS, ApiVersions negotiation, and
//! optional SASL/PLAIN authentication. After that the connection is a plain
//! request/response channel: one in-flight request at a time, correlated by
//! id, with responses decoded at the negotiated version.

use std::collections::HashMap;

use bytes::Bytes;
use castellan_core::config::ClientSettings;
use castellan_core::tls::{TlsClientStream, TlsConnector};
use kafka_protocol::messages::{
    ApiVersionsRequest, SaslAuthenticateRequest, SaslHandshakeRequest,
};
use kafka_protocol::protocol::StrBytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, warn};

use crate::codec::{self, AdminRequest, FRAME_HEADER_SIZE, MAX_RESPONSE_SIZE};
use crate::error::{describe_error_code, AdminError, Result};

/// Either a plaintext or a TLS broker stream.
#[allow(clippy::large_enum_variant)]
enum BrokerStream {
    Plaintext(TcpStream),
    Tls(TlsClientStream<TcpStream>),
}

impl AsyncRead for BrokerStream {
    fn poll_read(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &mut tokio::io::ReadBuf<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        match self.get_mut() {
            BrokerStream::Plaintext(s) => std::pin::Pin::new(s).poll_read(cx, buf),
            BrokerStream::Tls(s) => std::pin::Pin::new(s).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for BrokerStream {
    fn poll_write(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &[u8],
    ) -> std::task::Poll<std::io::Result<usize>> {
        match self.get_mut() {
            BrokerStream::Plaintext(s) => std::pin::Pin::new(s).poll_write(cx, buf),
            BrokerStream::Tls(s) => std::pin::Pin::new(s).poll_write(cx, buf),
        }
    }

    fn poll_flush(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        match self.get_mut() {
            BrokerStream::Plaintext(s) => std::pin::Pin::new(s).poll_flush(cx),
            BrokerStream::Tls(s) => std::pin::Pin::new(s).poll_flush(cx),
        }
    }

    fn poll_shutdown(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        match self.get_mut() {
            BrokerStream::Plaintext(s) => std::pin::Pin::new(s).poll_shutdown(cx),
            BrokerStream::Tls(s) => std::pin::Pin::new(s).poll_shutdown(cx),
        }
    }
}

/// An open, authenticated connection to one broker.
pub struct BrokerConnection {
    addr: String,
    client_id: String,
    stream: BrokerStream,
    correlation_id: i32,
    /// Version ranges advertised by the broker, by API key.
    api_versions: HashMap<i16, (i16, i16)>,
}

impl BrokerConnection {
    /// Open a connection to `addr` and run the handshake described by the
    /// settings. The returned connection is ready for admin requests; the
    /// caller owns it and must [`shutdown`](Self::shutdown) it when done.
    pub async fn open(addr: &str, settings: &ClientSettings) -> Result<Self> {
        debug!(addr, "opening broker connection");

        let tcp = tokio::time::timeout(settings.dial_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| AdminError::DialTimeout {
                addr: addr.to_string(),
                timeout: settings.dial_timeout,
            })??;

        let stream = match &settings.tls {
            Some(tls_config) => {
                let connector = TlsConnector::new(tls_config.clone());
                let server_name = host_of(addr);
                let tls = connector.connect(tcp, server_name).await?;
                BrokerStream::Tls(tls)
            }
            None => BrokerStream::Plaintext(tcp),
        };

        let mut conn = Self {
            addr: addr.to_string(),
            client_id: settings.client_id.clone(),
            stream,
            correlation_id: 0,
            api_versions: HashMap::new(),
        };

        conn.negotiate_versions().await?;

        if let Some(sasl) = &settings.sasl {
            conn.authenticate(&sasl.username, &sasl.password).await?;
        }

        Ok(conn)
    }

    /// Address this connection was opened against
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Close the connection.
    pub async fn shutdown(mut self) -> Result<()> {
        self.stream.shutdown().await?;
        Ok(())
    }

    /// Exchange ApiVersions with the broker and record its supported range
    /// for every API.
    async fn negotiate_versions(&mut self) -> Result<()> {
        let request = ApiVersionsRequest::default();
        let response = self.send_versioned(&request, 0).await?;

        if response.error_code != 0 {
            return Err(AdminError::ErrorCode {
                api: "ApiVersions",
                resource: self.addr.clone(),
                reason: describe_error_code(response.error_code),
            });
        }

        self.api_versions = response
            .api_keys
            .iter()
            .map(|v| (v.api_key, (v.min_version, v.max_version)))
            .collect();

        debug!(
            addr = %self.addr,
            apis = self.api_versions.len(),
            "negotiated protocol versions"
        );
        Ok(())
    }

    /// Highest version of `R` inside both the client's pinned range and the
    /// broker's advertised one.
    pub(crate) fn version_for<R: AdminRequest>(&self) -> Result<i16> {
        let unsupported = || AdminError::UnsupportedVersion {
            api: R::API_NAME,
            min: R::MIN_VERSION,
            max: R::MAX_VERSION,
        };

        let (broker_min, broker_max) = self
            .api_versions
            .get(&R::API_KEY)
            .copied()
            .ok_or_else(&unsupported)?;

        let version = R::MAX_VERSION.min(broker_max);
        if version < R::MIN_VERSION || version < broker_min {
            return Err(unsupported());
        }
        Ok(version)
    }

    /// Send a request at the negotiated version and decode its response.
    pub(crate) async fn send<R: AdminRequest>(&mut self, request: &R) -> Result<R::Response> {
        let version = self.version_for::<R>()?;
        self.send_versioned(request, version).await
    }

    async fn send_versioned<R: AdminRequest>(
        &mut self,
        request: &R,
        version: i16,
    ) -> Result<R::Response> {
        self.correlation_id = self.correlation_id.wrapping_add(1);
        let correlation_id = self.correlation_id;

        let payload = codec::encode_request(&self.client_id, correlation_id, version, request)?;

        let len = payload.len() as u32;
        self.stream.write_all(&len.to_be_bytes()).await?;
        self.stream.write_all(&payload).await?;
        self.stream.flush().await?;

        let mut len_buf = [0u8; FRAME_HEADER_SIZE];
        self.stream.read_exact(&mut len_buf).await?;
        let response_len = u32::from_be_bytes(len_buf) as usize;

        if response_len > MAX_RESPONSE_SIZE {
            return Err(AdminError::ResponseTooLarge {
                size: response_len,
                limit: MAX_RESPONSE_SIZE,
            });
        }

        let mut response_buf = vec![0u8; response_len];
        self.stream.read_exact(&mut response_buf).await?;

        let (received_id, response) =
            codec::decode_response::<R>(Bytes::from(response_buf), version)?;

        if received_id != correlation_id {
            return Err(AdminError::CorrelationMismatch {
                expected: correlation_id,
                actual: received_id,
            });
        }

        Ok(response)
    }

    /// SASL/PLAIN authentication: mechanism handshake, then the
    /// `\0user\0password` token through SaslAuthenticate.
    async fn authenticate(&mut self, username: &str, password: &str) -> Result<()> {
        let mut handshake = SaslHandshakeRequest::default();
        handshake.mechanism = StrBytes::from_string("PLAIN".to_string());

        let response = self.send(&handshake).await?;
        if response.error_code != 0 {
            let offered: Vec<String> = response
                .mechanisms
                .iter()
                .map(codec::str_bytes_to_string)
                .collect();
            warn!(addr = %self.addr, ?offered, "SASL mechanism rejected");
            return Err(AdminError::SaslAuthentication(format!(
                "broker rejected PLAIN ({}), offers [{}]",
                describe_error_code(response.error_code),
                offered.join(", ")
            )));
        }

        let mut authenticate = SaslAuthenticateRequest::default();
        authenticate.auth_bytes = Bytes::from(format!("\0{username}\0{password}").into_bytes());

        let response = self.send(&authenticate).await?;
        if response.error_code != 0 {
            let reason = response
                .error_message
                .as_ref()
                .map(codec::str_bytes_to_string)
                .unwrap_or_else(|| describe_error_code(response.error_code));
            return Err(AdminError::SaslAuthentication(reason));
        }

        debug!(addr = %self.addr, username, "SASL authentication succeeded");
        Ok(())
    }
}

impl std::fmt::Debug for BrokerConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerConnection")
            .field("addr", &self.addr)
            .field("correlation_id", &self.correlation_id)
            .finish()
    }
}

/// Host portion of a `host:port` address, for TLS server-name verification.
fn host_of(addr: &str) -> &str {
    addr.rsplit_once(':').map_or(addr, |(host, _)| host)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_of_strips_the_port() {
        assert_eq!(host_of("broker-1.example.com:9093"), "broker-1.example.com");
        assert_eq!(host_of("localhost:9092"), "localhost");
        assert_eq!(host_of("no-port"), "no-port");
    }
}
