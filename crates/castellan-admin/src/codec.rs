//! Request/response plumbing over the Kafka wire format.
//!
//! Message bodies are encoded and decoded by the `kafka-protocol` crate;
//! this module owns what sits around them: length framing, header version
//! selection, and the binding between a request type and its response.
//!
//! ```text
//! ┌─────────────────┬────────────────────────────────────────────────┐
//! │  Length (4B)    │  RequestHeader + RequestBody                   │
//! │   big-endian    │  (header version depends on API and version)   │
//! └─────────────────┴────────────────────────────────────────────────┘
//! ```
//!
//! The client speaks a Kafka 2.0 protocol baseline: every API is pinned to
//! the version ceiling of that release, and negotiation only ever moves
//! downward from it, so older brokers remain addressable.

use bytes::{Bytes, BytesMut};
use kafka_protocol::messages::{
    AlterConfigsRequest, AlterConfigsResponse, ApiKey, ApiVersionsRequest, ApiVersionsResponse,
    CreateAclsRequest, CreateAclsResponse, CreatePartitionsRequest, CreatePartitionsResponse,
    CreateTopicsRequest, CreateTopicsResponse, DeleteAclsRequest, DeleteAclsResponse,
    DeleteTopicsRequest, DeleteTopicsResponse, DescribeAclsRequest, DescribeAclsResponse,
    DescribeConfigsRequest, DescribeConfigsResponse, MetadataRequest, MetadataResponse,
    RequestHeader, ResponseHeader, SaslAuthenticateRequest, SaslAuthenticateResponse,
    SaslHandshakeRequest, SaslHandshakeResponse,
};
use kafka_protocol::protocol::{Decodable, Encodable, StrBytes};

use crate::error::{AdminError, Result};

/// Maximum accepted response size (100 MB), a guard against a misbehaving
/// broker exhausting client memory.
pub(crate) const MAX_RESPONSE_SIZE: usize = 100 * 1024 * 1024;

/// Length prefix size in bytes.
pub(crate) const FRAME_HEADER_SIZE: usize = 4;

/// Request header version for a given API key and version.
///
/// v1 carries `client_id`; v2 adds tagged fields (flexible versions). The
/// cutoffs below cover every API this client issues.
pub(crate) fn request_header_version(api_key: i16, api_version: i16) -> i16 {
    let flexible_from = flexible_version_start(api_key);
    match flexible_from {
        Some(flexible) if api_version >= flexible => 2,
        _ => 1,
    }
}

/// Response header version for a given API key and version.
///
/// v0 is just the correlation id; v1 adds tagged fields. ApiVersions
/// responses always use v0 regardless of version so that clients can decode
/// the version-negotiation reply before knowing what the broker supports.
pub(crate) fn response_header_version(api_key: i16, api_version: i16) -> i16 {
    if api_key == ApiKey::ApiVersions as i16 {
        return 0;
    }
    match flexible_version_start(api_key) {
        Some(flexible) if api_version >= flexible => 1,
        _ => 0,
    }
}

/// First flexible (tagged-field) version per API, `None` when the API never
/// became flexible.
fn flexible_version_start(api_key: i16) -> Option<i16> {
    match api_key {
        k if k == ApiKey::Metadata as i16 => Some(9),
        k if k == ApiKey::ApiVersions as i16 => Some(3),
        k if k == ApiKey::CreateTopics as i16 => Some(5),
        k if k == ApiKey::DeleteTopics as i16 => Some(4),
        k if k == ApiKey::DescribeAcls as i16 => Some(2),
        k if k == ApiKey::CreateAcls as i16 => Some(2),
        k if k == ApiKey::DeleteAcls as i16 => Some(2),
        k if k == ApiKey::DescribeConfigs as i16 => Some(4),
        k if k == ApiKey::AlterConfigs as i16 => Some(2),
        k if k == ApiKey::SaslAuthenticate as i16 => Some(2),
        k if k == ApiKey::CreatePartitions as i16 => Some(2),
        k if k == ApiKey::SaslHandshake as i16 => None,
        _ => None,
    }
}

/// Binds a request body to its API key, the version range this client
/// speaks, and the response type it decodes.
///
/// The ceilings pin the Kafka 2.0 protocol baseline; negotiation picks the
/// highest version inside both this range and the broker's advertised one.
pub(crate) trait AdminRequest: Encodable + std::fmt::Debug {
    const API_KEY: i16;
    const API_NAME: &'static str;
    const MIN_VERSION: i16;
    const MAX_VERSION: i16;
    type Response: Decodable + std::fmt::Debug;
}

macro_rules! admin_request {
    ($request:ty, $response:ty, $key:expr, $name:literal, $min:literal..=$max:literal) => {
        impl AdminRequest for $request {
            const API_KEY: i16 = $key as i16;
            const API_NAME: &'static str = $name;
            const MIN_VERSION: i16 = $min;
            const MAX_VERSION: i16 = $max;
            type Response = $response;
        }
    };
}

admin_request!(ApiVersionsRequest, ApiVersionsResponse, ApiKey::ApiVersions, "ApiVersions", 0..=0);
admin_request!(MetadataRequest, MetadataResponse, ApiKey::Metadata, "Metadata", 0..=5);
admin_request!(CreateTopicsRequest, CreateTopicsResponse, ApiKey::CreateTopics, "CreateTopics", 0..=3);
admin_request!(DeleteTopicsRequest, DeleteTopicsResponse, ApiKey::DeleteTopics, "DeleteTopics", 0..=2);
admin_request!(CreatePartitionsRequest, CreatePartitionsResponse, ApiKey::CreatePartitions, "CreatePartitions", 0..=1);
admin_request!(DescribeConfigsRequest, DescribeConfigsResponse, ApiKey::DescribeConfigs, "DescribeConfigs", 0..=2);
admin_request!(AlterConfigsRequest, AlterConfigsResponse, ApiKey::AlterConfigs, "AlterConfigs", 0..=1);
admin_request!(DescribeAclsRequest, DescribeAclsResponse, ApiKey::DescribeAcls, "DescribeAcls", 0..=1);
admin_request!(CreateAclsRequest, CreateAclsResponse, ApiKey::CreateAcls, "CreateAcls", 0..=1);
admin_request!(DeleteAclsRequest, DeleteAclsResponse, ApiKey::DeleteAcls, "DeleteAcls", 0..=1);
admin_request!(SaslHandshakeRequest, SaslHandshakeResponse, ApiKey::SaslHandshake, "SaslHandshake", 0..=1);
admin_request!(SaslAuthenticateRequest, SaslAuthenticateResponse, ApiKey::SaslAuthenticate, "SaslAuthenticate", 0..=0);

/// Encode a request header and body at the given version.
pub(crate) fn encode_request<R: AdminRequest>(
    client_id: &str,
    correlation_id: i32,
    version: i16,
    request: &R,
) -> Result<BytesMut> {
    let mut header = RequestHeader::default();
    header.request_api_key = R::API_KEY;
    header.request_api_version = version;
    header.correlation_id = correlation_id;
    header.client_id = Some(StrBytes::from_string(client_id.to_string()));

    let mut buf = BytesMut::new();
    header
        .encode(&mut buf, request_header_version(R::API_KEY, version))
        .map_err(AdminError::encode)?;
    request.encode(&mut buf, version).map_err(AdminError::encode)?;
    Ok(buf)
}

/// Convert `StrBytes` to an owned `String` for domain objects and error
/// messages.
pub(crate) fn str_bytes_to_string(s: &StrBytes) -> String {
    String::from_utf8_lossy(s.as_ref()).to_string()
}

/// Decode a response header and body from a frame payload.
///
/// Returns the correlation id alongside the body so the caller can match it
/// against the request it sent.
pub(crate) fn decode_response<R: AdminRequest>(
    payload: Bytes,
    version: i16,
) -> Result<(i32, R::Response)> {
    let mut buf = payload;
    let header = ResponseHeader::decode(&mut buf, response_header_version(R::API_KEY, version))
        .map_err(AdminError::decode)?;
    let body = R::Response::decode(&mut buf, version).map_err(AdminError::decode)?;
    Ok((header.correlation_id, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pinned_ceilings_match_the_kafka_2_0_baseline() {
        assert_eq!(CreateTopicsRequest::MAX_VERSION, 3);
        assert_eq!(DeleteTopicsRequest::MAX_VERSION, 2);
        assert_eq!(CreatePartitionsRequest::MAX_VERSION, 1);
        assert_eq!(DescribeConfigsRequest::MAX_VERSION, 2);
        assert_eq!(AlterConfigsRequest::MAX_VERSION, 1);
        assert_eq!(DescribeAclsRequest::MAX_VERSION, 1);
        assert_eq!(CreateAclsRequest::MAX_VERSION, 1);
        assert_eq!(DeleteAclsRequest::MAX_VERSION, 1);
        assert_eq!(MetadataRequest::MAX_VERSION, 5);
    }

    #[test]
    fn header_versions_below_flexible_cutoffs() {
        assert_eq!(request_header_version(ApiKey::CreateTopics as i16, 3), 1);
        assert_eq!(request_header_version(ApiKey::Metadata as i16, 5), 1);
        assert_eq!(request_header_version(ApiKey::SaslHandshake as i16, 1), 1);
        assert_eq!(response_header_version(ApiKey::CreateTopics as i16, 3), 0);
        assert_eq!(response_header_version(ApiKey::Metadata as i16, 5), 0);
    }

    #[test]
    fn header_versions_at_flexible_cutoffs() {
        assert_eq!(request_header_version(ApiKey::CreateTopics as i16, 5), 2);
        assert_eq!(request_header_version(ApiKey::Metadata as i16, 9), 2);
        assert_eq!(response_header_version(ApiKey::CreateTopics as i16, 5), 1);
    }

    #[test]
    fn api_versions_response_header_is_always_v0() {
        assert_eq!(response_header_version(ApiKey::ApiVersions as i16, 0), 0);
        assert_eq!(response_header_version(ApiKey::ApiVersions as i16, 3), 0);
    }

    #[test]
    fn request_roundtrips_through_encode() {
        let request = ApiVersionsRequest::default();
        let buf = encode_request("castellan-admin", 7, 0, &request).unwrap();

        // Header echoes what we asked for.
        let mut payload = buf.freeze();
        let header = RequestHeader::decode(&mut payload, 1).unwrap();
        assert_eq!(header.request_api_key, ApiKey::ApiVersions as i16);
        assert_eq!(header.request_api_version, 0);
        assert_eq!(header.correlation_id, 7);
        assert_eq!(header.client_id.as_deref(), Some("castellan-admin"));
    }

    #[test]
    fn response_decodes_with_correlation_id() {
        let mut response = ApiVersionsResponse::default();
        response.error_code = 0;

        let mut header = ResponseHeader::default();
        header.correlation_id = 42;

        let mut buf = BytesMut::new();
        header.encode(&mut buf, 0).unwrap();
        response.encode(&mut buf, 0).unwrap();

        let (correlation_id, decoded) =
            decode_response::<ApiVersionsRequest>(buf.freeze(), 0).unwrap();
        assert_eq!(correlation_id, 42);
        assert_eq!(decoded.error_code, 0);
    }
}
