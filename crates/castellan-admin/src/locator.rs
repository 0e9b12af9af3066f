//! Broker location.
//!
//! Topic and partition mutations must go to the cluster controller; ACL
//! operations are served by any broker. Both lookups produce a fresh
//! [`BrokerConnection`] the caller is responsible for closing.

use castellan_core::config::ClientSettings;
use kafka_protocol::messages::{MetadataRequest, MetadataResponse};
use tracing::{debug, warn};

use crate::broker::BrokerConnection;
use crate::error::{AdminError, Result};

/// Fetch fresh cluster metadata (all topics) over an open connection.
pub(crate) async fn fetch_metadata(conn: &mut BrokerConnection) -> Result<MetadataResponse> {
    let mut request = MetadataRequest::default();
    // A null topic list asks for every topic in the cluster.
    request.topics = None;
    request.allow_auto_topic_creation = false;
    conn.send(&request).await
}

/// Resolve the cluster controller and open a connection to it.
///
/// Metadata is re-read on every call; the controller can move between
/// invocations and nothing is cached.
pub(crate) async fn controller(
    cluster: &mut BrokerConnection,
    settings: &ClientSettings,
) -> Result<BrokerConnection> {
    let metadata = fetch_metadata(cluster).await?;

    let controller_id = metadata.controller_id.0;
    if controller_id < 0 {
        return Err(AdminError::NoController);
    }

    let broker = metadata
        .brokers
        .iter()
        .find(|b| b.node_id.0 == controller_id)
        .ok_or(AdminError::NoController)?;

    let host: &str = &broker.host;
    let addr = format!("{}:{}", host, broker.port);
    debug!(controller_id, addr = %addr, "resolved cluster controller");

    BrokerConnection::open(&addr, settings).await
}

/// Open a connection to the first reachable bootstrap address.
///
/// Addresses are tried strictly in order. Only after every address has
/// failed does this return, with an aggregate error naming each one.
pub(crate) async fn available_broker(
    bootstrap_servers: &[String],
    settings: &ClientSettings,
) -> Result<BrokerConnection> {
    debug!(?bootstrap_servers, "looking for an available broker");

    for addr in bootstrap_servers {
        match BrokerConnection::open(addr, settings).await {
            Ok(conn) => return Ok(conn),
            Err(err) => {
                warn!(addr = %addr, error = %err, "broker cannot be reached");
            }
        }
    }

    Err(AdminError::NoAvailableBrokers {
        attempted: bootstrap_servers.to_vec(),
    })
}
