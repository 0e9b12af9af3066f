//! The cluster admin client.
//!
//! [`AdminClient`] owns one long-lived connection (the first reachable
//! bootstrap broker) used for metadata queries, and opens short-lived
//! connections per operation: to the controller for topic and partition
//! mutation, to any available broker for ACL work. Nothing about the
//! cluster is cached between operations: every call re-resolves the broker
//! it needs and re-reads the state it depends on.
//!
//! Operations take `&mut self`; callers sharing a client across tasks must
//! serialize access themselves, which the borrow checker enforces.
//!
//! # Example
//!
//! ```rust,ignore
//! use castellan_admin::AdminClient;
//! use castellan_core::ConnectionConfig;
//!
//! let config = ConnectionConfig::new(vec!["broker-1:9092".to_string()]);
//! let mut client = AdminClient::connect(config).await?;
//! let topic = client.read_topic("events").await?;
//! println!("{} partitions", topic.partitions);
//! client.close().await?;
//! ```

use castellan_core::config::{ClientSettings, ConnectionConfig};
use kafka_protocol::messages::MetadataResponse;
use tracing::info;

use crate::broker::BrokerConnection;
use crate::error::Result;
use crate::locator;

/// Handle to a Kafka cluster for administrative operations.
pub struct AdminClient {
    config: ConnectionConfig,
    settings: ClientSettings,
    cluster: BrokerConnection,
}

impl AdminClient {
    /// Validate the configuration and open the cluster connection.
    ///
    /// Configuration problems (empty bootstrap list, bad certificates)
    /// fail here, before any admin operation runs.
    pub async fn connect(config: ConnectionConfig) -> Result<Self> {
        let settings = config.derive_client_settings()?;
        let cluster = locator::available_broker(&config.bootstrap_servers, &settings).await?;
        info!(addr = cluster.addr(), "connected to cluster");

        Ok(Self {
            config,
            settings,
            cluster,
        })
    }

    /// The configuration this client was built from
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Address of the broker serving metadata queries
    pub fn cluster_addr(&self) -> &str {
        self.cluster.addr()
    }

    /// Close the cluster connection.
    pub async fn close(self) -> Result<()> {
        self.cluster.shutdown().await
    }

    pub(crate) fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// Open a connection to the current cluster controller.
    pub(crate) async fn controller(&mut self) -> Result<BrokerConnection> {
        locator::controller(&mut self.cluster, &self.settings).await
    }

    /// Open a connection to any reachable bootstrap broker.
    pub(crate) async fn available_broker(&self) -> Result<BrokerConnection> {
        locator::available_broker(&self.config.bootstrap_servers, &self.settings).await
    }

    /// Re-read cluster metadata over the long-lived connection.
    pub(crate) async fn refresh_metadata(&mut self) -> Result<MetadataResponse> {
        locator::fetch_metadata(&mut self.cluster).await
    }
}

impl std::fmt::Debug for AdminClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminClient")
            .field("bootstrap_servers", &self.config.bootstrap_servers)
            .field("cluster", &self.cluster)
            .finish()
    }
}
