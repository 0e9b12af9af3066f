//! # Castellan Admin
//!
//! Kafka cluster administration: topics, partitions, ACLs and effective
//! configuration, over the broker protocol.
//!
//! The client translates resource intents into single protocol exchanges
//! and normalizes the results into stable domain objects:
//!
//! - **Topics**: create, alter configuration, delete, add partitions, and
//!   read back a topic's materialized state (partition count, replication
//!   factor, non-default config only).
//! - **ACLs**: create, delete by filter, and list across all resource
//!   types, with strict string-vocabulary validation.
//!
//! Topic and partition mutations are routed to the cluster controller;
//! ACL operations go to any reachable broker. Responses are inspected for
//! per-resource error codes; a delivered response whose embedded code is
//! non-zero is a failure, reported with the resource name and the broker's
//! reason.
//!
//! There are no internal retries and no cached cluster state: every
//! operation re-resolves the broker it needs and re-reads what it depends
//! on, so the client is safe to use against clusters whose controller or
//! topology moves between calls.
//!
//! ```rust,ignore
//! use castellan_admin::{AdminClient, Topic};
//! use castellan_core::ConnectionConfig;
//!
//! let config = ConnectionConfig::new(vec!["broker-1:9092".to_string()]);
//! let mut client = AdminClient::connect(config).await?;
//!
//! let topic = Topic::new("events", 6, 3).with_config("retention.ms", "86400000");
//! client.create_topic(&topic).await?;
//!
//! match client.read_topic("events").await {
//!     Ok(state) => println!("{} partitions", state.partitions),
//!     Err(err) if err.is_topic_missing() => println!("gone"),
//!     Err(err) => return Err(err),
//! }
//! ```

pub mod acl;
pub mod acl_admin;
pub mod broker;
pub mod client;
pub mod configs;
pub mod error;
pub mod topics;

mod codec;
mod locator;

pub use acl::{Acl, AclBinding, AclOperation, AclPatternType, AclPermissionType, AclResource, AclResourceType};
pub use acl_admin::{ResourceAclEntry, ResourceAcls, ACL_LISTING_RESOURCE_TYPES};
pub use broker::BrokerConnection;
pub use client::AdminClient;
pub use error::{AdminError, Result};
pub use topics::Topic;
