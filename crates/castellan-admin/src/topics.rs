//! Topic administration.
//!
//! Create, alter and delete go to the cluster controller, the only broker
//! that accepts metadata mutations. Each operation is a single request
//! whose response embeds per-topic error codes; a non-zero code is a
//! failure even though the response itself arrived fine.

use std::collections::HashMap;

use kafka_protocol::messages::create_partitions_request::CreatePartitionsTopic;
use kafka_protocol::messages::create_topics_request::{CreatableTopic, CreateableTopicConfig};
use kafka_protocol::messages::alter_configs_request::{AlterConfigsResource, AlterableConfig};
use kafka_protocol::messages::describe_configs_request::DescribeConfigsResource;
use kafka_protocol::messages::{
    AlterConfigsRequest, AlterConfigsResponse, CreatePartitionsRequest, CreatePartitionsResponse,
    CreateTopicsRequest, CreateTopicsResponse, DeleteTopicsRequest, DeleteTopicsResponse,
    DescribeConfigsRequest, DescribeConfigsResponse, MetadataResponse, TopicName,
};
use kafka_protocol::protocol::StrBytes;
use tracing::{debug, info};

use crate::client::AdminClient;
use crate::codec::str_bytes_to_string;
use crate::configs::{non_default_entries, RESOURCE_TYPE_TOPIC};
use crate::error::{AdminError, Result};

/// A topic as the caller intends it (create/alter) or as the cluster
/// reports it (read).
///
/// On read, `config` contains only the non-default entries, so comparing a
/// read-back topic against a desired-state declaration detects drift
/// without noise from inherited defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    /// Unique cluster-wide name
    pub name: String,
    /// Partition count
    pub partitions: i32,
    /// Replicas per partition
    pub replication_factor: i16,
    /// Config entries; values are nullable per the protocol
    pub config: HashMap<String, Option<String>>,
}

impl Topic {
    pub fn new(name: impl Into<String>, partitions: i32, replication_factor: i16) -> Self {
        Self {
            name: name.into(),
            partitions,
            replication_factor,
            config: HashMap::new(),
        }
    }

    /// Add a config entry
    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.insert(key.into(), Some(value.into()));
        self
    }
}

/// Partition layout read from cluster metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TopicLayout {
    pub partitions: i32,
    pub replication_factor: i16,
}

impl AdminClient {
    /// Create a topic with the given partition count, replication factor
    /// and config map.
    pub async fn create_topic(&mut self, topic: &Topic) -> Result<()> {
        let mut broker = self.controller().await?;

        let mut creatable = CreatableTopic::default();
        creatable.name = TopicName(StrBytes::from_string(topic.name.clone()));
        creatable.num_partitions = topic.partitions;
        creatable.replication_factor = topic.replication_factor;
        creatable.configs = topic
            .config
            .iter()
            .map(|(key, value)| {
                let mut entry = CreateableTopicConfig::default();
                entry.name = StrBytes::from_string(key.clone());
                entry.value = value.as_ref().map(|v| StrBytes::from_string(v.clone()));
                entry
            })
            .collect();

        let mut request = CreateTopicsRequest::default();
        request.topics = vec![creatable];
        request.timeout_ms = self.settings().request_timeout.as_millis() as i32;

        debug!(topic = %topic.name, timeout_ms = request.timeout_ms, "creating topic");
        let response = broker.send(&request).await;
        let _ = broker.shutdown().await;
        check_create_topics(&response?)?;

        info!(topic = %topic.name, "created topic");
        Ok(())
    }

    /// Replace the topic's configuration with the given map.
    pub async fn update_topic(&mut self, topic: &Topic) -> Result<()> {
        let mut broker = self.controller().await?;

        let mut resource = AlterConfigsResource::default();
        resource.resource_type = RESOURCE_TYPE_TOPIC;
        resource.resource_name = StrBytes::from_string(topic.name.clone());
        resource.configs = topic
            .config
            .iter()
            .map(|(key, value)| {
                let mut entry = AlterableConfig::default();
                entry.name = StrBytes::from_string(key.clone());
                entry.value = value.as_ref().map(|v| StrBytes::from_string(v.clone()));
                entry
            })
            .collect();

        let mut request = AlterConfigsRequest::default();
        request.resources = vec![resource];
        request.validate_only = false;

        let response = broker.send(&request).await;
        let _ = broker.shutdown().await;
        check_alter_configs(&response?)?;

        info!(topic = %topic.name, "updated topic configuration");
        Ok(())
    }

    /// Delete a topic by name.
    pub async fn delete_topic(&mut self, name: &str) -> Result<()> {
        let mut broker = self.controller().await?;

        let mut request = DeleteTopicsRequest::default();
        request.topic_names = vec![TopicName(StrBytes::from_string(name.to_string()))];
        request.timeout_ms = self.settings().request_timeout.as_millis() as i32;

        let response = broker.send(&request).await;
        let _ = broker.shutdown().await;
        check_delete_topics(&response?)?;

        info!(topic = %name, "deleted topic");
        Ok(())
    }

    /// Grow the topic to `topic.partitions` partitions.
    pub async fn add_partitions(&mut self, topic: &Topic) -> Result<()> {
        let mut broker = self.controller().await?;

        let mut partitions = CreatePartitionsTopic::default();
        partitions.name = TopicName(StrBytes::from_string(topic.name.clone()));
        partitions.count = topic.partitions;
        partitions.assignments = None;

        let mut request = CreatePartitionsRequest::default();
        request.topics = vec![partitions];
        request.timeout_ms = self.settings().request_timeout.as_millis() as i32;
        request.validate_only = false;

        info!(topic = %topic.name, count = topic.partitions, "adding partitions");
        let response = broker.send(&request).await;
        let _ = broker.shutdown().await;
        check_create_partitions(&response?)?;

        info!(topic = %topic.name, "added partitions");
        Ok(())
    }

    /// Read a topic's materialized state: partition count, replication
    /// factor and non-default configuration.
    ///
    /// The name is matched exactly (case-sensitive) against the cluster's
    /// full topic listing; a miss is [`AdminError::TopicMissing`], which
    /// callers can tell apart from transport failures.
    pub async fn read_topic(&mut self, name: &str) -> Result<Topic> {
        let metadata = self.refresh_metadata().await?;
        let layout = topic_layout(&metadata, name)?;
        debug!(
            topic = %name,
            partitions = layout.partitions,
            replication_factor = layout.replication_factor,
            "read topic layout"
        );

        let config = self.topic_config(name).await?;

        Ok(Topic {
            name: name.to_string(),
            partitions: layout.partitions,
            replication_factor: layout.replication_factor,
            config,
        })
    }

    /// Fetch the topic's non-default config entries from the controller.
    async fn topic_config(&mut self, name: &str) -> Result<HashMap<String, Option<String>>> {
        let mut broker = self.controller().await?;

        let mut resource = DescribeConfigsResource::default();
        resource.resource_type = RESOURCE_TYPE_TOPIC;
        resource.resource_name = StrBytes::from_string(name.to_string());
        resource.configuration_keys = None;

        let mut request = DescribeConfigsRequest::default();
        request.resources = vec![resource];
        request.include_synonyms = true;

        // The negotiated version decides how default-ness is signaled.
        let response = match broker.version_for::<DescribeConfigsRequest>() {
            Ok(version) => broker.send(&request).await.map(|r| (r, version)),
            Err(err) => Err(err),
        };
        let _ = broker.shutdown().await;
        let (response, version) = response?;

        topic_config_from_response(&response, version, name)
    }
}

/// Find a topic in a metadata listing by exact name.
pub(crate) fn topic_layout(metadata: &MetadataResponse, name: &str) -> Result<TopicLayout> {
    for topic in &metadata.topics {
        let Some(topic_name) = &topic.name else {
            continue;
        };
        let topic_name: &str = &topic_name.0;
        if topic_name != name {
            continue;
        }

        // Replication factor is uniform across partitions, so any one
        // partition's replica assignment stands in for the topic.
        let replication_factor = topic
            .partitions
            .first()
            .map(|p| p.replica_nodes.len() as i16)
            .unwrap_or(0);

        return Ok(TopicLayout {
            partitions: topic.partitions.len() as i32,
            replication_factor,
        });
    }

    Err(AdminError::TopicMissing {
        topic: name.to_string(),
    })
}

/// Interpret a DescribeConfigs response for one topic.
pub(crate) fn topic_config_from_response(
    response: &DescribeConfigsResponse,
    version: i16,
    topic: &str,
) -> Result<HashMap<String, Option<String>>> {
    let Some(result) = response.results.first() else {
        return Ok(HashMap::new());
    };

    if result.error_code != 0 {
        return Err(AdminError::error_code(
            "DescribeConfigs",
            topic,
            result.error_code,
            result.error_message.as_deref(),
        ));
    }

    Ok(non_default_entries(result, version))
}

pub(crate) fn check_create_topics(response: &CreateTopicsResponse) -> Result<()> {
    for result in &response.topics {
        if result.error_code != 0 {
            return Err(AdminError::error_code(
                "CreateTopics",
                str_bytes_to_string(&result.name.0),
                result.error_code,
                result.error_message.as_deref(),
            ));
        }
    }
    Ok(())
}

pub(crate) fn check_delete_topics(response: &DeleteTopicsResponse) -> Result<()> {
    for result in &response.responses {
        if result.error_code != 0 {
            let name = result
                .name
                .as_ref()
                .map(|n| str_bytes_to_string(&n.0))
                .unwrap_or_default();
            return Err(AdminError::error_code(
                "DeleteTopics",
                name,
                result.error_code,
                None,
            ));
        }
    }
    Ok(())
}

pub(crate) fn check_alter_configs(response: &AlterConfigsResponse) -> Result<()> {
    for result in &response.responses {
        if result.error_code != 0 {
            return Err(AdminError::error_code(
                "AlterConfigs",
                str_bytes_to_string(&result.resource_name),
                result.error_code,
                result.error_message.as_deref(),
            ));
        }
    }
    Ok(())
}

pub(crate) fn check_create_partitions(response: &CreatePartitionsResponse) -> Result<()> {
    for result in &response.results {
        if result.error_code != 0 {
            return Err(AdminError::error_code(
                "CreatePartitions",
                str_bytes_to_string(&result.name.0),
                result.error_code,
                result.error_message.as_deref(),
            ));
        }
    }
    Ok(())
}
