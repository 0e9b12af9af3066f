//! Effective-configuration filtering.
//!
//! Reading a topic back should reflect only what was explicitly set, so
//! drift detection against a desired-state declaration stays accurate.
//! Which entries count as "default" depends on the DescribeConfigs version:
//! version 0 carries a plain `is_default` flag, while version 1 and later
//! report a config *source* instead. The split lives here so callers never
//! have to know which scheme the broker spoke.

use std::collections::HashMap;

use kafka_protocol::messages::describe_configs_response::{
    DescribeConfigsResourceResult, DescribeConfigsResult,
};
use tracing::debug;

use crate::codec::str_bytes_to_string;

/// Config resource type for topics, per the Kafka protocol.
pub(crate) const RESOURCE_TYPE_TOPIC: i8 = 2;

/// Config source: value inherited from the cluster-wide default.
pub const SOURCE_DEFAULT_CONFIG: i8 = 5;

/// Config source: value from the broker's static `server.properties`.
pub const SOURCE_STATIC_BROKER_CONFIG: i8 = 4;

/// Whether a config entry holds a default (non-explicit) value.
///
/// `version` is the DescribeConfigs version the response was decoded at.
/// Version 0 only has the `is_default` flag. From version 1 on, an entry is
/// default iff its source is the cluster default or the broker's static
/// configuration; any other source is a dynamic override someone set.
pub fn is_default_entry(entry: &DescribeConfigsResourceResult, version: i16) -> bool {
    if version == 0 {
        return entry.is_default;
    }
    entry.config_source == SOURCE_DEFAULT_CONFIG
        || entry.config_source == SOURCE_STATIC_BROKER_CONFIG
}

/// Extract the explicitly-set config entries from a DescribeConfigs result.
pub fn non_default_entries(
    result: &DescribeConfigsResult,
    version: i16,
) -> HashMap<String, Option<String>> {
    let mut entries = HashMap::new();

    for entry in &result.configs {
        debug!(
            name = %str_bytes_to_string(&entry.name),
            is_default = entry.is_default,
            source = entry.config_source,
            version,
            synonyms = entry.synonyms.len(),
            "config entry"
        );

        if is_default_entry(entry, version) {
            continue;
        }

        entries.insert(
            str_bytes_to_string(&entry.name),
            entry.value.as_ref().map(str_bytes_to_string),
        );
    }

    entries
}
