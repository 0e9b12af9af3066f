//! ACL administration.
//!
//! Unlike topic mutation, ACL requests are served by any broker, so each
//! operation opens a connection to the first reachable bootstrap address
//! and closes it before returning.

use kafka_protocol::messages::describe_acls_response::DescribeAclsResource;
use kafka_protocol::messages::{
    CreateAclsRequest, CreateAclsResponse, DeleteAclsRequest, DeleteAclsResponse,
    DescribeAclsRequest, DescribeAclsResponse,
};
use tracing::info;

use crate::acl::{AclBinding, AclOperation, AclPatternType, AclPermissionType, AclResourceType};
use crate::client::AdminClient;
use crate::codec::str_bytes_to_string;
use crate::error::{AdminError, Result};

/// Resource types queried by [`AdminClient::list_acls`], in issue order.
/// The returned sequence concatenates results in exactly this order.
pub const ACL_LISTING_RESOURCE_TYPES: [AclResourceType; 4] = [
    AclResourceType::Topic,
    AclResourceType::Group,
    AclResourceType::Cluster,
    AclResourceType::TransactionalID,
];

/// ACLs attached to one resource, as reported by the cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceAcls {
    pub resource_type: AclResourceType,
    pub resource_name: String,
    pub pattern_type: AclPatternType,
    pub acls: Vec<ResourceAclEntry>,
}

/// One ACL entry on a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceAclEntry {
    pub principal: String,
    pub host: String,
    pub operation: AclOperation,
    pub permission_type: AclPermissionType,
}

impl AdminClient {
    /// Create a single ACL.
    pub async fn create_acl(&mut self, binding: &AclBinding) -> Result<()> {
        let mut broker = self.available_broker().await?;

        let creation = match binding.creation() {
            Ok(creation) => creation,
            Err(err) => {
                let _ = broker.shutdown().await;
                return Err(err);
            }
        };

        let mut request = CreateAclsRequest::default();
        request.creations = vec![creation];

        let response = broker.send(&request).await;
        let _ = broker.shutdown().await;
        check_create_acls(&response?, binding)?;

        info!(acl = %binding, "created ACL");
        Ok(())
    }

    /// Delete the ACLs matching the binding's filter.
    pub async fn delete_acl(&mut self, binding: &AclBinding) -> Result<()> {
        let mut broker = self.available_broker().await?;

        let filter = match binding.filter() {
            Ok(filter) => filter,
            Err(err) => {
                let _ = broker.shutdown().await;
                return Err(err);
            }
        };

        let mut request = DeleteAclsRequest::default();
        request.filters = vec![filter];

        info!(acl = %binding, "deleting ACL");
        let response = broker.send(&request).await;
        let _ = broker.shutdown().await;
        check_delete_acls(&response?, binding)?;

        Ok(())
    }

    /// List every ACL in the cluster.
    ///
    /// Issues one DescribeAcls per resource type in
    /// [`ACL_LISTING_RESOURCE_TYPES`], each with `any` pattern, permission
    /// and operation filters, strictly sequentially. A failure on any of
    /// the four calls aborts the listing; partial results are discarded.
    pub async fn list_acls(&mut self) -> Result<Vec<ResourceAcls>> {
        let mut broker = self.available_broker().await?;

        if let Err(err) = self.refresh_metadata().await {
            let _ = broker.shutdown().await;
            return Err(err);
        }

        let mut collected = Vec::new();
        for resource_type in ACL_LISTING_RESOURCE_TYPES {
            let request = describe_all_acls_request(resource_type);
            let response = match broker.send(&request).await {
                Ok(response) => response,
                Err(err) => {
                    let _ = broker.shutdown().await;
                    return Err(err);
                }
            };

            match check_describe_acls(&response, resource_type) {
                Ok(mut acls) => collected.append(&mut acls),
                Err(err) => {
                    let _ = broker.shutdown().await;
                    return Err(err);
                }
            }
        }

        let _ = broker.shutdown().await;
        Ok(collected)
    }
}

/// An "everything of this resource type" DescribeAcls request.
pub(crate) fn describe_all_acls_request(resource_type: AclResourceType) -> DescribeAclsRequest {
    let mut request = DescribeAclsRequest::default();
    request.resource_type_filter = resource_type.wire_code();
    request.resource_name_filter = None;
    request.pattern_type_filter = AclPatternType::Any.wire_code();
    request.principal_filter = None;
    request.host_filter = None;
    request.operation = AclOperation::Any.wire_code();
    request.permission_type = AclPermissionType::Any.wire_code();
    request
}

pub(crate) fn check_create_acls(response: &CreateAclsResponse, binding: &AclBinding) -> Result<()> {
    for result in &response.results {
        if result.error_code != 0 {
            return Err(AdminError::error_code(
                "CreateAcls",
                binding.to_string(),
                result.error_code,
                result.error_message.as_deref(),
            ));
        }
    }
    Ok(())
}

pub(crate) fn check_delete_acls(response: &DeleteAclsResponse, binding: &AclBinding) -> Result<()> {
    for result in &response.filter_results {
        if result.error_code != 0 {
            return Err(AdminError::error_code(
                "DeleteAcls",
                binding.to_string(),
                result.error_code,
                result.error_message.as_deref(),
            ));
        }
    }
    Ok(())
}

/// Interpret one DescribeAcls response, surfacing the embedded error code.
pub(crate) fn check_describe_acls(
    response: &DescribeAclsResponse,
    resource_type: AclResourceType,
) -> Result<Vec<ResourceAcls>> {
    if response.error_code != 0 {
        return Err(AdminError::error_code(
            "DescribeAcls",
            resource_type.as_str(),
            response.error_code,
            response.error_message.as_deref(),
        ));
    }

    Ok(response.resources.iter().map(resource_acls_from_wire).collect())
}

fn resource_acls_from_wire(resource: &DescribeAclsResource) -> ResourceAcls {
    ResourceAcls {
        resource_type: AclResourceType::from_wire_code(resource.resource_type),
        resource_name: str_bytes_to_string(&resource.resource_name),
        pattern_type: AclPatternType::from_wire_code(resource.pattern_type),
        acls: resource
            .acls
            .iter()
            .map(|acl| ResourceAclEntry {
                principal: str_bytes_to_string(&acl.principal),
                host: str_bytes_to_string(&acl.host),
                operation: AclOperation::from_wire_code(acl.operation),
                permission_type: AclPermissionType::from_wire_code(acl.permission_type),
            })
            .collect(),
    }
}
