//! String-typed ACL vocabulary and its protocol mapping.
//!
//! Callers describe ACLs with plain strings (the encoding used by
//! declarative tooling); every field is translated through a closed
//! vocabulary before anything touches the wire. A string outside its
//! vocabulary maps to the [`Unrecognized`](AclOperation::Unrecognized)
//! sentinel and turns into a validation error naming the field and the
//! offending value, never a panic and never a silent coercion.
//!
//! Note that the literal string `"Unknown"` is itself part of three of the
//! vocabularies (it names the protocol's UNKNOWN enumeration, wire code 0)
//! and is therefore valid input; the sentinel is a different thing.

use kafka_protocol::messages::create_acls_request::AclCreation;
use kafka_protocol::messages::delete_acls_request::DeleteAclsFilter;
use kafka_protocol::protocol::StrBytes;

use crate::error::{AdminError, Result};

macro_rules! acl_vocabulary {
    (
        $(#[$meta:meta])*
        $name:ident, $field:literal, {
            $($variant:ident = $code:literal => $label:literal,)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant,)*
            /// Sentinel for strings outside the vocabulary
            Unrecognized,
        }

        impl $name {
            /// Total parse over the vocabulary; anything else is the
            /// sentinel.
            pub fn from_label(label: &str) -> Self {
                match label {
                    $($label => Self::$variant,)*
                    _ => Self::Unrecognized,
                }
            }

            /// Canonical string for the value
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)*
                    Self::Unrecognized => "unrecognized",
                }
            }

            /// Protocol enumeration code
            pub fn wire_code(self) -> i8 {
                match self {
                    $(Self::$variant => $code,)*
                    Self::Unrecognized => -1,
                }
            }

            /// Map a code from a broker response back to the vocabulary
            pub fn from_wire_code(code: i8) -> Self {
                match code {
                    $($code => Self::$variant,)*
                    _ => Self::Unrecognized,
                }
            }

            pub(crate) fn validated(label: &str) -> Result<Self> {
                match Self::from_label(label) {
                    Self::Unrecognized => Err(AdminError::UnknownAclToken {
                        field: $field,
                        value: label.to_string(),
                    }),
                    value => Ok(value),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

acl_vocabulary!(
    /// ACL operation being allowed or denied
    AclOperation, "operation", {
        Unknown = 0 => "Unknown",
        Any = 1 => "Any",
        All = 2 => "All",
        Read = 3 => "Read",
        Write = 4 => "Write",
        Create = 5 => "Create",
        Delete = 6 => "Delete",
        Alter = 7 => "Alter",
        Describe = 8 => "Describe",
        ClusterAction = 9 => "ClusterAction",
        DescribeConfigs = 10 => "DescribeConfigs",
        AlterConfigs = 11 => "AlterConfigs",
        IdempotentWrite = 12 => "IdempotentWrite",
    }
);

acl_vocabulary!(
    /// Whether the ACL allows or denies the operation
    AclPermissionType, "permission type", {
        Unknown = 0 => "Unknown",
        Any = 1 => "Any",
        Deny = 2 => "Deny",
        Allow = 3 => "Allow",
    }
);

acl_vocabulary!(
    /// Kind of entity the ACL applies to
    AclResourceType, "resource type", {
        Unknown = 0 => "Unknown",
        Any = 1 => "Any",
        Topic = 2 => "Topic",
        Group = 3 => "Group",
        Cluster = 4 => "Cluster",
        TransactionalID = 5 => "TransactionalID",
    }
);

acl_vocabulary!(
    /// How resource names are matched in filters.
    ///
    /// The vocabulary keys are lowercase and case-sensitive; there is no
    /// `unknown` keyword, so the `Unknown` variant renders as a string that
    /// does not parse back.
    AclPatternType, "pattern type filter", {
        Unknown = 0 => "unknown",
        Any = 1 => "any",
        Match = 2 => "match",
        Literal = 3 => "literal",
        Prefixed = 4 => "prefixed",
    }
);

/// String-typed ACL entry: who may (or may not) do what.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acl {
    pub principal: String,
    pub host: String,
    pub operation: String,
    pub permission_type: String,
}

/// String-typed resource the ACL applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclResource {
    pub resource_type: String,
    pub name: String,
    pub pattern_type_filter: String,
}

/// Caller-facing pairing of an ACL with its resource, string-encoded.
///
/// Every field is translated through the vocabularies above before a wire
/// call; translation stops at the first field that fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclBinding {
    pub acl: Acl,
    pub resource: AclResource,
}

impl std::fmt::Display for AclBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}|{}|{}|{}|{}|{}|{}",
            self.acl.principal,
            self.acl.host,
            self.acl.operation,
            self.acl.permission_type,
            self.resource.resource_type,
            self.resource.name,
            self.resource.pattern_type_filter,
        )
    }
}

impl AclBinding {
    /// Translate into a CreateAcls record, validating every field.
    pub(crate) fn creation(&self) -> Result<AclCreation> {
        let operation = AclOperation::validated(&self.acl.operation)?;
        let permission_type = AclPermissionType::validated(&self.acl.permission_type)?;
        let resource_type = AclResourceType::validated(&self.resource.resource_type)?;
        let pattern_type = AclPatternType::validated(&self.resource.pattern_type_filter)?;

        let mut creation = AclCreation::default();
        creation.principal = StrBytes::from_string(self.acl.principal.clone());
        creation.host = StrBytes::from_string(self.acl.host.clone());
        creation.operation = operation.wire_code();
        creation.permission_type = permission_type.wire_code();
        creation.resource_type = resource_type.wire_code();
        creation.resource_name = StrBytes::from_string(self.resource.name.clone());
        creation.resource_pattern_type = pattern_type.wire_code();
        Ok(creation)
    }

    /// Translate into a DeleteAcls filter on principal, host, resource
    /// name, operation, permission type and resource type. The pattern
    /// type is deliberately left at `any` so a delete matches the binding
    /// regardless of how it was patterned.
    pub(crate) fn filter(&self) -> Result<DeleteAclsFilter> {
        let operation = AclOperation::validated(&self.acl.operation)?;
        let permission_type = AclPermissionType::validated(&self.acl.permission_type)?;
        let resource_type = AclResourceType::validated(&self.resource.resource_type)?;

        let mut filter = DeleteAclsFilter::default();
        filter.principal_filter = Some(StrBytes::from_string(self.acl.principal.clone()));
        filter.host_filter = Some(StrBytes::from_string(self.acl.host.clone()));
        filter.resource_name_filter = Some(StrBytes::from_string(self.resource.name.clone()));
        filter.operation = operation.wire_code();
        filter.permission_type = permission_type.wire_code();
        filter.resource_type_filter = resource_type.wire_code();
        filter.pattern_type_filter = AclPatternType::Any.wire_code();
        Ok(filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding() -> AclBinding {
        AclBinding {
            acl: Acl {
                principal: "User:alice".to_string(),
                host: "*".to_string(),
                operation: "Read".to_string(),
                permission_type: "Allow".to_string(),
            },
            resource: AclResource {
                resource_type: "Topic".to_string(),
                name: "events".to_string(),
                pattern_type_filter: "literal".to_string(),
            },
        }
    }

    #[test]
    fn every_operation_label_maps_to_a_distinct_value() {
        let labels = [
            "Unknown",
            "Any",
            "All",
            "Read",
            "Write",
            "Create",
            "Delete",
            "Alter",
            "Describe",
            "ClusterAction",
            "DescribeConfigs",
            "AlterConfigs",
            "IdempotentWrite",
        ];
        let mut seen = std::collections::HashSet::new();
        for label in labels {
            let op = AclOperation::from_label(label);
            assert_ne!(op, AclOperation::Unrecognized, "{label}");
            assert!(seen.insert(op), "{label} mapped to a duplicate value");
            // Round-trip through the canonical string.
            assert_eq!(AclOperation::from_label(op.as_str()), op);
        }
    }

    #[test]
    fn operation_wire_codes_match_the_protocol() {
        assert_eq!(AclOperation::Unknown.wire_code(), 0);
        assert_eq!(AclOperation::Read.wire_code(), 3);
        assert_eq!(AclOperation::IdempotentWrite.wire_code(), 12);
        assert_eq!(AclOperation::from_wire_code(9), AclOperation::ClusterAction);
    }

    #[test]
    fn permission_type_vocabulary() {
        for (label, code) in [("Unknown", 0), ("Any", 1), ("Deny", 2), ("Allow", 3)] {
            let value = AclPermissionType::from_label(label);
            assert_ne!(value, AclPermissionType::Unrecognized);
            assert_eq!(value.wire_code(), code);
            assert_eq!(AclPermissionType::from_label(value.as_str()), value);
        }
        assert_eq!(
            AclPermissionType::from_label("allow"),
            AclPermissionType::Unrecognized
        );
    }

    #[test]
    fn resource_type_vocabulary() {
        for (label, code) in [
            ("Unknown", 0),
            ("Any", 1),
            ("Topic", 2),
            ("Group", 3),
            ("Cluster", 4),
            ("TransactionalID", 5),
        ] {
            let value = AclResourceType::from_label(label);
            assert_ne!(value, AclResourceType::Unrecognized);
            assert_eq!(value.wire_code(), code);
            assert_eq!(AclResourceType::from_label(value.as_str()), value);
        }
    }

    #[test]
    fn pattern_type_keys_are_lowercase_and_case_sensitive() {
        for (label, code) in [("any", 1), ("match", 2), ("literal", 3), ("prefixed", 4)] {
            let value = AclPatternType::from_label(label);
            assert_ne!(value, AclPatternType::Unrecognized);
            assert_eq!(value.wire_code(), code);
            assert_eq!(AclPatternType::from_label(value.as_str()), value);
        }
        assert_eq!(AclPatternType::from_label("Literal"), AclPatternType::Unrecognized);
        assert_eq!(AclPatternType::from_label("ANY"), AclPatternType::Unrecognized);
    }

    #[test]
    fn strings_outside_the_vocabulary_hit_the_sentinel() {
        assert_eq!(AclOperation::from_label("Browse"), AclOperation::Unrecognized);
        assert_eq!(AclOperation::from_label(""), AclOperation::Unrecognized);
        assert_eq!(AclResourceType::from_label("topic"), AclResourceType::Unrecognized);
    }

    #[test]
    fn creation_translates_every_field() {
        let creation = binding().creation().unwrap();
        assert_eq!(creation.operation, 3);
        assert_eq!(creation.permission_type, 3);
        assert_eq!(creation.resource_type, 2);
        assert_eq!(creation.resource_pattern_type, 3);
        assert_eq!(&*creation.principal, "User:alice");
        assert_eq!(&*creation.resource_name, "events");
    }

    #[test]
    fn creation_fails_on_the_first_bad_field() {
        let mut bad = binding();
        bad.acl.operation = "Browse".to_string();
        bad.acl.permission_type = "Maybe".to_string();

        let err = bad.creation().unwrap_err();
        // Operation is checked first; permission type is never reached.
        match err {
            AdminError::UnknownAclToken { field, value } => {
                assert_eq!(field, "operation");
                assert_eq!(value, "Browse");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn creation_error_names_field_and_value() {
        let mut bad = binding();
        bad.resource.pattern_type_filter = "Literal".to_string();
        let err = bad.creation().unwrap_err();
        let rendered = err.to_string();
        assert!(rendered.contains("pattern type filter"));
        assert!(rendered.contains("Literal"));
    }

    #[test]
    fn filter_translates_and_defaults_pattern_to_any() {
        let filter = binding().filter().unwrap();
        assert_eq!(filter.principal_filter.as_deref(), Some("User:alice"));
        assert_eq!(filter.host_filter.as_deref(), Some("*"));
        assert_eq!(filter.resource_name_filter.as_deref(), Some("events"));
        assert_eq!(filter.operation, 3);
        assert_eq!(filter.permission_type, 3);
        assert_eq!(filter.resource_type_filter, 2);
        assert_eq!(filter.pattern_type_filter, 1);
    }

    #[test]
    fn filter_rejects_bad_permission_type() {
        let mut bad = binding();
        bad.acl.permission_type = "Maybe".to_string();
        let err = bad.filter().unwrap_err();
        match err {
            AdminError::UnknownAclToken { field, value } => {
                assert_eq!(field, "permission type");
                assert_eq!(value, "Maybe");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn the_unknown_label_is_valid_vocabulary() {
        // "Unknown" names wire code 0; only out-of-vocabulary strings fail.
        let mut b = binding();
        b.acl.operation = "Unknown".to_string();
        let creation = b.creation().unwrap();
        assert_eq!(creation.operation, 0);
    }

    #[test]
    fn binding_renders_pipe_separated() {
        assert_eq!(
            binding().to_string(),
            "User:alice|*|Read|Allow|Topic|events|literal"
        );
    }
}
