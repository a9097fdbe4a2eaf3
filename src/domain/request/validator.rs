// Copyright 2025 JiangLong.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::domain::catalog;
use crate::domain::request::quantity::{compare_limits, Dimension, ResourceQuantity};
use crate::domain::request::{ProvisioningRequest, QuantityPair, SubjectKind};
use crate::shared::error::{ProvisionError, Result};
use regex::Regex;
use std::sync::OnceLock;

/// Naming constraints for one kind of target resource. Namespaces follow the
/// Kubernetes DNS label rules; managed clusters follow the cloud provider's
/// resource naming rules, which allow upper case but are shorter.
struct NameRules {
    field: &'static str,
    min_len: usize,
    max_len: usize,
    allow_uppercase: bool,
}

const NAMESPACE_NAME_RULES: NameRules = NameRules {
    field: "name",
    min_len: 3,
    max_len: 63,
    allow_uppercase: false,
};

const CLUSTER_NAME_RULES: NameRules = NameRules {
    field: "name",
    min_len: 3,
    max_len: 30,
    allow_uppercase: true,
};

fn check_name(rules: &NameRules, name: &str) -> Result<()> {
    let invalid = |reason: String| ProvisionError::invalid_name(rules.field, name, reason);

    let len = name.chars().count();
    if len < rules.min_len || len > rules.max_len {
        return Err(invalid(format!(
            "must be between {} and {} characters",
            rules.min_len, rules.max_len
        )));
    }

    let allowed = |c: char| {
        c.is_ascii_digit()
            || c.is_ascii_lowercase()
            || c == '-'
            || (rules.allow_uppercase && c.is_ascii_uppercase())
    };
    if !name.chars().all(allowed) {
        let charset = if rules.allow_uppercase {
            "letters, digits and hyphens"
        } else {
            "lowercase letters, digits and hyphens"
        };
        return Err(invalid(format!("may contain only {}", charset)));
    }

    if name.starts_with('-') || name.ends_with('-') {
        return Err(invalid("must not start or end with a hyphen".to_string()));
    }

    Ok(())
}

pub fn validate_namespace_name(name: &str) -> Result<()> {
    check_name(&NAMESPACE_NAME_RULES, name)
}

pub fn validate_cluster_name(name: &str) -> Result<()> {
    check_name(&CLUSTER_NAME_RULES, name)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimitPair {
    pub request: ResourceQuantity,
    pub limit: ResourceQuantity,
}

impl LimitPair {
    fn parse(dimension: Dimension, pair: &QuantityPair) -> Result<Self> {
        let request_field = format!("resources.{}.request", dimension);
        let limit_field = format!("resources.{}.limit", dimension);

        let request = ResourceQuantity::parse(dimension, &request_field, &pair.request)?;
        let limit = ResourceQuantity::parse(dimension, &limit_field, &pair.limit)?;
        compare_limits(&format!("resources.{}", dimension), &request, &limit)?;

        Ok(Self { request, limit })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLimits {
    pub cpu: LimitPair,
    pub memory: LimitPair,
}

/// A request whose domain invariants hold, with its quantities parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    pub request: ProvisioningRequest,
    pub limits: ResourceLimits,
}

fn version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d+\.\d+(\.\d+)?$").expect("version pattern is valid"))
}

/// Check every domain invariant of `request`. Returns the first violation.
pub fn validate_request(request: &ProvisioningRequest) -> Result<ValidatedRequest> {
    match request.kind {
        SubjectKind::Namespace => validate_namespace_name(&request.name)?,
        SubjectKind::Cluster => validate_cluster_name(&request.name)?,
    }

    let limits = ResourceLimits {
        cpu: LimitPair::parse(Dimension::Cpu, &request.resources.cpu)?,
        memory: LimitPair::parse(Dimension::Memory, &request.resources.memory)?,
    };

    if request.kind == SubjectKind::Cluster {
        validate_cluster_fields(request)?;
    }

    Ok(ValidatedRequest {
        request: request.clone(),
        limits,
    })
}

fn validate_cluster_fields(request: &ProvisioningRequest) -> Result<()> {
    let pool_type = request
        .node_pool_type
        .as_deref()
        .ok_or_else(|| ProvisionError::invalid_field("node_pool_type", "required for clusters"))?;
    catalog::describe(pool_type)?;

    if let Some(location) = request.location.as_deref() {
        catalog::describe_location(location)?;
    }

    if let Some(version) = request.advanced.kubernetes_version.as_deref() {
        if !version_pattern().is_match(version) {
            return Err(ProvisionError::invalid_field(
                "advanced.kubernetes_version",
                format!("'{}' is not a MAJOR.MINOR[.PATCH] version", version),
            ));
        }
    }

    if request.advanced.max_nodes == Some(0) {
        return Err(ProvisionError::invalid_quantity(
            "advanced.max_nodes",
            "0",
            "must be at least 1",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::error::ErrorKind;

    fn namespace_request(name: &str) -> ProvisioningRequest {
        ProvisioningRequest {
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_namespace_names() {
        assert!(validate_namespace_name("my-app-prod").is_ok());
        assert!(validate_namespace_name("abc").is_ok());

        for bad in ["ab", "-leading-hyphen", "trailing-", "Upper", "under_score"] {
            let err = validate_namespace_name(bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidName, "name {:?}", bad);
        }
        assert!(validate_namespace_name(&"a".repeat(64)).is_err());
        assert!(validate_namespace_name(&"a".repeat(63)).is_ok());
    }

    #[test]
    fn test_cluster_names() {
        assert!(validate_cluster_name("Prod-Cluster-01").is_ok());
        assert!(validate_cluster_name(&"c".repeat(31)).is_err());
        assert!(validate_cluster_name("-bad").is_err());
        assert!(validate_cluster_name("ok").is_err());
    }

    #[test]
    fn test_request_exceeding_limit_is_rejected() {
        let mut request = namespace_request("team-a");
        request.resources.cpu = QuantityPair {
            request: "1000m".to_string(),
            limit: "500m".to_string(),
        };
        let err = validate_request(&request).unwrap_err();
        match err {
            ProvisionError::RequestExceedsLimit { field, .. } => assert_eq!(field, "resources.cpu"),
            other => panic!("unexpected error: {other}"),
        }

        request.resources.cpu = QuantityPair {
            request: "500m".to_string(),
            limit: "1000m".to_string(),
        };
        assert!(validate_request(&request).is_ok());
    }

    #[test]
    fn test_invalid_quantity_names_field() {
        let mut request = namespace_request("team-a");
        request.resources.memory.limit = "lots".to_string();
        match validate_request(&request).unwrap_err() {
            ProvisionError::InvalidQuantity { field, .. } => {
                assert_eq!(field, "resources.memory.limit")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_cluster_requires_known_pool() {
        let mut request = ProvisioningRequest {
            kind: SubjectKind::Cluster,
            name: "Prod-01".to_string(),
            node_pool_type: Some("quantum".to_string()),
            ..Default::default()
        };
        assert_eq!(
            validate_request(&request).unwrap_err().kind(),
            ErrorKind::UnknownPoolType
        );

        request.node_pool_type = None;
        assert_eq!(
            validate_request(&request).unwrap_err().kind(),
            ErrorKind::InvalidField
        );

        request.node_pool_type = Some("general-purpose".to_string());
        assert!(validate_request(&request).is_ok());
    }

    #[test]
    fn test_cluster_advanced_fields() {
        let mut request = ProvisioningRequest {
            kind: SubjectKind::Cluster,
            name: "Prod-01".to_string(),
            node_pool_type: Some("general-purpose".to_string()),
            ..Default::default()
        };
        request.advanced.kubernetes_version = Some("latest".to_string());
        assert_eq!(
            validate_request(&request).unwrap_err().kind(),
            ErrorKind::InvalidField
        );

        request.advanced.kubernetes_version = Some("1.30".to_string());
        request.advanced.max_nodes = Some(0);
        assert_eq!(
            validate_request(&request).unwrap_err().kind(),
            ErrorKind::InvalidQuantity
        );

        request.advanced.max_nodes = Some(10);
        request.location = Some("moon-base-1".to_string());
        assert_eq!(
            validate_request(&request).unwrap_err().kind(),
            ErrorKind::InvalidField
        );
    }
}
