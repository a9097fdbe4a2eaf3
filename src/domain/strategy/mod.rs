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

//! Backend strategy selection for managed clusters
//!
//! Two strategies render the same cluster request into different document
//! shapes: `Direct` emits the cloud resources themselves, `Composition`
//! emits a single claim that a composition controller expands.

use crate::domain::catalog::{self, DEFAULT_LOCATION};
use crate::domain::request::{SubjectKind, ValidatedRequest};
use crate::infrastructure::constants::{
    DEFAULT_KUBERNETES_VERSION, DEFAULT_MAX_NODES, ENV_USE_COMPOSITION,
};
use crate::shared::error::{ProvisionError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyId {
    Direct,
    Composition,
}

impl StrategyId {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyId::Direct => "direct",
            StrategyId::Composition => "composition",
        }
    }
}

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Process-wide toggle between the two strategies. Cloned handles share
/// state; the value is read once per request and never re-read for a
/// workflow that already started.
#[derive(Debug, Clone, Default)]
pub struct StrategyFlag(Arc<AtomicBool>);

impl StrategyFlag {
    pub fn new(use_composition: bool) -> Self {
        Self(Arc::new(AtomicBool::new(use_composition)))
    }

    /// `default` unless the environment forces a value.
    pub fn from_env(default: bool) -> Self {
        let value = std::env::var(ENV_USE_COMPOSITION)
            .ok()
            .and_then(|v| parse_bool(&v))
            .unwrap_or(default);
        Self::new(value)
    }

    pub fn is_enabled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn set(&self, use_composition: bool) {
        self.0.store(use_composition, Ordering::SeqCst);
    }

    pub fn current(&self) -> StrategyId {
        select_strategy(self.is_enabled())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn select_strategy(use_composition: bool) -> StrategyId {
    if use_composition {
        StrategyId::Composition
    } else {
        StrategyId::Direct
    }
}

/// Request fields neither strategy reads. Per-container limits apply to
/// namespaces only and dry-run is consumed by the orchestrator.
const IGNORED_FIELDS: &[&str] = &[
    "resources.cpu.request",
    "resources.cpu.limit",
    "resources.memory.request",
    "resources.memory.limit",
    "dry_run",
];

/// Parameters consumed by the direct strategy. Pool sizing is resolved from
/// the catalog here because the documents carry it verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectParameters {
    pub cluster_name: String,
    pub location: String,
    pub kubernetes_version: String,
    pub pool_type: String,
    pub instance_sizes: Vec<String>,
    pub instance_family: String,
    pub max_cpu: String,
    pub max_memory: String,
    pub max_nodes: u32,
    pub spot_instances: bool,
    pub node_auto_provisioning: bool,
    pub network_isolated: bool,
}

/// Parameters consumed by the composition strategy. The composition resolves
/// the pool type itself, so only its name travels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositionParameters {
    pub cluster_name: String,
    pub location: String,
    pub kubernetes_version: String,
    pub pool_type: String,
    pub max_nodes: u32,
    pub spot_instances: bool,
    pub node_auto_provisioning: bool,
    pub network_isolated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "lowercase")]
pub enum StrategyParameters {
    Direct(DirectParameters),
    Composition(CompositionParameters),
}

impl StrategyParameters {
    pub fn strategy(&self) -> StrategyId {
        match self {
            StrategyParameters::Direct(_) => StrategyId::Direct,
            StrategyParameters::Composition(_) => StrategyId::Composition,
        }
    }

    pub fn cluster_name(&self) -> &str {
        match self {
            StrategyParameters::Direct(p) => &p.cluster_name,
            StrategyParameters::Composition(p) => &p.cluster_name,
        }
    }

    pub fn ignored_fields(&self) -> &'static [&'static str] {
        IGNORED_FIELDS
    }
}

/// Map a validated cluster request onto `strategy`'s parameter shape.
///
/// Defaults for optional fields are resolved once, here, so both strategies
/// see identical values.
pub fn map_parameters(
    validated: &ValidatedRequest,
    strategy: StrategyId,
) -> Result<StrategyParameters> {
    let request = &validated.request;
    if request.kind != SubjectKind::Cluster {
        return Err(ProvisionError::invalid_field(
            "kind",
            "strategies apply to cluster requests only",
        ));
    }

    let pool_type = request
        .node_pool_type
        .as_deref()
        .ok_or_else(|| ProvisionError::invalid_field("node_pool_type", "required for clusters"))?;
    let pool = catalog::describe(pool_type)?;

    let location = request
        .location
        .clone()
        .unwrap_or_else(|| DEFAULT_LOCATION.to_string());
    let kubernetes_version = request
        .advanced
        .kubernetes_version
        .clone()
        .unwrap_or_else(|| DEFAULT_KUBERNETES_VERSION.to_string());
    let max_nodes = request.advanced.max_nodes.unwrap_or(DEFAULT_MAX_NODES);

    let parameters = match strategy {
        StrategyId::Direct => StrategyParameters::Direct(DirectParameters {
            cluster_name: request.name.clone(),
            location,
            kubernetes_version,
            pool_type: pool.name.to_string(),
            instance_sizes: pool.instance_sizes.iter().map(|s| s.to_string()).collect(),
            instance_family: pool.instance_family.to_string(),
            max_cpu: pool.max_cpu.to_string(),
            max_memory: pool.max_memory.to_string(),
            max_nodes,
            spot_instances: request.advanced.spot_instances,
            node_auto_provisioning: request.enable_node_auto_provisioning,
            network_isolated: request.network_isolated,
        }),
        StrategyId::Composition => StrategyParameters::Composition(CompositionParameters {
            cluster_name: request.name.clone(),
            location,
            kubernetes_version,
            pool_type: pool.name.to_string(),
            max_nodes,
            spot_instances: request.advanced.spot_instances,
            node_auto_provisioning: request.enable_node_auto_provisioning,
            network_isolated: request.network_isolated,
        }),
    };

    Ok(parameters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::request::{validate_request, ProvisioningRequest};

    fn cluster_request() -> ValidatedRequest {
        let request = ProvisioningRequest {
            kind: SubjectKind::Cluster,
            name: "Prod-01".to_string(),
            node_pool_type: Some("compute-optimized".to_string()),
            ..Default::default()
        };
        validate_request(&request).unwrap()
    }

    #[test]
    fn test_select_strategy() {
        assert_eq!(select_strategy(false), StrategyId::Direct);
        assert_eq!(select_strategy(true), StrategyId::Composition);
    }

    #[test]
    fn test_flag_is_shared_between_clones() {
        let flag = StrategyFlag::new(false);
        let other = flag.clone();
        other.set(true);
        assert_eq!(flag.current(), StrategyId::Composition);
    }

    #[test]
    fn test_shared_fields_agree() {
        let validated = cluster_request();
        let direct = match map_parameters(&validated, StrategyId::Direct).unwrap() {
            StrategyParameters::Direct(p) => p,
            other => panic!("unexpected {:?}", other),
        };
        let composition = match map_parameters(&validated, StrategyId::Composition).unwrap() {
            StrategyParameters::Composition(p) => p,
            other => panic!("unexpected {:?}", other),
        };

        assert_eq!(direct.location, composition.location);
        assert_eq!(direct.location, DEFAULT_LOCATION);
        assert_eq!(direct.kubernetes_version, composition.kubernetes_version);
        assert_eq!(direct.max_nodes, composition.max_nodes);
        assert_eq!(direct.pool_type, composition.pool_type);
        assert_eq!(direct.instance_family, "F");
    }

    #[test]
    fn test_namespace_requests_have_no_strategy() {
        let validated = validate_request(&ProvisioningRequest {
            name: "team-a".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert!(map_parameters(&validated, StrategyId::Direct).is_err());
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
