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

use crate::domain::manifest::{Manifest, ManifestKey, ManifestSet};
use crate::domain::request::{SubjectKind, ValidatedRequest};
use crate::domain::strategy::{map_parameters, StrategyId, StrategyParameters};
use crate::infrastructure::kubernetes::resources::cluster::{
    ClusterClaimBuilder, ManagedClusterBuilder, NodeClassBuilder, NodePoolBuilder,
};
use crate::infrastructure::kubernetes::resources::{
    LimitRangeBuilder, NamespaceBuilder, NetworkPolicyBuilder,
};
use crate::shared::error::{ProvisionError, Result};

/// Namespace, LimitRange and (when isolated) NetworkPolicy, in that order.
pub fn generate_namespace_manifests(validated: &ValidatedRequest) -> Result<ManifestSet> {
    let request = &validated.request;
    if request.kind != SubjectKind::Namespace {
        return Err(ProvisionError::invalid_field(
            "kind",
            "namespace manifests need a namespace request",
        ));
    }

    let name = request.name.clone();
    let mut set = ManifestSet::new(request.subject());

    let namespace = NamespaceBuilder::new(name.clone(), request.network_isolated).build()?;
    set.push(Manifest::from_resource(ManifestKey::Namespace, &namespace)?)?;

    let limit_range = LimitRangeBuilder::new(name.clone(), validated.limits.clone()).build()?;
    set.push(Manifest::from_resource(ManifestKey::LimitRange, &limit_range)?)?;

    if request.network_isolated {
        let policy = NetworkPolicyBuilder::new(name).build()?;
        set.push(Manifest::from_resource(ManifestKey::NetworkPolicy, &policy)?)?;
    }

    Ok(set)
}

/// Cluster documents in `strategy`'s shape.
pub fn generate_cluster_manifests(
    validated: &ValidatedRequest,
    strategy: StrategyId,
) -> Result<ManifestSet> {
    let parameters = map_parameters(validated, strategy)?;
    render_cluster_manifests(validated, &parameters)
}

/// Render already-mapped parameters. Exposed so callers that need the
/// parameters for `start` do not map twice.
pub fn render_cluster_manifests(
    validated: &ValidatedRequest,
    parameters: &StrategyParameters,
) -> Result<ManifestSet> {
    let mut set = ManifestSet::new(validated.request.subject());

    match parameters {
        StrategyParameters::Direct(p) => {
            let cluster = ManagedClusterBuilder::new(p).build();
            set.push(Manifest::from_value(ManifestKey::ManagedCluster, cluster)?)?;
            if p.node_auto_provisioning {
                let class = NodeClassBuilder::new(p).build();
                set.push(Manifest::from_value(ManifestKey::NodeClass, class)?)?;
                let pool = NodePoolBuilder::new(p).build();
                set.push(Manifest::from_value(ManifestKey::NodePool, pool)?)?;
            }
        }
        StrategyParameters::Composition(p) => {
            let claim = ClusterClaimBuilder::new(p).build();
            set.push(Manifest::from_value(ManifestKey::ManagedCluster, claim)?)?;
        }
    }

    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::request::{validate_request, ProvisioningRequest};

    fn namespace(isolated: bool) -> ValidatedRequest {
        validate_request(&ProvisioningRequest {
            name: "team-a".to_string(),
            network_isolated: isolated,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_namespace_set_order() {
        let set = generate_namespace_manifests(&namespace(true)).unwrap();
        assert_eq!(
            set.keys(),
            vec![
                ManifestKey::Namespace,
                ManifestKey::LimitRange,
                ManifestKey::NetworkPolicy
            ]
        );
        assert!(set.iter().all(|m| m.is_managed()));
    }

    #[test]
    fn test_policy_absent_when_not_isolated() {
        let set = generate_namespace_manifests(&namespace(false)).unwrap();
        assert!(!set.contains(ManifestKey::NetworkPolicy));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_cluster_request_rejected_for_namespace_generator() {
        let validated = validate_request(&ProvisioningRequest {
            kind: SubjectKind::Cluster,
            name: "Prod-01".to_string(),
            node_pool_type: Some("general-purpose".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert!(generate_namespace_manifests(&validated).is_err());

        let composition = generate_cluster_manifests(&validated, StrategyId::Composition).unwrap();
        assert_eq!(composition.len(), 1);
        assert_eq!(
            composition.get(ManifestKey::ManagedCluster).unwrap().kind,
            "ClusterClaim"
        );
    }
}
