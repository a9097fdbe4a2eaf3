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

use kube_provisioner::domain::manifest::{
    generate_cluster_manifests, generate_namespace_manifests, ManifestKey,
};
use kube_provisioner::domain::request::{
    validate_cluster_name, validate_namespace_name, validate_request, AdvancedOptions,
    ProvisioningRequest, QuantityPair, ResourceSpec, SubjectKind,
};
use kube_provisioner::domain::strategy::{map_parameters, StrategyId};
use kube_provisioner::shared::ErrorKind;

fn namespace_request(name: &str) -> ProvisioningRequest {
    ProvisioningRequest {
        name: name.to_string(),
        resources: ResourceSpec {
            cpu: QuantityPair {
                request: "500m".to_string(),
                limit: "1000m".to_string(),
            },
            memory: QuantityPair {
                request: "512Mi".to_string(),
                limit: "1Gi".to_string(),
            },
        },
        ..Default::default()
    }
}

fn cluster_request(name: &str, nap: bool) -> ProvisioningRequest {
    ProvisioningRequest {
        kind: SubjectKind::Cluster,
        name: name.to_string(),
        node_pool_type: Some("memory-optimized".to_string()),
        location: Some("westeurope".to_string()),
        enable_node_auto_provisioning: nap,
        advanced: AdvancedOptions {
            kubernetes_version: Some("1.30.4".to_string()),
            max_nodes: Some(8),
            spot_instances: false,
        },
        ..Default::default()
    }
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn test_name_rules() {
    assert!(validate_namespace_name("my-app-prod").is_ok());
    for bad in ["ab", "-leading-hyphen", "trailing-", "Upper", "a_b"] {
        let err = validate_namespace_name(bad).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidName, "{}", bad);
    }

    assert!(validate_cluster_name("DataPlatform-01").is_ok());
    assert!(validate_cluster_name(&"a".repeat(31)).is_err());
}

#[test]
fn test_request_and_limit_comparison() {
    let mut request = namespace_request("team-a");
    request.resources.cpu = QuantityPair {
        request: "1000m".to_string(),
        limit: "500m".to_string(),
    };
    let err = validate_request(&request).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RequestExceedsLimit);

    request.resources.cpu = QuantityPair {
        request: "500m".to_string(),
        limit: "1".to_string(),
    };
    assert!(validate_request(&request).is_ok());
}

#[test]
fn test_memory_units_are_normalized() {
    let mut request = namespace_request("team-a");
    request.resources.memory = QuantityPair {
        request: "1024Mi".to_string(),
        limit: "1Gi".to_string(),
    };
    assert!(validate_request(&request).is_ok());

    request.resources.memory.request = "1025Mi".to_string();
    assert_eq!(
        validate_request(&request).unwrap_err().kind(),
        ErrorKind::RequestExceedsLimit
    );
}

#[test]
fn test_bad_quantity_is_rejected() {
    let mut request = namespace_request("team-a");
    request.resources.memory.limit = "lots".to_string();
    assert_eq!(
        validate_request(&request).unwrap_err().kind(),
        ErrorKind::InvalidQuantity
    );
}

// ============================================================================
// Namespace manifests
// ============================================================================

#[test]
fn test_namespace_manifests_are_deterministic() {
    let validated = validate_request(&namespace_request("team-a")).unwrap();
    let first = generate_namespace_manifests(&validated).unwrap();
    let second = generate_namespace_manifests(&validated).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.to_yaml().unwrap(), second.to_yaml().unwrap());
}

#[test]
fn test_limit_range_max_is_twice_the_limit() {
    let validated = validate_request(&namespace_request("team-a")).unwrap();
    let set = generate_namespace_manifests(&validated).unwrap();
    let limit_range = &set.get(ManifestKey::LimitRange).unwrap().document;

    let limit = &limit_range["spec"]["limits"][0];
    assert_eq!(limit["type"], "Container");
    assert_eq!(limit["max"]["cpu"], "2000m");
    assert_eq!(limit["max"]["memory"], "2Gi");
    assert_eq!(limit["default"]["cpu"], "1000m");
    assert_eq!(limit["defaultRequest"]["memory"], "512Mi");
    assert_eq!(limit_range["metadata"]["namespace"], "team-a");
}

#[test]
fn test_network_policy_allows_dns() {
    let validated = validate_request(&namespace_request("team-a")).unwrap();
    let set = generate_namespace_manifests(&validated).unwrap();
    let policy = &set.get(ManifestKey::NetworkPolicy).unwrap().document;

    let egress = policy["spec"]["egress"].as_array().unwrap();
    let dns = egress
        .iter()
        .find(|rule| rule["to"][0]["namespaceSelector"].is_object())
        .expect("a DNS egress rule");
    assert_eq!(
        dns["to"][0]["namespaceSelector"]["matchLabels"]["kubernetes.io/metadata.name"],
        "kube-system"
    );
    let ports: Vec<_> = dns["ports"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| (p["protocol"].as_str().unwrap(), p["port"].as_i64().unwrap()))
        .collect();
    assert!(ports.contains(&("UDP", 53)));
    assert!(ports.contains(&("TCP", 53)));
}

#[test]
fn test_every_document_is_managed() {
    let validated = validate_request(&namespace_request("team-a")).unwrap();
    let set = generate_namespace_manifests(&validated).unwrap();
    assert!(set.iter().all(|m| m.is_managed()));

    let validated = validate_request(&cluster_request("DataPlatform", true)).unwrap();
    for strategy in [StrategyId::Direct, StrategyId::Composition] {
        let set = generate_cluster_manifests(&validated, strategy).unwrap();
        assert!(set.iter().all(|m| m.is_managed()), "{}", strategy);
    }
}

// ============================================================================
// Cluster manifests
// ============================================================================

#[test]
fn test_direct_cluster_with_auto_provisioning() {
    let validated = validate_request(&cluster_request("DataPlatform", true)).unwrap();
    let set = generate_cluster_manifests(&validated, StrategyId::Direct).unwrap();
    assert_eq!(
        set.keys(),
        vec![
            ManifestKey::ManagedCluster,
            ManifestKey::NodeClass,
            ManifestKey::NodePool
        ]
    );

    let cluster = &set.get(ManifestKey::ManagedCluster).unwrap().document;
    assert_eq!(cluster["spec"]["location"], "westeurope");
    assert_eq!(cluster["spec"]["kubernetesVersion"], "1.30.4");

    let class = set.get(ManifestKey::NodeClass).unwrap();
    let pool = &set.get(ManifestKey::NodePool).unwrap().document;
    assert_eq!(
        pool["spec"]["template"]["spec"]["nodeClassRef"]["name"].as_str(),
        Some(class.name.as_str())
    );
    assert_eq!(
        pool["spec"]["template"]["spec"]["requirements"][0]["values"][0],
        "E"
    );
    assert_eq!(pool["spec"]["limits"]["nodes"], "8");
}

#[test]
fn test_direct_cluster_without_auto_provisioning() {
    let validated = validate_request(&cluster_request("DataPlatform", false)).unwrap();
    let set = generate_cluster_manifests(&validated, StrategyId::Direct).unwrap();
    assert_eq!(set.keys(), vec![ManifestKey::ManagedCluster]);

    let cluster = &set.get(ManifestKey::ManagedCluster).unwrap().document;
    let pools = cluster["spec"]["agentPoolProfiles"].as_array().unwrap();
    assert_eq!(pools.len(), 2);
    assert_eq!(pools[1]["vmSize"], "Standard_E8s_v5");
}

#[test]
fn test_composition_cluster_is_one_claim() {
    let validated = validate_request(&cluster_request("DataPlatform", true)).unwrap();
    let set = generate_cluster_manifests(&validated, StrategyId::Composition).unwrap();
    assert_eq!(set.len(), 1);

    let claim = set.get(ManifestKey::ManagedCluster).unwrap();
    assert_eq!(claim.kind, "ClusterClaim");
    assert_eq!(claim.document["spec"]["parameters"]["nodePoolType"], "memory-optimized");
    assert_eq!(claim.document["spec"]["parameters"]["maxNodes"], 8);
}

#[test]
fn test_strategies_agree_on_shared_fields() {
    let validated = validate_request(&cluster_request("DataPlatform", false)).unwrap();
    let direct = generate_cluster_manifests(&validated, StrategyId::Direct).unwrap();
    let composed = generate_cluster_manifests(&validated, StrategyId::Composition).unwrap();

    let cluster = &direct.get(ManifestKey::ManagedCluster).unwrap().document;
    let claim = &composed.get(ManifestKey::ManagedCluster).unwrap().document;
    assert_eq!(cluster["spec"]["location"], claim["spec"]["parameters"]["location"]);
    assert_eq!(
        cluster["spec"]["kubernetesVersion"],
        claim["spec"]["parameters"]["kubernetesVersion"]
    );
    assert_eq!(
        cluster["spec"]["networkProfile"]["networkPolicy"],
        claim["spec"]["parameters"]["networkPolicy"]
    );
}

#[test]
fn test_unknown_pool_type() {
    let mut request = cluster_request("DataPlatform", false);
    request.node_pool_type = Some("quantum".to_string());
    assert_eq!(
        validate_request(&request).unwrap_err().kind(),
        ErrorKind::UnknownPoolType
    );
}

#[test]
fn test_composition_ignores_resource_limits() {
    let validated = validate_request(&cluster_request("DataPlatform", false)).unwrap();
    let parameters = map_parameters(&validated, StrategyId::Composition).unwrap();
    assert!(parameters.ignored_fields().contains(&"dry_run"));
    assert!(parameters
        .ignored_fields()
        .iter()
        .any(|f| f.starts_with("resources.")));
}
