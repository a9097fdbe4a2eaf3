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

use kube_provisioner::domain::config::{
    apply_dynamic_configs, parse_dynamic_configs, ProvisionerConfig, StoreBackend,
};
use kube_provisioner::domain::request::{ProvisioningRequest, SubjectKind};
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

fn temp_file(suffix: &str, content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("create temp file");
    file.write_all(content.as_bytes()).expect("write temp file");
    file
}

// ============================================================================
// Provisioner configuration
// ============================================================================

#[test]
fn test_load_config_file() {
    let file = temp_file(
        ".toml",
        r#"
[kubernetes]
context = "aks-prod"
engine_namespace = "workflows"

[observation]
poll_interval_ms = 500
window_secs = 60

[strategy]
use_composition = true

[store]
backend = "memory"
"#,
    );

    let config = ProvisionerConfig::load(file.path().to_str()).unwrap();
    assert_eq!(config.kubernetes.context.as_deref(), Some("aks-prod"));
    assert_eq!(config.kubernetes.engine_namespace, "workflows");
    // untouched sections keep their defaults
    assert_eq!(config.kubernetes.state_namespace, "kube-provisioner");
    assert!(config.strategy.use_composition);
    assert_eq!(config.store.backend, StoreBackend::Memory);

    let policy = config.observation_policy();
    assert_eq!(policy.poll_interval, Duration::from_millis(500));
    assert_eq!(policy.window, Duration::from_secs(60));
}

#[test]
fn test_dynamic_configs_override_file() {
    let file = temp_file(".toml", "[observation]\nwindow_secs = 60\n");
    let mut config = ProvisionerConfig::from_file(file.path()).unwrap();

    let dynamic = parse_dynamic_configs(&[
        "observation.window-secs=1800".to_string(),
        "kubernetes.state-namespace=platform".to_string(),
    ])
    .unwrap();
    apply_dynamic_configs(&dynamic, &mut config).unwrap();

    assert_eq!(config.observation.window_secs, 1800);
    assert_eq!(config.kubernetes.state_namespace, "platform");
}

#[test]
fn test_unknown_dynamic_key_is_rejected() {
    let mut config = ProvisionerConfig::default();
    let dynamic = parse_dynamic_configs(&["kubernetes.namespace=x".to_string()]).unwrap();
    assert!(apply_dynamic_configs(&dynamic, &mut config).is_err());
}

#[test]
fn test_malformed_config_file() {
    let file = temp_file(".toml", "[observation\nwindow_secs = ");
    assert!(ProvisionerConfig::from_file(file.path()).is_err());
    assert!(ProvisionerConfig::from_file("/nonexistent/provisioner.toml").is_err());
}

// ============================================================================
// Request files
// ============================================================================

#[test]
fn test_request_from_yaml() {
    let file = temp_file(
        ".yaml",
        r#"
kind: cluster
name: DataPlatform
node_pool_type: gpu-accelerated
enable_node_auto_provisioning: true
advanced:
  max_nodes: 4
  spot_instances: true
"#,
    );
    let request = ProvisioningRequest::from_file(file.path()).unwrap();
    assert_eq!(request.kind, SubjectKind::Cluster);
    assert_eq!(request.node_pool_type.as_deref(), Some("gpu-accelerated"));
    assert_eq!(request.advanced.max_nodes, Some(4));
    assert!(request.advanced.spot_instances);
    // omitted fields take defaults
    assert!(request.network_isolated);
    assert_eq!(request.resources.cpu.limit, "1");
}

#[test]
fn test_request_from_json_and_toml() {
    let json = temp_file(".json", r#"{ "name": "team-a", "dry_run": true }"#);
    let request = ProvisioningRequest::from_file(json.path()).unwrap();
    assert_eq!(request.kind, SubjectKind::Namespace);
    assert!(request.dry_run);

    let toml = temp_file(
        ".toml",
        "name = \"team-b\"\nnetwork_isolated = false\n\n[resources.cpu]\nrequest = \"250m\"\nlimit = \"500m\"\n\n[resources.memory]\nrequest = \"256Mi\"\nlimit = \"512Mi\"\n",
    );
    let request = ProvisioningRequest::from_file(toml.path()).unwrap();
    assert_eq!(request.name, "team-b");
    assert!(!request.network_isolated);
    assert_eq!(request.resources.cpu.request, "250m");
}
