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

use crate::domain::request::{Subject, SubjectKind};
use crate::infrastructure::constants::{
    DNS_NAMESPACE, DNS_POD_LABEL_KEY, DNS_POD_LABEL_VALUE, DNS_PORT, LABEL_NAMESPACE_NAME,
    NETWORK_POLICY_NAME, POLICY_TYPE_EGRESS, POLICY_TYPE_INGRESS,
};
use crate::infrastructure::kubernetes::resources::managed_labels;
use crate::shared::error::Result;
use k8s_openapi::api::networking::v1::{
    NetworkPolicy, NetworkPolicyEgressRule, NetworkPolicyIngressRule, NetworkPolicyPeer,
    NetworkPolicyPort, NetworkPolicySpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use std::collections::BTreeMap;

/// Isolates a namespace: pods may only talk to pods in the same namespace,
/// plus DNS lookups against the cluster resolver.
pub struct NetworkPolicyBuilder {
    namespace: String,
}

impl NetworkPolicyBuilder {
    pub fn new(namespace: String) -> Self {
        Self { namespace }
    }

    pub fn build(&self) -> Result<NetworkPolicy> {
        let metadata = ObjectMeta {
            name: Some(NETWORK_POLICY_NAME.to_string()),
            namespace: Some(self.namespace.clone()),
            labels: Some(managed_labels(&Subject::new(
                SubjectKind::Namespace,
                self.namespace.clone(),
            ))),
            ..Default::default()
        };

        let spec = NetworkPolicySpec {
            // empty selector matches every pod in the namespace
            pod_selector: LabelSelector::default(),
            policy_types: Some(vec![
                POLICY_TYPE_INGRESS.to_string(),
                POLICY_TYPE_EGRESS.to_string(),
            ]),
            ingress: Some(vec![NetworkPolicyIngressRule {
                from: Some(vec![same_namespace_peer()]),
                ..Default::default()
            }]),
            egress: Some(vec![
                NetworkPolicyEgressRule {
                    to: Some(vec![same_namespace_peer()]),
                    ..Default::default()
                },
                self.build_dns_egress(),
            ]),
        };

        Ok(NetworkPolicy {
            metadata,
            spec: Some(spec),
            ..Default::default()
        })
    }

    fn build_dns_egress(&self) -> NetworkPolicyEgressRule {
        let peer = NetworkPolicyPeer {
            namespace_selector: Some(match_labels(LABEL_NAMESPACE_NAME, DNS_NAMESPACE)),
            pod_selector: Some(match_labels(DNS_POD_LABEL_KEY, DNS_POD_LABEL_VALUE)),
            ..Default::default()
        };

        let ports = ["UDP", "TCP"]
            .iter()
            .map(|protocol| NetworkPolicyPort {
                protocol: Some(protocol.to_string()),
                port: Some(IntOrString::Int(DNS_PORT)),
                ..Default::default()
            })
            .collect();

        NetworkPolicyEgressRule {
            to: Some(vec![peer]),
            ports: Some(ports),
        }
    }
}

fn same_namespace_peer() -> NetworkPolicyPeer {
    NetworkPolicyPeer {
        pod_selector: Some(LabelSelector::default()),
        ..Default::default()
    }
}

fn match_labels(key: &str, value: &str) -> LabelSelector {
    let mut labels = BTreeMap::new();
    labels.insert(key.to_string(), value.to_string());
    LabelSelector {
        match_labels: Some(labels),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_allows_only_namespace_and_dns() {
        let policy = NetworkPolicyBuilder::new("team-a".to_string())
            .build()
            .unwrap();
        assert_eq!(policy.metadata.namespace.as_deref(), Some("team-a"));

        let spec = policy.spec.unwrap();
        assert_eq!(spec.pod_selector, LabelSelector::default());
        assert_eq!(spec.ingress.as_ref().unwrap().len(), 1);

        let egress = spec.egress.unwrap();
        assert_eq!(egress.len(), 2);
        let dns = &egress[1];
        let peer = &dns.to.as_ref().unwrap()[0];
        let ns_labels = peer
            .namespace_selector
            .as_ref()
            .and_then(|s| s.match_labels.as_ref())
            .unwrap();
        assert_eq!(ns_labels[LABEL_NAMESPACE_NAME], "kube-system");

        let ports = dns.ports.as_ref().unwrap();
        assert_eq!(ports.len(), 2);
        assert!(ports
            .iter()
            .all(|p| p.port == Some(IntOrString::Int(53))));
    }
}
