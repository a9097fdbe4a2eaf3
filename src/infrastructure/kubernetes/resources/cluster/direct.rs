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

use crate::domain::strategy::DirectParameters;
use crate::infrastructure::constants::*;
use crate::infrastructure::kubernetes::resources::cluster::{
    api_version, cluster_labels, network_policy_engine,
};
use serde_json::{json, Value};

/// The managed cluster itself, with a system pool and, when node
/// auto-provisioning is off, a fixed autoscaling workload pool.
pub struct ManagedClusterBuilder<'a> {
    params: &'a DirectParameters,
}

impl<'a> ManagedClusterBuilder<'a> {
    pub fn new(params: &'a DirectParameters) -> Self {
        Self { params }
    }

    pub fn build(&self) -> Value {
        let p = self.params;

        let mut agent_pools = vec![json!({
            "name": SYSTEM_POOL_NAME,
            "mode": "System",
            "vmSize": SYSTEM_POOL_VM_SIZE,
            "count": SYSTEM_POOL_COUNT,
            "osType": "Linux",
        })];
        if !p.node_auto_provisioning {
            agent_pools.push(self.build_workload_pool());
        }

        let mode = if p.node_auto_provisioning {
            "Auto"
        } else {
            "Manual"
        };

        json!({
            "apiVersion": api_version(MANAGED_CLUSTER_GROUP, MANAGED_CLUSTER_VERSION),
            "kind": MANAGED_CLUSTER_KIND,
            "metadata": {
                "name": p.cluster_name,
                "namespace": CLUSTER_NAMESPACE,
                "labels": cluster_labels(&p.cluster_name),
            },
            "spec": {
                "location": p.location,
                "kubernetesVersion": p.kubernetes_version,
                "dnsPrefix": p.cluster_name.to_ascii_lowercase(),
                "identity": { "type": "SystemAssigned" },
                "networkProfile": {
                    "networkPlugin": "azure",
                    "networkPluginMode": "overlay",
                    "networkPolicy": network_policy_engine(p.network_isolated),
                },
                "nodeProvisioningProfile": { "mode": mode },
                "agentPoolProfiles": agent_pools,
            }
        })
    }

    fn build_workload_pool(&self) -> Value {
        let p = self.params;
        let priority = if p.spot_instances { "Spot" } else { "Regular" };
        let mut pool = json!({
            "name": WORKLOAD_POOL_NAME,
            "mode": "User",
            "vmSize": p.instance_sizes.first().cloned().unwrap_or_default(),
            "osType": "Linux",
            "enableAutoScaling": true,
            "minCount": 1,
            "maxCount": p.max_nodes,
            "scaleSetPriority": priority,
            "nodeLabels": { LABEL_POOL_TYPE: p.pool_type },
        });
        if p.spot_instances {
            pool["scaleSetEvictionPolicy"] = json!("Delete");
        }
        pool
    }
}

/// Node class for auto-provisioned nodes. Cluster-scoped, named after the
/// cluster and pool type.
pub struct NodeClassBuilder<'a> {
    params: &'a DirectParameters,
}

impl<'a> NodeClassBuilder<'a> {
    pub fn new(params: &'a DirectParameters) -> Self {
        Self { params }
    }

    pub fn name(params: &DirectParameters) -> String {
        format!("{}-{}", params.cluster_name.to_ascii_lowercase(), params.pool_type)
    }

    pub fn build(&self) -> Value {
        let p = self.params;
        json!({
            "apiVersion": api_version(NODE_CLASS_GROUP, NODE_CLASS_VERSION),
            "kind": NODE_CLASS_KIND,
            "metadata": {
                "name": Self::name(p),
                "labels": cluster_labels(&p.cluster_name),
            },
            "spec": {
                "imageFamily": NODE_IMAGE_FAMILY,
                "osDiskSizeGB": NODE_OS_DISK_GB,
                "tags": {
                    "cluster": p.cluster_name,
                    "pool-type": p.pool_type,
                }
            }
        })
    }
}

/// Auto-provisioned node pool bounded by the catalog ceilings.
pub struct NodePoolBuilder<'a> {
    params: &'a DirectParameters,
}

impl<'a> NodePoolBuilder<'a> {
    pub fn new(params: &'a DirectParameters) -> Self {
        Self { params }
    }

    pub fn build(&self) -> Value {
        let p = self.params;
        let capacity_types: Vec<&str> = if p.spot_instances {
            vec!["spot", "on-demand"]
        } else {
            vec!["on-demand"]
        };

        json!({
            "apiVersion": api_version(NODE_POOL_GROUP, NODE_POOL_VERSION),
            "kind": NODE_POOL_KIND,
            "metadata": {
                "name": NodeClassBuilder::name(p),
                "labels": cluster_labels(&p.cluster_name),
            },
            "spec": {
                "template": {
                    "metadata": {
                        "labels": { LABEL_POOL_TYPE: p.pool_type }
                    },
                    "spec": {
                        "nodeClassRef": {
                            "group": NODE_CLASS_GROUP,
                            "kind": NODE_CLASS_KIND,
                            "name": NodeClassBuilder::name(p),
                        },
                        "requirements": [
                            {
                                "key": "karpenter.azure.com/sku-family",
                                "operator": "In",
                                "values": [p.instance_family],
                            },
                            {
                                "key": "karpenter.sh/capacity-type",
                                "operator": "In",
                                "values": capacity_types,
                            }
                        ]
                    }
                },
                "limits": {
                    "cpu": p.max_cpu,
                    "memory": p.max_memory,
                    "nodes": p.max_nodes.to_string(),
                },
                "disruption": {
                    "consolidationPolicy": "WhenEmptyOrUnderutilized",
                    "consolidateAfter": "1m",
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(nap: bool) -> DirectParameters {
        DirectParameters {
            cluster_name: "Prod-01".to_string(),
            location: "eastus".to_string(),
            kubernetes_version: "1.30".to_string(),
            pool_type: "general-purpose".to_string(),
            instance_sizes: vec!["Standard_D4s_v5".to_string(), "Standard_D8s_v5".to_string()],
            instance_family: "D".to_string(),
            max_cpu: "64".to_string(),
            max_memory: "256Gi".to_string(),
            max_nodes: 5,
            spot_instances: true,
            node_auto_provisioning: nap,
            network_isolated: true,
        }
    }

    #[test]
    fn test_workload_pool_only_without_nap() {
        let manual = ManagedClusterBuilder::new(&params(false)).build();
        let pools = manual["spec"]["agentPoolProfiles"].as_array().unwrap();
        assert_eq!(pools.len(), 2);
        assert_eq!(pools[1]["maxCount"], 5);
        assert_eq!(pools[1]["scaleSetPriority"], "Spot");

        let auto = ManagedClusterBuilder::new(&params(true)).build();
        assert_eq!(auto["spec"]["agentPoolProfiles"].as_array().unwrap().len(), 1);
        assert_eq!(auto["spec"]["nodeProvisioningProfile"]["mode"], "Auto");
    }

    #[test]
    fn test_node_pool_references_node_class() {
        let p = params(true);
        let class = NodeClassBuilder::new(&p).build();
        let pool = NodePoolBuilder::new(&p).build();
        assert_eq!(class["metadata"]["name"], "prod-01-general-purpose");
        assert_eq!(
            pool["spec"]["template"]["spec"]["nodeClassRef"]["name"],
            class["metadata"]["name"]
        );
        assert_eq!(pool["spec"]["limits"]["cpu"], "64");
    }
}
