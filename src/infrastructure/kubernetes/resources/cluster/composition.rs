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

use crate::domain::strategy::CompositionParameters;
use crate::infrastructure::constants::{
    CLUSTER_CLAIM_GROUP, CLUSTER_CLAIM_KIND, CLUSTER_CLAIM_VERSION, CLUSTER_NAMESPACE,
    CONNECTION_SECRET_SUFFIX, LABEL_PROVIDER, LABEL_STRATEGY, PROVIDER_VALUE,
};
use crate::infrastructure::kubernetes::resources::cluster::{
    api_version, cluster_labels, network_policy_engine,
};
use serde_json::{json, Value};

/// A single claim; the composition controller expands it into the managed
/// cluster and its pools.
pub struct ClusterClaimBuilder<'a> {
    params: &'a CompositionParameters,
}

impl<'a> ClusterClaimBuilder<'a> {
    pub fn new(params: &'a CompositionParameters) -> Self {
        Self { params }
    }

    pub fn connection_secret_name(cluster_name: &str) -> String {
        format!(
            "{}{}",
            cluster_name.to_ascii_lowercase(),
            CONNECTION_SECRET_SUFFIX
        )
    }

    pub fn build(&self) -> Value {
        let p = self.params;
        json!({
            "apiVersion": api_version(CLUSTER_CLAIM_GROUP, CLUSTER_CLAIM_VERSION),
            "kind": CLUSTER_CLAIM_KIND,
            "metadata": {
                "name": p.cluster_name,
                "namespace": CLUSTER_NAMESPACE,
                "labels": cluster_labels(&p.cluster_name),
            },
            "spec": {
                "compositionSelector": {
                    "matchLabels": {
                        LABEL_PROVIDER: PROVIDER_VALUE,
                        LABEL_STRATEGY: "composition",
                    }
                },
                "parameters": {
                    "location": p.location,
                    "kubernetesVersion": p.kubernetes_version,
                    "nodePoolType": p.pool_type,
                    "maxNodes": p.max_nodes,
                    "spotInstances": p.spot_instances,
                    "nodeAutoProvisioning": p.node_auto_provisioning,
                    "networkPolicy": network_policy_engine(p.network_isolated),
                },
                "writeConnectionSecretToRef": {
                    "name": Self::connection_secret_name(&p.cluster_name),
                    "namespace": CLUSTER_NAMESPACE,
                }
            }
        })
    }
}
