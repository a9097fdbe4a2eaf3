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

//! Untyped cluster documents for the two backend strategies

pub mod composition;
pub mod direct;

pub use self::composition::ClusterClaimBuilder;
pub use self::direct::{ManagedClusterBuilder, NodeClassBuilder, NodePoolBuilder};

use crate::domain::request::{Subject, SubjectKind};
use crate::infrastructure::constants::{LABEL_CLUSTER, NETWORK_POLICY_ENGINE, NETWORK_POLICY_NONE};
use crate::infrastructure::kubernetes::resources::managed_labels;
use std::collections::BTreeMap;

pub(crate) fn cluster_labels(cluster_name: &str) -> BTreeMap<String, String> {
    let mut labels = managed_labels(&Subject::new(SubjectKind::Cluster, cluster_name));
    labels.insert(LABEL_CLUSTER.to_string(), cluster_name.to_string());
    labels
}

pub(crate) fn network_policy_engine(network_isolated: bool) -> &'static str {
    if network_isolated {
        NETWORK_POLICY_ENGINE
    } else {
        NETWORK_POLICY_NONE
    }
}

pub(crate) fn api_version(group: &str, version: &str) -> String {
    format!("{}/{}", group, version)
}
