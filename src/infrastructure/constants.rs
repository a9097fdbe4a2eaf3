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

/// Resource labels
pub const LABEL_MANAGED_BY: &str = "app.kubernetes.io/managed-by";
pub const MANAGED_BY_VALUE: &str = "kube-provisioner";
pub const LABEL_SUBJECT_KIND: &str = "kube-provisioner.io/subject-kind";
pub const LABEL_SUBJECT_NAME: &str = "kube-provisioner.io/subject-name";
pub const LABEL_CLUSTER: &str = "kube-provisioner.io/cluster";
pub const LABEL_POOL_TYPE: &str = "kube-provisioner.io/pool-type";
pub const LABEL_NETWORK_ISOLATED: &str = "kube-provisioner.io/network-isolated";
pub const LABEL_STRATEGY: &str = "kube-provisioner.io/strategy";
pub const LABEL_PROVIDER: &str = "kube-provisioner.io/provider";
pub const PROVIDER_VALUE: &str = "azure";

/// Field manager for server-side apply
pub const FIELD_MANAGER: &str = "kube-provisioner";

/// Namespace policy
pub const LIMIT_RANGE_NAME: &str = "default-limits";
pub const LIMIT_RANGE_TYPE_CONTAINER: &str = "Container";
pub const LIMIT_MAX_FACTOR: u32 = 2;
pub const NETWORK_POLICY_NAME: &str = "namespace-isolation";
pub const POLICY_TYPE_INGRESS: &str = "Ingress";
pub const POLICY_TYPE_EGRESS: &str = "Egress";
pub const LABEL_NAMESPACE_NAME: &str = "kubernetes.io/metadata.name";

/// Cluster DNS
pub const DNS_NAMESPACE: &str = "kube-system";
pub const DNS_POD_LABEL_KEY: &str = "k8s-app";
pub const DNS_POD_LABEL_VALUE: &str = "kube-dns";
pub const DNS_PORT: i32 = 53;

/// Managed cluster resources (direct strategy)
pub const CLUSTER_NAMESPACE: &str = "clusters";
pub const MANAGED_CLUSTER_GROUP: &str = "containerservice.azure.com";
pub const MANAGED_CLUSTER_VERSION: &str = "v1api20240901";
pub const MANAGED_CLUSTER_KIND: &str = "ManagedCluster";
pub const MANAGED_CLUSTER_PLURAL: &str = "managedclusters";
pub const NODE_CLASS_GROUP: &str = "karpenter.azure.com";
pub const NODE_CLASS_VERSION: &str = "v1beta1";
pub const NODE_CLASS_KIND: &str = "AKSNodeClass";
pub const NODE_POOL_GROUP: &str = "karpenter.sh";
pub const NODE_POOL_VERSION: &str = "v1";
pub const NODE_POOL_KIND: &str = "NodePool";
pub const SYSTEM_POOL_NAME: &str = "system";
pub const SYSTEM_POOL_VM_SIZE: &str = "Standard_D2s_v5";
pub const SYSTEM_POOL_COUNT: u32 = 3;
pub const WORKLOAD_POOL_NAME: &str = "workload";
pub const NODE_IMAGE_FAMILY: &str = "AzureLinux";
pub const NODE_OS_DISK_GB: u32 = 128;

/// Cluster claims (composition strategy)
pub const CLUSTER_CLAIM_GROUP: &str = "platform.kube-provisioner.io";
pub const CLUSTER_CLAIM_VERSION: &str = "v1alpha1";
pub const CLUSTER_CLAIM_KIND: &str = "ClusterClaim";
pub const CLUSTER_CLAIM_PLURAL: &str = "clusterclaims";
pub const CONNECTION_SECRET_SUFFIX: &str = "-kubeconfig";

/// Cluster defaults shared by both strategies
pub const DEFAULT_KUBERNETES_VERSION: &str = "1.30";
pub const DEFAULT_MAX_NODES: u32 = 10;
pub const NETWORK_POLICY_ENGINE: &str = "calico";
pub const NETWORK_POLICY_NONE: &str = "none";

/// Workflow engine
pub const ARGO_GROUP: &str = "argoproj.io";
pub const ARGO_VERSION: &str = "v1alpha1";
pub const ARGO_WORKFLOW_KIND: &str = "Workflow";
pub const ARGO_WORKFLOW_PLURAL: &str = "workflows";
pub const ARGO_ENTRYPOINT: &str = "provision";
pub const ARGO_SHUTDOWN_TERMINATE: &str = "Terminate";
pub const LABEL_WORKFLOW_ID: &str = "kube-provisioner.io/workflow-id";

/// Workflow store
pub const LABEL_TYPE: &str = "type";
pub const LABEL_TYPE_VALUE: &str = "kube-provisioner-workflow";
pub const LABEL_STATUS: &str = "kube-provisioner.io/status";
pub const STORE_CONFIGMAP_PREFIX: &str = "workflow-";
pub const STORE_DATA_KEY: &str = "record.json";

/// Default namespaces and identities
pub const DEFAULT_ENGINE_NAMESPACE: &str = "argo";
pub const DEFAULT_STATE_NAMESPACE: &str = "kube-provisioner";
pub const DEFAULT_SERVICE_ACCOUNT: &str = "kube-provisioner";

/// Observation defaults
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;
pub const DEFAULT_OBSERVATION_WINDOW_SECS: u64 = 900;
pub const DEFAULT_RETRY_ATTEMPTS: usize = 5;
pub const DEFAULT_RETRY_MIN_DELAY_MS: u64 = 200;
pub const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 10_000;

/// Environment variables
pub const ENV_CONFIG_PATH: &str = "KUBE_PROVISIONER_CONFIG";
pub const ENV_USE_COMPOSITION: &str = "KUBE_PROVISIONER_USE_COMPOSITION";

/// Step log excerpts are truncated to this many bytes
pub const STEP_LOG_LIMIT: usize = 4096;
