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

#[cfg(test)]
mod tests {
    use kube_provisioner::domain::config::ProvisionerConfig;
    use kube_provisioner::domain::request::SubjectKind;
    use kube_provisioner::domain::workflow::ResourceInspector;
    use kube_provisioner::infrastructure::kubernetes::KubeResourceInspector;
    use kube_provisioner::infrastructure::runtime;
    use kube_provisioner::*;
    use std::sync::Arc;

    #[tokio::test]
    #[ignore] // Requires Kubernetes cluster
    async fn test_kube_system_exists() {
        let client = ProvisionerKubeClientImpl::new("default".to_string())
            .await
            .expect("Failed to create client");
        let inspector = KubeResourceInspector::new(Arc::new(client));

        assert!(inspector
            .exists(SubjectKind::Namespace, "kube-system")
            .await
            .unwrap());
    }

    #[tokio::test]
    #[ignore] // Requires Kubernetes cluster
    async fn test_missing_configmap_is_none() {
        let client = ProvisionerKubeClientImpl::new("default".to_string())
            .await
            .expect("Failed to create client");

        let result = client.get_configmap("workflow-does-not-exist").await;
        assert!(matches!(result, Ok(None)));
    }

    #[tokio::test]
    #[ignore] // Requires Kubernetes cluster with Argo Workflows installed
    async fn test_dry_run_against_live_store() {
        let config = ProvisionerConfig::default();
        let provisioner = runtime::connect(&config)
            .await
            .expect("Failed to connect");

        let request = ProvisioningRequest {
            name: "kube-provisioner-smoke".to_string(),
            dry_run: true,
            ..Default::default()
        };
        let id = provisioner.provision(&request).await.unwrap();
        let record = provisioner.orchestrator().wait(&id).await.unwrap();
        assert_eq!(record.status, WorkflowStatus::Succeeded);
    }
}
