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

use crate::infrastructure::constants::FIELD_MANAGER;
use crate::shared::error::{ProvisionError, Result};
use k8s_openapi::api::core::v1::{ConfigMap, Namespace};
use kube::api::{DynamicObject, ListParams, Patch, PatchParams, PostParams};
use kube::discovery::ApiResource;
use kube::{Api, Client};

/// The slice of the Kubernetes API the provisioner uses. Typed calls target
/// the configured namespace; dynamic calls name their namespace explicitly
/// (`None` for cluster-scoped kinds).
#[async_trait::async_trait]
pub trait ProvisionerKubeClient: Send + Sync {
    async fn get_namespace(&self, name: &str) -> Result<Option<Namespace>>;

    async fn get_object(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<Option<serde_json::Value>>;

    async fn create_object(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        document: &serde_json::Value,
    ) -> Result<()>;

    async fn merge_patch_object(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        name: &str,
        patch: &serde_json::Value,
    ) -> Result<()>;

    async fn apply_configmap(&self, configmap: &ConfigMap) -> Result<()>;

    async fn get_configmap(&self, name: &str) -> Result<Option<ConfigMap>>;

    async fn list_configmaps(&self, label_selector: &str) -> Result<Vec<ConfigMap>>;
}

pub fn api_resource(group: &str, version: &str, kind: &str, plural: &str) -> ApiResource {
    ApiResource {
        group: group.to_string(),
        version: version.to_string(),
        api_version: format!("{}/{}", group, version),
        kind: kind.to_string(),
        plural: plural.to_string(),
    }
}

pub struct ProvisionerKubeClientImpl {
    client: Client,
    namespace: String,
}

impl ProvisionerKubeClientImpl {
    pub async fn new(namespace: String) -> Result<Self> {
        let client = Client::try_default().await.map_err(|e| {
            ProvisionError::KubeClient(format!("Failed to create Kubernetes client: {}", e))
        })?;

        Ok(Self { client, namespace })
    }

    pub async fn new_with_config(
        namespace: String,
        kubeconfig_path: Option<String>,
        context: Option<String>,
    ) -> Result<Self> {
        use kube::config::{KubeConfigOptions, Kubeconfig};

        if kubeconfig_path.is_none() && context.is_none() {
            return Self::new(namespace).await;
        }

        let kubeconfig = if let Some(path) = kubeconfig_path {
            Kubeconfig::read_from(path).map_err(|e| {
                ProvisionError::KubeClient(format!("Failed to load kubeconfig: {}", e))
            })?
        } else {
            Kubeconfig::read().map_err(|e| {
                ProvisionError::KubeClient(format!("Failed to load kubeconfig: {}", e))
            })?
        };

        let config_options = KubeConfigOptions {
            context,
            cluster: None,
            user: None,
        };

        let config = kube::Config::from_custom_kubeconfig(kubeconfig, &config_options)
            .await
            .map_err(|e| {
                ProvisionError::KubeClient(format!("Failed to create Kubernetes config: {}", e))
            })?;

        let client = Client::try_from(config).map_err(|e| {
            ProvisionError::KubeClient(format!("Failed to create Kubernetes client: {}", e))
        })?;

        Ok(Self { client, namespace })
    }

    fn dynamic_api(&self, resource: &ApiResource, namespace: Option<&str>) -> Api<DynamicObject> {
        match namespace {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, resource),
            None => Api::all_with(self.client.clone(), resource),
        }
    }
}

#[async_trait::async_trait]
impl ProvisionerKubeClient for ProvisionerKubeClientImpl {
    async fn get_namespace(&self, name: &str) -> Result<Option<Namespace>> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        match api.get(name).await {
            Ok(ns) => Ok(Some(ns)),
            Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_object(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<Option<serde_json::Value>> {
        let api = self.dynamic_api(resource, namespace);
        match api.get(name).await {
            Ok(obj) => Ok(Some(serde_json::to_value(obj)?)),
            Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn create_object(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        document: &serde_json::Value,
    ) -> Result<()> {
        let api = self.dynamic_api(resource, namespace);
        let obj: DynamicObject = serde_json::from_value(document.clone())?;
        api.create(&PostParams::default(), &obj).await?;
        Ok(())
    }

    async fn merge_patch_object(
        &self,
        resource: &ApiResource,
        namespace: Option<&str>,
        name: &str,
        patch: &serde_json::Value,
    ) -> Result<()> {
        let api = self.dynamic_api(resource, namespace);
        api.patch(name, &PatchParams::default(), &Patch::Merge(patch))
            .await?;
        Ok(())
    }

    async fn apply_configmap(&self, configmap: &ConfigMap) -> Result<()> {
        let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), &self.namespace);
        let name = configmap
            .metadata
            .name
            .as_ref()
            .ok_or_else(|| ProvisionError::config_error("ConfigMap name is required"))?;

        match api.get(name).await {
            Ok(_) => {
                let patch_params = PatchParams::apply(FIELD_MANAGER).force();
                let patch = serde_json::to_value(configmap)?;
                api.patch(name, &patch_params, &Patch::Apply(patch)).await?;
            }
            Err(kube::Error::Api(ae)) if ae.code == 404 => {
                api.create(&PostParams::default(), configmap).await?;
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    async fn get_configmap(&self, name: &str) -> Result<Option<ConfigMap>> {
        let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), &self.namespace);
        match api.get(name).await {
            Ok(cm) => Ok(Some(cm)),
            Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_configmaps(&self, label_selector: &str) -> Result<Vec<ConfigMap>> {
        let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), &self.namespace);
        let list_params = ListParams::default().labels(label_selector);

        Ok(api.list(&list_params).await?.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_resource() {
        let ar = api_resource("argoproj.io", "v1alpha1", "Workflow", "workflows");
        assert_eq!(ar.api_version, "argoproj.io/v1alpha1");
        assert_eq!(ar.plural, "workflows");
    }
}
