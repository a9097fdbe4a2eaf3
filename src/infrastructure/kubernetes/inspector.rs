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

use crate::domain::request::SubjectKind;
use crate::domain::workflow::ResourceInspector;
use crate::infrastructure::constants::{
    CLUSTER_CLAIM_GROUP, CLUSTER_CLAIM_KIND, CLUSTER_CLAIM_PLURAL, CLUSTER_CLAIM_VERSION,
    CLUSTER_NAMESPACE, MANAGED_CLUSTER_GROUP, MANAGED_CLUSTER_KIND, MANAGED_CLUSTER_PLURAL,
    MANAGED_CLUSTER_VERSION,
};
use crate::infrastructure::kubernetes::client::{api_resource, ProvisionerKubeClient};
use crate::shared::error::Result;
use std::sync::Arc;
use tracing::debug;

/// Existence checks against the live API server. A cluster exists when
/// either its managed cluster or its claim does, whichever strategy made it.
pub struct KubeResourceInspector {
    client: Arc<dyn ProvisionerKubeClient>,
}

impl KubeResourceInspector {
    pub fn new(client: Arc<dyn ProvisionerKubeClient>) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl ResourceInspector for KubeResourceInspector {
    async fn exists(&self, kind: SubjectKind, name: &str) -> Result<bool> {
        let found = match kind {
            SubjectKind::Namespace => self.client.get_namespace(name).await?.is_some(),
            SubjectKind::Cluster => {
                let resources = [
                    api_resource(
                        MANAGED_CLUSTER_GROUP,
                        MANAGED_CLUSTER_VERSION,
                        MANAGED_CLUSTER_KIND,
                        MANAGED_CLUSTER_PLURAL,
                    ),
                    api_resource(
                        CLUSTER_CLAIM_GROUP,
                        CLUSTER_CLAIM_VERSION,
                        CLUSTER_CLAIM_KIND,
                        CLUSTER_CLAIM_PLURAL,
                    ),
                ];
                let mut found = false;
                for resource in &resources {
                    if self
                        .client
                        .get_object(resource, Some(CLUSTER_NAMESPACE), name)
                        .await?
                        .is_some()
                    {
                        found = true;
                        break;
                    }
                }
                found
            }
        };

        debug!(kind = %kind, name = %name, exists = found, "Existence check");
        Ok(found)
    }
}
