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

use crate::domain::workflow::{WorkflowId, WorkflowRecord, WorkflowStatus, WorkflowStore};
use crate::infrastructure::constants::{LABEL_STATUS, LABEL_TYPE, LABEL_TYPE_VALUE};
use crate::infrastructure::kubernetes::client::ProvisionerKubeClient;
use crate::infrastructure::kubernetes::resources::configmap::{parse_record, RecordConfigMapBuilder};
use crate::shared::error::Result;
use std::sync::Arc;
use tracing::{debug, warn};

/// Workflow records persisted as one ConfigMap each in the state namespace,
/// so any process pointed at the same cluster sees the same history.
pub struct ConfigMapWorkflowStore {
    client: Arc<dyn ProvisionerKubeClient>,
    namespace: String,
}

impl ConfigMapWorkflowStore {
    pub fn new(client: Arc<dyn ProvisionerKubeClient>, namespace: String) -> Self {
        Self { client, namespace }
    }

    async fn list_selected(&self, selector: &str) -> Result<Vec<WorkflowRecord>> {
        let mut records = Vec::new();
        for configmap in self.client.list_configmaps(selector).await? {
            match parse_record(&configmap) {
                Ok(record) => records.push(record),
                Err(e) => warn!(
                    configmap = ?configmap.metadata.name,
                    error = %e,
                    "Skipping unreadable workflow record"
                ),
            }
        }
        records.sort_by_key(|r| r.created_at);
        Ok(records)
    }
}

#[async_trait::async_trait]
impl WorkflowStore for ConfigMapWorkflowStore {
    async fn get(&self, id: &WorkflowId) -> Result<Option<WorkflowRecord>> {
        match self
            .client
            .get_configmap(&RecordConfigMapBuilder::name(id))
            .await?
        {
            Some(configmap) => Ok(Some(parse_record(&configmap)?)),
            None => Ok(None),
        }
    }

    async fn list(&self) -> Result<Vec<WorkflowRecord>> {
        self.list_selected(&format!("{}={}", LABEL_TYPE, LABEL_TYPE_VALUE))
            .await
    }

    async fn list_by_status(&self, statuses: &[WorkflowStatus]) -> Result<Vec<WorkflowRecord>> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }
        let values: Vec<&str> = statuses.iter().map(|s| s.as_str()).collect();
        let selector = format!(
            "{}={},{} in ({})",
            LABEL_TYPE,
            LABEL_TYPE_VALUE,
            LABEL_STATUS,
            values.join(",")
        );
        self.list_selected(&selector).await
    }

    async fn upsert(&self, record: &WorkflowRecord) -> Result<()> {
        let configmap = RecordConfigMapBuilder::new(record, self.namespace.clone()).build()?;
        self.client.apply_configmap(&configmap).await?;
        debug!(workflow_id = %record.id, status = %record.status, "Stored workflow record");
        Ok(())
    }
}
