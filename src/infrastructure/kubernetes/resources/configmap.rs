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

use crate::domain::workflow::{WorkflowId, WorkflowRecord};
use crate::infrastructure::constants::{
    LABEL_STATUS, LABEL_TYPE, LABEL_TYPE_VALUE, LABEL_WORKFLOW_ID, STORE_CONFIGMAP_PREFIX,
    STORE_DATA_KEY,
};
use crate::infrastructure::kubernetes::resources::managed_labels;
use crate::shared::error::{ProvisionError, Result};
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;

/// Holds one workflow record as JSON. Labels mirror the fields the store
/// filters on.
pub struct RecordConfigMapBuilder<'a> {
    record: &'a WorkflowRecord,
    namespace: String,
}

impl<'a> RecordConfigMapBuilder<'a> {
    pub fn new(record: &'a WorkflowRecord, namespace: String) -> Self {
        Self { record, namespace }
    }

    pub fn name(id: &WorkflowId) -> String {
        format!("{}{}", STORE_CONFIGMAP_PREFIX, id)
    }

    pub fn build(&self) -> Result<ConfigMap> {
        let metadata = ObjectMeta {
            name: Some(Self::name(&self.record.id)),
            namespace: Some(self.namespace.clone()),
            labels: Some(self.get_labels()),
            ..Default::default()
        };

        let mut data = BTreeMap::new();
        data.insert(
            STORE_DATA_KEY.to_string(),
            serde_json::to_string(self.record)?,
        );

        Ok(ConfigMap {
            metadata,
            data: Some(data),
            ..Default::default()
        })
    }

    fn get_labels(&self) -> BTreeMap<String, String> {
        let mut labels = managed_labels(&self.record.subject);
        labels.insert(LABEL_TYPE.to_string(), LABEL_TYPE_VALUE.to_string());
        labels.insert(LABEL_STATUS.to_string(), self.record.status.to_string());
        labels.insert(LABEL_WORKFLOW_ID.to_string(), self.record.id.to_string());
        labels
    }
}

/// Decode the record a [`RecordConfigMapBuilder`] stored.
pub fn parse_record(configmap: &ConfigMap) -> Result<WorkflowRecord> {
    let name = configmap.metadata.name.clone().unwrap_or_default();
    let raw = configmap
        .data
        .as_ref()
        .and_then(|d| d.get(STORE_DATA_KEY))
        .ok_or_else(|| {
            ProvisionError::config_error(format!("ConfigMap {} has no {}", name, STORE_DATA_KEY))
        })?;
    Ok(serde_json::from_str(raw)?)
}
