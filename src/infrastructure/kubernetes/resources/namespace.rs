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
use crate::infrastructure::constants::LABEL_NETWORK_ISOLATED;
use crate::infrastructure::kubernetes::resources::managed_labels;
use crate::shared::error::Result;
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;

pub struct NamespaceBuilder {
    name: String,
    network_isolated: bool,
}

impl NamespaceBuilder {
    pub fn new(name: String, network_isolated: bool) -> Self {
        Self {
            name,
            network_isolated,
        }
    }

    pub fn build(&self) -> Result<Namespace> {
        let metadata = ObjectMeta {
            name: Some(self.name.clone()),
            labels: Some(self.get_labels()),
            ..Default::default()
        };

        Ok(Namespace {
            metadata,
            ..Default::default()
        })
    }

    fn get_labels(&self) -> BTreeMap<String, String> {
        let mut labels = managed_labels(&Subject::new(SubjectKind::Namespace, self.name.clone()));
        labels.insert(
            LABEL_NETWORK_ISOLATED.to_string(),
            self.network_isolated.to_string(),
        );
        labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::constants::{LABEL_MANAGED_BY, MANAGED_BY_VALUE};

    #[test]
    fn test_namespace_labels() {
        let ns = NamespaceBuilder::new("team-a".to_string(), false)
            .build()
            .unwrap();
        let labels = ns.metadata.labels.unwrap();
        assert_eq!(ns.metadata.name.as_deref(), Some("team-a"));
        assert_eq!(labels.get(LABEL_MANAGED_BY).unwrap(), MANAGED_BY_VALUE);
        assert_eq!(labels.get(LABEL_NETWORK_ISOLATED).unwrap(), "false");
    }
}
