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

use crate::domain::request::{ResourceLimits, ResourceQuantity, Subject, SubjectKind};
use crate::infrastructure::constants::{
    LIMIT_MAX_FACTOR, LIMIT_RANGE_NAME, LIMIT_RANGE_TYPE_CONTAINER,
};
use crate::infrastructure::kubernetes::resources::managed_labels;
use crate::shared::error::Result;
use k8s_openapi::api::core::v1::{LimitRange, LimitRangeItem, LimitRangeSpec};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;

/// Per-container defaults for a namespace. Containers without explicit
/// resources get the configured request and limit; nothing may exceed twice
/// the configured limit.
pub struct LimitRangeBuilder {
    namespace: String,
    limits: ResourceLimits,
}

impl LimitRangeBuilder {
    pub fn new(namespace: String, limits: ResourceLimits) -> Self {
        Self { namespace, limits }
    }

    pub fn build(&self) -> Result<LimitRange> {
        let metadata = ObjectMeta {
            name: Some(LIMIT_RANGE_NAME.to_string()),
            namespace: Some(self.namespace.clone()),
            labels: Some(managed_labels(&Subject::new(
                SubjectKind::Namespace,
                self.namespace.clone(),
            ))),
            ..Default::default()
        };

        let cpu = &self.limits.cpu;
        let memory = &self.limits.memory;

        let item = LimitRangeItem {
            type_: LIMIT_RANGE_TYPE_CONTAINER.to_string(),
            default: Some(quantities(&cpu.limit, &memory.limit)),
            default_request: Some(quantities(&cpu.request, &memory.request)),
            max: Some(quantities(
                &cpu.limit.scaled(LIMIT_MAX_FACTOR),
                &memory.limit.scaled(LIMIT_MAX_FACTOR),
            )),
            ..Default::default()
        };

        Ok(LimitRange {
            metadata,
            spec: Some(LimitRangeSpec { limits: vec![item] }),
        })
    }
}

fn quantities(cpu: &ResourceQuantity, memory: &ResourceQuantity) -> BTreeMap<String, Quantity> {
    let mut map = BTreeMap::new();
    map.insert("cpu".to_string(), Quantity(cpu.to_string()));
    map.insert("memory".to_string(), Quantity(memory.to_string()));
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::request::{validate_request, ProvisioningRequest, QuantityPair};

    fn limits(cpu_limit: &str, memory_limit: &str) -> ResourceLimits {
        let mut request = ProvisioningRequest {
            name: "team-a".to_string(),
            ..Default::default()
        };
        request.resources.cpu = QuantityPair {
            request: "250m".to_string(),
            limit: cpu_limit.to_string(),
        };
        request.resources.memory = QuantityPair {
            request: "256Mi".to_string(),
            limit: memory_limit.to_string(),
        };
        validate_request(&request).unwrap().limits
    }

    #[test]
    fn test_max_is_twice_the_limit() {
        let range = LimitRangeBuilder::new("team-a".to_string(), limits("1000m", "1Gi"))
            .build()
            .unwrap();
        let item = &range.spec.unwrap().limits[0];
        let max = item.max.as_ref().unwrap();
        assert_eq!(max["cpu"].0, "2000m");
        assert_eq!(max["memory"].0, "2Gi");
        let default = item.default.as_ref().unwrap();
        assert_eq!(default["cpu"].0, "1000m");
        assert_eq!(item.default_request.as_ref().unwrap()["memory"].0, "256Mi");
        assert_eq!(item.type_, "Container");
    }
}
