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

use crate::shared::error::{ProvisionError, Result};
use serde::Serialize;

/// One selectable class of worker nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodePoolConfiguration {
    pub name: &'static str,
    pub description: &'static str,
    /// Two representative VM sizes, smallest first
    pub instance_sizes: [&'static str; 2],
    /// SKU family used for node auto-provisioning requirements
    pub instance_family: &'static str,
    /// Pool-wide CPU ceiling
    pub max_cpu: &'static str,
    /// Pool-wide memory ceiling
    pub max_memory: &'static str,
    pub workloads: &'static [&'static str],
}

const NODE_POOLS: &[NodePoolConfiguration] = &[
    NodePoolConfiguration {
        name: "general-purpose",
        description: "Balanced CPU-to-memory ratio for most workloads",
        instance_sizes: ["Standard_D4s_v5", "Standard_D8s_v5"],
        instance_family: "D",
        max_cpu: "64",
        max_memory: "256Gi",
        workloads: &["web services", "APIs", "small databases"],
    },
    NodePoolConfiguration {
        name: "compute-optimized",
        description: "High CPU-to-memory ratio for compute-bound work",
        instance_sizes: ["Standard_F8s_v2", "Standard_F16s_v2"],
        instance_family: "F",
        max_cpu: "128",
        max_memory: "256Gi",
        workloads: &["batch processing", "CI runners", "game servers"],
    },
    NodePoolConfiguration {
        name: "memory-optimized",
        description: "High memory-to-CPU ratio for in-memory data",
        instance_sizes: ["Standard_E8s_v5", "Standard_E16s_v5"],
        instance_family: "E",
        max_cpu: "64",
        max_memory: "512Gi",
        workloads: &["caches", "analytics", "large databases"],
    },
    NodePoolConfiguration {
        name: "gpu-accelerated",
        description: "NVIDIA GPU nodes for training and inference",
        instance_sizes: ["Standard_NC6s_v3", "Standard_NC12s_v3"],
        instance_family: "NC",
        max_cpu: "48",
        max_memory: "448Gi",
        workloads: &["model training", "inference", "rendering"],
    },
];

pub fn list_pool_types() -> &'static [NodePoolConfiguration] {
    NODE_POOLS
}

pub fn describe(pool_type: &str) -> Result<&'static NodePoolConfiguration> {
    NODE_POOLS
        .iter()
        .find(|pool| pool.name == pool_type)
        .ok_or_else(|| ProvisionError::UnknownPoolType {
            pool_type: pool_type.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::request::{Dimension, ResourceQuantity};

    #[test]
    fn test_order_is_stable() {
        let first: Vec<_> = list_pool_types().iter().map(|p| p.name).collect();
        let second: Vec<_> = list_pool_types().iter().map(|p| p.name).collect();
        assert_eq!(first, second);
        assert_eq!(first[0], "general-purpose");
    }

    #[test]
    fn test_describe() {
        assert_eq!(describe("memory-optimized").unwrap().instance_family, "E");
        assert!(describe("nonexistent").is_err());
    }

    #[test]
    fn test_ceilings_parse() {
        for pool in list_pool_types() {
            ResourceQuantity::parse(Dimension::Cpu, "max_cpu", pool.max_cpu).unwrap();
            ResourceQuantity::parse(Dimension::Memory, "max_memory", pool.max_memory).unwrap();
        }
    }
}
