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

//! Provisioning requests as submitted by operators

pub mod quantity;
pub mod validator;

use crate::shared::error::{ProvisionError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

pub use self::quantity::{compare_limits, Dimension, QuantityUnit, ResourceQuantity};
pub use self::validator::{
    validate_cluster_name, validate_namespace_name, validate_request, LimitPair, ResourceLimits,
    ValidatedRequest,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectKind {
    Namespace,
    Cluster,
}

impl SubjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectKind::Namespace => "Namespace",
            SubjectKind::Cluster => "Cluster",
        }
    }
}

impl fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SubjectKind {
    type Err = ProvisionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "namespace" => Ok(SubjectKind::Namespace),
            "cluster" => Ok(SubjectKind::Cluster),
            _ => Err(ProvisionError::invalid_field(
                "kind",
                format!("unknown subject kind '{}'", s),
            )),
        }
    }
}

/// The resource a workflow provisions. At most one live workflow may own a
/// subject at any time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subject {
    pub kind: SubjectKind,
    pub name: String,
}

impl Subject {
    pub fn new(kind: SubjectKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantityPair {
    pub request: String,
    pub limit: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSpec {
    pub cpu: QuantityPair,
    pub memory: QuantityPair,
}

impl Default for ResourceSpec {
    fn default() -> Self {
        Self {
            cpu: QuantityPair {
                request: "500m".to_string(),
                limit: "1".to_string(),
            },
            memory: QuantityPair {
                request: "512Mi".to_string(),
                limit: "1Gi".to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvancedOptions {
    /// Kubernetes version pin, e.g. "1.30" or "1.30.4"
    pub kubernetes_version: Option<String>,
    pub max_nodes: Option<u32>,
    pub spot_instances: bool,
}

/// Operator input. Shape and types are assumed checked by whoever built the
/// value; domain invariants are checked by [`validate_request`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisioningRequest {
    pub kind: SubjectKind,
    pub name: String,
    pub resources: ResourceSpec,
    pub network_isolated: bool,
    pub dry_run: bool,
    pub enable_node_auto_provisioning: bool,
    pub advanced: AdvancedOptions,
    pub node_pool_type: Option<String>,
    pub location: Option<String>,
}

impl Default for ProvisioningRequest {
    fn default() -> Self {
        Self {
            kind: SubjectKind::Namespace,
            name: String::new(),
            resources: ResourceSpec::default(),
            network_isolated: true,
            dry_run: false,
            enable_node_auto_provisioning: false,
            advanced: AdvancedOptions::default(),
            node_pool_type: None,
            location: None,
        }
    }
}

impl ProvisioningRequest {
    pub fn subject(&self) -> Subject {
        Subject::new(self.kind, self.name.clone())
    }

    /// Load a request from a YAML, JSON or TOML file, chosen by extension.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        let request = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content)?,
            Some("toml") => toml::from_str(&content)?,
            _ => serde_yaml::from_str(&content)?,
        };
        Ok(request)
    }
}
