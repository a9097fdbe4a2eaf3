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

use crate::domain::workflow::ObservationPolicy;
use crate::infrastructure::constants::*;
use crate::shared::error::{ProvisionError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::read_to_string;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

// ============================================================================
// Provisioner configuration
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionerConfig {
    pub kubernetes: KubernetesConf,
    pub observation: ObservationConf,
    pub strategy: StrategyConf,
    pub store: StoreConf,
}

impl ProvisionerConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = read_to_string(path).map_err(|e| {
            ProvisionError::config_error(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// `path`, else the file named by `KUBE_PROVISIONER_CONFIG`, else defaults.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let env_path = std::env::var(ENV_CONFIG_PATH).ok();
        match path.or(env_path.as_deref()) {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn observation_policy(&self) -> ObservationPolicy {
        let o = &self.observation;
        ObservationPolicy {
            poll_interval: Duration::from_millis(o.poll_interval_ms),
            window: Duration::from_secs(o.window_secs),
            retry_attempts: o.retry_attempts,
            min_delay: Duration::from_millis(o.min_backoff_ms),
            max_delay: Duration::from_millis(o.max_backoff_ms),
        }
    }
}

// ============================================================================
// Sections
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KubernetesConf {
    /// Path to a kubeconfig; in-cluster or default discovery when unset
    pub kubeconfig: Option<String>,
    pub context: Option<String>,
    /// Namespace engine workflows are submitted to
    pub engine_namespace: String,
    /// Namespace holding workflow records
    pub state_namespace: String,
    /// Service account the engine runs steps as
    pub service_account: String,
}

impl Default for KubernetesConf {
    fn default() -> Self {
        Self {
            kubeconfig: None,
            context: None,
            engine_namespace: DEFAULT_ENGINE_NAMESPACE.to_string(),
            state_namespace: DEFAULT_STATE_NAMESPACE.to_string(),
            service_account: DEFAULT_SERVICE_ACCOUNT.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservationConf {
    pub poll_interval_ms: u64,
    pub window_secs: u64,
    pub retry_attempts: usize,
    pub min_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for ObservationConf {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            window_secs: DEFAULT_OBSERVATION_WINDOW_SECS,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            min_backoff_ms: DEFAULT_RETRY_MIN_DELAY_MS,
            max_backoff_ms: DEFAULT_RETRY_MAX_DELAY_MS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConf {
    pub use_composition: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    #[default]
    ConfigMap,
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreBackend::Memory => write!(f, "memory"),
            StoreBackend::ConfigMap => write!(f, "configmap"),
        }
    }
}

impl FromStr for StoreBackend {
    type Err = ProvisionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "configmap" => Ok(StoreBackend::ConfigMap),
            _ => Err(ProvisionError::config_error(format!(
                "Invalid store backend: {}. Valid values: memory, configmap",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConf {
    pub backend: StoreBackend,
}
