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

use crate::domain::config::settings::{ProvisionerConfig, StoreBackend};
use crate::shared::error::{ProvisionError, Result};
use std::collections::HashMap;
use std::str::FromStr;

/// Parse `-D key=value` arguments.
pub fn parse_dynamic_configs(configs: &[String]) -> Result<HashMap<String, String>> {
    let mut map = HashMap::new();

    for config in configs {
        let parts: Vec<&str> = config.splitn(2, '=').collect();
        if parts.len() != 2 {
            return Err(ProvisionError::config_error(format!(
                "Invalid config format: '{}'. Expected 'key=value'",
                config
            )));
        }

        let key = parts[0].trim();
        let value = parts[1].trim();

        if key.is_empty() {
            return Err(ProvisionError::config_error(format!(
                "Empty key in config: '{}'",
                config
            )));
        }

        map.insert(key.to_string(), value.to_string());
    }

    Ok(map)
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value.parse::<T>().map_err(|e| {
        ProvisionError::config_error(format!("Invalid value '{}' for {}: {}", value, key, e))
    })
}

/// Apply dynamic overrides on top of the file configuration. Unknown keys
/// are rejected so typos do not pass silently.
pub fn apply_dynamic_configs(
    configs: &HashMap<String, String>,
    conf: &mut ProvisionerConfig,
) -> Result<()> {
    for (key, value) in configs {
        match key.as_str() {
            "kubernetes.kubeconfig" => conf.kubernetes.kubeconfig = Some(value.clone()),
            "kubernetes.context" => conf.kubernetes.context = Some(value.clone()),
            "kubernetes.engine-namespace" => conf.kubernetes.engine_namespace = value.clone(),
            "kubernetes.state-namespace" => conf.kubernetes.state_namespace = value.clone(),
            "kubernetes.service-account" => conf.kubernetes.service_account = value.clone(),
            "observation.poll-interval-ms" => {
                conf.observation.poll_interval_ms = parse_value(key, value)?
            }
            "observation.window-secs" => conf.observation.window_secs = parse_value(key, value)?,
            "observation.retry-attempts" => {
                conf.observation.retry_attempts = parse_value(key, value)?
            }
            "observation.min-backoff-ms" => {
                conf.observation.min_backoff_ms = parse_value(key, value)?
            }
            "observation.max-backoff-ms" => {
                conf.observation.max_backoff_ms = parse_value(key, value)?
            }
            "strategy.use-composition" => {
                conf.strategy.use_composition = parse_value(key, value)?
            }
            "store.backend" => conf.store.backend = value.parse::<StoreBackend>()?,
            _ => {
                return Err(ProvisionError::config_error(format!(
                    "Unknown config key: {}",
                    key
                )))
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dynamic_configs() {
        let args = vec![
            "store.backend=memory".to_string(),
            "kubernetes.context = staging".to_string(),
        ];
        let map = parse_dynamic_configs(&args).unwrap();
        assert_eq!(map["kubernetes.context"], "staging");

        assert!(parse_dynamic_configs(&["novalue".to_string()]).is_err());
        assert!(parse_dynamic_configs(&["=x".to_string()]).is_err());
    }

    #[test]
    fn test_apply_overrides() {
        let mut conf = ProvisionerConfig::default();
        let map = parse_dynamic_configs(&[
            "strategy.use-composition=true".to_string(),
            "observation.window-secs=60".to_string(),
            "store.backend=memory".to_string(),
        ])
        .unwrap();
        apply_dynamic_configs(&map, &mut conf).unwrap();
        assert!(conf.strategy.use_composition);
        assert_eq!(conf.observation.window_secs, 60);
        assert_eq!(conf.store.backend, StoreBackend::Memory);
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut conf = ProvisionerConfig::default();
        let mut map = HashMap::new();
        map.insert("observation.window-secs".to_string(), "soon".to_string());
        assert!(apply_dynamic_configs(&map, &mut conf).is_err());

        let mut map = HashMap::new();
        map.insert("kubernetes.imaginary".to_string(), "x".to_string());
        assert!(apply_dynamic_configs(&map, &mut conf).is_err());
    }
}
