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

use crate::domain::manifest::ManifestKey;
use crate::domain::manifest::ManifestSet;
use crate::domain::request::SubjectKind;
use crate::shared::error::{ProvisionError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// What a step does when it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "manifest", rename_all = "lowercase")]
pub enum StepAction {
    /// Wait for the engine to report the manifest applied
    Apply(ManifestKey),
    /// Ask the existence checker whether the subject exists
    Verify,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDefinition {
    pub name: String,
    pub action: StepAction,
    pub depends_on: Vec<String>,
}

impl StepDefinition {
    pub fn apply(key: ManifestKey, depends_on: Vec<String>) -> Self {
        Self {
            name: apply_step_name(key),
            action: StepAction::Apply(key),
            depends_on,
        }
    }
}

pub fn apply_step_name(key: ManifestKey) -> String {
    format!("apply-{}", key)
}

pub fn verify_step_name(kind: SubjectKind) -> String {
    format!("verify-{}", kind.as_str().to_ascii_lowercase())
}

/// Manifests each manifest waits for. Keys absent from a set are ignored.
fn declared_dependencies(key: ManifestKey) -> &'static [ManifestKey] {
    match key {
        ManifestKey::Namespace | ManifestKey::ManagedCluster => &[],
        ManifestKey::LimitRange | ManifestKey::NetworkPolicy => &[ManifestKey::Namespace],
        ManifestKey::NodeClass => &[ManifestKey::ManagedCluster],
        ManifestKey::NodePool => &[ManifestKey::ManagedCluster, ManifestKey::NodeClass],
    }
}

/// Ordered step definitions. Every dependency names an earlier step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepPlan {
    steps: Vec<StepDefinition>,
}

impl StepPlan {
    pub fn new(steps: Vec<StepDefinition>) -> Result<Self> {
        let mut seen: HashSet<&str> = HashSet::new();
        for step in &steps {
            for dependency in &step.depends_on {
                if !seen.contains(dependency.as_str()) {
                    return Err(ProvisionError::config_error(format!(
                        "step '{}' depends on '{}', which is not declared before it",
                        step.name, dependency
                    )));
                }
            }
            if !seen.insert(step.name.as_str()) {
                return Err(ProvisionError::config_error(format!(
                    "step '{}' is declared twice",
                    step.name
                )));
            }
        }
        Ok(Self { steps })
    }

    /// One apply step per manifest in set order, then a verify step that
    /// depends on all of them.
    pub fn for_manifests(manifests: &ManifestSet) -> Result<Self> {
        let present = manifests.keys();
        let mut steps = Vec::with_capacity(present.len() + 1);

        for key in &present {
            let depends_on = declared_dependencies(*key)
                .iter()
                .filter(|dep| present.contains(*dep))
                .map(|dep| apply_step_name(*dep))
                .collect();
            steps.push(StepDefinition::apply(*key, depends_on));
        }

        let apply_names = steps.iter().map(|s| s.name.clone()).collect();
        steps.push(StepDefinition {
            name: verify_step_name(manifests.subject().kind),
            action: StepAction::Verify,
            depends_on: apply_names,
        });

        Self::new(steps)
    }

    pub fn steps(&self) -> &[StepDefinition] {
        &self.steps
    }

    pub fn into_steps(self) -> Vec<StepDefinition> {
        self.steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::manifest::generate_namespace_manifests;
    use crate::domain::request::{validate_request, ProvisioningRequest};

    #[test]
    fn test_plan_for_namespace() {
        let validated = validate_request(&ProvisioningRequest {
            name: "team-a".to_string(),
            ..Default::default()
        })
        .unwrap();
        let set = generate_namespace_manifests(&validated).unwrap();
        let plan = StepPlan::for_manifests(&set).unwrap();
        let names: Vec<_> = plan.steps().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "apply-namespace",
                "apply-limit-range",
                "apply-network-policy",
                "verify-namespace"
            ]
        );
        assert_eq!(plan.steps()[1].depends_on, vec!["apply-namespace"]);
        assert_eq!(plan.steps()[3].depends_on.len(), 3);
    }

    #[test]
    fn test_forward_dependency_is_rejected() {
        let steps = vec![
            StepDefinition {
                name: "b".to_string(),
                action: StepAction::Verify,
                depends_on: vec!["a".to_string()],
            },
            StepDefinition {
                name: "a".to_string(),
                action: StepAction::Verify,
                depends_on: vec![],
            },
        ];
        assert!(StepPlan::new(steps).is_err());
    }
}
