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

//! Boundary traits between the orchestrator and the outside world

use crate::domain::manifest::Manifest;
use crate::domain::request::{Subject, SubjectKind};
use crate::domain::workflow::record::{EngineJobId, WorkflowId};
use crate::shared::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineStep {
    pub name: String,
    pub manifest: Manifest,
}

/// Everything the engine needs to run one workflow's apply steps, in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSubmission {
    pub workflow_id: WorkflowId,
    pub subject: Subject,
    pub steps: Vec<EngineStep>,
}

/// Engine phase folded onto the three states the orchestrator acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservedPhase {
    Running,
    Succeeded,
    Failed,
}

/// Map a raw engine phase. Unknown phases count as Running until the engine
/// says the job finished.
pub fn map_phase(phase: &str, finished: bool) -> ObservedPhase {
    match phase {
        "Pending" | "Running" => ObservedPhase::Running,
        "Succeeded" => ObservedPhase::Succeeded,
        "Failed" | "Error" => ObservedPhase::Failed,
        _ if finished => ObservedPhase::Failed,
        _ => ObservedPhase::Running,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineObservation {
    pub phase: String,
    pub finished: bool,
    /// Raw phase per step name
    pub steps: BTreeMap<String, String>,
    /// Log excerpt per step name
    pub logs: BTreeMap<String, String>,
    pub message: Option<String>,
}

impl EngineObservation {
    pub fn overall(&self) -> ObservedPhase {
        map_phase(&self.phase, self.finished)
    }

    /// Phase of one step. A step the engine has not reached yet is Running.
    pub fn step(&self, name: &str) -> ObservedPhase {
        match self.steps.get(name) {
            Some(phase) => map_phase(phase, false),
            None => ObservedPhase::Running,
        }
    }

    pub fn step_logs(&self, name: &str) -> String {
        self.logs.get(name).cloned().unwrap_or_default()
    }
}

#[async_trait::async_trait]
pub trait WorkflowEngine: Send + Sync {
    async fn submit(&self, submission: &EngineSubmission) -> Result<EngineJobId>;

    async fn observe(&self, job: &EngineJobId) -> Result<EngineObservation>;

    async fn cancel(&self, job: &EngineJobId) -> Result<()>;
}

/// Answers whether a subject already exists on the target platform.
#[async_trait::async_trait]
pub trait ResourceInspector: Send + Sync {
    async fn exists(&self, kind: SubjectKind, name: &str) -> Result<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_mapping() {
        assert_eq!(map_phase("Pending", false), ObservedPhase::Running);
        assert_eq!(map_phase("Running", true), ObservedPhase::Running);
        assert_eq!(map_phase("Succeeded", false), ObservedPhase::Succeeded);
        assert_eq!(map_phase("Error", false), ObservedPhase::Failed);
        assert_eq!(map_phase("Omitted", false), ObservedPhase::Running);
        assert_eq!(map_phase("Omitted", true), ObservedPhase::Failed);
    }

    #[test]
    fn test_unreached_step_is_running() {
        let observation = EngineObservation {
            phase: "Running".to_string(),
            ..Default::default()
        };
        assert_eq!(observation.step("apply-namespace"), ObservedPhase::Running);
        assert_eq!(observation.step_logs("apply-namespace"), "");
    }
}
