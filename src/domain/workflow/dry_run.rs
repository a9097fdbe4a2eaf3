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

use crate::domain::request::SubjectKind;
use crate::domain::workflow::engine::{
    EngineObservation, EngineSubmission, ResourceInspector, WorkflowEngine,
};
use crate::domain::workflow::record::EngineJobId;
use crate::shared::error::{ProvisionError, Result};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::Mutex;
use tracing::info;

struct SimulatedJob {
    /// (step name, rendered log) in submission order
    steps: Vec<(String, String)>,
    completed: usize,
    cancelled: bool,
}

impl SimulatedJob {
    fn finished(&self) -> bool {
        !self.cancelled && self.completed == self.steps.len()
    }
}

/// Stands in for the engine when a workflow runs in dry-run mode. Each
/// observation advances the job by one step, so dry runs go through the same
/// polling loop as real ones. Nothing leaves the process.
///
/// What a job "would have created" is only known per job: it answers the
/// job's own verify step and never what exists in the cluster.
#[derive(Default)]
pub struct DryRunSimulator {
    jobs: Mutex<HashMap<EngineJobId, SimulatedJob>>,
}

impl DryRunSimulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `job` ran every step, i.e. its subject would now exist.
    pub async fn would_exist(&self, job: &EngineJobId) -> bool {
        self.jobs
            .lock()
            .await
            .get(job)
            .is_some_and(SimulatedJob::finished)
    }

    /// Drop a job once its workflow is terminal.
    pub async fn forget(&self, job: &EngineJobId) {
        self.jobs.lock().await.remove(job);
    }
}

#[async_trait::async_trait]
impl WorkflowEngine for DryRunSimulator {
    async fn submit(&self, submission: &EngineSubmission) -> Result<EngineJobId> {
        let job = EngineJobId(format!("dry-run-{}", submission.workflow_id));

        let mut steps = Vec::with_capacity(submission.steps.len());
        for step in &submission.steps {
            let manifest = &step.manifest;
            let log = format!(
                "dry-run: would apply {} {}\n{}",
                manifest.kind,
                manifest.name,
                manifest.to_yaml()?
            );
            steps.push((step.name.clone(), log));
        }

        info!(
            workflow_id = %submission.workflow_id,
            steps = steps.len(),
            "Dry-run submission accepted"
        );

        self.jobs.lock().await.insert(
            job.clone(),
            SimulatedJob {
                steps,
                completed: 0,
                cancelled: false,
            },
        );
        Ok(job)
    }

    async fn observe(&self, job: &EngineJobId) -> Result<EngineObservation> {
        let mut jobs = self.jobs.lock().await;
        let state = jobs
            .get_mut(job)
            .ok_or_else(|| ProvisionError::not_found("DryRunJob", job.to_string()))?;

        if state.cancelled {
            return Ok(EngineObservation {
                phase: "Failed".to_string(),
                finished: true,
                message: Some("dry run terminated".to_string()),
                ..Default::default()
            });
        }

        state.completed = (state.completed + 1).min(state.steps.len());
        let finished = state.completed == state.steps.len();

        let mut steps = BTreeMap::new();
        let mut logs = BTreeMap::new();
        for (index, (name, log)) in state.steps.iter().enumerate() {
            if index < state.completed {
                steps.insert(name.clone(), "Succeeded".to_string());
                logs.insert(name.clone(), log.clone());
            } else {
                steps.insert(name.clone(), "Pending".to_string());
            }
        }

        Ok(EngineObservation {
            phase: if finished { "Succeeded" } else { "Running" }.to_string(),
            finished,
            steps,
            logs,
            message: None,
        })
    }

    async fn cancel(&self, job: &EngineJobId) -> Result<()> {
        if let Some(state) = self.jobs.lock().await.get_mut(job) {
            state.cancelled = true;
        }
        Ok(())
    }
}

/// Offline there is no cluster behind the simulator, so nothing exists.
#[async_trait::async_trait]
impl ResourceInspector for DryRunSimulator {
    async fn exists(&self, _kind: SubjectKind, _name: &str) -> Result<bool> {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::manifest::generate_namespace_manifests;
    use crate::domain::request::{validate_request, ProvisioningRequest};
    use crate::domain::workflow::engine::{EngineStep, ObservedPhase};
    use crate::domain::workflow::record::WorkflowId;

    fn submission() -> EngineSubmission {
        let validated = validate_request(&ProvisioningRequest {
            name: "team-a".to_string(),
            ..Default::default()
        })
        .unwrap();
        let set = generate_namespace_manifests(&validated).unwrap();
        EngineSubmission {
            workflow_id: WorkflowId::new(),
            subject: set.subject().clone(),
            steps: set
                .iter()
                .map(|m| EngineStep {
                    name: format!("apply-{}", m.key),
                    manifest: m.clone(),
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_advances_one_step_per_observation() {
        let simulator = DryRunSimulator::new();
        let submission = submission();
        let job = simulator.submit(&submission).await.unwrap();

        let first = simulator.observe(&job).await.unwrap();
        assert_eq!(first.overall(), ObservedPhase::Running);
        assert_eq!(first.step("apply-namespace"), ObservedPhase::Succeeded);
        assert_eq!(first.step("apply-limit-range"), ObservedPhase::Running);
        assert!(first.step_logs("apply-namespace").contains("kind: Namespace"));
        assert!(!simulator.would_exist(&job).await);

        simulator.observe(&job).await.unwrap();
        let last = simulator.observe(&job).await.unwrap();
        assert_eq!(last.overall(), ObservedPhase::Succeeded);
        assert!(simulator.would_exist(&job).await);

        // scoped to the job, never to the subject
        assert!(!simulator.exists(SubjectKind::Namespace, "team-a").await.unwrap());
        simulator.forget(&job).await;
        assert!(!simulator.would_exist(&job).await);
    }

    #[tokio::test]
    async fn test_cancelled_job_fails() {
        let simulator = DryRunSimulator::new();
        let job = simulator.submit(&submission()).await.unwrap();
        simulator.cancel(&job).await.unwrap();
        let observation = simulator.observe(&job).await.unwrap();
        assert_eq!(observation.overall(), ObservedPhase::Failed);
        assert!(!simulator.would_exist(&job).await);
    }
}
