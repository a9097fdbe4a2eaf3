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

use crate::domain::workflow::{EngineJobId, EngineObservation, EngineSubmission, WorkflowEngine};
use crate::infrastructure::constants::{
    ARGO_GROUP, ARGO_SHUTDOWN_TERMINATE, ARGO_VERSION, ARGO_WORKFLOW_KIND, ARGO_WORKFLOW_PLURAL,
};
use crate::infrastructure::kubernetes::client::{api_resource, ProvisionerKubeClient};
use crate::infrastructure::kubernetes::resources::ArgoWorkflowBuilder;
use crate::shared::error::{ProvisionError, Result};
use kube::discovery::ApiResource;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Runs apply steps as Argo Workflows in the engine namespace.
pub struct ArgoWorkflowEngine {
    client: Arc<dyn ProvisionerKubeClient>,
    namespace: String,
    service_account: String,
}

impl ArgoWorkflowEngine {
    pub fn new(
        client: Arc<dyn ProvisionerKubeClient>,
        namespace: String,
        service_account: String,
    ) -> Self {
        Self {
            client,
            namespace,
            service_account,
        }
    }

    fn resource() -> ApiResource {
        api_resource(
            ARGO_GROUP,
            ARGO_VERSION,
            ARGO_WORKFLOW_KIND,
            ARGO_WORKFLOW_PLURAL,
        )
    }
}

/// Fold an Argo Workflow status into an [`EngineObservation`]. Nodes are
/// keyed by display name, which is the step name for our templates.
pub fn parse_workflow_status(workflow: &Value) -> EngineObservation {
    let status = &workflow["status"];
    let text = |v: &Value| v.as_str().map(str::to_string);

    let mut steps = BTreeMap::new();
    let mut logs = BTreeMap::new();
    if let Some(nodes) = status["nodes"].as_object() {
        for node in nodes.values() {
            let Some(name) = text(&node["displayName"]) else {
                continue;
            };
            if let Some(phase) = text(&node["phase"]) {
                steps.insert(name.clone(), phase);
            }
            if let Some(message) = text(&node["message"]) {
                logs.insert(name, message);
            }
        }
    }

    EngineObservation {
        phase: text(&status["phase"]).unwrap_or_else(|| "Pending".to_string()),
        finished: status["finishedAt"].as_str().is_some_and(|s| !s.is_empty()),
        steps,
        logs,
        message: text(&status["message"]),
    }
}

#[async_trait::async_trait]
impl WorkflowEngine for ArgoWorkflowEngine {
    async fn submit(&self, submission: &EngineSubmission) -> Result<EngineJobId> {
        let document = ArgoWorkflowBuilder::new(
            submission,
            self.namespace.clone(),
            self.service_account.clone(),
        )
        .build()?;
        let name = ArgoWorkflowBuilder::name(submission);

        self.client
            .create_object(&Self::resource(), Some(&self.namespace), &document)
            .await?;

        info!(
            workflow = %name,
            namespace = %self.namespace,
            steps = submission.steps.len(),
            "Submitted Argo workflow"
        );
        Ok(EngineJobId(name))
    }

    async fn observe(&self, job: &EngineJobId) -> Result<EngineObservation> {
        let workflow = self
            .client
            .get_object(&Self::resource(), Some(&self.namespace), &job.0)
            .await?
            .ok_or_else(|| ProvisionError::not_found(ARGO_WORKFLOW_KIND, job.0.clone()))?;

        let observation = parse_workflow_status(&workflow);
        debug!(workflow = %job.0, phase = %observation.phase, "Observed Argo workflow");
        Ok(observation)
    }

    async fn cancel(&self, job: &EngineJobId) -> Result<()> {
        let patch = json!({ "spec": { "shutdown": ARGO_SHUTDOWN_TERMINATE } });
        self.client
            .merge_patch_object(&Self::resource(), Some(&self.namespace), &job.0, &patch)
            .await?;
        info!(workflow = %job.0, "Terminated Argo workflow");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::workflow::ObservedPhase;

    #[test]
    fn test_parse_running_workflow() {
        let workflow = json!({
            "status": {
                "phase": "Running",
                "nodes": {
                    "provision-1": { "displayName": "provision-1", "phase": "Running" },
                    "provision-1-111": {
                        "displayName": "apply-namespace",
                        "phase": "Succeeded",
                        "message": "namespace/team-a created"
                    },
                    "provision-1-222": { "displayName": "apply-limit-range", "phase": "Pending" }
                }
            }
        });

        let observation = parse_workflow_status(&workflow);
        assert_eq!(observation.overall(), ObservedPhase::Running);
        assert!(!observation.finished);
        assert_eq!(observation.step("apply-namespace"), ObservedPhase::Succeeded);
        assert_eq!(observation.step("apply-limit-range"), ObservedPhase::Running);
        assert_eq!(
            observation.step_logs("apply-namespace"),
            "namespace/team-a created"
        );
    }

    #[test]
    fn test_parse_missing_status() {
        let observation = parse_workflow_status(&json!({ "metadata": { "name": "x" } }));
        assert_eq!(observation.phase, "Pending");
        assert_eq!(observation.overall(), ObservedPhase::Running);
        assert!(observation.steps.is_empty());
    }

    #[test]
    fn test_parse_failed_workflow() {
        let workflow = json!({
            "status": {
                "phase": "Failed",
                "finishedAt": "2025-01-01T00:00:00Z",
                "message": "child failed"
            }
        });
        let observation = parse_workflow_status(&workflow);
        assert_eq!(observation.overall(), ObservedPhase::Failed);
        assert!(observation.finished);
        assert_eq!(observation.message.as_deref(), Some("child failed"));
    }
}
