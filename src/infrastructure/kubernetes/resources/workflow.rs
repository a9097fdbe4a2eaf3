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

use crate::domain::workflow::EngineSubmission;
use crate::infrastructure::constants::{
    ARGO_ENTRYPOINT, ARGO_GROUP, ARGO_VERSION, ARGO_WORKFLOW_KIND, LABEL_WORKFLOW_ID,
};
use crate::infrastructure::kubernetes::resources::managed_labels;
use crate::shared::error::Result;
use serde_json::{json, Value};

/// An Argo Workflow with one `resource` template per apply step, run as
/// sequential step groups so each manifest is applied after the previous one.
pub struct ArgoWorkflowBuilder<'a> {
    submission: &'a EngineSubmission,
    namespace: String,
    service_account: String,
}

impl<'a> ArgoWorkflowBuilder<'a> {
    pub fn new(submission: &'a EngineSubmission, namespace: String, service_account: String) -> Self {
        Self {
            submission,
            namespace,
            service_account,
        }
    }

    pub fn name(submission: &EngineSubmission) -> String {
        format!("provision-{}", submission.workflow_id)
    }

    pub fn build(&self) -> Result<Value> {
        let mut labels = managed_labels(&self.submission.subject);
        labels.insert(
            LABEL_WORKFLOW_ID.to_string(),
            self.submission.workflow_id.to_string(),
        );

        let groups: Vec<Value> = self
            .submission
            .steps
            .iter()
            .map(|step| json!([{ "name": step.name, "template": step.name }]))
            .collect();

        let mut templates = vec![json!({
            "name": ARGO_ENTRYPOINT,
            "steps": groups,
        })];
        for step in &self.submission.steps {
            templates.push(json!({
                "name": step.name,
                "resource": {
                    "action": "apply",
                    "manifest": step.manifest.to_yaml()?,
                }
            }));
        }

        Ok(json!({
            "apiVersion": format!("{}/{}", ARGO_GROUP, ARGO_VERSION),
            "kind": ARGO_WORKFLOW_KIND,
            "metadata": {
                "name": Self::name(self.submission),
                "namespace": self.namespace,
                "labels": labels,
            },
            "spec": {
                "entrypoint": ARGO_ENTRYPOINT,
                "serviceAccountName": self.service_account,
                "templates": templates,
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::manifest::generate_namespace_manifests;
    use crate::domain::request::{validate_request, ProvisioningRequest};
    use crate::domain::workflow::{EngineStep, WorkflowId};

    #[test]
    fn test_one_template_per_step() {
        let validated = validate_request(&ProvisioningRequest {
            name: "team-a".to_string(),
            ..Default::default()
        })
        .unwrap();
        let set = generate_namespace_manifests(&validated).unwrap();
        let submission = EngineSubmission {
            workflow_id: WorkflowId::new(),
            subject: set.subject().clone(),
            steps: set
                .iter()
                .map(|m| EngineStep {
                    name: format!("apply-{}", m.key),
                    manifest: m.clone(),
                })
                .collect(),
        };

        let wf = ArgoWorkflowBuilder::new(&submission, "argo".to_string(), "sa".to_string())
            .build()
            .unwrap();
        let templates = wf["spec"]["templates"].as_array().unwrap();
        assert_eq!(templates.len(), 4);
        assert_eq!(templates[0]["steps"].as_array().unwrap().len(), 3);
        assert_eq!(templates[1]["name"], "apply-namespace");
        assert!(templates[1]["resource"]["manifest"]
            .as_str()
            .unwrap()
            .contains("kind: Namespace"));
        assert_eq!(wf["metadata"]["namespace"], "argo");
    }
}
