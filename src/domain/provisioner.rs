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

//! Request-to-workflow entry point
//!
//! Validates a request, renders its manifests under the strategy the flag
//! selects at that moment, and hands both to the orchestrator.

use crate::domain::manifest::generator::render_cluster_manifests;
use crate::domain::manifest::{generate_namespace_manifests, ManifestSet};
use crate::domain::request::{validate_request, ProvisioningRequest, SubjectKind};
use crate::domain::strategy::{map_parameters, StrategyFlag, StrategyParameters};
use crate::domain::workflow::{WorkflowId, WorkflowOrchestrator};
use crate::shared::error::Result;
use tracing::info;

/// Output of [`Provisioner::render`]: everything `start` needs.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedRequest {
    pub manifests: ManifestSet,
    pub parameters: Option<StrategyParameters>,
    pub dry_run: bool,
}

pub struct Provisioner {
    orchestrator: WorkflowOrchestrator,
    flag: StrategyFlag,
}

impl Provisioner {
    pub fn new(orchestrator: WorkflowOrchestrator, flag: StrategyFlag) -> Self {
        Self { orchestrator, flag }
    }

    pub fn orchestrator(&self) -> &WorkflowOrchestrator {
        &self.orchestrator
    }

    pub fn flag(&self) -> &StrategyFlag {
        &self.flag
    }

    /// Validate and render without starting anything.
    pub fn render(&self, request: &ProvisioningRequest) -> Result<RenderedRequest> {
        let validated = validate_request(request)?;

        let (manifests, parameters) = match request.kind {
            SubjectKind::Namespace => (generate_namespace_manifests(&validated)?, None),
            SubjectKind::Cluster => {
                let parameters = map_parameters(&validated, self.flag.current())?;
                let manifests = render_cluster_manifests(&validated, &parameters)?;
                (manifests, Some(parameters))
            }
        };

        Ok(RenderedRequest {
            manifests,
            parameters,
            dry_run: request.dry_run,
        })
    }

    pub async fn provision(&self, request: &ProvisioningRequest) -> Result<WorkflowId> {
        let rendered = self.render(request)?;
        let strategy = rendered.parameters.as_ref().map(|p| p.strategy());
        info!(
            subject = %rendered.manifests.subject(),
            strategy = ?strategy,
            documents = rendered.manifests.len(),
            "Provisioning request accepted"
        );

        self.orchestrator
            .start(rendered.manifests, rendered.parameters, rendered.dry_run)
            .await
    }
}
