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

//! Wiring from configuration to a running [`Provisioner`]

use crate::domain::config::{ProvisionerConfig, StoreBackend};
use crate::domain::provisioner::Provisioner;
use crate::domain::strategy::StrategyFlag;
use crate::domain::workflow::{
    DryRunSimulator, InMemoryWorkflowStore, WorkflowEngine, WorkflowOrchestrator, WorkflowStore,
};
use crate::infrastructure::kubernetes::{
    ArgoWorkflowEngine, ConfigMapWorkflowStore, KubeResourceInspector, ProvisionerKubeClient,
    ProvisionerKubeClientImpl,
};
use crate::shared::error::Result;
use std::sync::Arc;
use tracing::info;

/// Connect to the cluster named by `config` and assemble the orchestrator.
pub async fn connect(config: &ProvisionerConfig) -> Result<Provisioner> {
    let kube = &config.kubernetes;
    let client: Arc<dyn ProvisionerKubeClient> = Arc::new(
        ProvisionerKubeClientImpl::new_with_config(
            kube.state_namespace.clone(),
            kube.kubeconfig.clone(),
            kube.context.clone(),
        )
        .await?,
    );

    let store: Arc<dyn WorkflowStore> = match config.store.backend {
        StoreBackend::ConfigMap => Arc::new(ConfigMapWorkflowStore::new(
            client.clone(),
            kube.state_namespace.clone(),
        )),
        StoreBackend::Memory => Arc::new(InMemoryWorkflowStore::new()),
    };
    let engine: Arc<dyn WorkflowEngine> = Arc::new(ArgoWorkflowEngine::new(
        client.clone(),
        kube.engine_namespace.clone(),
        kube.service_account.clone(),
    ));
    let inspector = Arc::new(KubeResourceInspector::new(client));

    info!(
        store = %config.store.backend,
        engine_namespace = %kube.engine_namespace,
        state_namespace = %kube.state_namespace,
        "Connected provisioner"
    );

    let orchestrator =
        WorkflowOrchestrator::new(store, engine, inspector, config.observation_policy());
    Ok(Provisioner::new(orchestrator, strategy_flag(config)))
}

/// A provisioner that never reaches a cluster. Only dry-run workflows make
/// sense against it.
pub fn offline(config: &ProvisionerConfig) -> Provisioner {
    let simulator = Arc::new(DryRunSimulator::new());
    let orchestrator = WorkflowOrchestrator::new(
        Arc::new(InMemoryWorkflowStore::new()),
        simulator.clone(),
        simulator,
        config.observation_policy(),
    );
    Provisioner::new(orchestrator, strategy_flag(config))
}

fn strategy_flag(config: &ProvisionerConfig) -> StrategyFlag {
    StrategyFlag::from_env(config.strategy.use_composition)
}
