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

//! Tracked provisioning workflows

pub mod dry_run;
pub mod engine;
pub mod observe;
pub mod orchestrator;
pub mod plan;
pub mod record;
pub mod store;

pub use self::dry_run::DryRunSimulator;
pub use self::engine::{
    map_phase, EngineObservation, EngineStep, EngineSubmission, ObservedPhase, ResourceInspector,
    WorkflowEngine,
};
pub use self::observe::ObservationPolicy;
pub use self::orchestrator::WorkflowOrchestrator;
pub use self::plan::{StepAction, StepDefinition, StepPlan};
pub use self::record::{
    EngineJobId, RecordedError, StepRecord, StepStatus, WorkflowId, WorkflowRecord,
    WorkflowStatus,
};
pub use self::store::{InMemoryWorkflowStore, WorkflowStore};
