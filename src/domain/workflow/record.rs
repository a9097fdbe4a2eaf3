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

use crate::domain::manifest::ManifestSet;
use crate::domain::request::Subject;
use crate::domain::strategy::{StrategyId, StrategyParameters};
use crate::domain::workflow::plan::{StepAction, StepDefinition, StepPlan};
use crate::infrastructure::constants::STEP_LOG_LIMIT;
use crate::shared::error::{ErrorKind, ProvisionError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkflowId(Uuid);

impl WorkflowId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for WorkflowId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WorkflowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for WorkflowId {
    type Err = ProvisionError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| ProvisionError::invalid_field("workflow_id", e.to_string()))
    }
}

/// Opaque handle the engine returned for a submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EngineJobId(pub String);

impl fmt::Display for EngineJobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkflowStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Aborted,
}

impl WorkflowStatus {
    pub const ALL: [WorkflowStatus; 5] = [
        WorkflowStatus::Pending,
        WorkflowStatus::Running,
        WorkflowStatus::Succeeded,
        WorkflowStatus::Failed,
        WorkflowStatus::Aborted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStatus::Pending => "Pending",
            WorkflowStatus::Running => "Running",
            WorkflowStatus::Succeeded => "Succeeded",
            WorkflowStatus::Failed => "Failed",
            WorkflowStatus::Aborted => "Aborted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkflowStatus::Succeeded | WorkflowStatus::Failed | WorkflowStatus::Aborted
        )
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowStatus {
    type Err = ProvisionError;

    fn from_str(s: &str) -> Result<Self> {
        WorkflowStatus::ALL
            .iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| {
                ProvisionError::invalid_field("status", format!("unknown workflow status '{}'", s))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Skipped,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Pending => "Pending",
            StepStatus::Running => "Running",
            StepStatus::Succeeded => "Succeeded",
            StepStatus::Failed => "Failed",
            StepStatus::Skipped => "Skipped",
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            StepStatus::Succeeded | StepStatus::Failed | StepStatus::Skipped
        )
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub name: String,
    pub action: StepAction,
    pub depends_on: Vec<String>,
    pub status: StepStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Log excerpt, truncated
    #[serde(default)]
    pub logs: String,
}

impl StepRecord {
    pub fn pending(definition: &StepDefinition) -> Self {
        Self {
            name: definition.name.clone(),
            action: definition.action,
            depends_on: definition.depends_on.clone(),
            status: StepStatus::Pending,
            started_at: None,
            finished_at: None,
            logs: String::new(),
        }
    }

    pub fn definition(&self) -> StepDefinition {
        StepDefinition {
            name: self.name.clone(),
            action: self.action,
            depends_on: self.depends_on.clone(),
        }
    }
}

/// Error as stored on a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedError {
    pub kind: ErrorKind,
    pub step: Option<String>,
    pub message: String,
}

impl RecordedError {
    pub fn from_error(err: &ProvisionError, step: Option<&str>) -> Self {
        Self {
            kind: err.kind(),
            step: err.step().or(step).map(str::to_string),
            message: err.to_string(),
        }
    }
}

/// One provisioning run. Terminal records are never changed again; a retry
/// produces a new record pointing back through `retried_from`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRecord {
    pub id: WorkflowId,
    pub subject: Subject,
    pub strategy: Option<StrategyId>,
    pub parameters: Option<StrategyParameters>,
    pub status: WorkflowStatus,
    pub steps: Vec<StepRecord>,
    pub manifests: ManifestSet,
    pub dry_run: bool,
    pub engine_job_id: Option<EngineJobId>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub last_error: Option<RecordedError>,
    pub abort_reason: Option<String>,
    pub retried_from: Option<WorkflowId>,
}

impl WorkflowRecord {
    pub fn new(
        manifests: ManifestSet,
        parameters: Option<StrategyParameters>,
        dry_run: bool,
        plan: StepPlan,
    ) -> Self {
        Self {
            id: WorkflowId::new(),
            subject: manifests.subject().clone(),
            strategy: parameters.as_ref().map(|p| p.strategy()),
            parameters,
            status: WorkflowStatus::Pending,
            steps: plan.steps().iter().map(StepRecord::pending).collect(),
            manifests,
            dry_run,
            engine_job_id: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            last_error: None,
            abort_reason: None,
            retried_from: None,
        }
    }

    pub fn is_live(&self) -> bool {
        !self.status.is_terminal()
    }

    pub fn step(&self, name: &str) -> Option<&StepRecord> {
        self.steps.iter().find(|s| s.name == name)
    }

    /// The step execution is on: the Running one, else the first Pending.
    pub fn current_step(&self) -> Option<&str> {
        self.steps
            .iter()
            .find(|s| s.status == StepStatus::Running)
            .or_else(|| self.steps.iter().find(|s| s.status == StepStatus::Pending))
            .map(|s| s.name.as_str())
    }

    /// Latest timestamp an executor wrote to this record.
    pub fn last_progress(&self) -> DateTime<Utc> {
        self.steps
            .iter()
            .flat_map(|s| [s.started_at, s.finished_at])
            .chain([self.started_at])
            .flatten()
            .fold(self.created_at, std::cmp::max)
    }

    /// A live record nobody has moved forward for longer than `limit`.
    pub fn is_stale(&self, now: DateTime<Utc>, limit: Duration) -> bool {
        self.is_live()
            && (now - self.last_progress())
                .to_std()
                .is_ok_and(|idle| idle > limit)
    }

    fn step_index(&self, name: &str) -> Result<usize> {
        self.steps
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| ProvisionError::UnknownStep {
                workflow_id: self.id.to_string(),
                step: name.to_string(),
            })
    }

    pub fn mark_running(&mut self) -> Result<()> {
        if self.status != WorkflowStatus::Pending {
            return Err(ProvisionError::invalid_state(self.id, self.status, "start"));
        }
        self.status = WorkflowStatus::Running;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    /// Move `name` to Running. Returns `false` when the record is no longer
    /// running and the step must not start.
    pub fn start_step(&mut self, name: &str) -> Result<bool> {
        if self.status != WorkflowStatus::Running {
            return Ok(false);
        }
        let index = self.step_index(name)?;

        for dependency in &self.steps[index].depends_on {
            // dependencies dropped by a retry succeeded in an earlier record
            if let Some(dep) = self.step(dependency) {
                if dep.status != StepStatus::Succeeded {
                    return Err(ProvisionError::DependencyNotSatisfied {
                        step: name.to_string(),
                        dependency: dependency.clone(),
                    });
                }
            }
        }

        let step = &mut self.steps[index];
        if step.status != StepStatus::Pending {
            return Err(ProvisionError::invalid_state(
                self.id,
                step.status,
                format!("start step {}", name),
            ));
        }
        step.status = StepStatus::Running;
        step.started_at = Some(Utc::now());
        Ok(true)
    }

    /// Mark `name` Succeeded. When it was the last unfinished step the record
    /// becomes Succeeded in the same mutation.
    pub fn complete_step(&mut self, name: &str, logs: &str) -> Result<()> {
        if self.status != WorkflowStatus::Running {
            return Err(ProvisionError::invalid_state(
                self.id,
                self.status,
                format!("complete step {}", name),
            ));
        }
        let index = self.step_index(name)?;
        let now = Utc::now();
        let step = &mut self.steps[index];
        step.status = StepStatus::Succeeded;
        step.finished_at = Some(now);
        step.logs = truncate_logs(logs);

        if self.steps.iter().all(|s| s.status == StepStatus::Succeeded) {
            self.status = WorkflowStatus::Succeeded;
            self.finished_at = Some(now);
        }
        Ok(())
    }

    /// Fail the record. `step` (or the first unfinished step) is marked
    /// Failed and every later unfinished step Skipped.
    pub fn fail(&mut self, step: Option<&str>, err: &ProvisionError) -> Result<()> {
        if self.status.is_terminal() {
            return Err(ProvisionError::invalid_state(self.id, self.status, "fail"));
        }
        let now = Utc::now();
        let index = match step {
            Some(name) => Some(self.step_index(name)?),
            None => self.steps.iter().position(|s| !s.status.is_finished()),
        };

        if let Some(index) = index {
            let failed = &mut self.steps[index];
            failed.status = StepStatus::Failed;
            failed.started_at.get_or_insert(now);
            failed.finished_at = Some(now);
            failed.logs = truncate_logs(&err.to_string());
        }
        self.skip_unfinished(now);

        let step_name = index.map(|i| self.steps[i].name.clone());
        self.last_error = Some(RecordedError::from_error(err, step_name.as_deref()));
        self.status = WorkflowStatus::Failed;
        self.finished_at = Some(now);
        Ok(())
    }

    pub fn abort(&mut self, reason: impl Into<String>) -> Result<()> {
        if self.status.is_terminal() {
            return Err(ProvisionError::invalid_state(self.id, self.status, "abort"));
        }
        let now = Utc::now();
        self.skip_unfinished(now);
        self.abort_reason = Some(reason.into());
        self.status = WorkflowStatus::Aborted;
        self.finished_at = Some(now);
        Ok(())
    }

    fn skip_unfinished(&mut self, now: DateTime<Utc>) {
        for step in self.steps.iter_mut().filter(|s| !s.status.is_finished()) {
            step.status = StepStatus::Skipped;
            step.finished_at = Some(now);
        }
    }

    /// Index of the step a retry resumes from when none is named.
    pub fn default_retry_index(&self) -> Option<usize> {
        self.steps
            .iter()
            .position(|s| matches!(s.status, StepStatus::Failed | StepStatus::Skipped))
    }

    pub fn retry_index(&self, step: Option<&str>) -> Result<usize> {
        match step {
            Some(name) => self.step_index(name),
            None => self.default_retry_index().ok_or_else(|| {
                ProvisionError::invalid_state(self.id, self.status, "retry without failed steps")
            }),
        }
    }

    /// A fresh Pending record that re-runs this one from `from_step`
    /// onwards with the same manifests and strategy. `self` is not touched.
    pub fn successor(&self, from_step: Option<&str>) -> Result<WorkflowRecord> {
        if !matches!(
            self.status,
            WorkflowStatus::Failed | WorkflowStatus::Aborted
        ) {
            return Err(ProvisionError::invalid_state(self.id, self.status, "retry"));
        }

        let start = self.retry_index(from_step)?;
        let (dropped, kept) = self.steps.split_at(start);

        for step in kept {
            for dependency in &step.depends_on {
                let unmet = dropped
                    .iter()
                    .any(|d| &d.name == dependency && d.status != StepStatus::Succeeded);
                if unmet {
                    return Err(ProvisionError::DependencyNotSatisfied {
                        step: step.name.clone(),
                        dependency: dependency.clone(),
                    });
                }
            }
        }

        Ok(WorkflowRecord {
            id: WorkflowId::new(),
            subject: self.subject.clone(),
            strategy: self.strategy,
            parameters: self.parameters.clone(),
            status: WorkflowStatus::Pending,
            steps: kept
                .iter()
                .map(|s| StepRecord::pending(&s.definition()))
                .collect(),
            manifests: self.manifests.clone(),
            dry_run: self.dry_run,
            engine_job_id: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            last_error: None,
            abort_reason: None,
            retried_from: Some(self.id),
        })
    }
}

fn truncate_logs(logs: &str) -> String {
    if logs.len() <= STEP_LOG_LIMIT {
        return logs.to_string();
    }
    let mut end = STEP_LOG_LIMIT;
    while !logs.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}\n... (truncated)", &logs[..end])
}
