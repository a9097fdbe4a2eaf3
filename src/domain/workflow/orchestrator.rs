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

//! Workflow state machine
//!
//! Each workflow runs in its own task. Mutations of one record are
//! serialized through a per-workflow lock, shared by the executor and
//! `abort`; reads go straight to the store.
//!
//! Execution lives in the process that started the workflow. A live record
//! whose executor went away stops making progress; once it has been idle for
//! longer than [`ObservationPolicy::stale_after`] it is failed with
//! `ObservationTimeout` the next time it is read or its subject is admitted.

use crate::domain::manifest::ManifestSet;
use crate::domain::request::{Subject, SubjectKind};
use crate::domain::strategy::StrategyParameters;
use crate::domain::workflow::dry_run::DryRunSimulator;
use crate::domain::workflow::engine::{
    EngineStep, EngineSubmission, ResourceInspector, WorkflowEngine,
};
use crate::domain::workflow::observe::{with_backoff, ObservationPolicy, StepOutcome, StepWatcher};
use crate::domain::workflow::plan::{StepAction, StepPlan};
use crate::domain::workflow::record::{
    EngineJobId, StepRecord, StepStatus, WorkflowId, WorkflowRecord, WorkflowStatus,
};
use crate::domain::workflow::store::WorkflowStore;
use crate::shared::error::{ProvisionError, Result};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const LIVE_STATUSES: [WorkflowStatus; 2] = [WorkflowStatus::Pending, WorkflowStatus::Running];

#[derive(Clone)]
pub struct WorkflowOrchestrator {
    inner: Arc<Inner>,
}

struct Inner {
    store: Arc<dyn WorkflowStore>,
    engine: Arc<dyn WorkflowEngine>,
    inspector: Arc<dyn ResourceInspector>,
    simulator: Arc<DryRunSimulator>,
    policy: ObservationPolicy,
    /// Subjects with a workflow admitted by this process
    reservations: Mutex<HashMap<Subject, WorkflowId>>,
    /// One lock per workflow executing in this process
    locks: Mutex<HashMap<WorkflowId, Arc<Mutex<()>>>>,
    /// Serializes mutations of records with no local executor
    idle_lock: Arc<Mutex<()>>,
    tokens: Mutex<HashMap<WorkflowId, CancellationToken>>,
    handles: Mutex<HashMap<WorkflowId, JoinHandle<()>>>,
}

impl WorkflowOrchestrator {
    pub fn new(
        store: Arc<dyn WorkflowStore>,
        engine: Arc<dyn WorkflowEngine>,
        inspector: Arc<dyn ResourceInspector>,
        policy: ObservationPolicy,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                engine,
                inspector,
                simulator: Arc::new(DryRunSimulator::new()),
                policy,
                reservations: Mutex::new(HashMap::new()),
                locks: Mutex::new(HashMap::new()),
                idle_lock: Arc::new(Mutex::new(())),
                tokens: Mutex::new(HashMap::new()),
                handles: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Admit a workflow for `manifests` and start executing it in the
    /// background. Cluster workflows must carry the strategy parameters they
    /// were rendered from.
    pub async fn start(
        &self,
        manifests: ManifestSet,
        parameters: Option<StrategyParameters>,
        dry_run: bool,
    ) -> Result<WorkflowId> {
        let subject = manifests.subject().clone();
        check_parameters(&subject, parameters.as_ref())?;

        let plan = StepPlan::for_manifests(&manifests)?;
        let record = WorkflowRecord::new(manifests, parameters, dry_run, plan);
        let id = record.id;

        self.inner.admit(&record).await?;

        // dry runs see the same existence answer as real ones
        if let Err(err) = self.inner.check_absent(&subject).await {
            self.inner.release(&subject, id).await;
            return Err(err);
        }

        self.inner.launch(record).await?;
        info!(
            workflow_id = %id,
            subject = %subject,
            dry_run,
            "Workflow started"
        );
        Ok(id)
    }

    pub async fn get_status(&self, id: &WorkflowId) -> Result<WorkflowRecord> {
        let record = self.inner.load(*id).await?;
        self.inner.expire_if_stale(record).await
    }

    pub async fn get_steps(&self, id: &WorkflowId) -> Result<Vec<StepRecord>> {
        Ok(self.get_status(id).await?.steps)
    }

    pub async fn list(&self, status: Option<WorkflowStatus>) -> Result<Vec<WorkflowRecord>> {
        match status {
            Some(status) => self.inner.store.list_by_status(&[status]).await,
            None => self.inner.store.list().await,
        }
    }

    /// Abort a Pending or Running workflow. Unfinished steps become Skipped
    /// and the engine job is cancelled on a best-effort basis.
    pub async fn abort(&self, id: &WorkflowId, reason: &str) -> Result<WorkflowRecord> {
        let record = self
            .inner
            .mutate(*id, |r| {
                r.abort(reason)?;
                Ok(r.clone())
            })
            .await?;

        info!(workflow_id = %id, reason = %reason, "Workflow aborted");

        if let Some(token) = self.inner.tokens.lock().await.get(id) {
            token.cancel();
        }
        if let Some(job) = &record.engine_job_id {
            self.inner.cancel_job(&record, job).await;
        }
        self.inner.release(&record.subject, *id).await;

        Ok(record)
    }

    /// Start a new workflow that re-runs a Failed or Aborted one from
    /// `from_step` (default: its first Failed or Skipped step). The original
    /// record is left as it is.
    pub async fn retry(&self, id: &WorkflowId, from_step: Option<&str>) -> Result<WorkflowId> {
        let original = self.inner.load(*id).await?;
        let record = original.successor(from_step)?;
        let new_id = record.id;

        self.inner.admit(&record).await?;
        self.inner.launch(record).await?;

        info!(
            workflow_id = %new_id,
            retried_from = %id,
            from_step = from_step.unwrap_or("<first unfinished>"),
            "Workflow retried"
        );
        Ok(new_id)
    }

    /// Wait until the workflow is terminal and return its final record.
    pub async fn wait(&self, id: &WorkflowId) -> Result<WorkflowRecord> {
        let handle = self.inner.handles.lock().await.remove(id);
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                warn!(workflow_id = %id, error = %err, "Executor task ended abnormally");
            }
        }

        loop {
            let record = self.get_status(id).await?;
            if record.status.is_terminal() {
                return Ok(record);
            }
            tokio::time::sleep(self.inner.policy.poll_interval).await;
        }
    }
}

fn check_parameters(subject: &Subject, parameters: Option<&StrategyParameters>) -> Result<()> {
    match (subject.kind, parameters) {
        (SubjectKind::Namespace, None) => Ok(()),
        (SubjectKind::Namespace, Some(_)) => Err(ProvisionError::invalid_field(
            "strategy",
            "namespace workflows take no strategy parameters",
        )),
        (SubjectKind::Cluster, None) => Err(ProvisionError::invalid_field(
            "strategy",
            "cluster workflows need strategy parameters",
        )),
        (SubjectKind::Cluster, Some(p)) if p.cluster_name() != subject.name => {
            Err(ProvisionError::invalid_field(
                "strategy",
                format!(
                    "parameters are for cluster '{}', manifests for '{}'",
                    p.cluster_name(),
                    subject.name
                ),
            ))
        }
        (SubjectKind::Cluster, Some(_)) => Ok(()),
    }
}

fn conflict(subject: &Subject, owner: WorkflowId) -> ProvisionError {
    ProvisionError::ConflictingWorkflow {
        kind: subject.kind.to_string(),
        name: subject.name.clone(),
        workflow_id: owner.to_string(),
    }
}

impl Inner {
    fn engine_for(&self, dry_run: bool) -> Arc<dyn WorkflowEngine> {
        if dry_run {
            self.simulator.clone()
        } else {
            self.engine.clone()
        }
    }

    async fn load(&self, id: WorkflowId) -> Result<WorkflowRecord> {
        self.store
            .get(&id)
            .await?
            .ok_or_else(|| ProvisionError::not_found("Workflow", id.to_string()))
    }

    async fn lock_for(&self, id: WorkflowId) -> Arc<Mutex<()>> {
        match self.locks.lock().await.get(&id) {
            Some(lock) => lock.clone(),
            None => self.idle_lock.clone(),
        }
    }

    /// Apply `f` to the stored record under the workflow's lock. Nothing is
    /// written when `f` fails or leaves the record unchanged.
    async fn mutate<T, F>(&self, id: WorkflowId, f: F) -> Result<T>
    where
        F: FnOnce(&mut WorkflowRecord) -> Result<T>,
    {
        let lock = self.lock_for(id).await;
        let _guard = lock.lock().await;

        let before = self.load(id).await?;
        let mut record = before.clone();
        let value = f(&mut record)?;
        if record != before {
            self.store.upsert(&record).await?;
        }
        Ok(value)
    }

    /// Reserve the subject, then make sure no live record for it exists in
    /// the store (possibly written by another process).
    async fn admit(&self, record: &WorkflowRecord) -> Result<()> {
        {
            let mut reservations = self.reservations.lock().await;
            if let Some(owner) = reservations.get(&record.subject) {
                return Err(conflict(&record.subject, *owner));
            }
            reservations.insert(record.subject.clone(), record.id);
        }

        if let Err(err) = self.check_store(record).await {
            self.release(&record.subject, record.id).await;
            return Err(err);
        }
        Ok(())
    }

    async fn check_store(&self, record: &WorkflowRecord) -> Result<()> {
        let live = self.store.list_by_status(&LIVE_STATUSES).await?;
        for other in live
            .into_iter()
            .filter(|r| r.subject == record.subject && r.id != record.id)
        {
            let other = self.expire_if_stale(other).await?;
            if other.is_live() {
                return Err(conflict(&record.subject, other.id));
            }
        }
        Ok(())
    }

    /// Fail a live record that no executor in this process owns and that
    /// has not moved for longer than the policy allows.
    async fn expire_if_stale(&self, record: WorkflowRecord) -> Result<WorkflowRecord> {
        let limit = self.policy.stale_after();
        if !record.is_stale(Utc::now(), limit) || self.tokens.lock().await.contains_key(&record.id)
        {
            return Ok(record);
        }

        let expired = self
            .mutate(record.id, |r| {
                if r.is_stale(Utc::now(), limit) {
                    let step = r.current_step().map(str::to_string);
                    let err = ProvisionError::ObservationTimeout {
                        step: step.clone().unwrap_or_default(),
                        window_secs: limit.as_secs(),
                    };
                    r.fail(step.as_deref(), &err)?;
                }
                Ok(r.clone())
            })
            .await?;

        if !expired.is_live() {
            warn!(
                workflow_id = %expired.id,
                subject = %expired.subject,
                idle_secs = limit.as_secs(),
                "Expired workflow whose executor stopped"
            );
            self.release(&expired.subject, expired.id).await;
        }
        Ok(expired)
    }

    async fn release(&self, subject: &Subject, id: WorkflowId) {
        let mut reservations = self.reservations.lock().await;
        if reservations.get(subject) == Some(&id) {
            reservations.remove(subject);
        }
    }

    async fn check_absent(&self, subject: &Subject) -> Result<()> {
        let inspector = self.inspector.as_ref();
        let kind = subject.kind;
        let name = subject.name.as_str();

        let exists = with_backoff(&self.policy, "exists", move || inspector.exists(kind, name)).await?;
        if exists {
            return Err(ProvisionError::already_exists(kind.as_str(), name));
        }
        Ok(())
    }

    /// Persist the record as Pending, move it to Running and spawn its
    /// executor.
    async fn launch(self: &Arc<Self>, mut record: WorkflowRecord) -> Result<()> {
        let id = record.id;
        let subject = record.subject.clone();

        let lock = Arc::new(Mutex::new(()));
        self.locks.lock().await.insert(id, lock.clone());
        let token = CancellationToken::new();
        self.tokens.lock().await.insert(id, token.clone());

        let persisted = {
            let _guard = lock.lock().await;
            async {
                self.store.upsert(&record).await?;
                record.mark_running()?;
                self.store.upsert(&record).await
            }
            .await
        };
        if let Err(err) = persisted {
            self.forget(id).await;
            self.release(&subject, id).await;
            return Err(err);
        }

        // held across the spawn so the task cannot finish before its handle
        // is registered
        let mut handles = self.handles.lock().await;
        let inner = Arc::clone(self);
        let handle = tokio::spawn(async move {
            inner.run(id, token).await;
        });
        handles.insert(id, handle);
        Ok(())
    }

    async fn forget(&self, id: WorkflowId) {
        self.tokens.lock().await.remove(&id);
        self.locks.lock().await.remove(&id);
        self.handles.lock().await.remove(&id);
    }

    async fn run(&self, id: WorkflowId, token: CancellationToken) {
        if let Err(err) = self.execute(id, &token).await {
            error!(workflow_id = %id, error = %err, "Workflow execution failed");
            let recorded = self
                .mutate(id, |r| {
                    if r.is_live() {
                        r.fail(None, &err)?;
                    }
                    Ok(())
                })
                .await;
            if let Err(err) = recorded {
                error!(workflow_id = %id, error = %err, "Could not record workflow failure");
            }
        }

        match self.store.get(&id).await {
            Ok(Some(record)) => {
                if let (true, Some(job)) = (record.dry_run, &record.engine_job_id) {
                    self.simulator.forget(job).await;
                }
                self.release(&record.subject, id).await;
            }
            Ok(None) => {}
            Err(err) => warn!(workflow_id = %id, error = %err, "Could not reload workflow"),
        }
        self.forget(id).await;
    }

    async fn execute(&self, id: WorkflowId, token: &CancellationToken) -> Result<()> {
        let record = self.load(id).await?;
        let engine = self.engine_for(record.dry_run);

        let job = match record.engine_job_id.clone() {
            Some(job) => Some(job),
            None => match self.submit(&record, engine.as_ref()).await {
                Ok(job) => job,
                Err(err) => {
                    warn!(workflow_id = %id, error = %err, "Submission failed");
                    let step = record.current_step().map(str::to_string);
                    match step {
                        Some(step) => self.fail_step(id, &step, &err).await?,
                        None => return Err(err),
                    }
                    return Ok(());
                }
            },
        };

        if let (Some(job), None) = (&job, &record.engine_job_id) {
            let live = self
                .mutate(id, |r| {
                    if r.is_live() {
                        r.engine_job_id = Some(job.clone());
                    }
                    Ok(r.is_live())
                })
                .await?;
            if !live {
                // aborted while the submission was in flight
                self.cancel_job(&record, job).await;
                return Ok(());
            }
        }

        for step in &record.steps {
            if token.is_cancelled() {
                return Ok(());
            }

            match self.mutate(id, |r| r.start_step(&step.name)).await {
                Ok(true) => {}
                Ok(false) => return Ok(()),
                Err(err) => {
                    self.fail_step(id, &step.name, &err).await?;
                    return Ok(());
                }
            }
            info!(workflow_id = %id, step = %step.name, "Step started");

            let outcome = match (step.action, &job) {
                (StepAction::Apply(_), Some(job)) => {
                    StepWatcher {
                        workflow_id: id,
                        job,
                        engine: engine.as_ref(),
                        store: self.store.as_ref(),
                        policy: &self.policy,
                        token,
                    }
                    .watch(&step.name)
                    .await
                }
                (StepAction::Apply(_), None) => Err(ProvisionError::step_failed(
                    &step.name,
                    "no engine job was submitted",
                )),
                (StepAction::Verify, job) if record.dry_run => {
                    self.verify_dry_run(&record.subject, job.as_ref(), &step.name)
                        .await
                }
                (StepAction::Verify, _) => self.verify(&record.subject, &step.name).await,
            };

            match outcome {
                Ok(StepOutcome::Succeeded { logs }) => {
                    let status = self
                        .mutate(id, |r| {
                            if r.status != WorkflowStatus::Running {
                                return Ok(None);
                            }
                            r.complete_step(&step.name, &logs)?;
                            Ok(Some(r.status))
                        })
                        .await?;
                    match status {
                        None => return Ok(()),
                        Some(WorkflowStatus::Succeeded) => {
                            info!(workflow_id = %id, subject = %record.subject, "Workflow succeeded");
                        }
                        Some(_) => info!(workflow_id = %id, step = %step.name, "Step succeeded"),
                    }
                }
                Ok(StepOutcome::Interrupted) => {
                    info!(workflow_id = %id, step = %step.name, "Execution interrupted");
                    return Ok(());
                }
                Err(err) => {
                    warn!(workflow_id = %id, step = %step.name, error = %err, "Step failed");
                    self.fail_step(id, &step.name, &err).await?;
                    if let Some(job) = &job {
                        self.cancel_job(&record, job).await;
                    }
                    return Ok(());
                }
            }
        }

        Ok(())
    }

    /// Submit every pending apply step of `record` in one engine job.
    async fn submit(
        &self,
        record: &WorkflowRecord,
        engine: &dyn WorkflowEngine,
    ) -> Result<Option<EngineJobId>> {
        let mut steps = Vec::new();
        for step in &record.steps {
            if let StepAction::Apply(key) = step.action {
                if step.status != StepStatus::Pending {
                    continue;
                }
                let manifest = record.manifests.get(key).ok_or_else(|| {
                    ProvisionError::config_error(format!(
                        "step '{}' refers to missing manifest {}",
                        step.name, key
                    ))
                })?;
                steps.push(EngineStep {
                    name: step.name.clone(),
                    manifest: manifest.clone(),
                });
            }
        }
        if steps.is_empty() {
            return Ok(None);
        }

        let submission = EngineSubmission {
            workflow_id: record.id,
            subject: record.subject.clone(),
            steps,
        };
        let submission = &submission;
        let job = with_backoff(&self.policy, "submit", move || engine.submit(submission))
            .await
            .map_err(|err| {
                if err.is_transient() {
                    ProvisionError::EngineUnavailable(err.to_string())
                } else {
                    err
                }
            })?;

        info!(workflow_id = %record.id, job = %job, "Submitted to workflow engine");
        Ok(Some(job))
    }

    async fn verify(&self, subject: &Subject, step: &str) -> Result<StepOutcome> {
        let inspector = self.inspector.as_ref();
        let kind = subject.kind;
        let name = subject.name.as_str();
        let exists = with_backoff(&self.policy, "exists", move || inspector.exists(kind, name)).await?;
        if exists {
            Ok(StepOutcome::Succeeded {
                logs: format!("{} exists", subject),
            })
        } else {
            Err(ProvisionError::step_failed(
                step,
                format!("{} does not exist after apply", subject),
            ))
        }
    }

    /// Only the dry run's own job can say its subject would exist.
    async fn verify_dry_run(
        &self,
        subject: &Subject,
        job: Option<&EngineJobId>,
        step: &str,
    ) -> Result<StepOutcome> {
        let applied = match job {
            Some(job) => self.simulator.would_exist(job).await,
            None => false,
        };
        if applied {
            Ok(StepOutcome::Succeeded {
                logs: format!("dry-run: {} would exist", subject),
            })
        } else {
            Err(ProvisionError::step_failed(
                step,
                format!("dry-run job never applied {}", subject),
            ))
        }
    }

    async fn fail_step(&self, id: WorkflowId, step: &str, err: &ProvisionError) -> Result<()> {
        self.mutate(id, |r| {
            if r.is_live() {
                r.fail(Some(step), err)?;
            }
            Ok(())
        })
        .await
    }

    async fn cancel_job(&self, record: &WorkflowRecord, job: &EngineJobId) {
        let engine = self.engine_for(record.dry_run);
        if let Err(err) = engine.cancel(job).await {
            warn!(
                workflow_id = %record.id,
                job = %job,
                error = %err,
                "Could not cancel engine job"
            );
        }
    }
}
