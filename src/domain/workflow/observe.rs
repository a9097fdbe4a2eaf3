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

use crate::domain::workflow::engine::{ObservedPhase, WorkflowEngine};
use crate::domain::workflow::record::{EngineJobId, WorkflowId, WorkflowStatus};
use crate::domain::workflow::store::WorkflowStore;
use crate::infrastructure::constants::{
    DEFAULT_OBSERVATION_WINDOW_SECS, DEFAULT_POLL_INTERVAL_MS, DEFAULT_RETRY_ATTEMPTS,
    DEFAULT_RETRY_MAX_DELAY_MS, DEFAULT_RETRY_MIN_DELAY_MS,
};
use crate::shared::error::{ProvisionError, Result};
use backon::{ExponentialBuilder, Retryable};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// How the orchestrator polls the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservationPolicy {
    pub poll_interval: Duration,
    /// Longest a single step may stay unfinished
    pub window: Duration,
    pub retry_attempts: usize,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for ObservationPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            window: Duration::from_secs(DEFAULT_OBSERVATION_WINDOW_SECS),
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            min_delay: Duration::from_millis(DEFAULT_RETRY_MIN_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_RETRY_MAX_DELAY_MS),
        }
    }
}

impl ObservationPolicy {
    pub fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.retry_attempts)
    }

    /// Longest a live executor can go without writing to its record: one
    /// observation window plus a full backoff sequence and a poll, doubled.
    pub fn stale_after(&self) -> Duration {
        let backoff = self.max_delay * (self.retry_attempts as u32 + 1);
        (self.window + backoff + self.poll_interval) * 2
    }
}

/// Run `operation`, retrying transient failures with exponential backoff.
/// The last error is returned once attempts are exhausted.
pub async fn with_backoff<T, F, Fut>(policy: &ObservationPolicy, operation: &str, f: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    f.retry(policy.backoff())
        .sleep(tokio::time::sleep)
        .when(|err: &ProvisionError| err.is_transient())
        .notify(|err: &ProvisionError, delay: Duration| {
            warn!(
                operation = %operation,
                error = %err,
                retry_in_ms = delay.as_millis() as u64,
                "Transient error, retrying"
            );
        })
        .await
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Succeeded { logs: String },
    /// Execution stopped because the record was aborted, locally or by
    /// another process sharing the store.
    Interrupted,
}

/// Polls the engine for one workflow's apply steps.
pub struct StepWatcher<'a> {
    pub workflow_id: WorkflowId,
    pub job: &'a EngineJobId,
    pub engine: &'a dyn WorkflowEngine,
    pub store: &'a dyn WorkflowStore,
    pub policy: &'a ObservationPolicy,
    pub token: &'a CancellationToken,
}

impl StepWatcher<'_> {
    pub async fn watch(&self, step: &str) -> Result<StepOutcome> {
        let started = Instant::now();

        loop {
            if self.token.is_cancelled() || !self.still_running().await? {
                return Ok(StepOutcome::Interrupted);
            }

            let engine = self.engine;
            let job = self.job;
            let observation = with_backoff(self.policy, "observe", move || engine.observe(job))
                .await
                .map_err(|err| {
                    if err.is_transient() {
                        ProvisionError::EngineUnavailable(err.to_string())
                    } else {
                        err
                    }
                })?;

            let overall = observation.overall();
            let phase = match observation.step(step) {
                // engines may omit nodes of a finished, successful run
                ObservedPhase::Running if overall == ObservedPhase::Succeeded => {
                    ObservedPhase::Succeeded
                }
                phase => phase,
            };

            match phase {
                ObservedPhase::Succeeded => {
                    return Ok(StepOutcome::Succeeded {
                        logs: observation.step_logs(step),
                    });
                }
                ObservedPhase::Failed => {
                    let message = observation
                        .message
                        .clone()
                        .unwrap_or_else(|| "engine reported the step failed".to_string());
                    return Err(ProvisionError::step_failed(step, message));
                }
                ObservedPhase::Running if overall == ObservedPhase::Failed => {
                    let message = observation
                        .message
                        .clone()
                        .unwrap_or_else(|| format!("engine job ended in phase {}", observation.phase));
                    return Err(ProvisionError::step_failed(step, message));
                }
                ObservedPhase::Running => {}
            }

            if started.elapsed() >= self.policy.window {
                return Err(ProvisionError::ObservationTimeout {
                    step: step.to_string(),
                    window_secs: self.policy.window.as_secs(),
                });
            }

            debug!(
                workflow_id = %self.workflow_id,
                step = %step,
                phase = %observation.phase,
                "Step still running"
            );

            tokio::select! {
                _ = self.token.cancelled() => return Ok(StepOutcome::Interrupted),
                _ = tokio::time::sleep(self.policy.poll_interval) => {}
            }
        }
    }

    async fn still_running(&self) -> Result<bool> {
        let record = self.store.get(&self.workflow_id).await?;
        Ok(matches!(record, Some(r) if r.status == WorkflowStatus::Running))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fast_policy(attempts: usize) -> ObservationPolicy {
        ObservationPolicy {
            poll_interval: Duration::from_millis(1),
            window: Duration::from_millis(50),
            retry_attempts: attempts,
            min_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        }
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let result = with_backoff(&fast_policy(3), "test", move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(ProvisionError::KubeError("connection reset".to_string()))
            } else {
                Ok(7)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_errors_are_not_retried() {
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let result: Result<()> = with_backoff(&fast_policy(3), "test", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ProvisionError::not_found("Workflow", "missing"))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
