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

use crate::domain::workflow::record::{WorkflowId, WorkflowRecord, WorkflowStatus};
use crate::shared::error::Result;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Persistence for workflow records. Writes replace the whole record.
#[async_trait::async_trait]
pub trait WorkflowStore: Send + Sync {
    async fn get(&self, id: &WorkflowId) -> Result<Option<WorkflowRecord>>;

    /// All records, oldest first.
    async fn list(&self) -> Result<Vec<WorkflowRecord>>;

    async fn list_by_status(&self, statuses: &[WorkflowStatus]) -> Result<Vec<WorkflowRecord>> {
        let records = self.list().await?;
        Ok(records
            .into_iter()
            .filter(|r| statuses.contains(&r.status))
            .collect())
    }

    async fn upsert(&self, record: &WorkflowRecord) -> Result<()>;
}

#[derive(Default)]
pub struct InMemoryWorkflowStore {
    records: RwLock<HashMap<WorkflowId, WorkflowRecord>>,
}

impl InMemoryWorkflowStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl WorkflowStore for InMemoryWorkflowStore {
    async fn get(&self, id: &WorkflowId) -> Result<Option<WorkflowRecord>> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<WorkflowRecord>> {
        let mut records: Vec<_> = self.records.read().await.values().cloned().collect();
        records.sort_by_key(|r| r.created_at);
        Ok(records)
    }

    async fn upsert(&self, record: &WorkflowRecord) -> Result<()> {
        self.records
            .write()
            .await
            .insert(record.id, record.clone());
        Ok(())
    }
}
