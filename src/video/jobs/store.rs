use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::types::{Job, JobId, JobUpdate};

/// Storage for job snapshots.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn insert(&self, job: Job);

    async fn get(&self, id: JobId) -> Option<Job>;

    /// Apply a forward update; `None` if the job is unknown, otherwise
    /// whether the update took effect.
    async fn update(&self, id: JobId, update: JobUpdate) -> Option<bool>;
}

/// Process-local store. The map lock is held only for lookup and insert;
/// each job has its own lock.
#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<JobId, Arc<RwLock<Job>>>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn entry(&self, id: JobId) -> Option<Arc<RwLock<Job>>> {
        self.jobs.read().await.get(&id).cloned()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn insert(&self, job: Job) {
        self.jobs
            .write()
            .await
            .insert(job.id, Arc::new(RwLock::new(job)));
    }

    async fn get(&self, id: JobId) -> Option<Job> {
        let entry = self.entry(id).await?;
        let job = entry.read().await.clone();
        Some(job)
    }

    async fn update(&self, id: JobId, update: JobUpdate) -> Option<bool> {
        let entry = self.entry(id).await?;
        let applied = entry.write().await.apply(update);
        Some(applied)
    }
}
