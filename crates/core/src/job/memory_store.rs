//! In-process job store.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{Job, JobStatus, JobStore, JobStoreError};

/// Job store backed by a map guarded by a `RwLock`.
///
/// Lives for the whole process; contents are lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<String, Job>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Job>>, JobStoreError> {
        self.jobs
            .read()
            .map_err(|e| JobStoreError::Backend(format!("lock poisoned: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, Job>>, JobStoreError> {
        self.jobs
            .write()
            .map_err(|e| JobStoreError::Backend(format!("lock poisoned: {}", e)))
    }
}

impl JobStore for InMemoryJobStore {
    fn create(&self, job: Job) -> Result<Job, JobStoreError> {
        let mut jobs = self.write()?;
        if jobs.contains_key(&job.id) {
            return Err(JobStoreError::AlreadyExists(job.id));
        }
        jobs.insert(job.id.clone(), job.clone());
        Ok(job)
    }

    fn get(&self, id: &str) -> Result<Option<Job>, JobStoreError> {
        Ok(self.read()?.get(id).cloned())
    }

    fn put(&self, job: Job) -> Result<Job, JobStoreError> {
        let mut jobs = self.write()?;
        let existing = jobs
            .get_mut(&job.id)
            .ok_or_else(|| JobStoreError::NotFound(job.id.clone()))?;

        if existing.status.is_terminal() {
            return Err(JobStoreError::TerminalState {
                job_id: job.id,
                status: existing.status,
            });
        }

        *existing = job.clone();
        Ok(job)
    }

    fn count(&self) -> Result<usize, JobStoreError> {
        Ok(self.read()?.len())
    }

    fn count_by_status(&self, status: JobStatus) -> Result<usize, JobStoreError> {
        Ok(self
            .read()?
            .values()
            .filter(|job| job.status == status)
            .count())
    }
}
