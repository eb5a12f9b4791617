//! Podcast job records and their storage.

mod memory_store;
mod store;
mod types;

pub use memory_store::InMemoryJobStore;
pub use store::{JobStore, JobStoreError};
pub use types::{display_summary, display_title, Job, JobStatus};
