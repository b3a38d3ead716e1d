//! Record store adapter boundary.
//!
//! Handlers talk to `TaskStore` and nothing else; the Postgres adapter is
//! the production backend and the in-memory adapter backs the test suite
//! and the database-less dev path. Single-record operations are assumed
//! atomic at store granularity; the core adds no locking of its own.

mod memory;
mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{NewTask, Task, TaskChanges};
use crate::query::{Sort, TaskFilter};

pub use memory::MemoryTaskStore;
pub use postgres::PgTaskStore;

/// Result of a conditional update, made explicit so handlers never have to
/// guess whether they were handed a post-image or a driver-specific shape.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    /// The record existed; this is its post-image.
    Updated(Task),
    /// The record vanished between authorization and write.
    NotFound,
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Bounded read: filter, sort, then skip/limit.
    async fn find(
        &self,
        filter: &TaskFilter,
        sort: &Sort,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Task>, StoreError>;

    /// Unbounded count of records matching `filter`.
    async fn count(&self, filter: &TaskFilter) -> Result<u64, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Task>, StoreError>;

    /// Insert and return the stored record, id assigned by the store.
    async fn insert(&self, task: NewTask) -> Result<Task, StoreError>;

    /// Apply `changes` to the record with `id`, returning the post-image.
    async fn update(&self, id: Uuid, changes: &TaskChanges) -> Result<UpdateOutcome, StoreError>;

    /// Delete by id; `false` if nothing was deleted.
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;
}
