//! In-memory task store.
//!
//! Backs the test suite and the database-less dev path. Sorting is stable,
//! so ties keep insertion order, which is also what the list contract
//! promises ("natural store order" for equal keys).

use std::cmp::Ordering;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{NewTask, Task, TaskChanges};
use crate::query::{Sort, SortDirection, TaskFilter};

use super::{TaskStore, UpdateOutcome};

#[derive(Default)]
pub struct MemoryTaskStore {
    tasks: RwLock<Vec<Task>>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn compare(a: &Task, b: &Task, key: &str) -> Ordering {
        match key {
            "id" => a.id.cmp(&b.id),
            "title" => a.title.cmp(&b.title),
            "description" => a.description.cmp(&b.description),
            "is_done" => a.is_done.cmp(&b.is_done),
            "priority" => a.priority.cmp(&b.priority),
            "due_date" => a.due_date.cmp(&b.due_date),
            "category" => a.category.cmp(&b.category),
            "time_hour" => a.time_hour.cmp(&b.time_hour),
            "ownerId" | "owner_id" => a.owner_id.cmp(&b.owner_id),
            // Unknown sort keys fall back to created_at, same as the
            // Postgres adapter.
            _ => a.created_at.cmp(&b.created_at),
        }
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn find(
        &self,
        filter: &TaskFilter,
        sort: &Sort,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Task>, StoreError> {
        let tasks = self.tasks.read().await;
        let mut matched: Vec<Task> = tasks.iter().filter(|t| filter.matches(t)).cloned().collect();
        matched.sort_by(|a, b| {
            let ord = Self::compare(a, b, &sort.key);
            match sort.direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            }
        });
        Ok(matched
            .into_iter()
            .skip(skip as usize)
            .take(limit as usize)
            .collect())
    }

    async fn count(&self, filter: &TaskFilter) -> Result<u64, StoreError> {
        let tasks = self.tasks.read().await;
        Ok(tasks.iter().filter(|t| filter.matches(t)).count() as u64)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        let tasks = self.tasks.read().await;
        Ok(tasks.iter().find(|t| t.id == id).cloned())
    }

    async fn insert(&self, task: NewTask) -> Result<Task, StoreError> {
        let stored = Task {
            id: Uuid::new_v4(),
            title: task.title,
            description: task.description,
            is_done: task.is_done,
            priority: task.priority,
            due_date: task.due_date,
            category: task.category,
            time_hour: task.time_hour,
            owner_id: task.owner_id,
            created_at: task.created_at,
        };
        self.tasks.write().await.push(stored.clone());
        Ok(stored)
    }

    async fn update(&self, id: Uuid, changes: &TaskChanges) -> Result<UpdateOutcome, StoreError> {
        let mut tasks = self.tasks.write().await;
        match tasks.iter_mut().find(|t| t.id == id) {
            Some(task) => {
                changes.apply_to(task);
                Ok(UpdateOutcome::Updated(task.clone()))
            }
            None => Ok(UpdateOutcome::NotFound),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut tasks = self.tasks.write().await;
        let before = tasks.len();
        tasks.retain(|t| t.id != id);
        Ok(tasks.len() < before)
    }
}
