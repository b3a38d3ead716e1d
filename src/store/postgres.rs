//! Postgres task store built on sqlx.
//!
//! Filters compile to a WHERE conjunction with bound parameters; the sort
//! key is resolved against the known column set so client input never
//! reaches the SQL text. Every write is a single statement, which supplies
//! the single-record atomicity the handlers rely on.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{NewTask, Task, TaskChanges};
use crate::query::{Sort, SortDirection, TaskFilter};

use super::{TaskStore, UpdateOutcome};

const COLUMNS: &str =
    "id, title, description, is_done, priority, due_date, category, time_hour, owner_id, created_at";

#[derive(Clone)]
pub struct PgTaskStore {
    pool: PgPool,
}

impl PgTaskStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the tasks table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS tasks (
                   id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                   title TEXT NOT NULL,
                   description TEXT,
                   is_done BOOLEAN NOT NULL DEFAULT FALSE,
                   priority INTEGER,
                   due_date TIMESTAMPTZ,
                   category TEXT,
                   time_hour INTEGER,
                   owner_id UUID NOT NULL,
                   created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
               )"#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Map a requested sort key onto a real column. Unknown keys sort by
    /// `created_at`, the same fallback the in-memory adapter uses.
    fn sort_column(key: &str) -> &'static str {
        match key {
            "id" => "id",
            "title" => "title",
            "description" => "description",
            "is_done" => "is_done",
            "priority" => "priority",
            "due_date" => "due_date",
            "category" => "category",
            "time_hour" => "time_hour",
            "ownerId" | "owner_id" => "owner_id",
            _ => "created_at",
        }
    }

    fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &TaskFilter) {
        qb.push(" WHERE TRUE");
        if let Some(done) = filter.is_done {
            qb.push(" AND is_done = ").push_bind(done);
        }
        if let Some(ref needle) = filter.title_contains {
            qb.push(" AND title ILIKE ")
                .push_bind(format!("%{}%", escape_like(needle)));
        }
        if let Some(owner) = filter.owner_id {
            qb.push(" AND owner_id = ").push_bind(owner);
        }
    }
}

/// Escape LIKE metacharacters so the needle matches literally.
fn escape_like(needle: &str) -> String {
    needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[async_trait]
impl TaskStore for PgTaskStore {
    async fn find(
        &self,
        filter: &TaskFilter,
        sort: &Sort,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Task>, StoreError> {
        let mut qb = QueryBuilder::new(format!("SELECT {COLUMNS} FROM tasks"));
        Self::push_filter(&mut qb, filter);

        let direction = match sort.direction {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        };
        qb.push(format!(
            " ORDER BY {} {direction}",
            Self::sort_column(&sort.key)
        ));
        qb.push(" OFFSET ").push_bind(skip as i64);
        qb.push(" LIMIT ").push_bind(limit as i64);

        let tasks = qb.build_query_as::<Task>().fetch_all(&self.pool).await?;
        Ok(tasks)
    }

    async fn count(&self, filter: &TaskFilter) -> Result<u64, StoreError> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM tasks");
        Self::push_filter(&mut qb, filter);
        let total: i64 = qb.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(total as u64)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        let sql = format!("SELECT {COLUMNS} FROM tasks WHERE id = $1");
        let task = sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(task)
    }

    async fn insert(&self, task: NewTask) -> Result<Task, StoreError> {
        let sql = format!(
            r#"INSERT INTO tasks (
                   title, description, is_done, priority, due_date,
                   category, time_hour, owner_id, created_at
               ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
               RETURNING {COLUMNS}"#
        );
        let stored = sqlx::query_as::<_, Task>(&sql)
            .bind(&task.title)
            .bind(&task.description)
            .bind(task.is_done)
            .bind(task.priority)
            .bind(task.due_date)
            .bind(&task.category)
            .bind(task.time_hour)
            .bind(task.owner_id)
            .bind(task.created_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(stored)
    }

    async fn update(&self, id: Uuid, changes: &TaskChanges) -> Result<UpdateOutcome, StoreError> {
        // Handlers reject empty change sets before reaching the store.
        debug_assert!(!changes.is_empty());

        let mut qb = QueryBuilder::new("UPDATE tasks SET ");
        let mut set = qb.separated(", ");

        if let Some(ref title) = changes.title {
            set.push("title = ").push_bind_unseparated(title);
        }
        if let Some(ref description) = changes.description {
            set.push("description = ")
                .push_bind_unseparated(description.clone());
        }
        if let Some(is_done) = changes.is_done {
            set.push("is_done = ").push_bind_unseparated(is_done);
        }
        if let Some(priority) = changes.priority {
            set.push("priority = ").push_bind_unseparated(priority);
        }
        if let Some(due_date) = changes.due_date {
            set.push("due_date = ").push_bind_unseparated(due_date);
        }
        if let Some(ref category) = changes.category {
            set.push("category = ")
                .push_bind_unseparated(category.clone());
        }
        if let Some(time_hour) = changes.time_hour {
            set.push("time_hour = ").push_bind_unseparated(time_hour);
        }

        qb.push(" WHERE id = ").push_bind(id);
        qb.push(format!(" RETURNING {COLUMNS}"));

        let task = qb
            .build_query_as::<Task>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(match task {
            Some(task) => UpdateOutcome::Updated(task),
            None => UpdateOutcome::NotFound,
        })
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_metacharacters_are_escaped() {
        assert_eq!(escape_like("50%_done"), "50\\%\\_done");
        assert_eq!(escape_like(r"back\slash"), r"back\\slash");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn unknown_sort_keys_fall_back_to_created_at() {
        assert_eq!(PgTaskStore::sort_column("priority"), "priority");
        assert_eq!(PgTaskStore::sort_column("ownerId"), "owner_id");
        assert_eq!(PgTaskStore::sort_column("created_at"), "created_at");
        assert_eq!(PgTaskStore::sort_column("'; DROP TABLE tasks;"), "created_at");
    }
}
