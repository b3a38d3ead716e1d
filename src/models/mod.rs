//! Domain models shared across the service.

mod identity;
mod task;

pub use identity::{Identity, Role};
pub use task::{parse_due_date, NewTask, Task, TaskChanges};
