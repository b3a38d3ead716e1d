//! Taskboard: a task-management REST service.
//!
//! The interesting part lives in three small components: the query
//! translator ([`query`]) turns untrusted query-string parameters into a
//! bounded [`query::QuerySpec`], the access policy ([`policy`]) decides what
//! an authenticated caller may see or touch, and the handlers ([`api`])
//! orchestrate both against a pluggable record store ([`store`]).

pub mod api;
pub mod error;
pub mod models;
pub mod policy;
pub mod query;
pub mod store;

pub use api::{router, AppState};
pub use error::{ApiError, StoreError};
