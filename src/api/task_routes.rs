//! Task CRUD endpoints.
//!
//! ## Endpoints
//!
//! - `GET /tasks` - bounded, scoped list with filter/projection/sort/pagination
//! - `GET /tasks/:id` - fetch one task, optionally projected
//! - `POST /tasks` - create a task owned by the caller
//! - `PUT /tasks/:id` - partial update returning the post-image
//! - `DELETE /tasks/:id` - delete a task
//!
//! Handlers validate before touching the store, check existence before
//! ownership, and delegate all ownership/role decisions to [`crate::policy`].

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::session::Caller;
use crate::api::AppState;
use crate::error::ApiError;
use crate::models::{parse_due_date, NewTask, TaskChanges};
use crate::policy::{self, ListScope};
use crate::query::{parse_projection, shape_task, ListParams, QuerySpec};
use crate::store::UpdateOutcome;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/tasks", get(list_tasks).post(create_task))
        .route(
            "/tasks/:id",
            get(get_task).put(update_task).delete(delete_task),
        )
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Serialize)]
pub struct ListResponse {
    pub count: usize,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub items: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GetParams {
    pub fields: Option<String>,
}

/// Create body. Any owner field a client smuggles in is simply not part of
/// this struct: ownership always comes from the authenticated caller.
#[derive(Debug, Default, Deserialize)]
pub struct CreateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_done: Option<bool>,
    pub priority: Option<i32>,
    pub due_date: Option<String>,
    pub category: Option<String>,
    pub time_hour: Option<i32>,
}

/// Update body. A missing field means "leave unchanged"; an explicit `null`
/// on the clearable fields means "set to absent", which the double-`Option`
/// deserializer keeps distinguishable.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub is_done: Option<bool>,
    // Double-Option so an explicit null can be rejected: priority is not a
    // clearable field.
    #[serde(default, deserialize_with = "double_option")]
    pub priority: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub category: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub time_hour: Option<Option<i32>>,
}

fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

// ============================================================================
// Validation
// ============================================================================

fn invalid(msg: &str) -> ApiError {
    ApiError::InvalidInput(msg.to_string())
}

fn parse_task_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::InvalidId)
}

fn check_priority(priority: i32) -> Result<i32, ApiError> {
    if (1..=5).contains(&priority) {
        Ok(priority)
    } else {
        Err(invalid("Invalid field: priority (1-5)"))
    }
}

fn check_time_hour(hour: i32) -> Result<i32, ApiError> {
    if (0..=23).contains(&hour) {
        Ok(hour)
    } else {
        Err(invalid("Invalid field: time_hour (0-23)"))
    }
}

fn validate_create(body: CreateTaskRequest, owner_id: Uuid) -> Result<NewTask, ApiError> {
    let title = body
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| invalid("Missing or invalid field: title"))?
        .to_string();

    let priority = body.priority.map(check_priority).transpose()?;
    let time_hour = body.time_hour.map(check_time_hour).transpose()?;
    let due_date = body
        .due_date
        .as_deref()
        .map(|raw| parse_due_date(raw).ok_or_else(|| invalid("Invalid field: due_date (ISO date string)")))
        .transpose()?;

    Ok(NewTask {
        title,
        description: body.description.map(|d| d.trim().to_string()),
        is_done: body.is_done.unwrap_or(false),
        priority,
        due_date,
        category: body.category.map(|c| c.trim().to_string()),
        time_hour,
        owner_id,
        created_at: Utc::now(),
    })
}

fn validate_update(body: UpdateTaskRequest) -> Result<TaskChanges, ApiError> {
    let mut changes = TaskChanges::default();

    if let Some(title) = body.title {
        let title = title.trim().to_string();
        if title.is_empty() {
            return Err(invalid("Invalid field: title"));
        }
        changes.title = Some(title);
    }
    if let Some(description) = body.description {
        changes.description = Some(description.map(|d| d.trim().to_string()));
    }
    if let Some(is_done) = body.is_done {
        changes.is_done = Some(is_done);
    }
    if let Some(priority) = body.priority {
        let priority = priority.ok_or_else(|| invalid("Invalid field: priority (1-5)"))?;
        changes.priority = Some(check_priority(priority)?);
    }
    if let Some(due_date) = body.due_date {
        changes.due_date = Some(match due_date.as_deref().map(str::trim) {
            // Explicit null and the empty string both clear the field.
            None | Some("") => None,
            Some(raw) => Some(
                parse_due_date(raw)
                    .ok_or_else(|| invalid("Invalid field: due_date (ISO date string)"))?,
            ),
        });
    }
    if let Some(category) = body.category {
        changes.category = Some(category.map(|c| c.trim().to_string()));
    }
    if let Some(time_hour) = body.time_hour {
        changes.time_hour = Some(time_hour.map(check_time_hour).transpose()?);
    }

    if changes.is_empty() {
        return Err(ApiError::NoFields);
    }
    Ok(changes)
}

// ============================================================================
// Handlers
// ============================================================================

async fn list_tasks(
    State(state): State<AppState>,
    caller: Caller,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResponse>, ApiError> {
    let mut spec = QuerySpec::from_params(&params);
    match policy::authorize_list(caller.0.as_ref())? {
        ListScope::All => {}
        ListScope::Owner(owner) => spec.filter.owner_id = Some(owner),
    }

    let tasks = state
        .store
        .find(&spec.filter, &spec.sort, spec.skip(), spec.limit)
        .await?;
    let total = state.store.count(&spec.filter).await?;

    let items: Vec<Value> = tasks
        .iter()
        .map(|task| shape_task(task, spec.projection.as_ref()))
        .collect();

    Ok(Json(ListResponse {
        count: items.len(),
        total,
        page: spec.page,
        limit: spec.limit,
        items,
    }))
}

async fn get_task(
    State(state): State<AppState>,
    caller: Caller,
    Path(raw_id): Path<String>,
    Query(params): Query<GetParams>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_task_id(&raw_id)?;
    let task = state
        .store
        .find_by_id(id)
        .await?
        .ok_or(ApiError::NotFound)?;
    policy::authorize_record(caller.0.as_ref(), task.owner_id)?;

    let projection = parse_projection(params.fields.as_deref());
    Ok(Json(shape_task(&task, projection.as_ref())))
}

async fn create_task(
    State(state): State<AppState>,
    caller: Caller,
    body: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let identity = policy::authenticated(caller.0.as_ref())?;
    let Json(body) = body.map_err(|_| invalid("Invalid JSON body"))?;

    let new_task = validate_create(body, identity.id)?;
    let stored = state.store.insert(new_task).await?;
    Ok((StatusCode::CREATED, Json(shape_task(&stored, None))))
}

async fn update_task(
    State(state): State<AppState>,
    caller: Caller,
    Path(raw_id): Path<String>,
    body: Result<Json<UpdateTaskRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_task_id(&raw_id)?;
    let Json(body) = body.map_err(|_| invalid("Invalid JSON body"))?;
    let changes = validate_update(body)?;

    // Existence before ownership: a missing id is 404 for everyone.
    let task = state
        .store
        .find_by_id(id)
        .await?
        .ok_or(ApiError::NotFound)?;
    policy::authorize_record(caller.0.as_ref(), task.owner_id)?;

    match state.store.update(id, &changes).await? {
        UpdateOutcome::Updated(task) => Ok(Json(shape_task(&task, None))),
        // The record vanished between the ownership check and the write.
        UpdateOutcome::NotFound => Err(ApiError::NotFound),
    }
}

async fn delete_task(
    State(state): State<AppState>,
    caller: Caller,
    Path(raw_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_task_id(&raw_id)?;
    let task = state
        .store
        .find_by_id(id)
        .await?
        .ok_or(ApiError::NotFound)?;
    policy::authorize_record(caller.0.as_ref(), task.owner_id)?;

    if state.store.delete(id).await? {
        Ok(Json(json!({ "message": "Deleted" })))
    } else {
        Err(ApiError::NotFound)
    }
}
