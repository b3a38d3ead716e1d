//! Query translator: raw list parameters to a bounded query specification.
//!
//! List queries are advisory, so translation never fails: unparseable or
//! out-of-range values are normalized to defaults instead of rejected. The
//! only mandatory constraint, the ownership scope for non-admin callers, is
//! added by the access policy after translation and cannot be influenced by
//! any request parameter.

use std::collections::BTreeSet;

use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::models::Task;

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;
pub const MAX_LIMIT: u64 = 100;
pub const DEFAULT_SORT_KEY: &str = "created_at";

/// Raw query-string parameters for `GET /tasks`.
///
/// Everything is text so that extraction itself can never reject a request;
/// normalization happens in [`QuerySpec::from_params`].
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub is_done: Option<String>,
    pub q: Option<String>,
    pub fields: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// Conjunction of the supported filter predicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    /// Equality on `is_done`.
    pub is_done: Option<bool>,
    /// Case-insensitive substring match on `title`.
    pub title_contains: Option<String>,
    /// Equality on `owner_id`. Set by the access policy, never by clients.
    pub owner_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub key: String,
    pub direction: SortDirection,
}

impl Default for Sort {
    fn default() -> Self {
        Sort {
            key: DEFAULT_SORT_KEY.to_string(),
            direction: SortDirection::Ascending,
        }
    }
}

/// A validated, bounded list query. Built once per request, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
    pub filter: TaskFilter,
    /// Wire field names to return; `None` means all fields. `id` is always
    /// included regardless of the requested set.
    pub projection: Option<BTreeSet<String>>,
    pub sort: Sort,
    pub page: u64,
    pub limit: u64,
}

impl QuerySpec {
    pub fn from_params(params: &ListParams) -> Self {
        let mut filter = TaskFilter::default();

        if let Some(raw) = params.is_done.as_deref() {
            match raw.to_ascii_lowercase().as_str() {
                "true" | "1" => filter.is_done = Some(true),
                "false" | "0" => filter.is_done = Some(false),
                _ => {}
            }
        }

        if let Some(q) = params.q.as_deref() {
            let q = q.trim();
            if !q.is_empty() {
                filter.title_contains = Some(q.to_string());
            }
        }

        let direction = match params.order.as_deref() {
            Some(order) if order.eq_ignore_ascii_case("desc") => SortDirection::Descending,
            _ => SortDirection::Ascending,
        };
        let key = params
            .sort
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SORT_KEY)
            .to_string();

        let page = params
            .page
            .as_deref()
            .and_then(|p| p.trim().parse::<i64>().ok())
            .unwrap_or(DEFAULT_PAGE as i64)
            .max(DEFAULT_PAGE as i64) as u64;

        let limit = params
            .limit
            .as_deref()
            .and_then(|l| l.trim().parse::<i64>().ok())
            .unwrap_or(DEFAULT_LIMIT as i64)
            .clamp(1, MAX_LIMIT as i64) as u64;

        QuerySpec {
            filter,
            projection: parse_projection(params.fields.as_deref()),
            sort: Sort { key, direction },
            page,
            limit,
        }
    }

    /// Number of records to skip before the first returned item.
    ///
    /// Saturating: a huge but parseable `page` stays a valid past-the-end
    /// query instead of overflowing. Capped at `i64::MAX` so the offset can
    /// always be bound as a database integer.
    pub fn skip(&self) -> u64 {
        self.page
            .saturating_sub(1)
            .saturating_mul(self.limit)
            .min(i64::MAX as u64)
    }
}

impl TaskFilter {
    /// Whether `task` satisfies every predicate in the conjunction.
    pub fn matches(&self, task: &Task) -> bool {
        if let Some(done) = self.is_done {
            if task.is_done != done {
                return false;
            }
        }
        if let Some(ref needle) = self.title_contains {
            if !task
                .title
                .to_lowercase()
                .contains(&needle.to_lowercase())
            {
                return false;
            }
        }
        if let Some(owner) = self.owner_id {
            if task.owner_id != owner {
                return false;
            }
        }
        true
    }
}

/// Parse a comma-separated `fields` parameter into a projection set.
///
/// Names are trimmed and empties dropped; an effectively empty list means no
/// projection restriction. Unknown field names are kept as-is: projecting a
/// field no record has simply returns records without it.
pub fn parse_projection(fields: Option<&str>) -> Option<BTreeSet<String>> {
    let raw = fields?;
    let set: BTreeSet<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if set.is_empty() {
        None
    } else {
        Some(set)
    }
}

/// Shape a task for the response, applying the projection if one was given.
///
/// Projection keeps exactly the named wire fields plus `id`.
pub fn shape_task(task: &Task, projection: Option<&BTreeSet<String>>) -> Value {
    let value = serde_json::to_value(task).unwrap_or(Value::Null);
    let Some(fields) = projection else {
        return value;
    };
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(key, _)| key == "id" || fields.contains(key))
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn params(pairs: &[(&str, &str)]) -> ListParams {
        let mut p = ListParams::default();
        for (k, v) in pairs {
            let v = Some(v.to_string());
            match *k {
                "is_done" => p.is_done = v,
                "q" => p.q = v,
                "fields" => p.fields = v,
                "sort" => p.sort = v,
                "order" => p.order = v,
                "page" => p.page = v,
                "limit" => p.limit = v,
                other => panic!("unknown param {other}"),
            }
        }
        p
    }

    #[test]
    fn defaults_when_nothing_supplied() {
        let spec = QuerySpec::from_params(&ListParams::default());
        assert_eq!(spec.filter, TaskFilter::default());
        assert!(spec.projection.is_none());
        assert_eq!(spec.sort.key, "created_at");
        assert_eq!(spec.sort.direction, SortDirection::Ascending);
        assert_eq!(spec.page, 1);
        assert_eq!(spec.limit, 10);
        assert_eq!(spec.skip(), 0);
    }

    #[test]
    fn is_done_accepts_truthy_and_falsy_tokens() {
        for (raw, want) in [
            ("true", Some(true)),
            ("TRUE", Some(true)),
            ("1", Some(true)),
            ("false", Some(false)),
            ("0", Some(false)),
            ("yes", None),
            ("", None),
            ("2", None),
        ] {
            let spec = QuerySpec::from_params(&params(&[("is_done", raw)]));
            assert_eq!(spec.filter.is_done, want, "is_done={raw:?}");
        }
    }

    #[test]
    fn free_text_is_trimmed_and_blank_ignored() {
        let spec = QuerySpec::from_params(&params(&[("q", "  milk  ")]));
        assert_eq!(spec.filter.title_contains.as_deref(), Some("milk"));

        let spec = QuerySpec::from_params(&params(&[("q", "   ")]));
        assert!(spec.filter.title_contains.is_none());
    }

    #[test]
    fn only_literal_desc_selects_descending() {
        for (raw, want) in [
            ("desc", SortDirection::Descending),
            ("DESC", SortDirection::Descending),
            ("asc", SortDirection::Ascending),
            ("descending", SortDirection::Ascending),
            ("garbage", SortDirection::Ascending),
        ] {
            let spec = QuerySpec::from_params(&params(&[("order", raw)]));
            assert_eq!(spec.sort.direction, want, "order={raw:?}");
        }
    }

    #[test]
    fn page_and_limit_are_clamped_not_rejected() {
        let spec = QuerySpec::from_params(&params(&[("page", "0"), ("limit", "1000")]));
        assert_eq!(spec.page, 1);
        assert_eq!(spec.limit, 100);

        let spec = QuerySpec::from_params(&params(&[("page", "-3"), ("limit", "0")]));
        assert_eq!(spec.page, 1);
        assert_eq!(spec.limit, 1);

        let spec = QuerySpec::from_params(&params(&[("page", "abc"), ("limit", "xyz")]));
        assert_eq!(spec.page, 1);
        assert_eq!(spec.limit, 10);

        let spec = QuerySpec::from_params(&params(&[("page", "3"), ("limit", "25")]));
        assert_eq!(spec.skip(), 50);
    }

    #[test]
    fn skip_saturates_for_huge_pages() {
        let page = i64::MAX.to_string();
        let spec = QuerySpec::from_params(&params(&[("page", &page), ("limit", "100")]));
        assert_eq!(spec.page, i64::MAX as u64);
        // No overflow, and the offset stays bindable as a database integer.
        assert_eq!(spec.skip(), i64::MAX as u64);

        let spec = QuerySpec::from_params(&params(&[("page", &page), ("limit", "1")]));
        assert_eq!(spec.skip(), i64::MAX as u64 - 1);
    }

    #[test]
    fn projection_parsing_drops_empties() {
        assert_eq!(parse_projection(None), None);
        assert_eq!(parse_projection(Some("")), None);
        assert_eq!(parse_projection(Some(" , ,")), None);

        let set = parse_projection(Some("title, is_done ,,")).unwrap();
        assert_eq!(
            set.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["is_done", "title"]
        );
    }

    #[test]
    fn shape_task_keeps_id_and_named_fields_only() {
        let task = Task {
            id: Uuid::new_v4(),
            title: "Buy milk".into(),
            description: Some("2 liters".into()),
            is_done: false,
            priority: Some(3),
            due_date: None,
            category: None,
            time_hour: None,
            owner_id: Uuid::new_v4(),
            created_at: Utc::now(),
        };

        let projection = parse_projection(Some("title,is_done,nonexistent"));
        let shaped = shape_task(&task, projection.as_ref());
        let obj = shaped.as_object().unwrap();

        let mut keys: Vec<_> = obj.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["id", "is_done", "title"]);
        assert_eq!(obj["title"], "Buy milk");

        // No projection: everything comes back.
        let full = shape_task(&task, None);
        assert!(full.get("ownerId").is_some());
    }

    #[test]
    fn filter_matches_title_case_insensitively() {
        let task = Task {
            id: Uuid::new_v4(),
            title: "Buy Milk".into(),
            description: None,
            is_done: true,
            priority: None,
            due_date: None,
            category: None,
            time_hour: None,
            owner_id: Uuid::new_v4(),
            created_at: Utc::now(),
        };

        let filter = TaskFilter {
            title_contains: Some("milk".into()),
            ..Default::default()
        };
        assert!(filter.matches(&task));

        let filter = TaskFilter {
            is_done: Some(false),
            ..Default::default()
        };
        assert!(!filter.matches(&task));

        let filter = TaskFilter {
            owner_id: Some(task.owner_id),
            is_done: Some(true),
            title_contains: Some("MILK".into()),
        };
        assert!(filter.matches(&task));
    }
}
