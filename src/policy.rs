//! Access policy: ownership and role rules, defined once.
//!
//! Handlers never test roles or owners inline; they ask this module. The
//! rules: an absent identity is denied everything, admins see and touch
//! everything, plain users are scoped to records they own.
//!
//! Existence is checked before ownership by the handlers, so a missing
//! record yields `NotFound` before this module can yield `Forbidden`.

use uuid::Uuid;

use crate::error::ApiError;
use crate::models::Identity;

/// How a list query must be scoped for a given caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListScope {
    /// Admins: no implicit filter.
    All,
    /// Plain users: results restricted to records owned by this identity.
    /// Mandatory; not overridable by any request parameter.
    Owner(Uuid),
}

/// Require an authenticated caller, for operations that need one before any
/// record is involved (create).
pub fn authenticated(identity: Option<&Identity>) -> Result<&Identity, ApiError> {
    identity.ok_or(ApiError::Unauthenticated)
}

/// Decide the scope of a list operation.
pub fn authorize_list(identity: Option<&Identity>) -> Result<ListScope, ApiError> {
    let identity = authenticated(identity)?;
    if identity.is_admin() {
        Ok(ListScope::All)
    } else {
        Ok(ListScope::Owner(identity.id))
    }
}

/// Decide whether the caller may read, write or delete a record owned by
/// `owner_id`. Callers must have established that the record exists.
pub fn authorize_record(identity: Option<&Identity>, owner_id: Uuid) -> Result<(), ApiError> {
    let identity = authenticated(identity)?;
    if identity.is_admin() || identity.id == owner_id {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}
