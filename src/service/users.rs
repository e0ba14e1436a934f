//! User administration operations. Admin-only, with one exception
//! baked in everywhere it matters: administrators cannot strip or
//! delete their own account, so the system always keeps the admin who
//! is currently acting.

use crate::auth::{AuthContext, Capability};
use crate::error::{Result, TrackletError};
use crate::model::{Role, User};
use crate::storage::SqliteStorage;
use crate::validation::NameValidator;

/// Outcome of a role change request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleChange {
    /// The role was flipped.
    Changed(User),
    /// The user already held the requested role.
    NoChange(User),
}

/// List every account, ordered by last name then first name.
///
/// # Errors
///
/// Fails for non-admin callers or on storage errors.
pub fn list_users(storage: &SqliteStorage, ctx: &AuthContext) -> Result<Vec<User>> {
    ctx.authorize(Capability::ManageUsers, "manage users")?;
    storage.list_users()
}

/// Fetch one account.
///
/// # Errors
///
/// Fails for non-admin callers, unknown ids, or on storage errors.
pub fn get_user(storage: &SqliteStorage, ctx: &AuthContext, id: i64) -> Result<User> {
    ctx.authorize(Capability::ManageUsers, "manage users")?;
    storage
        .get_user(id)?
        .ok_or(TrackletError::UserNotFound { id })
}

/// Update a user's first and last name. Email and role are not
/// editable through this operation.
///
/// # Errors
///
/// Fails for non-admin callers, invalid names, unknown ids, or on
/// storage errors.
pub fn rename_user(
    storage: &mut SqliteStorage,
    ctx: &AuthContext,
    id: i64,
    first_name: &str,
    last_name: &str,
) -> Result<User> {
    let actor = ctx.authorize(Capability::ManageUsers, "manage users")?;
    let (first_name, last_name) = NameValidator::validate(first_name, last_name)?;

    let rows = storage.rename_user(id, &first_name, &last_name)?;
    if rows == 0 {
        return Err(TrackletError::UserNotFound { id });
    }

    tracing::info!(user_id = id, actor = actor, "User renamed");
    storage
        .get_user(id)?
        .ok_or(TrackletError::UserNotFound { id })
}

/// Grant or revoke the admin role.
///
/// The update is conditional on the user currently holding the
/// opposite role, so granting a role the user already has reports
/// `NoChange`. Acting on your own account is rejected outright, which
/// keeps at least the acting admin in place.
///
/// # Errors
///
/// Fails for non-admin callers, self-targeting, unknown roles, unknown
/// ids, or on storage errors.
pub fn set_role(
    storage: &mut SqliteStorage,
    ctx: &AuthContext,
    target_id: i64,
    role: &str,
) -> Result<RoleChange> {
    let actor = ctx.authorize(Capability::ManageUsers, "manage users")?;
    let role: Role = role.parse()?;

    if actor == target_id {
        return Err(TrackletError::CannotActOnSelf);
    }

    let from = match role {
        Role::Admin => Role::User,
        Role::User => Role::Admin,
    };
    let rows = storage.set_role_if_currently(target_id, from, role)?;

    let current = storage
        .get_user(target_id)?
        .ok_or(TrackletError::UserNotFound { id: target_id })?;

    if rows == 1 {
        tracing::info!(
            user_id = target_id,
            role = %role,
            actor = actor,
            "User role changed"
        );
        Ok(RoleChange::Changed(current))
    } else {
        Ok(RoleChange::NoChange(current))
    }
}

/// Delete an account. The account's comments are kept and show up
/// under a placeholder author from then on.
///
/// # Errors
///
/// Fails for non-admin callers, self-targeting, unknown ids, or on
/// storage errors.
pub fn delete_user(storage: &mut SqliteStorage, ctx: &AuthContext, target_id: i64) -> Result<()> {
    let actor = ctx.authorize(Capability::ManageUsers, "delete users")?;

    if actor == target_id {
        return Err(TrackletError::CannotActOnSelf);
    }

    let rows = storage.delete_user(target_id)?;
    if rows == 0 {
        return Err(TrackletError::UserNotFound { id: target_id });
    }

    tracing::info!(user_id = target_id, actor = actor, "User deleted");
    Ok(())
}
