//! Request identity and authorization.
//!
//! Authentication itself happens upstream (a reverse proxy or session
//! gateway); requests arrive carrying an already-verified account id
//! and role, or nothing. This module turns that into an [`AuthContext`]
//! and answers every "may this request do X?" question through one
//! predicate, [`AuthContext::authorize`], instead of scattering role
//! string comparisons around the codebase.

use crate::error::{Result, TrackletError};
use crate::model::Role;
use serde::Serialize;

/// The identity attached to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthContext {
    /// No valid identity was presented.
    Anonymous,
    /// A trusted upstream verified this account.
    Authenticated { user_id: i64, role: Role },
}

/// Something a request can be allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    ViewIssues,
    EditIssues,
    Comment,
    ManageUsers,
}

/// The full capability set of one identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub view_issues: bool,
    pub edit_issues: bool,
    pub comment: bool,
    pub manage_users: bool,
}

impl Capabilities {
    /// The anonymous capability set: nothing at all.
    pub const NONE: Self = Self {
        view_issues: false,
        edit_issues: false,
        comment: false,
        manage_users: false,
    };

    #[must_use]
    pub const fn for_role(role: Role) -> Self {
        match role {
            // Regular users read and discuss; changing an issue's fields
            // or lifecycle is an admin action.
            Role::User => Self {
                view_issues: true,
                edit_issues: false,
                comment: true,
                manage_users: false,
            },
            Role::Admin => Self {
                view_issues: true,
                edit_issues: true,
                comment: true,
                manage_users: true,
            },
        }
    }

    #[must_use]
    pub const fn allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::ViewIssues => self.view_issues,
            Capability::EditIssues => self.edit_issues,
            Capability::Comment => self.comment,
            Capability::ManageUsers => self.manage_users,
        }
    }
}

impl AuthContext {
    #[must_use]
    pub const fn authenticated(user_id: i64, role: Role) -> Self {
        Self::Authenticated { user_id, role }
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }

    #[must_use]
    pub const fn user_id(&self) -> Option<i64> {
        match self {
            Self::Authenticated { user_id, .. } => Some(*user_id),
            Self::Anonymous => None,
        }
    }

    #[must_use]
    pub const fn capabilities(&self) -> Capabilities {
        match self {
            Self::Authenticated { role, .. } => Capabilities::for_role(*role),
            Self::Anonymous => Capabilities::NONE,
        }
    }

    /// The one authorization gate.
    ///
    /// Anonymous requests fail with `Unauthenticated`; authenticated
    /// requests lacking the capability fail with `Forbidden` naming the
    /// attempted action. On success, returns the acting account's id.
    pub fn authorize(&self, capability: Capability, action: &'static str) -> Result<i64> {
        match self {
            Self::Anonymous => Err(TrackletError::Unauthenticated),
            Self::Authenticated { user_id, role } => {
                if Capabilities::for_role(*role).allows(capability) {
                    Ok(*user_id)
                } else {
                    Err(TrackletError::Forbidden { action })
                }
            }
        }
    }
}
