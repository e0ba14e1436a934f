//! Error types and handling for `tracklet`.
//!
//! # Design
//!
//! - Uses `thiserror` for derive-based error types
//! - Every variant maps to a stable `kind()` string, which the HTTP
//!   layer uses for status codes and response bodies
//! - Storage failures are always wrapped with the name of the failing
//!   operation; the raw driver error is kept as `source` for logs and
//!   never shown to clients

use thiserror::Error;

/// Primary error type for `tracklet` operations.
#[derive(Error, Debug)]
pub enum TrackletError {
    // === Auth Errors ===
    /// No authenticated account on the request.
    #[error("Authentication required")]
    Unauthenticated,

    /// Authenticated, but the account's role does not permit the action.
    #[error("Access denied: insufficient privileges to {action}")]
    Forbidden { action: &'static str },

    // === Issue Errors ===
    /// Issue with the specified ID was not found.
    #[error("Issue not found: {id}")]
    IssueNotFound { id: i64 },

    /// Write rejected because the issue is already closed.
    #[error("Issue {id} is closed and can no longer be modified")]
    IssueClosed { id: i64 },

    // === User Errors ===
    /// User with the specified ID was not found.
    #[error("User not found: {id}")]
    UserNotFound { id: i64 },

    /// Administrators may not revoke or delete their own account.
    #[error("You cannot perform this action on your own account")]
    CannotActOnSelf,

    // === Validation Errors ===
    /// Field validation failed.
    #[error("Validation failed: {field}: {reason}")]
    Validation { field: String, reason: String },

    /// Priority outside the allowed enumeration.
    #[error("Invalid priority: '{priority}' (valid: High, Medium, Low)")]
    InvalidPriority { priority: String },

    /// Role outside the allowed enumeration.
    #[error("Invalid role: '{role}' (valid: user, admin)")]
    InvalidRole { role: String },

    // === Storage Errors ===
    /// A database operation failed. The operation name is for logs and
    /// diagnostics; the driver error stays out of user-facing text.
    #[error("Storage failure during {op}")]
    Storage {
        op: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    // === Configuration Errors ===
    /// Configuration file error.
    #[error("Configuration error: {0}")]
    Config(String),

    // === I/O Errors ===
    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl TrackletError {
    /// Stable machine-readable category for this error.
    ///
    /// These strings appear in API responses and log lines, so changing
    /// one is a wire-format change.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Forbidden { .. } => "forbidden",
            Self::IssueNotFound { .. } | Self::UserNotFound { .. } => "not_found",
            Self::IssueClosed { .. } => "issue_closed",
            Self::CannotActOnSelf => "cannot_act_on_self",
            Self::Validation { .. }
            | Self::InvalidPriority { .. }
            | Self::InvalidRole { .. } => "validation",
            Self::Storage { .. } => "storage",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
            Self::Yaml(_) => "yaml",
        }
    }

    /// Can the caller fix this by changing the request?
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        !matches!(
            self,
            Self::Storage { .. } | Self::Config(_) | Self::Io(_) | Self::Json(_) | Self::Yaml(_)
        )
    }

    /// Create a validation error for a specific field.
    #[must_use]
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Wrap a failed database operation.
    #[must_use]
    pub fn storage(
        op: &'static str,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Storage {
            op,
            source: Box::new(source),
        }
    }
}

/// Result type using `TrackletError`.
pub type Result<T> = std::result::Result<T, TrackletError>;
