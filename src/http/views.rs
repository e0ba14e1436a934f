//! JSON response shapes for the HTTP API.
//!
//! Mutation responses all carry a request-scoped `{status, message}`
//! pair plus the fresh entity, replacing the session flash messages a
//! browser UI would use. Listing endpoints return bare arrays.

use crate::model::{Comment, Issue, IssueStatus, Priority, User};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Outcome summary attached to every mutation response and error body.
#[derive(Debug, Clone, Serialize)]
pub struct ApiMessage {
    /// Stable machine-readable outcome (`created`, `updated`,
    /// `no_change`, `closed`, `deleted`, or an error kind).
    pub status: &'static str,
    /// Human-readable sentence for display.
    pub message: String,
}

impl ApiMessage {
    #[must_use]
    pub fn new(status: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

/// An issue as rendered to clients, with the derived `status` field.
#[derive(Debug, Clone, Serialize)]
pub struct IssueView {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub status: IssueStatus,
    pub date_opened: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_closed: Option<DateTime<Utc>>,
}

impl From<Issue> for IssueView {
    fn from(issue: Issue) -> Self {
        let status = issue.status();
        Self {
            id: issue.id,
            title: issue.title,
            description: issue.description,
            priority: issue.priority,
            status,
            date_opened: issue.date_opened,
            date_closed: issue.date_closed,
        }
    }
}

/// Mutation response wrapping an issue.
#[derive(Debug, Serialize)]
pub struct IssueResponse {
    #[serde(flatten)]
    pub outcome: ApiMessage,
    pub issue: IssueView,
}

/// Mutation response wrapping a freshly created comment.
#[derive(Debug, Serialize)]
pub struct CommentResponse {
    #[serde(flatten)]
    pub outcome: ApiMessage,
    pub comment: Comment,
}

/// Mutation response wrapping a user account.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    #[serde(flatten)]
    pub outcome: ApiMessage,
    pub user: User,
}
