//! Core data types for `tracklet`.
//!
//! This module defines the fundamental types used throughout the application:
//! - `Issue` - The tracked work item
//! - `IssueStatus` - Open/closed lifecycle state, derived from `date_closed`
//! - `Priority` - Issue priority levels
//! - `User` - A registered account
//! - `Role` - Account role (drives capabilities)
//! - `Comment` - Discussion entry on an issue

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Name shown for comment authors whose account has been deleted.
///
/// Comments deliberately outlive their authors, so listings substitute
/// this placeholder instead of dropping the row.
pub const DELETED_USER_FIRST_NAME: &str = "Former";
/// Last-name half of the deleted-author placeholder.
pub const DELETED_USER_LAST_NAME: &str = "user";

/// Issue priority.
///
/// Stored and transmitted as the capitalized English word, matching the
/// `CHECK` constraint on the `issues` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Priority {
    type Err = crate::error::TrackletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "High" => Ok(Self::High),
            "Medium" => Ok(Self::Medium),
            "Low" => Ok(Self::Low),
            other => Err(crate::error::TrackletError::InvalidPriority {
                priority: other.to_string(),
            }),
        }
    }
}

/// Issue lifecycle state.
///
/// Not stored directly; an issue is open exactly while `date_closed` is
/// `NULL`, and closing is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    Open,
    Closed,
}

impl IssueStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = crate::error::TrackletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            other => Err(crate::error::TrackletError::InvalidRole {
                role: other.to_string(),
            }),
        }
    }
}

/// A tracked issue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Issue {
    pub id: i64,

    /// Title (1-500 chars, whitespace-trimmed).
    pub title: String,

    /// Detailed description; may be empty.
    pub description: String,

    pub priority: Priority,

    /// Creation timestamp.
    pub date_opened: DateTime<Utc>,

    /// Set exactly once, when the issue is closed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_closed: Option<DateTime<Utc>>,
}

impl Issue {
    #[must_use]
    pub const fn status(&self) -> IssueStatus {
        if self.date_closed.is_none() {
            IssueStatus::Open
        } else {
            IssueStatus::Closed
        }
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.date_closed.is_none()
    }
}

/// A registered account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
}

impl User {
    /// `"First Last"`, as rendered in listings.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// A comment on an issue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Comment {
    pub id: i64,
    pub issue_id: i64,
    /// Author account id. Not a foreign key: the author may since have
    /// been deleted.
    pub user_id: i64,
    #[serde(rename = "comment")]
    pub body: String,
    pub date_posted: DateTime<Utc>,
}

/// A comment joined with its author's display name, as returned by
/// comment listings. Deleted authors get the `Former user` placeholder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommentWithAuthor {
    pub id: i64,
    #[serde(rename = "comment")]
    pub body: String,
    pub date_posted: DateTime<Utc>,
    pub first_name: String,
    pub last_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn priority_parses_exact_names_only() {
        assert_eq!("High".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!("  Low  ".parse::<Priority>().unwrap(), Priority::Low);
        assert!("high".parse::<Priority>().is_err());
        assert!("Urgent".parse::<Priority>().is_err());
        assert!("".parse::<Priority>().is_err());
    }

    #[test]
    fn priority_serializes_as_capitalized_word() {
        assert_eq!(serde_json::to_string(&Priority::High).unwrap(), "\"High\"");
        let p: Priority = serde_json::from_str("\"Medium\"").unwrap();
        assert_eq!(p, Priority::Medium);
    }

    #[test]
    fn role_parse_is_case_insensitive() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("Admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("USER".parse::<Role>().unwrap(), Role::User);
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn status_derived_from_date_closed() {
        let mut issue = Issue {
            id: 1,
            title: "Printer on fire".to_string(),
            description: String::new(),
            priority: Priority::High,
            date_opened: Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap(),
            date_closed: None,
        };
        assert_eq!(issue.status(), IssueStatus::Open);
        assert!(issue.is_open());

        issue.date_closed = Some(Utc.with_ymd_and_hms(2026, 1, 2, 9, 0, 0).unwrap());
        assert_eq!(issue.status(), IssueStatus::Closed);
        assert!(!issue.is_open());
    }

    #[test]
    fn open_issue_serializes_without_date_closed() {
        let issue = Issue {
            id: 7,
            title: "Test".to_string(),
            description: "d".to_string(),
            priority: Priority::Medium,
            date_opened: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
            date_closed: None,
        };
        let json = serde_json::to_value(&issue).unwrap();
        assert!(json.get("date_closed").is_none());
    }

    #[test]
    fn comment_body_serializes_under_comment_key() {
        let comment = Comment {
            id: 3,
            issue_id: 1,
            user_id: 2,
            body: "Looks fixed to me".to_string(),
            date_posted: Utc.with_ymd_and_hms(2026, 2, 1, 8, 30, 0).unwrap(),
        };
        let json = serde_json::to_value(&comment).unwrap();
        assert_eq!(json["comment"], "Looks fixed to me");
        assert!(json.get("body").is_none());
    }
}
