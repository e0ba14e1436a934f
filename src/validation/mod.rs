//! Validation helpers for `tracklet`.
//!
//! These routines normalize and check user-submitted fields before
//! anything touches storage. Checks run in a fixed order (title before
//! priority, first name before last name) and report the first failing
//! field, so clients always see one actionable error at a time.

use crate::error::{Result, TrackletError};
use crate::model::Priority;

/// Maximum issue title length in characters.
pub const MAX_TITLE_LEN: usize = 500;
/// Maximum issue description length in bytes (100KB).
pub const MAX_DESCRIPTION_LEN: usize = 102_400;
/// Maximum comment length in bytes (50KB).
pub const MAX_COMMENT_LEN: usize = 51_200;
/// Maximum length for a user's first or last name.
pub const MAX_NAME_LEN: usize = 100;

/// Validates issue fields submitted on create or update.
pub struct IssueValidator;

impl IssueValidator {
    /// Validate raw issue fields and produce a storage-ready draft.
    ///
    /// The title is checked before the priority: a request with both an
    /// empty title and an unknown priority reports the title.
    ///
    /// # Errors
    ///
    /// Returns a `Validation` error naming the first failing field, or
    /// `InvalidPriority` when the priority string is not one of the
    /// allowed words.
    pub fn validate(title: &str, description: &str, priority: &str) -> Result<IssueDraft> {
        let title = title.trim();
        if title.is_empty() {
            return Err(TrackletError::validation("title", "cannot be empty"));
        }
        if title.len() > MAX_TITLE_LEN {
            return Err(TrackletError::validation("title", "exceeds 500 characters"));
        }

        let description = description.trim();
        if description.len() > MAX_DESCRIPTION_LEN {
            return Err(TrackletError::validation("description", "exceeds 100KB"));
        }

        let priority: Priority = priority.parse()?;

        Ok(IssueDraft {
            title: title.to_string(),
            description: description.to_string(),
            priority,
        })
    }
}

/// Issue fields that passed validation, trimmed and typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueDraft {
    pub title: String,
    pub description: String,
    pub priority: Priority,
}

/// Validates comment text before insertion.
pub struct CommentValidator;

impl CommentValidator {
    /// Trim and check a comment body.
    ///
    /// # Errors
    ///
    /// Returns a `Validation` error if the body is empty after trimming
    /// or exceeds the size cap.
    pub fn validate(body: &str) -> Result<String> {
        let body = body.trim();
        if body.is_empty() {
            return Err(TrackletError::validation("comment", "cannot be empty"));
        }
        if body.len() > MAX_COMMENT_LEN {
            return Err(TrackletError::validation("comment", "exceeds 50KB"));
        }
        Ok(body.to_string())
    }
}

/// Validates user name fields on profile edits.
pub struct NameValidator;

impl NameValidator {
    /// Trim and check first and last name, in that order.
    ///
    /// # Errors
    ///
    /// Returns a `Validation` error naming the first failing field.
    pub fn validate(first_name: &str, last_name: &str) -> Result<(String, String)> {
        let first_name = first_name.trim();
        if first_name.is_empty() {
            return Err(TrackletError::validation("first_name", "cannot be empty"));
        }
        if first_name.len() > MAX_NAME_LEN {
            return Err(TrackletError::validation(
                "first_name",
                "exceeds 100 characters",
            ));
        }

        let last_name = last_name.trim();
        if last_name.is_empty() {
            return Err(TrackletError::validation("last_name", "cannot be empty"));
        }
        if last_name.len() > MAX_NAME_LEN {
            return Err(TrackletError::validation(
                "last_name",
                "exceeds 100 characters",
            ));
        }

        Ok((first_name.to_string(), last_name.to_string()))
    }
}
