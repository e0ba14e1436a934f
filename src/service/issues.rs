//! Issue lifecycle operations.
//!
//! Closed issues are terminal: every mutation is guarded by a
//! conditional update keyed on `date_closed IS NULL`, and a zero-row
//! result is disambiguated by re-reading the issue afterwards. There is
//! no other concurrency control and none is needed.

use crate::auth::{AuthContext, Capability};
use crate::error::{Result, TrackletError};
use crate::model::{Comment, CommentWithAuthor, Issue};
use crate::storage::{CommentInsert, SqliteStorage};
use crate::validation::{CommentValidator, IssueValidator};
use chrono::Utc;

/// Raw issue fields as submitted by a client, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueInput {
    pub title: String,
    pub description: String,
    pub priority: String,
}

/// Outcome of an update attempt on an issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// At least one field changed.
    Updated(Issue),
    /// The issue is open but the submitted values match what is stored.
    NoChange(Issue),
}

/// Outcome of a close request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseOutcome {
    /// The issue was open and is now closed.
    Closed(Issue),
    /// The issue was already closed; closing is idempotent.
    AlreadyClosed(Issue),
}

/// List every issue, open ones first, newest first within each group.
///
/// # Errors
///
/// Fails for anonymous callers or on storage errors.
pub fn list_issues(storage: &SqliteStorage, ctx: &AuthContext) -> Result<Vec<Issue>> {
    ctx.authorize(Capability::ViewIssues, "view issues")?;
    storage.list_issues()
}

/// Fetch one issue.
///
/// # Errors
///
/// Fails for anonymous callers, unknown ids, or on storage errors.
pub fn get_issue(storage: &SqliteStorage, ctx: &AuthContext, id: i64) -> Result<Issue> {
    ctx.authorize(Capability::ViewIssues, "view issues")?;
    storage
        .get_issue(id)?
        .ok_or(TrackletError::IssueNotFound { id })
}

/// Create a new open issue from raw fields.
///
/// # Errors
///
/// Fails for anonymous callers, invalid fields, or on storage errors.
pub fn create_issue(
    storage: &mut SqliteStorage,
    ctx: &AuthContext,
    input: &IssueInput,
) -> Result<Issue> {
    let actor = ctx.authorize(Capability::EditIssues, "create issues")?;
    let draft = IssueValidator::validate(&input.title, &input.description, &input.priority)?;

    let issue = storage.insert_issue(&draft, Utc::now())?;
    tracing::info!(id = issue.id, actor = actor, "Issue created");
    Ok(issue)
}

/// Update an open issue's title, description, and priority.
///
/// The write succeeds only while the issue is open. A stale form
/// submitted after someone else closed the issue is rejected with
/// `IssueClosed`, never applied.
///
/// # Errors
///
/// Fails for anonymous callers, invalid fields, unknown ids, closed
/// issues, or on storage errors.
pub fn update_issue(
    storage: &mut SqliteStorage,
    ctx: &AuthContext,
    id: i64,
    input: &IssueInput,
) -> Result<UpdateOutcome> {
    let actor = ctx.authorize(Capability::EditIssues, "edit issues")?;
    let draft = IssueValidator::validate(&input.title, &input.description, &input.priority)?;

    let rows = storage.update_issue_if_open(id, &draft)?;

    // Zero rows means closed, missing, or identical values; the current
    // row tells us which.
    let current = storage
        .get_issue(id)?
        .ok_or(TrackletError::IssueNotFound { id })?;

    if rows == 1 {
        tracing::info!(id = id, actor = actor, "Issue updated");
        Ok(UpdateOutcome::Updated(current))
    } else if current.is_open() {
        tracing::debug!(id = id, actor = actor, "Issue update changed nothing");
        Ok(UpdateOutcome::NoChange(current))
    } else {
        Err(TrackletError::IssueClosed { id })
    }
}

/// Close an issue, stamping `date_closed`.
///
/// Closing an already-closed issue is a no-op that reports success; the
/// original close timestamp is never overwritten.
///
/// # Errors
///
/// Fails for anonymous callers, unknown ids, or on storage errors.
pub fn close_issue(storage: &mut SqliteStorage, ctx: &AuthContext, id: i64) -> Result<CloseOutcome> {
    let actor = ctx.authorize(Capability::EditIssues, "close issues")?;

    let rows = storage.close_issue_if_open(id, Utc::now())?;
    let current = storage
        .get_issue(id)?
        .ok_or(TrackletError::IssueNotFound { id })?;

    if rows == 1 {
        tracing::info!(id = id, actor = actor, "Issue closed");
        Ok(CloseOutcome::Closed(current))
    } else {
        Ok(CloseOutcome::AlreadyClosed(current))
    }
}

/// Add a comment to an open issue.
///
/// The closed-state check runs inside the insert transaction, so a
/// comment can never land on an issue that was closed in the meantime.
///
/// # Errors
///
/// Fails for anonymous callers, empty or oversized bodies, unknown
/// issues, closed issues, or on storage errors.
pub fn add_comment(
    storage: &mut SqliteStorage,
    ctx: &AuthContext,
    issue_id: i64,
    body: &str,
) -> Result<Comment> {
    let actor = ctx.authorize(Capability::Comment, "comment")?;
    let body = CommentValidator::validate(body)?;

    match storage.insert_comment_if_open(issue_id, actor, &body, Utc::now())? {
        CommentInsert::Inserted(comment) => {
            tracing::info!(
                issue_id = issue_id,
                comment_id = comment.id,
                actor = actor,
                "Comment added"
            );
            Ok(comment)
        }
        CommentInsert::IssueMissing => Err(TrackletError::IssueNotFound { id: issue_id }),
        CommentInsert::IssueClosed => Err(TrackletError::IssueClosed { id: issue_id }),
    }
}

/// List an issue's comments, oldest first, with author names.
///
/// An unknown issue id yields an empty list rather than an error, and
/// comments from deleted accounts appear under a placeholder author.
///
/// # Errors
///
/// Fails for anonymous callers or on storage errors.
pub fn list_comments(
    storage: &SqliteStorage,
    ctx: &AuthContext,
    issue_id: i64,
) -> Result<Vec<CommentWithAuthor>> {
    ctx.authorize(Capability::ViewIssues, "view comments")?;
    storage.comments_for_issue(issue_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Role;

    fn seeded() -> (SqliteStorage, AuthContext, AuthContext) {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let admin = storage
            .insert_user("Ada", "Lovelace", "ada@example.com", Role::Admin)
            .unwrap();
        let member = storage
            .insert_user("Grace", "Hopper", "grace@example.com", Role::User)
            .unwrap();
        let admin_ctx = AuthContext::authenticated(admin.id, Role::Admin);
        let member_ctx = AuthContext::authenticated(member.id, Role::User);
        (storage, admin_ctx, member_ctx)
    }

    fn input(title: &str, priority: &str) -> IssueInput {
        IssueInput {
            title: title.to_string(),
            description: "details".to_string(),
            priority: priority.to_string(),
        }
    }

    #[test]
    fn anonymous_cannot_touch_issues() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let ctx = AuthContext::Anonymous;

        let err = list_issues(&storage, &ctx).unwrap_err();
        assert_eq!(err.kind(), "unauthenticated");
        let err = create_issue(&mut storage, &ctx, &input("Title", "High")).unwrap_err();
        assert_eq!(err.kind(), "unauthenticated");
        let err = add_comment(&mut storage, &ctx, 1, "hi").unwrap_err();
        assert_eq!(err.kind(), "unauthenticated");
    }

    #[test]
    fn non_admin_mutations_forbidden_even_with_valid_input() {
        let (mut storage, admin, member) = seeded();
        let issue = create_issue(&mut storage, &admin, &input("Real issue", "High")).unwrap();

        let err = create_issue(&mut storage, &member, &input("Valid", "Low")).unwrap_err();
        assert_eq!(err.kind(), "forbidden");

        let err =
            update_issue(&mut storage, &member, issue.id, &input("Valid", "Low")).unwrap_err();
        assert_eq!(err.kind(), "forbidden");

        let err = close_issue(&mut storage, &member, issue.id).unwrap_err();
        assert_eq!(err.kind(), "forbidden");

        // Nothing changed underneath.
        let current = get_issue(&storage, &member, issue.id).unwrap();
        assert_eq!(current.title, "Real issue");
        assert!(current.is_open());
    }

    #[test]
    fn create_then_get_and_list() {
        let (mut storage, admin, member) = seeded();

        let created = create_issue(&mut storage, &admin, &input("Broken build", "High")).unwrap();
        let fetched = get_issue(&storage, &member, created.id).unwrap();
        assert_eq!(fetched, created);
        assert_eq!(list_issues(&storage, &member).unwrap().len(), 1);
    }

    #[test]
    fn get_unknown_issue_is_not_found() {
        let (storage, _, member) = seeded();
        let err = get_issue(&storage, &member, 404).unwrap_err();
        assert!(matches!(err, TrackletError::IssueNotFound { id: 404 }));
    }

    #[test]
    fn update_distinguishes_change_from_noop() {
        let (mut storage, admin, _) = seeded();
        let issue = create_issue(&mut storage, &admin, &input("Original", "Low")).unwrap();

        let outcome =
            update_issue(&mut storage, &admin, issue.id, &input("Renamed", "Low")).unwrap();
        assert!(matches!(outcome, UpdateOutcome::Updated(ref i) if i.title == "Renamed"));

        let outcome =
            update_issue(&mut storage, &admin, issue.id, &input("Renamed", "Low")).unwrap();
        assert!(matches!(outcome, UpdateOutcome::NoChange(ref i) if i.title == "Renamed"));
    }

    #[test]
    fn update_after_close_is_rejected_cleanly() {
        let (mut storage, admin, _) = seeded();
        let issue = create_issue(&mut storage, &admin, &input("Original", "Low")).unwrap();
        close_issue(&mut storage, &admin, issue.id).unwrap();

        let err = update_issue(&mut storage, &admin, issue.id, &input("Stale edit", "High"))
            .unwrap_err();
        assert!(matches!(err, TrackletError::IssueClosed { .. }));

        // The stale edit must not have leaked through.
        let current = get_issue(&storage, &admin, issue.id).unwrap();
        assert_eq!(current.title, "Original");
    }

    #[test]
    fn update_validation_precedence_title_first() {
        let (mut storage, admin, _) = seeded();
        let issue = create_issue(&mut storage, &admin, &input("Original", "Low")).unwrap();

        let err = update_issue(&mut storage, &admin, issue.id, &input("  ", "Bogus")).unwrap_err();
        assert!(matches!(err, TrackletError::Validation { ref field, .. } if field == "title"));
    }

    #[test]
    fn close_is_idempotent() {
        let (mut storage, admin, _) = seeded();
        let issue = create_issue(&mut storage, &admin, &input("To close", "Medium")).unwrap();

        let first = close_issue(&mut storage, &admin, issue.id).unwrap();
        let closed_at = match first {
            CloseOutcome::Closed(ref i) => i.date_closed.unwrap(),
            CloseOutcome::AlreadyClosed(_) => panic!("first close must report Closed"),
        };

        let second = close_issue(&mut storage, &admin, issue.id).unwrap();
        match second {
            CloseOutcome::AlreadyClosed(i) => assert_eq!(i.date_closed, Some(closed_at)),
            CloseOutcome::Closed(_) => panic!("second close must be a no-op"),
        }
    }

    #[test]
    fn close_unknown_issue_is_not_found() {
        let (mut storage, admin, _) = seeded();
        let err = close_issue(&mut storage, &admin, 999).unwrap_err();
        assert!(matches!(err, TrackletError::IssueNotFound { id: 999 }));
    }

    #[test]
    fn comment_flow_and_closed_rejection() {
        let (mut storage, admin, member) = seeded();
        let issue = create_issue(&mut storage, &admin, &input("Discuss", "Medium")).unwrap();

        let comment = add_comment(&mut storage, &member, issue.id, "  first post  ").unwrap();
        assert_eq!(comment.body, "first post");
        assert_eq!(comment.user_id, member.user_id().unwrap());

        close_issue(&mut storage, &admin, issue.id).unwrap();
        let err = add_comment(&mut storage, &member, issue.id, "too late").unwrap_err();
        assert!(matches!(err, TrackletError::IssueClosed { .. }));

        let comments = list_comments(&storage, &member, issue.id).unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].first_name, "Grace");
    }

    #[test]
    fn empty_comment_rejected_before_storage() {
        let (mut storage, admin, member) = seeded();
        let issue = create_issue(&mut storage, &admin, &input("Discuss", "Medium")).unwrap();

        let err = add_comment(&mut storage, &member, issue.id, "   ").unwrap_err();
        assert!(matches!(err, TrackletError::Validation { ref field, .. } if field == "comment"));
        assert!(list_comments(&storage, &member, issue.id).unwrap().is_empty());
    }

    #[test]
    fn comment_on_missing_issue_is_not_found() {
        let (mut storage, _, member) = seeded();
        let err = add_comment(&mut storage, &member, 12345, "hello").unwrap_err();
        assert!(matches!(err, TrackletError::IssueNotFound { id: 12345 }));
    }

    #[test]
    fn listing_comments_of_unknown_issue_is_empty() {
        let (storage, _, member) = seeded();
        assert!(list_comments(&storage, &member, 31337).unwrap().is_empty());
    }
}
