//! `SQLite` storage implementation.
//!
//! All methods are thin, synchronous data access: conditional updates
//! report affected-row counts and leave outcome interpretation to the
//! service layer. Every database failure is wrapped with the name of
//! the failing operation before it leaves this module.

use crate::error::{Result, TrackletError};
use crate::model::{
    Comment, CommentWithAuthor, Issue, Role, User, DELETED_USER_FIRST_NAME, DELETED_USER_LAST_NAME,
};
use crate::storage::schema::apply_schema;
use crate::validation::IssueDraft;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use rusqlite::{Connection, OptionalExtension, Transaction};
use std::path::Path;
use std::time::Duration;

/// SQLite-based storage backend.
#[derive(Debug)]
pub struct SqliteStorage {
    conn: Connection,
}

/// Outcome of a guarded comment insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentInsert {
    /// The issue was open and the comment was written.
    Inserted(Comment),
    /// No issue with that id exists.
    IssueMissing,
    /// The issue exists but is closed; nothing was written.
    IssueClosed,
}

impl SqliteStorage {
    /// Open a new connection to the database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or
    /// schema application fails.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| storage_err("open database", e))?;
        conn.busy_timeout(Duration::from_secs(5))
            .map_err(|e| storage_err("open database", e))?;
        apply_schema(&conn).map_err(|e| storage_err("apply schema", e))?;
        Ok(Self { conn })
    }

    /// Open an in-memory database for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or
    /// schema application fails.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| storage_err("open database", e))?;
        apply_schema(&conn).map_err(|e| storage_err("apply schema", e))?;
        Ok(Self { conn })
    }

    // === Issues ===

    /// Insert a new issue and return it with its assigned id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails.
    pub fn insert_issue(&mut self, draft: &IssueDraft, opened_at: DateTime<Utc>) -> Result<Issue> {
        self.conn
            .execute(
                "INSERT INTO issues (title, description, priority, date_opened)
                 VALUES (?, ?, ?, ?)",
                rusqlite::params![
                    draft.title,
                    draft.description,
                    draft.priority.as_str(),
                    opened_at.to_rfc3339()
                ],
            )
            .map_err(|e| storage_err("insert_issue", e))?;

        Ok(Issue {
            id: self.conn.last_insert_rowid(),
            title: draft.title.clone(),
            description: draft.description.clone(),
            priority: draft.priority,
            date_opened: opened_at,
            date_closed: None,
        })
    }

    /// Fetch a single issue by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_issue(&self, id: i64) -> Result<Option<Issue>> {
        self.conn
            .query_row(
                "SELECT id, title, description, priority, date_opened, date_closed
                 FROM issues WHERE id = ?",
                [id],
                issue_from_row,
            )
            .optional()
            .map_err(|e| storage_err("get_issue", e))
    }

    /// List all issues, open ones first, newest first within each group.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn list_issues(&self) -> Result<Vec<Issue>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, title, description, priority, date_opened, date_closed
                 FROM issues
                 ORDER BY (date_closed IS NULL) DESC, date_opened DESC, id DESC",
            )
            .map_err(|e| storage_err("list_issues", e))?;

        let issues = stmt
            .query_map([], issue_from_row)
            .and_then(|rows| rows.collect::<std::result::Result<Vec<_>, _>>())
            .map_err(|e| storage_err("list_issues", e))?;

        Ok(issues)
    }

    /// Conditionally update an open issue's editable fields.
    ///
    /// The guard requires the issue to be open and at least one field to
    /// actually differ, so a zero return means closed, missing, or
    /// identical values. Callers disambiguate by re-reading the row.
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails.
    pub fn update_issue_if_open(&mut self, id: i64, draft: &IssueDraft) -> Result<usize> {
        self.conn
            .execute(
                "UPDATE issues SET title = ?1, description = ?2, priority = ?3
                 WHERE id = ?4 AND date_closed IS NULL
                   AND (title <> ?1 OR description <> ?2 OR priority <> ?3)",
                rusqlite::params![draft.title, draft.description, draft.priority.as_str(), id],
            )
            .map_err(|e| storage_err("update_issue", e))
    }

    /// Stamp `date_closed` on an open issue.
    ///
    /// Returns the number of affected rows: zero means the issue is
    /// missing or was already closed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails.
    pub fn close_issue_if_open(&mut self, id: i64, closed_at: DateTime<Utc>) -> Result<usize> {
        self.conn
            .execute(
                "UPDATE issues SET date_closed = ? WHERE id = ? AND date_closed IS NULL",
                rusqlite::params![closed_at.to_rfc3339(), id],
            )
            .map_err(|e| storage_err("close_issue", e))
    }

    // === Comments ===

    /// Insert a comment if, and only if, the issue is currently open.
    ///
    /// The closed-state check and the insert run in one transaction, so
    /// a concurrent close cannot slip a comment onto a closed issue.
    ///
    /// # Errors
    ///
    /// Returns an error if any statement in the transaction fails.
    pub fn insert_comment_if_open(
        &mut self,
        issue_id: i64,
        user_id: i64,
        body: &str,
        posted_at: DateTime<Utc>,
    ) -> Result<CommentInsert> {
        let tx = self
            .conn
            .transaction()
            .map_err(|e| storage_err("insert_comment", e))?;

        let date_closed: Option<Option<String>> = tx
            .query_row("SELECT date_closed FROM issues WHERE id = ?", [issue_id], |row| {
                row.get(0)
            })
            .optional()
            .map_err(|e| storage_err("insert_comment", e))?;

        let outcome = match date_closed {
            None => CommentInsert::IssueMissing,
            Some(Some(_)) => CommentInsert::IssueClosed,
            Some(None) => {
                tx.execute(
                    "INSERT INTO comments (issue_id, user_id, comment, date_posted)
                     VALUES (?, ?, ?, ?)",
                    rusqlite::params![issue_id, user_id, body, posted_at.to_rfc3339()],
                )
                .map_err(|e| storage_err("insert_comment", e))?;

                let comment = fetch_comment(&tx, tx.last_insert_rowid())
                    .map_err(|e| storage_err("insert_comment", e))?;
                CommentInsert::Inserted(comment)
            }
        };

        tx.commit().map_err(|e| storage_err("insert_comment", e))?;
        Ok(outcome)
    }

    /// List an issue's comments with author names, oldest first.
    ///
    /// Authors are joined from `users`; comments whose author has been
    /// deleted get the `Former user` placeholder.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn comments_for_issue(&self, issue_id: i64) -> Result<Vec<CommentWithAuthor>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT c.id, c.comment, c.date_posted, u.first_name, u.last_name
                 FROM comments c
                 LEFT JOIN users u ON c.user_id = u.id
                 WHERE c.issue_id = ?
                 ORDER BY c.date_posted ASC, c.id ASC",
            )
            .map_err(|e| storage_err("list_comments", e))?;

        let comments = stmt
            .query_map([issue_id], |row| {
                Ok(CommentWithAuthor {
                    id: row.get(0)?,
                    body: row.get(1)?,
                    date_posted: parse_datetime(&row.get::<_, String>(2)?),
                    first_name: row
                        .get::<_, Option<String>>(3)?
                        .unwrap_or_else(|| DELETED_USER_FIRST_NAME.to_string()),
                    last_name: row
                        .get::<_, Option<String>>(4)?
                        .unwrap_or_else(|| DELETED_USER_LAST_NAME.to_string()),
                })
            })
            .and_then(|rows| rows.collect::<std::result::Result<Vec<_>, _>>())
            .map_err(|e| storage_err("list_comments", e))?;

        Ok(comments)
    }

    // === Users ===

    /// Insert a new user account and return it with its assigned id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails, including when the
    /// email is already taken.
    pub fn insert_user(
        &mut self,
        first_name: &str,
        last_name: &str,
        email: &str,
        role: Role,
    ) -> Result<User> {
        self.conn
            .execute(
                "INSERT INTO users (first_name, last_name, email, role)
                 VALUES (?, ?, ?, ?)",
                rusqlite::params![first_name, last_name, email, role.as_str()],
            )
            .map_err(|e| storage_err("insert_user", e))?;

        Ok(User {
            id: self.conn.last_insert_rowid(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: email.to_string(),
            role,
        })
    }

    /// Fetch a single user by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_user(&self, id: i64) -> Result<Option<User>> {
        self.conn
            .query_row(
                "SELECT id, first_name, last_name, email, role FROM users WHERE id = ?",
                [id],
                user_from_row,
            )
            .optional()
            .map_err(|e| storage_err("get_user", e))
    }

    /// List all user accounts, ordered by last name then first name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn list_users(&self) -> Result<Vec<User>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, first_name, last_name, email, role FROM users
                 ORDER BY last_name ASC, first_name ASC",
            )
            .map_err(|e| storage_err("list_users", e))?;

        let users = stmt
            .query_map([], user_from_row)
            .and_then(|rows| rows.collect::<std::result::Result<Vec<_>, _>>())
            .map_err(|e| storage_err("list_users", e))?;

        Ok(users)
    }

    /// Update a user's first and last name.
    ///
    /// Returns the number of affected rows: zero means no such user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails.
    pub fn rename_user(&mut self, id: i64, first_name: &str, last_name: &str) -> Result<usize> {
        self.conn
            .execute(
                "UPDATE users SET first_name = ?, last_name = ? WHERE id = ?",
                rusqlite::params![first_name, last_name, id],
            )
            .map_err(|e| storage_err("rename_user", e))
    }

    /// Conditionally flip a user's role.
    ///
    /// The update is keyed on the role the user is expected to hold
    /// right now, so a zero return means the user is missing or already
    /// holds the target role.
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails.
    pub fn set_role_if_currently(&mut self, id: i64, from: Role, to: Role) -> Result<usize> {
        self.conn
            .execute(
                "UPDATE users SET role = ? WHERE id = ? AND role = ?",
                rusqlite::params![to.as_str(), id, from.as_str()],
            )
            .map_err(|e| storage_err("set_role", e))
    }

    /// Delete a user account. Their comments are retained on purpose.
    ///
    /// Returns the number of affected rows: zero means no such user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database delete fails.
    pub fn delete_user(&mut self, id: i64) -> Result<usize> {
        self.conn
            .execute("DELETE FROM users WHERE id = ?", [id])
            .map_err(|e| storage_err("delete_user", e))
    }
}

fn issue_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Issue> {
    Ok(Issue {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        // The CHECK constraint keeps stored values inside the enum.
        priority: row.get::<_, String>(3)?.parse().unwrap_or_default(),
        date_opened: parse_datetime(&row.get::<_, String>(4)?),
        date_closed: row
            .get::<_, Option<String>>(5)?
            .map(|s| parse_datetime(&s)),
    })
}

fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        email: row.get(3)?,
        role: row.get::<_, String>(4)?.parse().unwrap_or(Role::User),
    })
}

fn fetch_comment(tx: &Transaction<'_>, comment_id: i64) -> rusqlite::Result<Comment> {
    tx.query_row(
        "SELECT id, issue_id, user_id, comment, date_posted FROM comments WHERE id = ?",
        rusqlite::params![comment_id],
        |row| {
            Ok(Comment {
                id: row.get(0)?,
                issue_id: row.get(1)?,
                user_id: row.get(2)?,
                body: row.get(3)?,
                date_posted: parse_datetime(&row.get::<_, String>(4)?),
            })
        },
    )
}

fn storage_err(op: &'static str, err: rusqlite::Error) -> TrackletError {
    tracing::error!(op, error = %err, "database operation failed");
    TrackletError::storage(op, err)
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Utc.from_utc_datetime(&naive);
    }

    Utc::now()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Priority;

    fn draft(title: &str, priority: Priority) -> IssueDraft {
        IssueDraft {
            title: title.to_string(),
            description: "desc".to_string(),
            priority,
        }
    }

    fn ts(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn insert_and_get_issue_roundtrip() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let issue = storage
            .insert_issue(&draft("Printer on fire", Priority::High), ts(1, 9))
            .unwrap();

        let fetched = storage.get_issue(issue.id).unwrap().unwrap();
        assert_eq!(fetched, issue);
        assert!(fetched.is_open());
    }

    #[test]
    fn get_issue_missing_returns_none() {
        let storage = SqliteStorage::open_memory().unwrap();
        assert!(storage.get_issue(999).unwrap().is_none());
    }

    #[test]
    fn update_counts_only_real_changes() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let issue = storage
            .insert_issue(&draft("Original", Priority::Low), ts(1, 9))
            .unwrap();

        let changed = draft("Renamed", Priority::Low);
        assert_eq!(storage.update_issue_if_open(issue.id, &changed).unwrap(), 1);

        // Submitting the now-current values touches nothing.
        assert_eq!(storage.update_issue_if_open(issue.id, &changed).unwrap(), 0);
        let current = storage.get_issue(issue.id).unwrap().unwrap();
        assert_eq!(current.title, "Renamed");
        assert!(current.is_open());
    }

    #[test]
    fn update_skips_closed_issue() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let issue = storage
            .insert_issue(&draft("Original", Priority::Low), ts(1, 9))
            .unwrap();
        assert_eq!(storage.close_issue_if_open(issue.id, ts(2, 9)).unwrap(), 1);

        let rows = storage
            .update_issue_if_open(issue.id, &draft("Renamed", Priority::High))
            .unwrap();
        assert_eq!(rows, 0);
        let current = storage.get_issue(issue.id).unwrap().unwrap();
        assert_eq!(current.title, "Original");
    }

    #[test]
    fn close_is_single_shot() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let issue = storage
            .insert_issue(&draft("To close", Priority::Medium), ts(1, 9))
            .unwrap();

        assert_eq!(storage.close_issue_if_open(issue.id, ts(2, 9)).unwrap(), 1);
        assert_eq!(storage.close_issue_if_open(issue.id, ts(3, 9)).unwrap(), 0);

        let closed = storage.get_issue(issue.id).unwrap().unwrap();
        assert_eq!(closed.date_closed, Some(ts(2, 9)));
    }

    #[test]
    fn comment_insert_respects_issue_state() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let user = storage
            .insert_user("Ada", "Lovelace", "ada@example.com", Role::User)
            .unwrap();
        let issue = storage
            .insert_issue(&draft("Discuss", Priority::Medium), ts(1, 9))
            .unwrap();

        let inserted = storage
            .insert_comment_if_open(issue.id, user.id, "first", ts(1, 10))
            .unwrap();
        assert!(matches!(inserted, CommentInsert::Inserted(ref c) if c.body == "first"));

        assert_eq!(
            storage
                .insert_comment_if_open(999, user.id, "ghost", ts(1, 11))
                .unwrap(),
            CommentInsert::IssueMissing
        );

        storage.close_issue_if_open(issue.id, ts(2, 9)).unwrap();
        assert_eq!(
            storage
                .insert_comment_if_open(issue.id, user.id, "late", ts(2, 10))
                .unwrap(),
            CommentInsert::IssueClosed
        );

        // The rejected comment must not have been written.
        assert_eq!(storage.comments_for_issue(issue.id).unwrap().len(), 1);
    }

    #[test]
    fn comments_ordered_oldest_first() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let user = storage
            .insert_user("Ada", "Lovelace", "ada@example.com", Role::User)
            .unwrap();
        let issue = storage
            .insert_issue(&draft("Discuss", Priority::Medium), ts(1, 9))
            .unwrap();

        storage
            .insert_comment_if_open(issue.id, user.id, "second", ts(3, 9))
            .unwrap();
        storage
            .insert_comment_if_open(issue.id, user.id, "first", ts(2, 9))
            .unwrap();

        let bodies: Vec<String> = storage
            .comments_for_issue(issue.id)
            .unwrap()
            .into_iter()
            .map(|c| c.body)
            .collect();
        assert_eq!(bodies, vec!["first", "second"]);
    }

    #[test]
    fn deleted_author_gets_placeholder_name() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let user = storage
            .insert_user("Grace", "Hopper", "grace@example.com", Role::User)
            .unwrap();
        let issue = storage
            .insert_issue(&draft("Discuss", Priority::Medium), ts(1, 9))
            .unwrap();
        storage
            .insert_comment_if_open(issue.id, user.id, "still here", ts(1, 10))
            .unwrap();

        assert_eq!(storage.delete_user(user.id).unwrap(), 1);

        let comments = storage.comments_for_issue(issue.id).unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].first_name, DELETED_USER_FIRST_NAME);
        assert_eq!(comments[0].last_name, DELETED_USER_LAST_NAME);
    }

    #[test]
    fn list_issues_open_first_then_newest() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let old_open = storage
            .insert_issue(&draft("old open", Priority::Low), ts(1, 9))
            .unwrap();
        let closed = storage
            .insert_issue(&draft("closed", Priority::Low), ts(2, 9))
            .unwrap();
        let new_open = storage
            .insert_issue(&draft("new open", Priority::Low), ts(3, 9))
            .unwrap();
        storage.close_issue_if_open(closed.id, ts(4, 9)).unwrap();

        let ids: Vec<i64> = storage.list_issues().unwrap().iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![new_open.id, old_open.id, closed.id]);
    }

    #[test]
    fn role_flip_is_guarded_by_current_role() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let user = storage
            .insert_user("Ada", "Lovelace", "ada@example.com", Role::User)
            .unwrap();

        assert_eq!(
            storage
                .set_role_if_currently(user.id, Role::User, Role::Admin)
                .unwrap(),
            1
        );
        // Already admin: the guard makes this a no-op.
        assert_eq!(
            storage
                .set_role_if_currently(user.id, Role::User, Role::Admin)
                .unwrap(),
            0
        );
        assert_eq!(storage.get_user(user.id).unwrap().unwrap().role, Role::Admin);
    }

    #[test]
    fn users_listed_by_name() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        storage
            .insert_user("Ada", "Lovelace", "ada@example.com", Role::Admin)
            .unwrap();
        storage
            .insert_user("Grace", "Hopper", "grace@example.com", Role::User)
            .unwrap();
        storage
            .insert_user("Alan", "Hopper", "alan@example.com", Role::User)
            .unwrap();

        let names: Vec<String> = storage
            .list_users()
            .unwrap()
            .into_iter()
            .map(|u| u.full_name())
            .collect();
        assert_eq!(names, vec!["Alan Hopper", "Grace Hopper", "Ada Lovelace"]);
    }

    #[test]
    fn rename_user_reports_missing() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        assert_eq!(storage.rename_user(41, "A", "B").unwrap(), 0);

        let user = storage
            .insert_user("Ada", "Lovelace", "ada@example.com", Role::User)
            .unwrap();
        assert_eq!(storage.rename_user(user.id, "Augusta", "King").unwrap(), 1);
        let renamed = storage.get_user(user.id).unwrap().unwrap();
        assert_eq!(renamed.first_name, "Augusta");
        assert_eq!(renamed.email, "ada@example.com");
    }

    #[test]
    fn duplicate_email_is_a_storage_error() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        storage
            .insert_user("Ada", "Lovelace", "ada@example.com", Role::User)
            .unwrap();
        let err = storage
            .insert_user("Other", "Person", "ada@example.com", Role::User)
            .unwrap_err();
        assert_eq!(err.kind(), "storage");
    }
}
