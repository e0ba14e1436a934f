//! Database schema definitions.

use rusqlite::{Connection, Result};

/// The complete SQL schema for the tracklet database.
///
/// Timestamps are stored as RFC3339 TEXT in UTC. An issue is open
/// exactly while `date_closed` is NULL.
pub const SCHEMA_SQL: &str = r"
    -- Accounts
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        role TEXT NOT NULL DEFAULT 'user',
        CHECK (role IN ('user', 'admin'))
    );

    -- Issues
    CREATE TABLE IF NOT EXISTS issues (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        priority TEXT NOT NULL,
        date_opened TEXT NOT NULL,
        date_closed TEXT,
        CHECK (length(title) >= 1 AND length(title) <= 500),
        CHECK (priority IN ('High', 'Medium', 'Low'))
    );
    CREATE INDEX IF NOT EXISTS idx_issues_date_closed ON issues(date_closed);
    CREATE INDEX IF NOT EXISTS idx_issues_date_opened ON issues(date_opened);

    -- Comments
    -- user_id is intentionally not a foreign key: comments outlive
    -- deleted authors, and listings substitute a placeholder name.
    CREATE TABLE IF NOT EXISTS comments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        issue_id INTEGER NOT NULL,
        user_id INTEGER NOT NULL,
        comment TEXT NOT NULL,
        date_posted TEXT NOT NULL,
        FOREIGN KEY (issue_id) REFERENCES issues(id) ON DELETE CASCADE
    );
    CREATE INDEX IF NOT EXISTS idx_comments_issue_id ON comments(issue_id);
    CREATE INDEX IF NOT EXISTS idx_comments_date_posted ON comments(date_posted);
";

/// Apply the schema to the database.
///
/// This uses `execute_batch` to run the entire DDL script.
/// It is idempotent because all statements use `IF NOT EXISTS`.
///
/// # Errors
///
/// Returns an error if the SQL execution fails or pragmas cannot be set.
pub fn apply_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    // Set journal mode to WAL for concurrency
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // Enable foreign keys
    conn.pragma_update(None, "foreign_keys", "ON")?;

    Ok(())
}
