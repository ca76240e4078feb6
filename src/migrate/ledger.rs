//! The `flow_migrations` ledger: which migrations are applied, and when.
//!
//! Every function takes a plain `&Connection`. A `rusqlite::Transaction`
//! derefs to one, so the runner records ledger changes inside the same
//! transaction as the migration body.

use rusqlite::{params, Connection, OptionalExtension};

/// Creates the ledger table if it is missing. Safe to call before every
/// ledger operation.
///
/// `applied_at` keeps millisecond precision so ordering stays meaningful
/// when several migrations land in the same second; `rowid` breaks any
/// remaining tie in insertion order.
pub fn ensure_table(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS flow_migrations (
          name TEXT PRIMARY KEY,
          applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
        );
        "#,
    )
}

pub fn is_applied(conn: &Connection, name: &str) -> rusqlite::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT count(1) FROM flow_migrations WHERE name = ?1",
        params![name],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Records `name` as applied. Fails with a constraint violation if it is
/// already recorded; check [`is_applied`] first.
pub fn mark_applied(conn: &Connection, name: &str) -> rusqlite::Result<()> {
    conn.execute("INSERT INTO flow_migrations (name) VALUES (?1)", params![name])?;
    Ok(())
}

pub fn unmark_applied(conn: &Connection, name: &str) -> rusqlite::Result<()> {
    conn.execute("DELETE FROM flow_migrations WHERE name = ?1", params![name])?;
    Ok(())
}

/// Applied migration names, oldest first.
pub fn applied(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let mut stmt =
        conn.prepare("SELECT name FROM flow_migrations ORDER BY applied_at ASC, rowid ASC")?;
    let names = stmt.query_map([], |row| row.get(0))?;
    names.collect()
}

/// The most recently applied migration, if any.
pub fn last_applied(conn: &Connection) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        "SELECT name FROM flow_migrations ORDER BY applied_at DESC, rowid DESC LIMIT 1",
        [],
        |row| row.get(0),
    )
    .optional()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        ensure_table(&conn).unwrap();
        conn
    }

    #[test]
    fn ensure_table_is_idempotent() {
        let conn = ledger();
        ensure_table(&conn).unwrap();
        ensure_table(&conn).unwrap();
        assert!(applied(&conn).unwrap().is_empty());
    }

    #[test]
    fn mark_and_unmark() {
        let conn = ledger();
        assert!(!is_applied(&conn, "20260101000000_a").unwrap());

        mark_applied(&conn, "20260101000000_a").unwrap();
        assert!(is_applied(&conn, "20260101000000_a").unwrap());

        unmark_applied(&conn, "20260101000000_a").unwrap();
        assert!(!is_applied(&conn, "20260101000000_a").unwrap());
    }

    #[test]
    fn marking_twice_is_a_constraint_error() {
        let conn = ledger();
        mark_applied(&conn, "20260101000000_a").unwrap();
        let err = mark_applied(&conn, "20260101000000_a").unwrap_err();
        assert_eq!(err.sqlite_error_code(), Some(rusqlite::ErrorCode::ConstraintViolation));
    }

    #[test]
    fn applied_order_follows_insertion_within_the_same_instant() {
        let conn = ledger();
        // Same applied_at for all three: only insertion order can separate them.
        for name in ["20260103000000_c", "20260101000000_a", "20260102000000_b"] {
            conn.execute(
                "INSERT INTO flow_migrations (name, applied_at) VALUES (?1, '2026-01-01 00:00:00.000')",
                params![name],
            )
            .unwrap();
        }

        assert_eq!(
            applied(&conn).unwrap(),
            ["20260103000000_c", "20260101000000_a", "20260102000000_b"]
        );
        assert_eq!(last_applied(&conn).unwrap().as_deref(), Some("20260102000000_b"));
    }

    #[test]
    fn last_applied_on_empty_ledger() {
        assert_eq!(last_applied(&ledger()).unwrap(), None);
    }
}
