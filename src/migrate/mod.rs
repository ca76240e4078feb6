//! Timestamped SQL migrations.
//!
//! A migration is a pair of files in one directory:
//!
//! ```text
//! db/migrate/20260108120000_create_users.up.sql
//! db/migrate/20260108120000_create_users.down.sql
//! ```
//!
//! The 14-digit UTC timestamp prefix makes lexicographic file order equal to
//! creation order. Each migration is either **unapplied** or **applied**;
//! the `flow_migrations` [`ledger`] records which.
//!
//! | Transition | SQL run          | Ledger           |
//! |------------|------------------|------------------|
//! | apply      | `<name>.up.sql`  | row inserted     |
//! | rollback   | `<name>.down.sql`| row deleted      |
//!
//! Each transition runs the SQL body and the ledger write in one
//! transaction, so a failure anywhere leaves both the schema and the ledger
//! as they were. [`Migrator::apply_all`] stops at the first failure; the
//! migrations before it stay applied and a re-run resumes at the failed one.
//!
//! There is no cross-process locking. Two concurrent `apply_all` runs race
//! on the ledger's primary key and the loser fails.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rusqlite::Connection;
use thiserror::Error;
use tracing::{debug, info};

pub mod ledger;
pub mod scaffold;

const UP_SUFFIX: &str = ".up.sql";
const DOWN_SUFFIX: &str = ".down.sql";

#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("migrations directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("read {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("io: {0}")]
    Io(#[from] io::Error),

    #[error("sqlite: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("apply {migration}: {source}")]
    Apply { migration: String, source: rusqlite::Error },

    #[error("rollback {migration}: {source}")]
    Rollback { migration: String, source: rusqlite::Error },

    #[error("no applied migrations; nothing to rollback")]
    NothingToRollback,

    #[error("down migration not found for {0}")]
    NoDownMigration(String),

    #[error("not a migration file: {}", .0.display())]
    NotAFile(PathBuf),

    #[error("invalid migration description: {0:?}")]
    InvalidName(String),

    #[error("format timestamp: {0}")]
    Timestamp(#[from] time::error::Format),
}

/// One discovered migration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Migration {
    /// Base name, `<timestamp>_<description>`.
    pub name: String,
    pub up: PathBuf,
    /// Missing down files are fine for apply; rollback refuses them.
    pub down: Option<PathBuf>,
}

/// Runs the migrations found in one directory against a SQLite connection.
#[derive(Clone, Debug)]
pub struct Migrator {
    dir: PathBuf,
}

impl Migrator {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Every `*.up.sql` in the directory (not recursive), in file-name order.
    pub fn discover(&self) -> Result<Vec<Migration>, MigrateError> {
        let entries = fs::read_dir(&self.dir).map_err(|e| self.dir_error(e))?;

        let mut found = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                continue;
            }
            let Some(file_name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            let Some(name) = file_name.strip_suffix(UP_SUFFIX) else {
                continue;
            };
            let down = self.dir.join(format!("{name}{DOWN_SUFFIX}"));
            found.push(Migration {
                name: name.to_owned(),
                up: entry.path(),
                down: down.is_file().then_some(down),
            });
        }
        found.sort_by(|a, b| a.up.file_name().cmp(&b.up.file_name()));
        Ok(found)
    }

    /// Applies every unapplied migration in timestamp order and returns the
    /// names applied by this call. A second call with nothing new is a no-op.
    pub fn apply_all(&self, conn: &mut Connection) -> Result<Vec<String>, MigrateError> {
        ledger::ensure_table(conn)?;

        let mut applied = Vec::new();
        for migration in self.discover()? {
            if ledger::is_applied(conn, &migration.name)? {
                debug!(migration = %migration.name, "already applied");
                continue;
            }

            let sql = read_sql(&migration.up)?;
            run_recorded(conn, &sql, |tx| ledger::mark_applied(tx, &migration.name))
                .map_err(|source| MigrateError::Apply {
                    migration: migration.name.clone(),
                    source,
                })?;

            info!(migration = %migration.name, "applied");
            applied.push(migration.name);
        }
        Ok(applied)
    }

    /// Rolls back the most recently applied migration and returns its name.
    pub fn rollback_last(&self, conn: &mut Connection) -> Result<String, MigrateError> {
        ledger::ensure_table(conn)?;

        let name = ledger::last_applied(conn)?.ok_or(MigrateError::NothingToRollback)?;
        let down = self.dir.join(format!("{name}{DOWN_SUFFIX}"));
        if !down.is_file() {
            return Err(MigrateError::NoDownMigration(name));
        }

        let sql = read_sql(&down)?;
        run_recorded(conn, &sql, |tx| ledger::unmark_applied(tx, &name))
            .map_err(|source| MigrateError::Rollback { migration: name.clone(), source })?;

        info!(migration = %name, "rolled back");
        Ok(name)
    }

    /// Names of discovered migrations not yet in the ledger, in file order.
    pub fn pending(&self, conn: &Connection) -> Result<Vec<String>, MigrateError> {
        ledger::ensure_table(conn)?;

        let mut pending = Vec::new();
        for migration in self.discover()? {
            if !ledger::is_applied(conn, &migration.name)? {
                pending.push(migration.name);
            }
        }
        Ok(pending)
    }

    /// Ledger contents, oldest first. Needs no directory.
    pub fn applied(conn: &Connection) -> Result<Vec<String>, MigrateError> {
        ledger::ensure_table(conn)?;
        Ok(ledger::applied(conn)?)
    }

    /// Every up and down file under the directory, recursively, sorted by path.
    pub fn list(&self) -> Result<Vec<PathBuf>, MigrateError> {
        if !self.dir.is_dir() {
            return Err(MigrateError::DirectoryNotFound(self.dir.clone()));
        }

        let mut files = Vec::new();
        let mut stack = vec![self.dir.clone()];
        while let Some(dir) = stack.pop() {
            for entry in fs::read_dir(&dir)? {
                let entry = entry?;
                let path = entry.path();
                if entry.file_type()?.is_dir() {
                    stack.push(path);
                } else if is_migration_file(&path) {
                    files.push(path);
                }
            }
        }
        files.sort();
        Ok(files)
    }

    /// Runs one file. An up file is recorded as applied and a down file as
    /// rolled back, in the same transaction as its SQL.
    pub fn apply_single(&self, conn: &mut Connection, path: &Path) -> Result<(), MigrateError> {
        if !path.is_file() {
            return Err(MigrateError::NotAFile(path.to_path_buf()));
        }
        ledger::ensure_table(conn)?;

        let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        let sql = read_sql(path)?;

        if let Some(name) = file_name.strip_suffix(UP_SUFFIX) {
            run_recorded(conn, &sql, |tx| ledger::mark_applied(tx, name))
                .map_err(|source| MigrateError::Apply { migration: name.to_owned(), source })?;
        } else if let Some(name) = file_name.strip_suffix(DOWN_SUFFIX) {
            run_recorded(conn, &sql, |tx| ledger::unmark_applied(tx, name))
                .map_err(|source| MigrateError::Rollback { migration: name.to_owned(), source })?;
        } else {
            run_recorded(conn, &sql, |_| Ok(()))?;
        }

        info!(file = %path.display(), "executed");
        Ok(())
    }

    fn dir_error(&self, e: io::Error) -> MigrateError {
        if e.kind() == io::ErrorKind::NotFound {
            MigrateError::DirectoryNotFound(self.dir.clone())
        } else {
            MigrateError::Io(e)
        }
    }
}

fn is_migration_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(UP_SUFFIX) || n.ends_with(DOWN_SUFFIX))
}

fn read_sql(path: &Path) -> Result<String, MigrateError> {
    fs::read_to_string(path).map_err(|source| MigrateError::Read { path: path.to_path_buf(), source })
}

/// Executes `sql` and then `record` inside one transaction. Any error drops
/// the transaction, which rolls both back.
fn run_recorded(
    conn: &mut Connection,
    sql: &str,
    record: impl FnOnce(&Connection) -> rusqlite::Result<()>,
) -> rusqlite::Result<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(sql)?;
    record(&tx)?;
    tx.commit()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_migration_files() {
        assert!(is_migration_file(Path::new("db/20260101000000_a.up.sql")));
        assert!(is_migration_file(Path::new("db/20260101000000_a.down.sql")));
        assert!(!is_migration_file(Path::new("db/20260101000000_a.sql")));
        assert!(!is_migration_file(Path::new("db/README.md")));
    }

    #[test]
    fn failed_body_leaves_nothing_behind() {
        let mut conn = Connection::open_in_memory().unwrap();
        ledger::ensure_table(&conn).unwrap();

        let err = run_recorded(
            &mut conn,
            "CREATE TABLE half (id INTEGER); INSERT INTO missing VALUES (1);",
            |tx| ledger::mark_applied(tx, "20260101000000_half"),
        );
        assert!(err.is_err());

        let tables: i64 = conn
            .query_row("SELECT count(*) FROM sqlite_master WHERE name = 'half'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(tables, 0);
        assert!(!ledger::is_applied(&conn, "20260101000000_half").unwrap());
    }

    #[test]
    fn failed_ledger_write_undoes_the_body() {
        let mut conn = Connection::open_in_memory().unwrap();
        ledger::ensure_table(&conn).unwrap();
        ledger::mark_applied(&conn, "20260101000000_dup").unwrap();

        let err = run_recorded(&mut conn, "CREATE TABLE dup (id INTEGER);", |tx| {
            ledger::mark_applied(tx, "20260101000000_dup")
        });
        assert!(err.is_err());

        let tables: i64 = conn
            .query_row("SELECT count(*) FROM sqlite_master WHERE name = 'dup'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(tables, 0);
    }
}
