use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OpenFlags};
use std::path::Path;

use crate::services::slug::SlugKind;

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A `UNIQUE` slug constraint rejected the write. Callers may retry with another slug.
    #[error("slug '{0}' is already taken")]
    DuplicateSlug(String),
    #[error("{kind} name '{name}' is already in use")]
    NameInUse { kind: SlugKind, name: String },
    #[error("could not find a free slug for '{0}'")]
    SlugExhausted(String),
    #[error("invalid slug '{0}'")]
    InvalidSlug(String),
    #[error("content must not be empty")]
    EmptyContent,
    #[error("{kind} '{slug}' not found")]
    NotFound { kind: SlugKind, slug: String },
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error(transparent)]
    Pool(#[from] r2d2::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::DuplicateSlug(_))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// True when `err` came from a `UNIQUE` constraint.
pub fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

#[derive(Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    pub fn open(path: &str, pool_size: u32) -> StoreResult<Self> {
        let path = Path::new(path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let manager = SqliteConnectionManager::file(path)
            .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys=ON;"));
        let pool = Pool::builder().max_size(pool_size).build(manager)?;

        let conn = pool.get()?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        Ok(Self { pool })
    }

    /// Named in-memory database shared by every connection of the pool. It lives as long
    /// as the pool does.
    pub fn open_memory(name: &str) -> StoreResult<Self> {
        let uri = format!("file:{}?mode=memory&cache=shared", name);
        let manager = SqliteConnectionManager::file(uri)
            .with_flags(
                OpenFlags::SQLITE_OPEN_READ_WRITE
                    | OpenFlags::SQLITE_OPEN_CREATE
                    | OpenFlags::SQLITE_OPEN_URI,
            )
            .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys=ON;"));
        let pool = Pool::builder().max_size(2).build(manager)?;
        Ok(Self { pool })
    }

    pub fn get(&self) -> StoreResult<r2d2::PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    pub fn migrate(&self) -> StoreResult<()> {
        let conn = self.get()?;
        run_migrations(&conn)?;
        Ok(())
    }
}

fn run_migrations(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT DEFAULT CURRENT_TIMESTAMP
        );
        "#,
    )?;

    let current_version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    let migrations: Vec<(i32, &str)> = vec![(1, include_str!("migrations/001_initial.sql"))];

    for (version, sql) in migrations {
        if version > current_version {
            tracing::info!("Running migration {}", version);
            conn.execute_batch(sql)?;
            conn.execute(
                "INSERT INTO schema_migrations (version) VALUES (?)",
                [version],
            )?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrate_is_repeatable() {
        let db = Database::open_memory("db_migrate_twice").unwrap();
        db.migrate().unwrap();
        db.migrate().unwrap();
        let conn = db.get().unwrap();
        let version: i32 = conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, 1);
    }

    #[test]
    fn test_unique_violation_is_detected() {
        let db = Database::open_memory("db_unique_violation").unwrap();
        db.migrate().unwrap();
        let conn = db.get().unwrap();
        conn.execute("INSERT INTO tags (name, slug) VALUES ('Rust', 'rust')", [])
            .unwrap();
        let err = conn
            .execute("INSERT INTO tags (name, slug) VALUES ('rust!', 'rust')", [])
            .unwrap_err();
        assert!(is_unique_violation(&err));
    }
}
