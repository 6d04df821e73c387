use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::constants::MEMBER_TABLE;
use crate::error::{MaintenanceError, Result};

/// Owns the single connection a tool run uses. The connection is closed
/// when this value is dropped, on success and error paths alike.
pub struct Database {
    conn: Connection,
    path: PathBuf,
}

impl Database {
    /// Open an existing database file for reading and writing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path.as_ref(), OpenFlags::SQLITE_OPEN_READ_WRITE)
    }

    /// Open an existing database file without write access.
    pub fn open_read_only<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path.as_ref(), OpenFlags::SQLITE_OPEN_READ_ONLY)
    }

    /// Open or create a database file, e.g. for a fresh development setup.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Self::open_with(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        )
    }

    fn open_with(path: &Path, flags: OpenFlags) -> Result<Self> {
        if !flags.contains(OpenFlags::SQLITE_OPEN_CREATE) && !path.exists() {
            return Err(MaintenanceError::Config(format!(
                "Database file '{}' does not exist",
                path.display()
            )));
        }
        let conn = Connection::open_with_flags(path, flags | OpenFlags::SQLITE_OPEN_NO_MUTEX)?;
        info!("Opened database {}", path.display());
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Create the member tables if they are missing.
    pub fn bootstrap_schema(&self) -> Result<()> {
        bootstrap_schema(&self.conn)
    }
}

pub fn bootstrap_schema(conn: &Connection) -> Result<()> {
    debug!("Bootstrapping member tables");
    conn.execute_batch(include_str!("../migrations/001_create_member_tables.sql"))?;
    Ok(())
}

pub fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let found: Option<String> = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![table],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

pub fn require_table(conn: &Connection, table: &str) -> Result<()> {
    if table_exists(conn, table)? {
        Ok(())
    } else {
        Err(MaintenanceError::MissingTable(table.to_string()))
    }
}

/// Column names of a table in declaration order.
pub fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    require_table(conn, table)?;
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(columns)
}

pub fn count_rows(conn: &Connection, table: &str) -> Result<i64> {
    let count = conn.query_row(
        &format!("SELECT COUNT(*) FROM {}", quote_ident(table)),
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Quote an identifier for interpolation into SQL.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemberStats {
    pub total: i64,
    pub active: i64,
    pub inactive: i64,
}

impl MemberStats {
    pub fn load(conn: &Connection) -> Result<Self> {
        let total = count_rows(conn, MEMBER_TABLE)?;
        let active: i64 = conn.query_row(
            "SELECT COUNT(*) FROM Member WHERE isActive = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(Self {
            total,
            active,
            inactive: total - active,
        })
    }
}
