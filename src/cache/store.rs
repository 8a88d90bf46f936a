//! SQLite-backed address store
//!
//! Provides the `AddressStore` trait the resolver reads and writes through,
//! and `SqliteStore`, which persists records in a single `endereco` table
//! keyed by the normalized CEP.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use thiserror::Error;

use crate::data::AddressRecord;

/// File name used when no database path is configured
pub const DEFAULT_DB_FILE: &str = "viacep.db";

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS endereco (
    cep TEXT PRIMARY KEY,
    logradouro TEXT,
    complemento TEXT,
    bairro TEXT,
    localidade TEXT,
    uf TEXT,
    ibge TEXT,
    gia TEXT,
    ddd TEXT,
    siafi TEXT
);
";

/// Errors from the underlying store other than "no such key"
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite reported an error
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The database directory could not be created
    #[error("Failed to create database directory: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from inserting a record
#[derive(Debug, Error)]
pub enum InsertError {
    /// A record with this code is already stored
    #[error("CEP {0} is already cached")]
    KeyExists(String),

    /// Any other store failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A persistent record store keyed by normalized CEP
///
/// Records are append-only: there is no update or delete path.
pub trait AddressStore {
    /// Looks up a record. `Ok(None)` means the key is not present.
    fn get(&self, code: &str) -> Result<Option<AddressRecord>, StoreError>;

    /// Inserts a new record keyed by `record.code`
    fn insert(&self, record: &AddressRecord) -> Result<(), InsertError>;
}

/// Address store backed by a SQLite database file
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens or creates the database at `path`, creating parent directories
    /// and the schema if they do not exist yet
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Opens a private in-memory database
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA_SQL)?;
        tracing::debug!("address store schema ready");
        Ok(Self { conn })
    }

    /// Number of cached records
    pub fn count(&self) -> Result<u64, StoreError> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM endereco", [], |row| row.get(0))?;
        Ok(n as u64)
    }

    fn row_to_record(row: &rusqlite::Row<'_>) -> Result<AddressRecord, rusqlite::Error> {
        // Columns are nullable in the schema; treat NULL as empty text
        let text = |idx: usize| -> Result<String, rusqlite::Error> {
            Ok(row.get::<_, Option<String>>(idx)?.unwrap_or_default())
        };
        Ok(AddressRecord {
            code: row.get(0)?,
            street: text(1)?,
            complement: text(2)?,
            neighborhood: text(3)?,
            city: text(4)?,
            state: text(5)?,
            ibge: text(6)?,
            gia: text(7)?,
            ddd: text(8)?,
            siafi: text(9)?,
        })
    }
}

impl AddressStore for SqliteStore {
    fn get(&self, code: &str) -> Result<Option<AddressRecord>, StoreError> {
        // Older databases may hold hyphenated keys such as "01001-000"
        let record = self
            .conn
            .query_row(
                "SELECT cep, logradouro, complemento, bairro, localidade, uf, ibge, gia, ddd, siafi
                 FROM endereco WHERE cep = ?1 OR REPLACE(cep, '-', '') = ?1
                 ORDER BY cep = ?1 DESC LIMIT 1",
                params![code],
                Self::row_to_record,
            )
            .optional()?;
        Ok(record.map(|mut record| {
            record.code = code.to_string();
            record
        }))
    }

    fn insert(&self, record: &AddressRecord) -> Result<(), InsertError> {
        let result = self.conn.execute(
            "INSERT INTO endereco (cep, logradouro, complemento, bairro, localidade, uf, ibge, gia, ddd, siafi)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                record.code,
                record.street,
                record.complement,
                record.neighborhood,
                record.city,
                record.state,
                record.ibge,
                record.gia,
                record.ddd,
                record.siafi,
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                Err(InsertError::KeyExists(record.code.clone()))
            }
            Err(e) => Err(StoreError::from(e).into()),
        }
    }
}

/// Returns the default database path
///
/// Uses the XDG data directory (`~/.local/share/cepcache/viacep.db` on Linux),
/// falling back to `./viacep.db` when no home directory can be determined.
pub fn default_db_path() -> PathBuf {
    ProjectDirs::from("", "", "cepcache")
        .map(|dirs| dirs.data_dir().join(DEFAULT_DB_FILE))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_FILE))
}
