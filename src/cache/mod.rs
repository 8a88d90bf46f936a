//! Persistent cache of resolved addresses
//!
//! This module provides the SQLite store that keeps every CEP resolved so far,
//! so repeated lookups across runs never hit the remote service twice.

mod store;

pub use store::{
    default_db_path, AddressStore, InsertError, SqliteStore, StoreError, DEFAULT_DB_FILE,
};
