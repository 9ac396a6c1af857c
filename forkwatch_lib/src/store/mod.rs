// Copyright (C) 2024, 2025 Forkwatch Developers (see AUTHORS)
//
// This file is part of Forkwatch
//
// Forkwatch is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option)
// any later version.
//
// Forkwatch is distributed in the hope that it will be useful, but WITHOUT ANY
// WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// Forkwatch. If not, see <https://www.gnu.org/licenses/>.


use crate::chain::ChainStore;
use crate::store::column_families::ColumnFamily;
use rocksdb::{ColumnFamilyDescriptor, DB, Options as RocksDbOptions};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::error::Error;
use std::fmt;
use tracing::debug;

pub mod block_store;
pub mod column_families;
pub mod fork_store;
pub mod metadata;

pub use metadata::PassMetadata;

/// Error type for store operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Database error
    Database(String),
    /// Item not found
    NotFound(String),
    /// Stored value could not be encoded or decoded
    Serialization(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Database(msg) => write!(f, "Database error: {msg}"),
            StoreError::NotFound(msg) => write!(f, "Not found: {msg}"),
            StoreError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
        }
    }
}

impl Error for StoreError {}

impl From<rocksdb::Error> for StoreError {
    fn from(e: rocksdb::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// Durable state of the fork watcher.
///
/// RocksDB is used as the underlying database, with one column family
/// per kind of record so compactions are independent:
/// - block: every ingested block, keyed by hash. Only ever grows.
/// - fork: the staged fork snapshot of the last committed pass.
/// - metadata: summary of the last committed pass.
pub struct Store {
    path: String,
    db: DB,
}

impl Store {
    /// Open the store, creating it when missing unless read_only is set
    pub fn new(path: String, read_only: bool) -> Result<Self, StoreError> {
        // for now we use default options for all column families
        let cfs = ColumnFamily::ALL
            .iter()
            .map(|cf| ColumnFamilyDescriptor::new(*cf, RocksDbOptions::default()))
            .collect::<Vec<_>>();

        let mut db_options = RocksDbOptions::default();
        db_options.create_missing_column_families(true);
        db_options.create_if_missing(true);
        let db = if read_only {
            DB::open_cf_descriptors_read_only(&db_options, &path, cfs, false)?
        } else {
            DB::open_cf_descriptors(&db_options, &path, cfs)?
        };
        debug!("Opened store at {} (read only: {})", path, read_only);
        Ok(Self { path, db })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Get a rocksb write batch
    /// An associated function as batch is not obtained from db
    pub fn get_write_batch() -> rocksdb::WriteBatch {
        rocksdb::WriteBatch::default()
    }

    /// Commit a write batch earlier obtained using get batch
    pub fn commit_batch(&self, batch: rocksdb::WriteBatch) -> Result<(), StoreError> {
        self.db.write(batch)?;
        Ok(())
    }

    fn cf_handle(&self, cf: ColumnFamily) -> Result<&rocksdb::ColumnFamily, StoreError> {
        self.db
            .cf_handle(&cf)
            .ok_or_else(|| StoreError::Database(format!("missing column family {}", cf.as_str())))
    }

    /// Rebuild the in-memory block graph from every stored block
    pub fn load_chain_store(&self) -> Result<ChainStore, StoreError> {
        let blocks = self.load_blocks()?;
        debug!("Restoring chain store from {} blocks", blocks.len());
        ChainStore::from_blocks(blocks).map_err(|e| StoreError::Database(e.to_string()))
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
    let mut buf = Vec::new();
    ciborium::ser::into_writer(value, &mut buf)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(buf)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
    ciborium::de::from_reader(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}
