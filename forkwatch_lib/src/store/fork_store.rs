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


use super::{ColumnFamily, Store, StoreError, decode, encode};
use crate::chain::ForkId;
use crate::staging::{ForkSink, ForkSnapshot, SnapshotDiff, StagedFork};
use rocksdb::IteratorMode;
use tracing::debug;

impl Store {
    /// Load the fork snapshot of the last committed pass
    pub fn get_forks(&self) -> Result<ForkSnapshot, StoreError> {
        let fork_cf = self.cf_handle(ColumnFamily::Fork)?;
        let mut snapshot = ForkSnapshot::new();
        for item in self.db.iterator_cf(fork_cf, IteratorMode::Start) {
            let (key, value) = item?;
            let id = std::str::from_utf8(&key)
                .map_err(|e| StoreError::Serialization(format!("invalid fork id: {e}")))?;
            snapshot.insert(ForkId::from(id), decode(&value)?);
        }
        Ok(snapshot)
    }

    pub fn get_fork(&self, id: &ForkId) -> Result<Option<StagedFork>, StoreError> {
        let fork_cf = self.cf_handle(ColumnFamily::Fork)?;
        match self.db.get_cf(fork_cf, id.as_str().as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Stage the writes that turn the stored fork set into `staged`.
    /// Only changed keys are touched.
    pub fn reconcile_forks(
        &self,
        staged: &ForkSnapshot,
        batch: &mut rocksdb::WriteBatch,
    ) -> Result<SnapshotDiff, StoreError> {
        let previous = self.get_forks()?;
        let diff = SnapshotDiff::between(&previous, staged);
        let fork_cf = self.cf_handle(ColumnFamily::Fork)?;

        for id in &diff.removed {
            debug!("Deleting fork {}", id);
            batch.delete_cf(fork_cf, id.as_str().as_bytes());
        }
        for id in diff.inserted.iter().chain(diff.updated.iter()) {
            let Some(fork) = staged.get(id) else {
                return Err(StoreError::NotFound(format!("staged fork {id}")));
            };
            debug!("Writing fork {} with {} blocks", id, fork.length);
            batch.put_cf(fork_cf, id.as_str().as_bytes(), encode(fork)?);
        }
        Ok(diff)
    }
}

impl ForkSink for Store {
    fn reconcile(&self, staged: &ForkSnapshot) -> Result<SnapshotDiff, StoreError> {
        let mut batch = Store::get_write_batch();
        let diff = self.reconcile_forks(staged, &mut batch)?;
        self.commit_batch(batch)?;
        Ok(diff)
    }
}
