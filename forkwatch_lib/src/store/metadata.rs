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
use crate::chain::{Block, BlockHash};
use crate::staging::{ForkSnapshot, SnapshotDiff};
use serde::{Deserialize, Serialize};
use tracing::info;

const LAST_PASS_KEY: &str = "meta:last_pass";

/// Summary of the last committed pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassMetadata {
    pub head: BlockHash,
    pub head_height: u64,
    pub fork_count: usize,
    /// Unix seconds
    pub completed_at: u64,
}

impl Store {
    pub fn get_pass_metadata(&self) -> Result<Option<PassMetadata>, StoreError> {
        let metadata_cf = self.cf_handle(ColumnFamily::Metadata)?;
        match self.db.get_cf(metadata_cf, LAST_PASS_KEY.as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Commit the result of a pass. Blocks first seen in the pass, the
    /// fork set and the pass metadata are written in one batch, so either
    /// all of them change or none does.
    pub fn commit_pass(
        &self,
        blocks: &[Block],
        staged: &ForkSnapshot,
        metadata: &PassMetadata,
    ) -> Result<SnapshotDiff, StoreError> {
        let mut batch = Store::get_write_batch();
        self.add_blocks(blocks, &mut batch)?;
        let diff = self.reconcile_forks(staged, &mut batch)?;
        let metadata_cf = self.cf_handle(ColumnFamily::Metadata)?;
        batch.put_cf(metadata_cf, LAST_PASS_KEY.as_bytes(), encode(metadata)?);
        self.commit_batch(batch)?;

        info!(
            "Committed pass with head {} at height {}: {} new blocks, {} forks ({} inserted, {} updated, {} removed)",
            metadata.head,
            metadata.head_height,
            blocks.len(),
            metadata.fork_count,
            diff.inserted.len(),
            diff.updated.len(),
            diff.removed.len()
        );
        Ok(diff)
    }
}
