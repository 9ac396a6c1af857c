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
use rocksdb::IteratorMode;
use tracing::debug;

impl Store {
    /// Add blocks to the write batch. Blocks are immutable, so writing an
    /// already stored block again rewrites identical bytes.
    pub fn add_blocks(
        &self,
        blocks: &[Block],
        batch: &mut rocksdb::WriteBatch,
    ) -> Result<(), StoreError> {
        let block_cf = self.cf_handle(ColumnFamily::Block)?;
        for block in blocks {
            debug!("Adding block {} to store", block.hash);
            batch.put_cf(block_cf, block.hash.as_str().as_bytes(), encode(block)?);
        }
        Ok(())
    }

    pub fn get_block(&self, hash: &BlockHash) -> Result<Option<Block>, StoreError> {
        let block_cf = self.cf_handle(ColumnFamily::Block)?;
        match self.db.get_cf(block_cf, hash.as_str().as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn contains_block(&self, hash: &BlockHash) -> Result<bool, StoreError> {
        let block_cf = self.cf_handle(ColumnFamily::Block)?;
        Ok(self.db.get_pinned_cf(block_cf, hash.as_str().as_bytes())?.is_some())
    }

    /// Load every stored block, in key order
    pub fn load_blocks(&self) -> Result<Vec<Block>, StoreError> {
        let block_cf = self.cf_handle(ColumnFamily::Block)?;
        let mut blocks = Vec::new();
        for item in self.db.iterator_cf(block_cf, IteratorMode::Start) {
            let (_, value) = item?;
            blocks.push(decode(&value)?);
        }
        Ok(blocks)
    }

    pub fn block_count(&self) -> Result<usize, StoreError> {
        let block_cf = self.cf_handle(ColumnFamily::Block)?;
        let mut count = 0;
        for item in self.db.iterator_cf(block_cf, IteratorMode::Start) {
            item?;
            count += 1;
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use crate::chain::BlockHash;
    use crate::store::Store;
    use crate::test_utils::{TestBlockBuilder, setup_test_store};

    #[test]
    fn test_add_and_get_block() {
        let (store, _temp_dir) = setup_test_store();
        let block = TestBlockBuilder::new("3NKa")
            .parent("3NKg")
            .height(12)
            .timestamp(1_615_940_160_000)
            .creator("B62qalice")
            .supercharged(true)
            .build();

        let mut batch = Store::get_write_batch();
        store.add_blocks(std::slice::from_ref(&block), &mut batch).unwrap();

        // nothing is visible before the batch is committed
        assert!(!store.contains_block(&block.hash).unwrap());
        store.commit_batch(batch).unwrap();

        assert!(store.contains_block(&block.hash).unwrap());
        assert_eq!(store.get_block(&block.hash).unwrap(), Some(block));
        assert_eq!(store.get_block(&BlockHash::from("3NKz")).unwrap(), None);
    }

    #[test]
    fn test_rewriting_block_is_idempotent() {
        let (store, _temp_dir) = setup_test_store();
        let block = TestBlockBuilder::new("a").build();

        for _ in 0..2 {
            let mut batch = Store::get_write_batch();
            store.add_blocks(std::slice::from_ref(&block), &mut batch).unwrap();
            store.commit_batch(batch).unwrap();
        }

        assert_eq!(store.block_count().unwrap(), 1);
        assert_eq!(store.load_blocks().unwrap(), vec![block]);
    }
}
