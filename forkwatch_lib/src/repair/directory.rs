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


use super::{BlockLookup, LookupError};
use crate::chain::{Block, BlockHash};
use crate::ingest::{BlockFileSource, IngestError, parse_block};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::debug;

/// Looks blocks up in a local archive of block files, such as a full
/// mirror of the block bucket. The directory is indexed once at
/// construction.
#[derive(Debug, Clone)]
pub struct DirectoryLookup {
    index: HashMap<BlockHash, PathBuf>,
}

impl DirectoryLookup {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, IngestError> {
        let source = BlockFileSource::new(dir);
        let index: HashMap<BlockHash, PathBuf> = source.list()?.into_iter().collect();
        debug!("Indexed {} block files in {}", index.len(), source.dir().display());
        Ok(Self { index })
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

#[async_trait]
impl BlockLookup for DirectoryLookup {
    async fn lookup(&self, hash: &BlockHash) -> Result<Block, LookupError> {
        let Some(path) = self.index.get(hash) else {
            return Err(LookupError::NotFound(hash.clone()));
        };
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| LookupError::Unavailable {
                hash: hash.clone(),
                reason: e.to_string(),
            })?;
        parse_block(hash.clone(), &bytes).map_err(|e| LookupError::Malformed {
            hash: hash.clone(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{TestBlockBuilder, write_block_file};
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_directory_lookup() {
        let dir = tempdir().unwrap();
        let block = TestBlockBuilder::new("3NKa")
            .parent("3NKg")
            .height(3)
            .timestamp(3000)
            .supercharged(true)
            .build();
        write_block_file(dir.path(), &block);
        std::fs::write(dir.path().join("mainnet-3NKbad.json"), "[]").unwrap();

        let lookup = DirectoryLookup::new(dir.path()).unwrap();
        assert_eq!(lookup.len(), 2);

        assert_eq!(lookup.lookup(&BlockHash::from("3NKa")).await, Ok(block));
        assert_eq!(
            lookup.lookup(&BlockHash::from("3NKz")).await,
            Err(LookupError::NotFound(BlockHash::from("3NKz")))
        );
        assert!(matches!(
            lookup.lookup(&BlockHash::from("3NKbad")).await,
            Err(LookupError::Malformed { .. })
        ));
    }
}
