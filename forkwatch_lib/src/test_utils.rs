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


// Helpers for unit and integration tests (available with test-utils feature)
use crate::chain::{Block, BlockHash, PublicKey};
use crate::store::Store;
use std::path::{Path, PathBuf};
use tempfile::{TempDir, tempdir};

/// Creator key used when a test does not care about creators
pub const DEFAULT_CREATOR: &str = "B62qtestcreator";

/// Open a fresh writable store in a temporary directory.
/// The TempDir must stay alive for as long as the store is used.
pub fn setup_test_store() -> (Store, TempDir) {
    let temp_dir = tempdir().unwrap();
    let store = Store::new(temp_dir.path().to_str().unwrap().to_string(), false).unwrap();
    (store, temp_dir)
}

/// Render a block as a precomputed block JSON document
pub fn precomputed_json(block: &Block) -> String {
    serde_json::json!({
        "scheduled_time": block.timestamp.to_string(),
        "protocol_state": {
            "previous_state_hash": block.parent_hash.as_str(),
            "body": {
                "consensus_state": {
                    "block_creator": block.creator.as_str(),
                    "global_slot_since_genesis": block.height.to_string(),
                    "supercharge_coinbase": block.supercharged,
                }
            }
        }
    })
    .to_string()
}

/// Write a block as `mainnet-<hash>.json` into dir
pub fn write_block_file(dir: &Path, block: &Block) -> PathBuf {
    let path = dir.join(format!("mainnet-{}.json", block.hash));
    std::fs::write(&path, precomputed_json(block)).unwrap();
    path
}

/// Build a linear chain of `count` blocks named `<prefix>-1`..`<prefix>-<count>`
/// on top of `parent`. Heights start at `start_height`, timestamps are
/// 1000 times the height.
pub fn build_chain(prefix: &str, parent: &str, start_height: u64, count: u64) -> Vec<Block> {
    let mut blocks = Vec::with_capacity(count as usize);
    let mut parent_hash = parent.to_string();
    for i in 1..=count {
        let height = start_height + i - 1;
        let hash = format!("{prefix}-{i}");
        blocks.push(
            TestBlockBuilder::new(&hash)
                .parent(&parent_hash)
                .height(height)
                .timestamp(height * 1000)
                .build(),
        );
        parent_hash = hash;
    }
    blocks
}

/// Builder for blocks in tests. Unset fields default to height and
/// timestamp 0, a parent named "none" and the default creator.
#[derive(Debug, Clone)]
pub struct TestBlockBuilder {
    hash: String,
    parent_hash: String,
    height: u64,
    timestamp: u64,
    creator: String,
    supercharged: bool,
}

impl TestBlockBuilder {
    pub fn new(hash: &str) -> Self {
        Self {
            hash: hash.to_string(),
            parent_hash: "none".to_string(),
            height: 0,
            timestamp: 0,
            creator: DEFAULT_CREATOR.to_string(),
            supercharged: false,
        }
    }

    pub fn parent(mut self, parent_hash: &str) -> Self {
        self.parent_hash = parent_hash.to_string();
        self
    }

    pub fn height(mut self, height: u64) -> Self {
        self.height = height;
        self
    }

    pub fn timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn creator(mut self, creator: &str) -> Self {
        self.creator = creator.to_string();
        self
    }

    pub fn supercharged(mut self, supercharged: bool) -> Self {
        self.supercharged = supercharged;
        self
    }

    pub fn build(self) -> Block {
        Block {
            hash: BlockHash::new(self.hash),
            parent_hash: BlockHash::new(self.parent_hash),
            height: self.height,
            timestamp: self.timestamp,
            creator: PublicKey::new(self.creator),
            supercharged: self.supercharged,
        }
    }
}
