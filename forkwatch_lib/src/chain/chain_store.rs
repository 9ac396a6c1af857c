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

use super::block::{Block, BlockHash};
use super::error::ChainError;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Result of inserting a block into the ChainStore
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Block was new and is now part of the graph
    Inserted,
    /// An identical block was already present, nothing changed
    AlreadyPresent,
}

/// Walk state used while checking parent links for cycles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    OnPath,
    Done,
}

/// In-memory block graph.
///
/// Owns every known block by hash and a children index keyed by parent
/// hash. The index is derived only from the parent links of stored
/// blocks, so it also holds entries for parents that have not arrived
/// yet. When such a parent is inserted later, its children are already
/// linked.
#[derive(Debug, Clone, Default)]
pub struct ChainStore {
    blocks: HashMap<BlockHash, Block>,
    children: HashMap<BlockHash, BTreeSet<BlockHash>>,
}

impl ChainStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a set of blocks, as loaded from persistence
    pub fn from_blocks(blocks: impl IntoIterator<Item = Block>) -> Result<Self, ChainError> {
        let mut store = Self::new();
        for block in blocks {
            store.insert(block)?;
        }
        Ok(store)
    }

    /// Insert a block.
    ///
    /// Re-inserting an identical block is a no-op. A block with a known
    /// hash but different fields is rejected and the stored block is
    /// left untouched.
    pub fn insert(&mut self, block: Block) -> Result<InsertOutcome, ChainError> {
        if let Some(existing) = self.blocks.get(&block.hash) {
            if *existing == block {
                debug!("Block {} already present", block.hash);
                return Ok(InsertOutcome::AlreadyPresent);
            }
            return Err(ChainError::DuplicateBlock { hash: block.hash });
        }

        debug!(
            "Inserting block {} at height {} with parent {}",
            block.hash, block.height, block.parent_hash
        );
        self.children
            .entry(block.parent_hash.clone())
            .or_default()
            .insert(block.hash.clone());
        self.blocks.insert(block.hash.clone(), block);
        Ok(InsertOutcome::Inserted)
    }

    pub fn get(&self, hash: &BlockHash) -> Option<&Block> {
        self.blocks.get(hash)
    }

    pub fn contains(&self, hash: &BlockHash) -> bool {
        self.blocks.contains_key(hash)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Iterate over all blocks in no particular order
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.values()
    }

    /// Resolve the parent of a block.
    ///
    /// Returns `DanglingParent` if the parent has not been ingested.
    /// Callers walking towards genesis treat that as the end of the walk.
    pub fn parent(&self, block: &Block) -> Result<&Block, ChainError> {
        self.blocks
            .get(&block.parent_hash)
            .ok_or_else(|| ChainError::DanglingParent {
                hash: block.hash.clone(),
                parent_hash: block.parent_hash.clone(),
            })
    }

    /// Hashes of all known blocks naming `hash` as their parent
    pub fn children_of(&self, hash: &BlockHash) -> BTreeSet<BlockHash> {
        self.children.get(hash).cloned().unwrap_or_default()
    }

    /// A known block with no known children
    pub fn is_endpoint(&self, hash: &BlockHash) -> bool {
        self.contains(hash) && self.children.get(hash).is_none_or(|c| c.is_empty())
    }

    /// All blocks without children, i.e. the tips of the canonical chain
    /// and of every fork
    pub fn endpoints(&self) -> BTreeSet<BlockHash> {
        self.blocks
            .keys()
            .filter(|hash| self.is_endpoint(hash))
            .cloned()
            .collect()
    }

    /// True if the block is known and its parent is not
    pub fn has_dangling_parent(&self, hash: &BlockHash) -> bool {
        self.blocks
            .get(hash)
            .is_some_and(|block| !self.blocks.contains_key(&block.parent_hash))
    }

    /// Parent hashes referenced by stored blocks but not present themselves
    pub fn dangling_parents(&self) -> BTreeSet<BlockHash> {
        self.children
            .keys()
            .filter(|parent| !self.blocks.contains_key(*parent))
            .cloned()
            .collect()
    }

    /// Verify that following parent links never loops.
    ///
    /// Each block has at most one parent, so every walk is a simple path
    /// that either ends at a dangling parent, reaches a block finished by
    /// an earlier walk, or comes back to a block on its own path. The last
    /// case is a cycle. Runs in O(n) with an explicit path, never recursion.
    pub fn check_acyclic(&self) -> Result<(), ChainError> {
        let mut starts: Vec<&BlockHash> = self.blocks.keys().collect();
        starts.sort();

        let mut visits: HashMap<&BlockHash, Visit> = HashMap::with_capacity(self.blocks.len());
        for start in starts {
            if visits.contains_key(start) {
                continue;
            }
            let mut path = Vec::new();
            let mut current = Some(start);
            while let Some(hash) = current {
                match visits.get(hash) {
                    Some(Visit::OnPath) => {
                        return Err(ChainError::CycleDetected { hash: hash.clone() });
                    }
                    Some(Visit::Done) => break,
                    None => {}
                }
                visits.insert(hash, Visit::OnPath);
                path.push(hash);
                current = self
                    .blocks
                    .get(hash)
                    .and_then(|block| self.blocks.get_key_value(&block.parent_hash))
                    .map(|(parent, _)| parent);
            }
            for hash in path {
                visits.insert(hash, Visit::Done);
            }
        }
        Ok(())
    }
}
