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
use super::chain_store::ChainStore;
use super::error::ChainError;
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, info};

/// Canonical marks for one pass.
///
/// Built from scratch by every call to `canonicalize` and only read
/// afterwards. Hashes not in the set are non-canonical.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalView {
    canonical: HashSet<BlockHash>,
}

impl CanonicalView {
    pub fn is_canonical(&self, hash: &BlockHash) -> bool {
        self.canonical.contains(hash)
    }

    /// Number of blocks on the canonical chain
    pub fn len(&self) -> usize {
        self.canonical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BlockHash> {
        self.canonical.iter()
    }

    #[cfg(test)]
    pub(crate) fn from_hashes(canonical: HashSet<BlockHash>) -> Self {
        Self { canonical }
    }
}

/// Output of a canonicalization pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canonicalization {
    /// Tip of the canonical chain
    pub head: BlockHash,
    /// Every block without children, canonical head included
    pub endpoints: BTreeSet<BlockHash>,
    pub view: CanonicalView,
}

/// Select the canonical head and mark its ancestry.
///
/// The head is the endpoint with the greatest height, ties broken by the
/// greatest timestamp and then by hash. From the head we follow parent
/// links until a parent is not in the store. Every block visited is
/// canonical, every other block is not.
///
/// The walk uses a loop, chains hundreds of thousands of blocks long
/// must not depend on stack depth.
pub fn canonicalize(store: &ChainStore) -> Result<Canonicalization, ChainError> {
    if store.is_empty() {
        return Err(ChainError::NoBlocks);
    }
    store.check_acyclic()?;

    let endpoints = store.endpoints();
    let head = endpoints
        .iter()
        .filter_map(|hash| store.get(hash))
        .max_by(|a, b| a.tip_cmp(b))
        .ok_or(ChainError::NoBlocks)?;
    debug!(
        "Selected head {} at height {} from {} endpoints",
        head.hash,
        head.height,
        endpoints.len()
    );

    let view = mark_canonical(store, head)?;
    info!(
        "Canonical chain has {} blocks ending at {} (height {})",
        view.len(),
        head.hash,
        head.height
    );

    Ok(Canonicalization {
        head: head.hash.clone(),
        endpoints,
        view,
    })
}

/// Walk from head to the earliest resolvable ancestor
fn mark_canonical(store: &ChainStore, head: &Block) -> Result<CanonicalView, ChainError> {
    let mut canonical = HashSet::new();
    let mut current = Some(head);
    while let Some(block) = current {
        if !canonical.insert(block.hash.clone()) {
            return Err(ChainError::CycleDetected {
                hash: block.hash.clone(),
            });
        }
        current = store.parent(block).ok();
    }
    Ok(CanonicalView { canonical })
}
