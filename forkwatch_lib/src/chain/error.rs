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

use super::block::BlockHash;

/// Structural errors raised while building or walking the block graph.
///
/// Cycles and conflicting duplicates abort the whole pass. Dangling
/// parents are expected and usually handled by the caller as a stop
/// condition rather than propagated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    #[error("block {hash} is already stored with different content")]
    DuplicateBlock { hash: BlockHash },

    #[error("parent {parent_hash} of block {hash} is not in the store")]
    DanglingParent {
        hash: BlockHash,
        parent_hash: BlockHash,
    },

    #[error("parent links form a cycle through block {hash}")]
    CycleDetected { hash: BlockHash },

    #[error("no blocks to canonicalize")]
    NoBlocks,

    #[error("endpoint {hash} is canonical but not the head, fork would be empty")]
    EmptyFork { hash: BlockHash },
}
