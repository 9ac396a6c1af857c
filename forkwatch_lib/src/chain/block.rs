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

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coinbase forfeited by a fork for each supercharged block
pub const SUPERCHARGED_REWARD: u64 = 1440;

/// Coinbase forfeited by a fork for each regular block
pub const BASE_REWARD: u64 = 720;

/// State hash identifying a block. Mina state hashes are base58 strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockHash(String);

impl BlockHash {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlockHash {
    fn from(hash: &str) -> Self {
        Self(hash.to_string())
    }
}

impl From<String> for BlockHash {
    fn from(hash: String) -> Self {
        Self(hash)
    }
}

/// Public key of the block producer
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublicKey(String);

impl PublicKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PublicKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

/// An immutable block record as ingested from a block file or a lookup.
///
/// The parent/child relation is not stored here. Children are derived
/// by the ChainStore from the parent links of all known blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub hash: BlockHash,
    pub parent_hash: BlockHash,
    /// Global slot since genesis
    pub height: u64,
    /// Scheduled time in milliseconds since the epoch
    pub timestamp: u64,
    pub creator: PublicKey,
    pub supercharged: bool,
}

impl Block {
    /// Coinbase lost if this block ends up off the canonical chain
    pub fn reward(&self) -> u64 {
        if self.supercharged {
            SUPERCHARGED_REWARD
        } else {
            BASE_REWARD
        }
    }

    /// Total order used to rank competing tips: height, then timestamp,
    /// then hash so that exact ties never depend on iteration order.
    pub fn tip_cmp(&self, other: &Block) -> std::cmp::Ordering {
        self.height
            .cmp(&other.height)
            .then(self.timestamp.cmp(&other.timestamp))
            .then_with(|| self.hash.cmp(&other.hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestBlockBuilder;
    use std::cmp::Ordering;

    #[test]
    fn test_reward_depends_on_supercharge() {
        let block = TestBlockBuilder::new("a").supercharged(true).build();
        assert_eq!(block.reward(), 1440);

        let block = TestBlockBuilder::new("a").supercharged(false).build();
        assert_eq!(block.reward(), 720);
    }

    #[test]
    fn test_tip_cmp_prefers_height_then_timestamp() {
        let low = TestBlockBuilder::new("a").height(99).timestamp(50).build();
        let high = TestBlockBuilder::new("b").height(100).timestamp(5).build();
        assert_eq!(low.tip_cmp(&high), Ordering::Less);

        let early = TestBlockBuilder::new("c").height(100).timestamp(5).build();
        let late = TestBlockBuilder::new("d").height(100).timestamp(9).build();
        assert_eq!(late.tip_cmp(&early), Ordering::Greater);
    }

    #[test]
    fn test_tip_cmp_falls_back_to_hash_on_exact_tie() {
        let first = TestBlockBuilder::new("3NKa").height(10).timestamp(1).build();
        let second = TestBlockBuilder::new("3NKb").height(10).timestamp(1).build();
        assert_eq!(second.tip_cmp(&first), Ordering::Greater);
        assert_eq!(first.tip_cmp(&first.clone()), Ordering::Equal);
    }

    #[test]
    fn test_block_hash_serializes_as_plain_string() {
        let hash = BlockHash::from("3NKabc");
        assert_eq!(serde_json::to_string(&hash).unwrap(), "\"3NKabc\"");
        assert_eq!(hash.to_string(), "3NKabc");
    }
}
