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

use super::block::{Block, BlockHash, PublicKey};
use super::canonical::CanonicalView;
use super::chain_store::ChainStore;
use super::error::ChainError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use tracing::{debug, info};

/// Content derived fork identifier.
///
/// Hex encoded SHA-256 over the oldest block's hash, its timestamp in
/// decimal and its creator. Re-extracting an unchanged fork yields the
/// same id, which lets persistence upsert by key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ForkId(String);

impl ForkId {
    pub fn derive(oldest: &Block) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(oldest.hash.as_str().as_bytes());
        hasher.update(oldest.timestamp.to_string().as_bytes());
        hasher.update(oldest.creator.as_str().as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ForkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ForkId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A maximal non-canonical branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fork {
    pub id: ForkId,
    /// Oldest first
    pub blocks: Vec<BlockHash>,
    pub creators: BTreeSet<PublicKey>,
    pub total_forfeited_reward: u64,
    /// Block with the greatest timestamp
    pub latest_block: BlockHash,
    pub last_updated: u64,
    /// Block this fork branched off from. None when the walk ran into a
    /// missing parent and the fork's base is not known yet.
    pub rejoins: Option<BlockHash>,
}

impl Fork {
    /// Aggregate a fork from its blocks, oldest first. Returns None for
    /// an empty slice.
    fn from_blocks(blocks: &[&Block], rejoins: Option<BlockHash>) -> Option<Self> {
        let oldest = blocks.first()?;
        // max_by_key keeps the last maximum, so equal timestamps pick the newer block
        let latest = blocks.iter().max_by_key(|block| block.timestamp)?;
        Some(Self {
            id: ForkId::derive(oldest),
            blocks: blocks.iter().map(|block| block.hash.clone()).collect(),
            creators: blocks.iter().map(|block| block.creator.clone()).collect(),
            total_forfeited_reward: blocks.iter().map(|block| block.reward()).sum(),
            latest_block: latest.hash.clone(),
            last_updated: latest.timestamp,
            rejoins,
        })
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// The fork's base block is known
    pub fn is_complete(&self) -> bool {
        self.rejoins.is_some()
    }
}

/// Enumerate every non-canonical branch.
///
/// Fork boundaries follow from the block graph alone. A fork starts at
/// every non-canonical block whose parent is canonical or missing. Walking
/// down from there, at each fork point the fork continues into the child
/// with the least (timestamp, hash) and every other child starts a fork of
/// its own, rejoining at the fork point. Each non-canonical endpoint thus
/// closes exactly one fork, every non-canonical block lands in exactly one
/// fork, and a block arriving at one tip never moves blocks between the
/// forks it does not extend.
///
/// The only canonical endpoint should be the head. A second one would
/// produce an empty fork and is reported as `EmptyFork`.
pub fn extract_forks(
    store: &ChainStore,
    view: &CanonicalView,
    endpoints: &BTreeSet<BlockHash>,
) -> Result<Vec<Fork>, ChainError> {
    let mut canonical_tips: Vec<&Block> = endpoints
        .iter()
        .filter(|hash| view.is_canonical(hash))
        .filter_map(|hash| store.get(hash))
        .collect();
    if canonical_tips.len() > 1 {
        canonical_tips.sort_by(|a, b| b.tip_cmp(a));
        return Err(ChainError::EmptyFork {
            hash: canonical_tips[1].hash.clone(),
        });
    }

    let mut starts: Vec<(&Block, Option<BlockHash>)> = Vec::new();
    let mut non_canonical = 0;
    for block in store.blocks() {
        if view.is_canonical(&block.hash) {
            continue;
        }
        non_canonical += 1;
        match store.parent(block) {
            Ok(parent) if view.is_canonical(&parent.hash) => {
                starts.push((block, Some(parent.hash.clone())));
            }
            Ok(_) => {}
            Err(ChainError::DanglingParent { parent_hash, .. }) => {
                debug!("Fork at {} has missing parent {}", block.hash, parent_hash);
                starts.push((block, None));
            }
            Err(e) => return Err(e),
        }
    }
    // Worklist is a stack, push in reverse to pop oldest first
    starts.sort_by(|(a, _), (b, _)| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| b.hash.cmp(&a.hash))
    });

    let mut visited: HashSet<&BlockHash> = HashSet::with_capacity(non_canonical);
    let mut forks = Vec::new();
    while let Some((start, rejoins)) = starts.pop() {
        let mut walked: Vec<&Block> = Vec::new();
        let mut current = start;
        loop {
            if !visited.insert(&current.hash) {
                return Err(ChainError::CycleDetected {
                    hash: current.hash.clone(),
                });
            }
            walked.push(current);

            let mut children: Vec<&Block> = store
                .children_of(&current.hash)
                .iter()
                .filter(|hash| !view.is_canonical(hash))
                .filter_map(|hash| store.get(hash))
                .collect();
            children.sort_by(|a, b| {
                a.timestamp
                    .cmp(&b.timestamp)
                    .then_with(|| a.hash.cmp(&b.hash))
            });
            let mut children = children.into_iter();
            let Some(next) = children.next() else {
                break;
            };
            for side in children {
                starts.push((side, Some(current.hash.clone())));
            }
            current = next;
        }

        let tip = current;
        let fork = Fork::from_blocks(&walked, rejoins).ok_or_else(|| ChainError::EmptyFork {
            hash: tip.hash.clone(),
        })?;
        debug!(
            "Fork {} with {} blocks ending at {}",
            fork.id,
            fork.len(),
            tip.hash
        );
        forks.push(fork);
    }

    // Blocks no start reaches can only sit on a parent loop
    if visited.len() < non_canonical {
        let stranded = store
            .blocks()
            .filter(|block| !view.is_canonical(&block.hash) && !visited.contains(&block.hash))
            .map(|block| block.hash.clone())
            .min();
        if let Some(hash) = stranded {
            return Err(ChainError::CycleDetected { hash });
        }
    }

    forks.sort_by(|a, b| {
        let tip_a = a.blocks.last().and_then(|hash| store.get(hash));
        let tip_b = b.blocks.last().and_then(|hash| store.get(hash));
        match (tip_a, tip_b) {
            (Some(tip_a), Some(tip_b)) => tip_b.tip_cmp(tip_a),
            _ => b.blocks.last().cmp(&a.blocks.last()),
        }
    });

    info!("Extracted {} forks", forks.len());
    Ok(forks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::canonical::canonicalize;
    use crate::test_utils::{TestBlockBuilder, build_chain};
    use std::collections::BTreeMap;

    fn extract(store: &ChainStore) -> Vec<Fork> {
        let result = canonicalize(store).unwrap();
        extract_forks(store, &result.view, &result.endpoints).unwrap()
    }

    fn hashes(names: &[&str]) -> Vec<BlockHash> {
        names.iter().map(|name| BlockHash::from(*name)).collect()
    }

    /// g - main-1 .. main-6, with a branch off main-2 and a second
    /// branch off the first branch's first block.
    fn forked_store() -> ChainStore {
        let mut blocks = build_chain("main", "g", 1, 6);
        blocks.push(TestBlockBuilder::new("g").build());
        blocks.push(
            TestBlockBuilder::new("s1")
                .parent("main-2")
                .height(3)
                .timestamp(3_100)
                .creator("alice")
                .supercharged(true)
                .build(),
        );
        blocks.push(
            TestBlockBuilder::new("s2")
                .parent("s1")
                .height(4)
                .timestamp(4_100)
                .creator("bob")
                .build(),
        );
        blocks.push(
            TestBlockBuilder::new("s3")
                .parent("s2")
                .height(5)
                .timestamp(5_100)
                .creator("alice")
                .supercharged(true)
                .build(),
        );
        blocks.push(
            TestBlockBuilder::new("t1")
                .parent("s1")
                .height(4)
                .timestamp(4_200)
                .creator("carol")
                .build(),
        );
        ChainStore::from_blocks(blocks).unwrap()
    }

    #[test]
    fn test_no_forks_on_linear_chain() {
        let mut blocks = build_chain("main", "g", 1, 4);
        blocks.push(TestBlockBuilder::new("g").build());
        let store = ChainStore::from_blocks(blocks).unwrap();
        assert!(extract(&store).is_empty());
    }

    #[test]
    fn test_fork_blocks_are_oldest_first_with_aggregates() {
        let store = forked_store();
        let forks = extract(&store);
        assert_eq!(forks.len(), 2);

        let trunk = &forks[0];
        assert_eq!(trunk.blocks, hashes(&["s1", "s2", "s3"]));
        assert_eq!(
            trunk.creators,
            BTreeSet::from([PublicKey::from("alice"), PublicKey::from("bob")])
        );
        assert_eq!(trunk.total_forfeited_reward, 1440 + 720 + 1440);
        assert_eq!(trunk.latest_block, BlockHash::from("s3"));
        assert_eq!(trunk.last_updated, 5_100);
        assert_eq!(trunk.rejoins, Some(BlockHash::from("main-2")));
        assert_eq!(
            trunk.id,
            ForkId::derive(store.get(&BlockHash::from("s1")).unwrap())
        );

        let side = &forks[1];
        assert_eq!(side.blocks, hashes(&["t1"]));
        assert_eq!(side.rejoins, Some(BlockHash::from("s1")));
        assert_eq!(side.total_forfeited_reward, 720);
    }

    #[test]
    fn test_fork_partition() {
        let store = forked_store();
        let result = canonicalize(&store).unwrap();
        let forks = extract_forks(&store, &result.view, &result.endpoints).unwrap();

        let mut seen = HashSet::new();
        for fork in &forks {
            for hash in &fork.blocks {
                assert!(!result.view.is_canonical(hash), "{hash} is canonical");
                assert!(seen.insert(hash.clone()), "{hash} in two forks");
            }
        }
        let non_canonical: HashSet<BlockHash> = store
            .blocks()
            .filter(|block| !result.view.is_canonical(&block.hash))
            .map(|block| block.hash.clone())
            .collect();
        assert_eq!(seen, non_canonical);
    }

    fn fork_ids(forks: &[Fork]) -> BTreeMap<ForkId, Vec<BlockHash>> {
        forks
            .iter()
            .map(|fork| (fork.id.clone(), fork.blocks.clone()))
            .collect()
    }

    fn branch(hash: &str, parent: &str, height: u64, timestamp: u64) -> Block {
        TestBlockBuilder::new(hash)
            .parent(parent)
            .height(height)
            .timestamp(timestamp)
            .build()
    }

    #[test]
    fn test_growing_one_fork_leaves_sibling_untouched() {
        // t1-t2-t3-a1 off main-5, with b1 branching off t2
        let mut blocks = build_chain("main", "g", 1, 20);
        blocks.push(TestBlockBuilder::new("g").build());
        blocks.push(branch("t1", "main-5", 6, 6_100));
        blocks.push(branch("t2", "t1", 7, 7_100));
        blocks.push(branch("t3", "t2", 8, 8_100));
        blocks.push(branch("a1", "t3", 9, 9_100));
        blocks.push(branch("b1", "t2", 8, 8_200));
        let mut store = ChainStore::from_blocks(blocks).unwrap();

        let before = extract(&store);
        let trunk_id = ForkId::derive(store.get(&BlockHash::from("t1")).unwrap());
        let side_id = ForkId::derive(store.get(&BlockHash::from("b1")).unwrap());
        assert_eq!(
            fork_ids(&before),
            BTreeMap::from([
                (trunk_id.clone(), hashes(&["t1", "t2", "t3", "a1"])),
                (side_id.clone(), hashes(&["b1"])),
            ])
        );

        // b1 outgrows a1
        store.insert(branch("b2", "b1", 9, 9_200)).unwrap();
        store.insert(branch("b3", "b2", 10, 10_200)).unwrap();

        let after = extract(&store);
        assert_eq!(
            fork_ids(&after),
            BTreeMap::from([
                (trunk_id, hashes(&["t1", "t2", "t3", "a1"])),
                (side_id, hashes(&["b1", "b2", "b3"])),
            ])
        );
    }

    #[test]
    fn test_side_fork_rejoins_at_fork_point() {
        let store = forked_store();
        let forks = extract(&store);
        let side = forks
            .iter()
            .find(|fork| fork.blocks == hashes(&["t1"]))
            .unwrap();
        assert_eq!(side.rejoins, Some(BlockHash::from("s1")));
        assert!(side.is_complete());
    }

    #[test]
    fn test_deep_fork_does_not_overflow() {
        let mut blocks = build_chain("main", "g", 1, 300_001);
        blocks.extend(build_chain("side", "g", 1, 300_000));
        blocks.push(TestBlockBuilder::new("g").build());
        let store = ChainStore::from_blocks(blocks).unwrap();

        let forks = extract(&store);
        assert_eq!(forks.len(), 1);
        assert_eq!(forks[0].len(), 300_000);
        assert_eq!(forks[0].blocks[0], BlockHash::from("side-1"));
        assert_eq!(forks[0].latest_block, BlockHash::from("side-300000"));
    }

    #[test]
    fn test_reward_aggregation() {
        let store = ChainStore::from_blocks(vec![
            TestBlockBuilder::new("g").build(),
            TestBlockBuilder::new("m1").parent("g").height(1).build(),
            TestBlockBuilder::new("m2").parent("m1").height(2).build(),
            TestBlockBuilder::new("m3").parent("m2").height(3).build(),
            TestBlockBuilder::new("m4").parent("m3").height(4).build(),
            TestBlockBuilder::new("f1")
                .parent("g")
                .height(1)
                .supercharged(true)
                .build(),
            TestBlockBuilder::new("f2")
                .parent("f1")
                .height(2)
                .supercharged(false)
                .build(),
            TestBlockBuilder::new("f3")
                .parent("f2")
                .height(3)
                .supercharged(true)
                .build(),
        ])
        .unwrap();

        let forks = extract(&store);
        assert_eq!(forks.len(), 1);
        assert_eq!(forks[0].total_forfeited_reward, 3600);
    }

    #[test]
    fn test_fork_with_missing_base_is_incomplete() {
        let mut blocks = build_chain("main", "g", 1, 5);
        blocks.push(TestBlockBuilder::new("g").build());
        blocks.push(
            TestBlockBuilder::new("orphan-2")
                .parent("orphan-1")
                .height(3)
                .build(),
        );
        let store = ChainStore::from_blocks(blocks).unwrap();

        let forks = extract(&store);
        assert_eq!(forks.len(), 1);
        assert_eq!(forks[0].blocks, hashes(&["orphan-2"]));
        assert!(!forks[0].is_complete());
    }

    #[test]
    fn test_latest_block_tie_prefers_newer() {
        let store = ChainStore::from_blocks(vec![
            TestBlockBuilder::new("g").build(),
            TestBlockBuilder::new("m1").parent("g").height(1).build(),
            TestBlockBuilder::new("m2").parent("m1").height(2).build(),
            TestBlockBuilder::new("m3").parent("m2").height(3).build(),
            TestBlockBuilder::new("f1")
                .parent("g")
                .height(1)
                .timestamp(500)
                .build(),
            TestBlockBuilder::new("f2")
                .parent("f1")
                .height(2)
                .timestamp(500)
                .build(),
        ])
        .unwrap();

        let forks = extract(&store);
        assert_eq!(forks[0].latest_block, BlockHash::from("f2"));
        assert_eq!(forks[0].last_updated, 500);
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let store = forked_store();
        let first = extract(&store);
        let rebuilt = ChainStore::from_blocks(store.blocks().cloned().collect::<Vec<_>>()).unwrap();
        let second = extract(&rebuilt);
        assert_eq!(first, second);
    }

    #[test]
    fn test_second_canonical_endpoint_is_reported() {
        let store = forked_store();
        let result = canonicalize(&store).unwrap();

        // a view that wrongly marks a side tip canonical
        let mut canonical: HashSet<BlockHash> = result.view.iter().cloned().collect();
        canonical.insert(BlockHash::from("t1"));
        let broken = CanonicalView::from_hashes(canonical);

        assert_eq!(
            extract_forks(&store, &broken, &result.endpoints),
            Err(ChainError::EmptyFork {
                hash: BlockHash::from("t1")
            })
        );
    }

    #[test]
    fn test_fork_id_is_stable_and_content_derived() {
        let block = TestBlockBuilder::new("3NKfork")
            .timestamp(1_650_000_000_000)
            .creator("B62qcreator")
            .build();
        let id = ForkId::derive(&block);
        assert_eq!(id, ForkId::derive(&block.clone()));
        assert_eq!(id.as_str().len(), 64);

        let other = TestBlockBuilder::new("3NKfork")
            .timestamp(1_650_000_000_001)
            .creator("B62qcreator")
            .build();
        assert_ne!(id, ForkId::derive(&other));
    }
}
