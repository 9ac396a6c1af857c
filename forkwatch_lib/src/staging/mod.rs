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


//! Turns extracted forks into a keyed snapshot for persistence.

pub mod json_sink;

pub use json_sink::JsonSnapshotSink;

use crate::chain::{BlockHash, Fork, ForkId, PublicKey};
use crate::store::StoreError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Storage and wire form of a fork
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedFork {
    pub length: u64,
    /// Oldest first
    pub blocks: Vec<BlockHash>,
    /// Sorted
    pub creators: Vec<PublicKey>,
    pub rewards: u64,
    pub latest: BlockHash,
    /// Epoch milliseconds
    pub last_updated: u64,
    /// Block the fork branched off from. None while the fork's base is
    /// still missing.
    #[serde(default)]
    pub rejoins: Option<BlockHash>,
}

impl From<&Fork> for StagedFork {
    fn from(fork: &Fork) -> Self {
        Self {
            length: fork.len() as u64,
            blocks: fork.blocks.clone(),
            creators: fork.creators.iter().cloned().collect(),
            rewards: fork.total_forfeited_reward,
            latest: fork.latest_block.clone(),
            last_updated: fork.last_updated,
            rejoins: fork.rejoins.clone(),
        }
    }
}

/// Complete fork set of one pass, keyed by content derived id
pub type ForkSnapshot = BTreeMap<ForkId, StagedFork>;

/// Key the forks by id.
///
/// Extraction never yields two forks with the same oldest block, so ids
/// do not collide in practice. Should they, the first fork is kept.
pub fn stage(forks: &[Fork]) -> ForkSnapshot {
    let mut snapshot = ForkSnapshot::new();
    for fork in forks {
        if snapshot.contains_key(&fork.id) {
            warn!("Duplicate fork id {}, keeping the first", fork.id);
            continue;
        }
        snapshot.insert(fork.id.clone(), StagedFork::from(fork));
    }
    snapshot
}

/// Key level difference between two snapshots
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SnapshotDiff {
    /// In previous only, to delete
    pub removed: Vec<ForkId>,
    /// In staged only, to insert
    pub inserted: Vec<ForkId>,
    /// In both with different content, to overwrite
    pub updated: Vec<ForkId>,
    pub unchanged: usize,
}

impl SnapshotDiff {
    pub fn between(previous: &ForkSnapshot, staged: &ForkSnapshot) -> Self {
        let mut diff = Self {
            removed: previous
                .keys()
                .filter(|id| !staged.contains_key(*id))
                .cloned()
                .collect(),
            ..Default::default()
        };
        for (id, fork) in staged {
            match previous.get(id) {
                None => diff.inserted.push(id.clone()),
                Some(old) if old != fork => diff.updated.push(id.clone()),
                Some(_) => diff.unchanged += 1,
            }
        }
        diff
    }

    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.inserted.is_empty() && self.updated.is_empty()
    }
}

/// Query over staged forks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForkFilter {
    pub min_length: u64,
    /// Only forks active at or after this epoch millisecond. 0 disables.
    pub updated_after: u64,
    /// Only forks with a block by this creator
    pub public_key: Option<PublicKey>,
}

impl Default for ForkFilter {
    fn default() -> Self {
        Self {
            min_length: 2,
            updated_after: 0,
            public_key: None,
        }
    }
}

impl ForkFilter {
    pub fn matches(&self, fork: &StagedFork) -> bool {
        if fork.length < self.min_length {
            return false;
        }
        if self.updated_after > 0 && fork.last_updated < self.updated_after {
            return false;
        }
        match &self.public_key {
            Some(key) => fork.creators.contains(key),
            None => true,
        }
    }

    pub fn apply(&self, snapshot: &ForkSnapshot) -> ForkSnapshot {
        snapshot
            .iter()
            .filter(|(_, fork)| self.matches(fork))
            .map(|(id, fork)| (id.clone(), fork.clone()))
            .collect()
    }
}

/// Persistence collaborator for staged snapshots.
///
/// Implementations replace their stored fork set with `staged`: ids
/// absent from it are deleted, the rest inserted or overwritten.
pub trait ForkSink {
    fn reconcile(&self, staged: &ForkSnapshot) -> Result<SnapshotDiff, StoreError>;
}
