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


//! Fills in missing ancestors from an external block source.
//!
//! Every block whose parent is not in the ChainStore is a dangling edge.
//! The repairer asks a `BlockLookup` for the missing parents, inserts
//! what comes back and repeats for the parents of the fetched blocks,
//! up to a bounded number of rounds. It only ever adds blocks.

pub mod directory;
pub mod http;

pub use directory::DirectoryLookup;
pub use http::{HttpLookup, HttpLookupError};

use crate::chain::{Block, BlockHash, ChainError, ChainStore, InsertOutcome};
use crate::config::LookupConfig;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
#[cfg(test)]
use mockall::automock;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Why a lookup did not produce a block
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    /// The source has no such block. Expected at the genesis boundary.
    #[error("block {0} not found")]
    NotFound(BlockHash),

    /// Transient failure that outlasted the source's own retries
    #[error("block {hash} unavailable: {reason}")]
    Unavailable { hash: BlockHash, reason: String },

    /// The source answered with something that is not a block
    #[error("block {hash} malformed: {reason}")]
    Malformed { hash: BlockHash, reason: String },
}

/// External source of individual blocks by hash
#[cfg_attr(test, automock)]
#[async_trait]
pub trait BlockLookup: Send + Sync {
    async fn lookup(&self, hash: &BlockHash) -> Result<Block, LookupError>;
}

/// Outcome of one repair run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepairReport {
    /// Blocks fetched and inserted
    pub missing_parents_fixed: usize,
    /// Blocks that were endpoints before the run and have children after it
    pub missing_children_fixed: usize,
    pub not_found: usize,
    pub unavailable: usize,
    /// Fetched blocks discarded as malformed or carrying the wrong hash
    pub rejected: usize,
    pub rounds: usize,
    /// Hashes of the inserted blocks, in insertion order
    #[serde(skip)]
    pub inserted: Vec<BlockHash>,
}

#[derive(Debug, Clone)]
pub struct IntegrityRepairer {
    concurrency: usize,
    max_rounds: usize,
}

impl IntegrityRepairer {
    pub fn new(concurrency: usize, max_rounds: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
            max_rounds,
        }
    }

    pub fn from_config(config: &LookupConfig) -> Self {
        Self::new(config.concurrency, config.max_rounds)
    }

    /// Resolve dangling parents through `lookup`.
    ///
    /// Lookups within a round run concurrently, results are then inserted
    /// one by one in hash order. A hash that failed once is not asked for
    /// again in the same run. Stops after `max_rounds`, or earlier when a
    /// round inserts nothing.
    pub async fn repair(
        &self,
        chain_store: &mut ChainStore,
        lookup: &dyn BlockLookup,
    ) -> Result<RepairReport, ChainError> {
        let endpoints_before = chain_store.endpoints();
        let mut report = RepairReport::default();
        let mut given_up: HashSet<BlockHash> = HashSet::new();

        for round in 1..=self.max_rounds {
            let wanted: Vec<BlockHash> = chain_store
                .dangling_parents()
                .into_iter()
                .filter(|hash| !given_up.contains(hash))
                .collect();
            if wanted.is_empty() {
                break;
            }
            report.rounds = round;
            debug!("Repair round {}: looking up {} blocks", round, wanted.len());

            let mut results: Vec<(BlockHash, Result<Block, LookupError>)> = stream::iter(wanted)
                .map(|hash| async move {
                    let result = lookup.lookup(&hash).await;
                    (hash, result)
                })
                .buffer_unordered(self.concurrency)
                .collect()
                .await;
            results.sort_by(|a, b| a.0.cmp(&b.0));

            let mut progress = false;
            for (hash, result) in results {
                match result {
                    Ok(block) if block.hash != hash => {
                        warn!("Lookup for {} returned block {}, discarding", hash, block.hash);
                        report.rejected += 1;
                        given_up.insert(hash);
                    }
                    Ok(block) => {
                        if chain_store.insert(block)? == InsertOutcome::Inserted {
                            report.missing_parents_fixed += 1;
                            report.inserted.push(hash);
                            progress = true;
                        }
                    }
                    Err(LookupError::NotFound(_)) => {
                        debug!("Block {} not found, leaving parent link dangling", hash);
                        report.not_found += 1;
                        given_up.insert(hash);
                    }
                    Err(e @ LookupError::Unavailable { .. }) => {
                        warn!("{}", e);
                        report.unavailable += 1;
                        given_up.insert(hash);
                    }
                    Err(e @ LookupError::Malformed { .. }) => {
                        warn!("{}", e);
                        report.rejected += 1;
                        given_up.insert(hash);
                    }
                }
            }
            if !progress {
                break;
            }
        }

        report.missing_children_fixed = endpoints_before
            .iter()
            .filter(|hash| !chain_store.is_endpoint(hash))
            .count();

        info!(
            "Repair fixed {} missing parents and {} missing children in {} rounds ({} not found, {} unavailable, {} rejected)",
            report.missing_parents_fixed,
            report.missing_children_fixed,
            report.rounds,
            report.not_found,
            report.unavailable,
            report.rejected
        );
        Ok(report)
    }
}
