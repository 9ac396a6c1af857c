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


//! One canonicalization pass over the durable block set.
//!
//! ingest -> repair -> canonicalize -> extract -> stage -> commit. The
//! pass owns the in-memory ChainStore for its whole duration. Blocks seen
//! for the first time, the fork set and the pass metadata are committed
//! together at the end, so a failed pass leaves the previous result in
//! place and never stores blocks that failed the structure checks.

use crate::chain::{BlockHash, ChainError, ChainStore, canonicalize, extract_forks};
use crate::config::{Config, LookupConfig, LookupKind};
use crate::ingest::{BlockFileSource, IngestError, IngestReport, ingest_new_blocks};
use crate::repair::{BlockLookup, DirectoryLookup, HttpLookup, IntegrityRepairer, RepairReport};
use crate::staging::{ForkSink, JsonSnapshotSink, SnapshotDiff, stage};
use crate::store::{PassMetadata, Store, StoreError};
use serde::Serialize;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{error, info};

#[derive(Debug, thiserror::Error)]
pub enum PassError {
    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// What a pass did, printed by `forkwatch run`
#[derive(Debug, Clone, Serialize)]
pub struct PassSummary {
    pub ingest: IngestReport,
    pub repair: Option<RepairReport>,
    pub head: BlockHash,
    pub head_height: u64,
    pub total_blocks: usize,
    pub canonical_blocks: usize,
    pub fork_count: usize,
    pub store_diff: SnapshotDiff,
    pub snapshot_diff: Option<SnapshotDiff>,
}

/// Build the configured block lookup
pub fn lookup_from_config(config: &LookupConfig) -> Result<Box<dyn BlockLookup>, PassError> {
    match config.kind {
        LookupKind::Directory => {
            let dir = config
                .dir
                .as_ref()
                .ok_or_else(|| PassError::Config("lookup.dir is required for kind = \"directory\"".into()))?;
            Ok(Box::new(DirectoryLookup::new(dir)?))
        }
        LookupKind::Http => {
            let url_template = config.url_template.as_ref().ok_or_else(|| {
                PassError::Config("lookup.url_template is required for kind = \"http\"".into())
            })?;
            let lookup = HttpLookup::new(
                url_template,
                Duration::from_secs(config.timeout_secs),
                config.max_retries,
            )
            .map_err(|e| PassError::Config(e.to_string()))?;
            Ok(Box::new(lookup))
        }
    }
}

pub struct Pipeline {
    store: Store,
    source: BlockFileSource,
    lookup: Option<(Box<dyn BlockLookup>, IntegrityRepairer)>,
    snapshot_sink: Option<JsonSnapshotSink>,
    chain_store: ChainStore,
}

impl Pipeline {
    /// Create a pipeline, restoring the block graph from the store
    pub fn new(store: Store, source: BlockFileSource) -> Result<Self, PassError> {
        let chain_store = store.load_chain_store()?;
        info!("Restored {} blocks from {}", chain_store.len(), store.path());
        Ok(Self {
            store,
            source,
            lookup: None,
            snapshot_sink: None,
            chain_store,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, PassError> {
        let store = Store::new(config.store.path.clone(), false)?;
        let mut pipeline = Self::new(store, BlockFileSource::new(&config.blocks.dir))?;
        if let Some(lookup_config) = &config.lookup {
            pipeline = pipeline.with_lookup(
                lookup_from_config(lookup_config)?,
                IntegrityRepairer::from_config(lookup_config),
            );
        }
        if let Some(path) = &config.output.snapshot_path {
            pipeline = pipeline.with_snapshot_sink(JsonSnapshotSink::new(path));
        }
        Ok(pipeline)
    }

    pub fn with_lookup(mut self, lookup: Box<dyn BlockLookup>, repairer: IntegrityRepairer) -> Self {
        self.lookup = Some((lookup, repairer));
        self
    }

    pub fn with_snapshot_sink(mut self, sink: JsonSnapshotSink) -> Self {
        self.snapshot_sink = Some(sink);
        self
    }

    pub fn chain_store(&self) -> &ChainStore {
        &self.chain_store
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Run one pass. On failure the in-memory graph is restored from the
    /// store, so the blocks of the failed pass are ingested again by the
    /// next one.
    pub async fn run_pass(&mut self) -> Result<PassSummary, PassError> {
        match self.try_pass().await {
            Ok(summary) => Ok(summary),
            Err(e) => {
                error!("Pass aborted: {}", e);
                self.chain_store = self.store.load_chain_store()?;
                Err(e)
            }
        }
    }

    async fn try_pass(&mut self) -> Result<PassSummary, PassError> {
        let (ingest, mut new_blocks) = ingest_new_blocks(&self.source, &mut self.chain_store)?;

        let repair = match &self.lookup {
            Some((lookup, repairer)) => {
                let report = repairer.repair(&mut self.chain_store, &**lookup).await?;
                new_blocks.extend(
                    report
                        .inserted
                        .iter()
                        .filter_map(|hash| self.chain_store.get(hash).cloned()),
                );
                Some(report)
            }
            None => None,
        };

        let canonicalization = canonicalize(&self.chain_store)?;
        let forks = extract_forks(
            &self.chain_store,
            &canonicalization.view,
            &canonicalization.endpoints,
        )?;
        let staged = stage(&forks);

        let head_height = self
            .chain_store
            .get(&canonicalization.head)
            .map(|block| block.height)
            .unwrap_or_default();
        let metadata = PassMetadata {
            head: canonicalization.head.clone(),
            head_height,
            fork_count: staged.len(),
            completed_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|elapsed| elapsed.as_secs())
                .unwrap_or_default(),
        };
        let store_diff = self.store.commit_pass(&new_blocks, &staged, &metadata)?;
        let snapshot_diff = match &self.snapshot_sink {
            Some(sink) => Some(sink.reconcile(&staged)?),
            None => None,
        };

        Ok(PassSummary {
            ingest,
            repair,
            head: canonicalization.head,
            head_height,
            total_blocks: self.chain_store.len(),
            canonical_blocks: canonicalization.view.len(),
            fork_count: staged.len(),
            store_diff,
            snapshot_diff,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_config(kind: LookupKind) -> LookupConfig {
        LookupConfig {
            kind,
            dir: None,
            url_template: None,
            concurrency: 4,
            max_rounds: 2,
            max_retries: 1,
            timeout_secs: 1,
        }
    }

    #[test]
    fn test_lookup_from_config_requires_location() {
        assert!(matches!(
            lookup_from_config(&lookup_config(LookupKind::Directory)),
            Err(PassError::Config(_))
        ));
        assert!(matches!(
            lookup_from_config(&lookup_config(LookupKind::Http)),
            Err(PassError::Config(_))
        ));

        let mut config = lookup_config(LookupKind::Http);
        config.url_template = Some("http://localhost/blocks/latest.json".into());
        assert!(matches!(lookup_from_config(&config), Err(PassError::Config(_))));

        config.url_template = Some("http://localhost/blocks/mainnet-{hash}.json".into());
        assert!(lookup_from_config(&config).is_ok());
    }

    #[test]
    fn test_directory_lookup_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = lookup_config(LookupKind::Directory);
        config.dir = Some(dir.path().to_str().unwrap().to_string());
        assert!(lookup_from_config(&config).is_ok());
    }
}
