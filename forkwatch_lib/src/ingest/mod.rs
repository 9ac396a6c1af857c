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

//! Block file ingestion.
//!
//! Block files are content addressed: the state hash is embedded in the
//! file name as `<network>-<state_hash>.json`. Files whose hash is
//! already known are skipped without being read, so a run only pays for
//! new files.

mod precomputed;

pub use precomputed::parse_block;

use crate::chain::{Block, BlockHash, ChainError, ChainStore, InsertOutcome};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Errors raised while reading block files
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("failed to read block directory {path}: {source}")]
    Directory {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read block file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse block {hash}: {reason}")]
    Parse { hash: BlockHash, reason: String },

    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// Extract the state hash from a block file name.
///
/// The hash is the segment after the last `-` of the file stem. Files
/// that are not `.json` are ignored.
pub fn hash_from_filename(path: &Path) -> Option<BlockHash> {
    if path.extension()?.to_str()? != "json" {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let hash = stem.rsplit('-').next()?;
    if hash.is_empty() {
        return None;
    }
    Some(BlockHash::from(hash))
}

/// A directory of block files
#[derive(Debug, Clone)]
pub struct BlockFileSource {
    dir: PathBuf,
}

impl BlockFileSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// List block files with their embedded hash, sorted by file name
    pub fn list(&self) -> Result<Vec<(BlockHash, PathBuf)>, IngestError> {
        let entries = std::fs::read_dir(&self.dir).map_err(|source| IngestError::Directory {
            path: self.dir.clone(),
            source,
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| IngestError::Directory {
                path: self.dir.clone(),
                source,
            })?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            match hash_from_filename(&path) {
                Some(hash) => files.push((hash, path)),
                None => debug!("Ignoring non block file {}", path.display()),
            }
        }
        files.sort_by(|a, b| a.1.cmp(&b.1));
        Ok(files)
    }

    /// Read and parse one block file
    pub fn read_block(hash: BlockHash, path: &Path) -> Result<Block, IngestError> {
        let bytes = std::fs::read(path).map_err(|source| IngestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        parse_block(hash, &bytes)
    }
}

/// Counters for one ingest run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub files_seen: usize,
    pub new_blocks: usize,
    pub already_known: usize,
    pub failed: usize,
}

/// Ingest every block file not yet in the ChainStore.
///
/// Returns the report and the newly inserted blocks so the caller can
/// persist them. Unreadable or unparsable files are logged and skipped.
/// A file conflicting with a stored block of the same hash aborts the
/// ingest with `DuplicateBlock`.
pub fn ingest_new_blocks(
    source: &BlockFileSource,
    chain_store: &mut ChainStore,
) -> Result<(IngestReport, Vec<Block>), IngestError> {
    let files = source.list()?;
    let mut report = IngestReport {
        files_seen: files.len(),
        ..Default::default()
    };
    let mut inserted = Vec::new();

    for (hash, path) in files {
        if chain_store.contains(&hash) {
            report.already_known += 1;
            continue;
        }
        let block = match BlockFileSource::read_block(hash, &path) {
            Ok(block) => block,
            Err(e) => {
                warn!("Skipping block file {}: {}", path.display(), e);
                report.failed += 1;
                continue;
            }
        };
        match chain_store.insert(block.clone())? {
            InsertOutcome::Inserted => {
                report.new_blocks += 1;
                inserted.push(block);
            }
            // two files carrying the same hash within one run
            InsertOutcome::AlreadyPresent => report.already_known += 1,
        }
    }

    info!(
        "Ingested {} new blocks from {} ({} files, {} known, {} failed)",
        report.new_blocks,
        source.dir().display(),
        report.files_seen,
        report.already_known,
        report.failed
    );
    Ok((report, inserted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{TestBlockBuilder, write_block_file};
    use tempfile::tempdir;

    #[test]
    fn test_hash_from_filename() {
        assert_eq!(
            hash_from_filename(Path::new("/blocks/mainnet-3NKabc.json")),
            Some(BlockHash::from("3NKabc"))
        );
        assert_eq!(
            hash_from_filename(Path::new("mainnet-1026-3NKabc.json")),
            Some(BlockHash::from("3NKabc"))
        );
        assert_eq!(
            hash_from_filename(Path::new("3NKabc.json")),
            Some(BlockHash::from("3NKabc"))
        );
        assert_eq!(hash_from_filename(Path::new("mainnet-3NKabc.txt")), None);
        assert_eq!(hash_from_filename(Path::new("mainnet-.json")), None);
    }

    #[test_log::test]
    fn test_ingest_new_blocks_only() {
        let dir = tempdir().unwrap();
        let genesis = TestBlockBuilder::new("g").build();
        let child = TestBlockBuilder::new("b1").parent("g").height(1).build();
        write_block_file(dir.path(), &genesis);
        write_block_file(dir.path(), &child);
        std::fs::write(dir.path().join("README.md"), "not a block").unwrap();

        let source = BlockFileSource::new(dir.path());
        let mut chain_store = ChainStore::new();

        let (report, inserted) = ingest_new_blocks(&source, &mut chain_store).unwrap();
        assert_eq!(report.files_seen, 2);
        assert_eq!(report.new_blocks, 2);
        assert_eq!(inserted.len(), 2);
        assert_eq!(chain_store.get(&BlockHash::from("b1")), Some(&child));

        let late = TestBlockBuilder::new("b2").parent("b1").height(2).build();
        write_block_file(dir.path(), &late);

        let (report, inserted) = ingest_new_blocks(&source, &mut chain_store).unwrap();
        assert_eq!(report.files_seen, 3);
        assert_eq!(report.already_known, 2);
        assert_eq!(report.new_blocks, 1);
        assert_eq!(inserted, vec![late]);
    }

    #[test]
    fn test_ingest_skips_unparsable_files() {
        let dir = tempdir().unwrap();
        write_block_file(dir.path(), &TestBlockBuilder::new("g").build());
        std::fs::write(dir.path().join("mainnet-3NKbroken.json"), "{ not json").unwrap();

        let source = BlockFileSource::new(dir.path());
        let mut chain_store = ChainStore::new();
        let (report, _) = ingest_new_blocks(&source, &mut chain_store).unwrap();

        assert_eq!(report.new_blocks, 1);
        assert_eq!(report.failed, 1);
        assert!(!chain_store.contains(&BlockHash::from("3NKbroken")));
    }

    #[test]
    fn test_ingest_missing_directory_fails() {
        let source = BlockFileSource::new("/definitely/not/here");
        let mut chain_store = ChainStore::new();
        assert!(matches!(
            ingest_new_blocks(&source, &mut chain_store),
            Err(IngestError::Directory { .. })
        ));
    }
}
