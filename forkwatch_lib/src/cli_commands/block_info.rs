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


use crate::chain::{BlockHash, canonicalize};
use crate::store::{Store, StoreError};
use serde::Serialize;
use std::error::Error;

#[derive(Debug, Serialize)]
pub(crate) struct BlockInfo {
    hash: String,
    parent_hash: String,
    parent_known: bool,
    height: u64,
    timestamp: u64,
    creator: String,
    supercharged: bool,
    children: Vec<String>,
    /// None when the stored graph cannot be canonicalized
    canonical: Option<bool>,
}

pub(crate) fn collect(store: &Store, hash: &BlockHash) -> Result<BlockInfo, StoreError> {
    let chain_store = store.load_chain_store()?;
    let block = chain_store
        .get(hash)
        .ok_or_else(|| StoreError::NotFound(format!("block {hash}")))?;
    let canonical = canonicalize(&chain_store)
        .ok()
        .map(|result| result.view.is_canonical(hash));

    Ok(BlockInfo {
        hash: block.hash.to_string(),
        parent_hash: block.parent_hash.to_string(),
        parent_known: !chain_store.has_dangling_parent(hash),
        height: block.height,
        timestamp: block.timestamp,
        creator: block.creator.to_string(),
        supercharged: block.supercharged,
        children: chain_store
            .children_of(hash)
            .into_iter()
            .map(|child| child.to_string())
            .collect(),
        canonical,
    })
}

/// Implementation of the block command
pub fn execute(store: &Store, hash_string: &str) -> Result<(), Box<dyn Error>> {
    let info = collect(store, &BlockHash::from(hash_string))?;
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}
