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


use crate::store::{Store, StoreError};
use serde::Serialize;
use std::error::Error;

/// Summary of the store contents
#[derive(Debug, Serialize)]
pub(crate) struct StoreInfo {
    total_blocks: usize,
    endpoints: usize,
    dangling_parents: usize,
    canonical_head: Option<String>,
    canonical_head_height: Option<u64>,
    stored_forks: usize,
    last_pass_completed_at: Option<u64>,
}

pub(crate) fn collect(store: &Store) -> Result<StoreInfo, StoreError> {
    let chain_store = store.load_chain_store()?;
    let last_pass = store.get_pass_metadata()?;
    Ok(StoreInfo {
        total_blocks: chain_store.len(),
        endpoints: chain_store.endpoints().len(),
        dangling_parents: chain_store.dangling_parents().len(),
        canonical_head: last_pass.as_ref().map(|pass| pass.head.to_string()),
        canonical_head_height: last_pass.as_ref().map(|pass| pass.head_height),
        stored_forks: store.get_forks()?.len(),
        last_pass_completed_at: last_pass.as_ref().map(|pass| pass.completed_at),
    })
}

/// Implementation of the info command
pub fn execute(store: &Store) -> Result<(), Box<dyn Error>> {
    let info = collect(store)?;
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}
