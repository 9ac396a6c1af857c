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


use crate::chain::ForkId;
use crate::staging::{ForkFilter, StagedFork};
use crate::store::{Store, StoreError};
use serde::Serialize;
use std::error::Error;

#[derive(Debug, Serialize)]
pub(crate) struct ForkEntry {
    id: ForkId,
    #[serde(flatten)]
    fork: StagedFork,
}

/// Stored forks matching the filter, most recently active first
pub(crate) fn collect(store: &Store, filter: &ForkFilter) -> Result<Vec<ForkEntry>, StoreError> {
    let mut entries: Vec<ForkEntry> = filter
        .apply(&store.get_forks()?)
        .into_iter()
        .map(|(id, fork)| ForkEntry { id, fork })
        .collect();
    entries.sort_by(|a, b| {
        b.fork
            .last_updated
            .cmp(&a.fork.last_updated)
            .then_with(|| a.id.cmp(&b.id))
    });
    Ok(entries)
}

/// Implementation of the forks command
pub fn execute(store: &Store, filter: &ForkFilter) -> Result<(), Box<dyn Error>> {
    let entries = collect(store, filter)?;
    println!("{}", serde_json::to_string_pretty(&entries)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{BlockHash, PublicKey};
    use crate::staging::{ForkSink, ForkSnapshot};
    use crate::test_utils::setup_test_store;

    fn fork(length: u64, creator: &str, last_updated: u64) -> StagedFork {
        StagedFork {
            length,
            blocks: (0..length).map(|i| BlockHash::new(format!("{creator}-{i}"))).collect(),
            creators: vec![PublicKey::from(creator)],
            rewards: 720 * length,
            latest: BlockHash::new(format!("{creator}-0")),
            last_updated,
            rejoins: Some(BlockHash::from("main-1")),
        }
    }

    #[test]
    fn test_forks_filtered_and_sorted() {
        let (store, _temp_dir) = setup_test_store();
        let snapshot: ForkSnapshot = [
            (ForkId::from("a"), fork(2, "alice", 100)),
            (ForkId::from("b"), fork(3, "bob", 300)),
            (ForkId::from("c"), fork(1, "carol", 500)),
            (ForkId::from("d"), fork(5, "alice", 200)),
        ]
        .into_iter()
        .collect();
        store.reconcile(&snapshot).unwrap();

        let entries = collect(&store, &ForkFilter::default()).unwrap();
        let ids: Vec<&str> = entries.iter().map(|entry| entry.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "d", "a"]);

        let filter = ForkFilter {
            public_key: Some(PublicKey::from("alice")),
            updated_after: 150,
            ..Default::default()
        };
        let entries = collect(&store, &filter).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, ForkId::from("d"));

        let json = serde_json::to_value(&entries[0]).unwrap();
        assert_eq!(json["id"], "d");
        assert_eq!(json["length"], 5);
        assert!(execute(&store, &filter).is_ok());
    }
}
