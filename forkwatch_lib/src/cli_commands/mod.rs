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


pub mod block_info;
pub mod forks;
pub mod info;
pub mod run;

// Re-export the shared store functionality
pub mod store {
    use crate::store::{Store, StoreError};

    /// Open a store from the given path
    pub fn open_store(store_path: String) -> Result<Store, StoreError> {
        tracing::debug!("Opening store in read-only mode: {:?}", store_path);

        Store::new(store_path, true).map_err(|e| {
            tracing::error!("Failed to open store: {}", e);
            e
        })
    }
}
