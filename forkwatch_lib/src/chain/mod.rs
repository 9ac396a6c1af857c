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

//! Block graph assembly, canonical chain selection and fork extraction.
//!
//! All stages take an explicitly owned `ChainStore` and hand their
//! results to the next stage. Nothing here keeps process wide state.

pub mod block;
pub mod canonical;
pub mod chain_store;
pub mod error;
pub mod fork;

pub use block::{Block, BlockHash, PublicKey};
pub use canonical::{CanonicalView, Canonicalization, canonicalize};
pub use chain_store::{ChainStore, InsertOutcome};
pub use error::ChainError;
pub use fork::{Fork, ForkId, extract_forks};
