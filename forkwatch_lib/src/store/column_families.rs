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


/// Column families strings defined in one place for type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnFamily {
    /// Block hash -> block
    Block,
    /// Fork id -> staged fork, replaced wholesale each pass
    Fork,
    Metadata,
}

impl ColumnFamily {
    pub const ALL: [ColumnFamily; 3] = [ColumnFamily::Block, ColumnFamily::Fork, ColumnFamily::Metadata];

    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnFamily::Block => "block",
            ColumnFamily::Fork => "fork",
            ColumnFamily::Metadata => "metadata",
        }
    }
}

impl std::ops::Deref for ColumnFamily {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        self.as_str()
    }
}

impl AsRef<str> for ColumnFamily {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl From<ColumnFamily> for String {
    fn from(val: ColumnFamily) -> Self {
        val.as_str().to_string()
    }
}
