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


use super::{ForkSink, ForkSnapshot, SnapshotDiff};
use crate::store::StoreError;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Keeps the latest fork snapshot as a single JSON document.
///
/// The file only supports whole-document get and set, so the diff is
/// computed here against the previous document. Writes go to a sibling
/// temp file that is then renamed over the target, so readers never
/// see a partial snapshot.
#[derive(Debug, Clone)]
pub struct JsonSnapshotSink {
    path: PathBuf,
}

impl JsonSnapshotSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current snapshot, empty when no file was written yet
    pub fn load(&self) -> Result<ForkSnapshot, StoreError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ForkSnapshot::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl ForkSink for JsonSnapshotSink {
    fn reconcile(&self, staged: &ForkSnapshot) -> Result<SnapshotDiff, StoreError> {
        let previous = self.load()?;
        let diff = SnapshotDiff::between(&previous, staged);
        if diff.is_empty() && self.path.exists() {
            debug!("Snapshot {} unchanged", self.path.display());
            return Ok(diff);
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let temp_path = self.temp_path();
        std::fs::write(&temp_path, serde_json::to_vec_pretty(staged)?)?;
        std::fs::rename(&temp_path, &self.path)?;

        info!(
            "Wrote {} forks to {} ({} inserted, {} updated, {} removed)",
            staged.len(),
            self.path.display(),
            diff.inserted.len(),
            diff.updated.len(),
            diff.removed.len()
        );
        Ok(diff)
    }
}
