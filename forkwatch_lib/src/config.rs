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


use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BlocksConfig {
    /// Directory of precomputed block files to ingest
    pub dir: String,
}

/// Where the integrity repairer looks up missing parents
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LookupKind {
    Directory,
    Http,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LookupConfig {
    pub kind: LookupKind,
    /// Archive directory, used with kind = "directory"
    pub dir: Option<String>,
    /// URL with a `{hash}` placeholder, used with kind = "http"
    pub url_template: Option<String>,
    /// Maximum lookups in flight
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Repair rounds per pass. Each round chases the parents found in the previous one.
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,
    /// Retries for transient HTTP failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_concurrency() -> usize {
    8
}

fn default_max_rounds() -> usize {
    4
}

fn default_max_retries() -> u32 {
    3
}

fn default_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct OutputConfig {
    /// Write the staged fork snapshot to this JSON file after each pass
    pub snapshot_path: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct LoggingConfig {
    /// Log to file if specified
    pub file: Option<String>,
    /// Log level (defaults to "info")
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log to console (defaults to true)
    pub console: Option<bool>,
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub store: StoreConfig,
    pub blocks: BlocksConfig,
    pub lookup: Option<LookupConfig>,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    pub fn load(path: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("FORKWATCH").separator("_"))
            .build()?
            .try_deserialize()
    }

    pub fn with_store_path(mut self, store_path: String) -> Self {
        self.store.path = store_path;
        self
    }

    pub fn with_blocks_dir(mut self, blocks_dir: String) -> Self {
        self.blocks.dir = blocks_dir;
        self
    }

    pub fn with_lookup(mut self, lookup: Option<LookupConfig>) -> Self {
        self.lookup = lookup;
        self
    }

    pub fn with_snapshot_path(mut self, snapshot_path: Option<String>) -> Self {
        self.output.snapshot_path = snapshot_path;
        self
    }

    pub fn with_log_level(mut self, level: String) -> Self {
        self.logging.level = level;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use temp_env::with_var;

    #[test]
    fn test_config_load() {
        let config = Config::load("../config.toml").unwrap();

        assert_eq!(config.store.path, "./store.db");
        assert_eq!(config.blocks.dir, "./mina_mainnet_blocks");
        let lookup = config.lookup.unwrap();
        assert_eq!(lookup.kind, LookupKind::Http);
        assert!(lookup.url_template.unwrap().contains("{hash}"));
        assert_eq!(lookup.concurrency, 8);
        assert_eq!(lookup.max_rounds, 4);
        assert_eq!(config.output.snapshot_path.as_deref(), Some("./forks.json"));
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.console, Some(true));
    }

    #[test]
    fn test_config_builder() {
        let config = Config::load("../config.toml").unwrap();
        let config = config
            .with_store_path("/tmp/store".to_string())
            .with_blocks_dir("/tmp/blocks".to_string())
            .with_lookup(None)
            .with_snapshot_path(None)
            .with_log_level("debug".to_string());

        assert_eq!(config.store.path, "/tmp/store");
        assert_eq!(config.blocks.dir, "/tmp/blocks");
        assert!(config.lookup.is_none());
        assert!(config.output.snapshot_path.is_none());
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_lookup_defaults() {
        let lookup: LookupConfig = serde_json::from_str(r#"{"kind": "directory", "dir": "/archive"}"#).unwrap();
        assert_eq!(lookup.kind, LookupKind::Directory);
        assert_eq!(lookup.dir.as_deref(), Some("/archive"));
        assert_eq!(lookup.concurrency, 8);
        assert_eq!(lookup.max_rounds, 4);
        assert_eq!(lookup.max_retries, 3);
        assert_eq!(lookup.timeout_secs, 10);
    }

    #[test]
    fn test_config_from_env_vars() {
        with_var("FORKWATCH_STORE_PATH", Some("/var/lib/forkwatch"), || {
            let config = Config::load("../config.toml").unwrap();

            // Check that the environment variable overrides the config file value
            assert_eq!(config.store.path, "/var/lib/forkwatch");
        });
    }
}
