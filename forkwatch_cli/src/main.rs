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


use clap::{Parser, Subcommand};
use forkwatch_lib::chain::PublicKey;
use forkwatch_lib::cli_commands;
use forkwatch_lib::config::Config;
use forkwatch_lib::logging::setup_logging;
use forkwatch_lib::staging::ForkFilter;
use std::error::Error;

/// Canonical chain and fork tracker for precomputed block dumps
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to forkwatch config file
    #[arg(short, long, env = "FORKWATCH_CONFIG", default_value = "config.toml")]
    config: String,

    /// Command to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ingest new block files, repair, and recompute canonical chain and forks
    Run {
        /// Repeat the pass every SECS seconds until Ctrl-C
        #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
        watch: Option<u64>,
    },
    /// List information about the store
    Info,
    /// List stored forks
    Forks {
        /// Minimum number of blocks in a fork
        #[arg(long, default_value_t = 2)]
        min_length: u64,
        /// Only forks active at or after this time, in epoch milliseconds
        #[arg(long, default_value_t = 0)]
        updated_after: u64,
        /// Only forks containing a block by this creator
        #[arg(long)]
        public_key: Option<String>,
    },
    /// Show a stored block with its children and canonical status
    Block {
        /// State hash of the block
        hash: String,
    },
}

/// Read-only commands print JSON on stdout, keep logs off it
fn init_stderr_tracing() {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Run { watch } => {
            // Keep the guard alive so file logs are flushed on exit
            let _guard = setup_logging(&config.logging)?;
            cli_commands::run::execute(&config, watch).await?;
        }
        Commands::Info => {
            init_stderr_tracing();
            let store = cli_commands::store::open_store(config.store.path.clone())?;
            cli_commands::info::execute(&store)?;
        }
        Commands::Forks {
            min_length,
            updated_after,
            public_key,
        } => {
            init_stderr_tracing();
            let store = cli_commands::store::open_store(config.store.path.clone())?;
            let filter = ForkFilter {
                min_length,
                updated_after,
                public_key: public_key.map(PublicKey::new),
            };
            cli_commands::forks::execute(&store, &filter)?;
        }
        Commands::Block { hash } => {
            init_stderr_tracing();
            let store = cli_commands::store::open_store(config.store.path.clone())?;
            cli_commands::block_info::execute(&store, &hash)?;
        }
    }

    Ok(())
}
