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


use crate::config::Config;
use crate::pipeline::Pipeline;
use std::error::Error;
use std::time::Duration;
use tracing::{error, info};

/// Implementation of the run command.
///
/// Runs a single pass, or with `watch` one pass every `watch` seconds
/// until Ctrl-C. In watch mode a failed pass is logged and the next one
/// is attempted on schedule.
pub async fn execute(config: &Config, watch: Option<u64>) -> Result<(), Box<dyn Error>> {
    let mut pipeline = Pipeline::from_config(config)?;

    let Some(interval) = watch else {
        let summary = pipeline.run_pass().await?;
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    };

    info!("Watching {} every {} seconds", config.blocks.dir, interval);
    loop {
        match pipeline.run_pass().await {
            Ok(summary) => println!("{}", serde_json::to_string_pretty(&summary)?),
            Err(e) => error!("Pass failed, retrying in {} seconds: {}", interval, e),
        }
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl-C, stopping");
                break;
            }
            _ = tokio::time::sleep(Duration::from_secs(interval)) => {}
        }
    }
    Ok(())
}
