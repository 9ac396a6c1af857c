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


use super::{BlockLookup, LookupError};
use crate::chain::{Block, BlockHash};
use crate::ingest::parse_block;
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use std::time::Duration;
use tracing::{debug, warn};

/// The delay before the first retry
const RETRY_DELAY: Duration = Duration::from_secs(1);
/// The maximum delay between retries
const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);
/// `{hash}` as it appears in a parsed URL path
const HASH_PLACEHOLDER: &str = "%7Bhash%7D";

#[derive(Debug, thiserror::Error)]
pub enum HttpLookupError {
    #[error("invalid url template {template}: {reason}")]
    Template { template: String, reason: String },

    #[error(transparent)]
    Client(#[from] reqwest::Error),
}

/// Fetches precomputed blocks over HTTP.
///
/// The URL template must contain `{hash}` in its path, e.g.
/// `https://storage.googleapis.com/mina_network_block_data/mainnet-{hash}.json`.
/// The template is written unescaped. The hash is escaped as a path
/// segment, so it can never change the path structure or add a query.
/// A 404 is a definite `NotFound`. Other failures are retried with
/// exponential backoff and reported as `Unavailable` once retries run out.
#[derive(Debug, Clone)]
pub struct HttpLookup {
    client: reqwest::Client,
    template: Url,
    /// Path segments of the template, still percent encoded
    segments: Vec<String>,
    max_retries: u32,
    retry_delay: Duration,
}

impl HttpLookup {
    pub fn new(
        url_template: &str,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Self, HttpLookupError> {
        let invalid = |reason: &str| HttpLookupError::Template {
            template: url_template.to_string(),
            reason: reason.to_string(),
        };
        let template = Url::parse(url_template).map_err(|e| invalid(&e.to_string()))?;
        let segments: Vec<String> = template
            .path_segments()
            .ok_or_else(|| invalid("url cannot have a path"))?
            .map(str::to_string)
            .collect();
        if !segments.iter().any(|segment| segment.contains(HASH_PLACEHOLDER)) {
            return Err(invalid("no {hash} placeholder in the path"));
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            template,
            segments,
            max_retries,
            retry_delay: RETRY_DELAY,
        })
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    fn url_for(&self, hash: &BlockHash) -> Url {
        let mut url = self.template.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.clear().extend(
                self.segments
                    .iter()
                    .map(|segment| segment.replace(HASH_PLACEHOLDER, hash.as_str())),
            );
        }
        url
    }
}

#[async_trait]
impl BlockLookup for HttpLookup {
    async fn lookup(&self, hash: &BlockHash) -> Result<Block, LookupError> {
        let url = self.url_for(hash);
        let mut retry_delay = self.retry_delay;
        let mut attempt = 0;

        loop {
            debug!("Fetching block {} from {}", hash, url);
            let reason = match self.client.get(url.clone()).send().await {
                Ok(response) if response.status() == StatusCode::NOT_FOUND => {
                    return Err(LookupError::NotFound(hash.clone()));
                }
                Ok(response) if response.status().is_success() => match response.bytes().await {
                    Ok(body) => {
                        return parse_block(hash.clone(), &body).map_err(|e| {
                            LookupError::Malformed {
                                hash: hash.clone(),
                                reason: e.to_string(),
                            }
                        });
                    }
                    Err(e) => e.to_string(),
                },
                Ok(response) => format!("HTTP {}", response.status()),
                Err(e) => e.to_string(),
            };

            if attempt >= self.max_retries {
                return Err(LookupError::Unavailable {
                    hash: hash.clone(),
                    reason,
                });
            }
            attempt += 1;
            warn!(
                "Failed to fetch block {}: {}. Retrying in {:?}...",
                hash, reason, retry_delay
            );
            tokio::time::sleep(retry_delay).await;

            // Exponential backoff with a maximum delay
            retry_delay = std::cmp::min(retry_delay * 2, MAX_RETRY_DELAY);
        }
    }
}
