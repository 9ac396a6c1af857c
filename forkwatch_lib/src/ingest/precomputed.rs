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

//! Parser for precomputed block JSON files.
//!
//! Only the handful of fields needed to place a block in the graph are
//! read, the rest of the (large) document is ignored by serde.

use super::IngestError;
use crate::chain::{Block, BlockHash, PublicKey};
use serde::{Deserialize, Deserializer};

#[derive(Debug, Deserialize)]
struct PrecomputedBlock {
    #[serde(deserialize_with = "deserialize_u64_lenient")]
    scheduled_time: u64,
    protocol_state: ProtocolState,
}

#[derive(Debug, Deserialize)]
struct ProtocolState {
    previous_state_hash: BlockHash,
    body: ProtocolStateBody,
}

#[derive(Debug, Deserialize)]
struct ProtocolStateBody {
    consensus_state: ConsensusState,
}

#[derive(Debug, Deserialize)]
struct ConsensusState {
    block_creator: PublicKey,
    #[serde(deserialize_with = "deserialize_u64_lenient")]
    global_slot_since_genesis: u64,
    supercharge_coinbase: bool,
}

/// Block files carry numbers as JSON strings, accept plain numbers too
fn deserialize_u64_lenient<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(u64),
    }

    match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => s.trim().parse().map_err(serde::de::Error::custom),
        StringOrNumber::Number(n) => Ok(n),
    }
}

/// Parse a precomputed block. The hash is not part of the document, it
/// comes from the file name or from the lookup request.
pub fn parse_block(hash: BlockHash, bytes: &[u8]) -> Result<Block, IngestError> {
    let precomputed: PrecomputedBlock =
        serde_json::from_slice(bytes).map_err(|e| IngestError::Parse {
            hash: hash.clone(),
            reason: e.to_string(),
        })?;
    let consensus_state = precomputed.protocol_state.body.consensus_state;
    Ok(Block {
        hash,
        parent_hash: precomputed.protocol_state.previous_state_hash,
        height: consensus_state.global_slot_since_genesis,
        timestamp: precomputed.scheduled_time,
        creator: consensus_state.block_creator,
        supercharged: consensus_state.supercharge_coinbase,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "scheduled_time": "1615940160000",
        "protocol_state": {
            "previous_state_hash": "3NKparent",
            "body": {
                "genesis_state_hash": "3NKgenesis",
                "consensus_state": {
                    "blockchain_length": "2",
                    "block_creator": "B62qcreator",
                    "global_slot_since_genesis": "1026",
                    "supercharge_coinbase": true
                }
            }
        },
        "staged_ledger_diff": {"diff": []}
    }"#;

    #[test]
    fn test_parse_sample_block() {
        let block = parse_block(BlockHash::from("3NKchild"), SAMPLE.as_bytes()).unwrap();
        assert_eq!(block.hash, BlockHash::from("3NKchild"));
        assert_eq!(block.parent_hash, BlockHash::from("3NKparent"));
        assert_eq!(block.height, 1026);
        assert_eq!(block.timestamp, 1_615_940_160_000);
        assert_eq!(block.creator, PublicKey::from("B62qcreator"));
        assert!(block.supercharged);
    }

    #[test]
    fn test_parse_numeric_fields() {
        let json = r#"{
            "scheduled_time": 42,
            "protocol_state": {
                "previous_state_hash": "p",
                "body": {"consensus_state": {
                    "block_creator": "c",
                    "global_slot_since_genesis": 7,
                    "supercharge_coinbase": false
                }}
            }
        }"#;
        let block = parse_block(BlockHash::from("h"), json.as_bytes()).unwrap();
        assert_eq!(block.timestamp, 42);
        assert_eq!(block.height, 7);
    }

    #[test]
    fn test_parse_missing_field_fails() {
        let json = r#"{"scheduled_time": "1", "protocol_state": {}}"#;
        let result = parse_block(BlockHash::from("h"), json.as_bytes());
        assert!(matches!(result, Err(IngestError::Parse { .. })));
    }

    #[test]
    fn test_parse_bad_number_fails() {
        let json = SAMPLE.replace("\"1026\"", "\"slot\"");
        assert!(parse_block(BlockHash::from("h"), json.as_bytes()).is_err());
    }
}
