use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::errors::RpcError;
use crate::models::{Block, LogEntry};

// ---------------------------------------------------------------------------
// JSON-RPC envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct RpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    pub params: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcResponse<T> {
    pub result: Option<T>,
    #[serde(default)]
    pub error: Option<RpcErrorObject>,
}

impl<T: DeserializeOwned> RpcResponse<T> {
    /// A `null` result is only accepted when `T` itself can represent null.
    pub fn into_result(self) -> Result<T, RpcError> {
        if let Some(err) = self.error {
            return Err(RpcError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        match self.result {
            Some(result) => Ok(result),
            None => serde_json::from_value(serde_json::Value::Null).map_err(|_| {
                RpcError::Unexpected("response has neither result nor error".into())
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// eth_getLogs / eth_getBlockByNumber payloads (hex-encoded quantities)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLog {
    pub address: String,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub transaction_hash: Option<String>,
    #[serde(default)]
    pub block_number: Option<String>,
    #[serde(default)]
    pub log_index: Option<String>,
    #[serde(default)]
    pub removed: bool,
}

impl RawLog {
    pub fn into_entry(self) -> Result<LogEntry, RpcError> {
        let topics = self
            .topics
            .iter()
            .map(|t| parse_word(t))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(LogEntry {
            address: self.address.to_lowercase(),
            topics,
            data: parse_bytes(&self.data)?,
            tx_hash: self.transaction_hash.unwrap_or_default().to_lowercase(),
            block_number: parse_quantity(self.block_number.as_deref().unwrap_or("0x0"))?,
            log_index: parse_quantity(self.log_index.as_deref().unwrap_or("0x0"))?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawTransaction {
    Hash(String),
    Full {
        hash: String,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawBlock {
    pub number: String,
    pub timestamp: String,
    #[serde(default)]
    pub transactions: Vec<RawTransaction>,
}

impl RawBlock {
    pub fn into_block(self) -> Result<Block, RpcError> {
        let number = parse_quantity(&self.number)?;
        let secs = parse_quantity(&self.timestamp)?;
        let timestamp: DateTime<Utc> = i64::try_from(secs)
            .ok()
            .and_then(|s| DateTime::from_timestamp(s, 0))
            .ok_or_else(|| RpcError::Unexpected(format!("bad block timestamp {}", self.timestamp)))?;

        let transaction_hashes = self
            .transactions
            .into_iter()
            .map(|tx| match tx {
                RawTransaction::Hash(h) => h,
                RawTransaction::Full { hash } => hash,
            })
            .collect();

        Ok(Block {
            number,
            timestamp,
            transaction_hashes,
        })
    }
}

// ---------------------------------------------------------------------------
// Hex helpers
// ---------------------------------------------------------------------------

/// Parse a `0x`-prefixed hex quantity such as `"0x1b4"`.
pub fn parse_quantity(s: &str) -> Result<u64, RpcError> {
    let hex = s.strip_prefix("0x").unwrap_or(s);
    if hex.is_empty() {
        return Ok(0);
    }
    u64::from_str_radix(hex, 16).map_err(|_| RpcError::Unexpected(format!("bad quantity {s}")))
}

pub fn format_quantity(n: u64) -> String {
    format!("0x{n:x}")
}

pub fn parse_word(s: &str) -> Result<[u8; 32], RpcError> {
    let hex = s.strip_prefix("0x").unwrap_or(s);
    let mut out = [0u8; 32];
    hex::decode_to_slice(hex, &mut out)
        .map_err(|_| RpcError::Unexpected(format!("bad 32-byte word {s}")))?;
    Ok(out)
}

pub fn format_word(word: &[u8; 32]) -> String {
    format!("0x{}", hex::encode(word))
}

fn parse_bytes(s: &str) -> Result<Vec<u8>, RpcError> {
    let hex = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(hex).map_err(|_| RpcError::Unexpected("bad log data".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("0x1b4").unwrap(), 436);
        assert_eq!(parse_quantity("0x").unwrap(), 0);
        assert!(parse_quantity("0xzz").is_err());
        assert_eq!(format_quantity(436), "0x1b4");
    }

    #[test]
    fn test_raw_log_into_entry() {
        let json = serde_json::json!({
            "address": "0x4BFB41D5B3570DEFD03C39A9A4D8DE6BD8B8982E",
            "topics": ["0xd0a08e8c493f9c94f29311604c9de1b4e8c8d4c06bd0c789af57f2d65bfec0f6"],
            "data": "0x0001",
            "transactionHash": "0xABC",
            "blockNumber": "0x10",
            "logIndex": "0x2"
        });
        let raw: RawLog = serde_json::from_value(json).unwrap();
        let entry = raw.into_entry().unwrap();
        assert_eq!(entry.address, "0x4bfb41d5b3570defd03c39a9a4d8de6bd8b8982e");
        assert_eq!(entry.topics.len(), 1);
        assert_eq!(entry.data, vec![0x00, 0x01]);
        assert_eq!(entry.tx_hash, "0xabc");
        assert_eq!(entry.block_number, 16);
        assert_eq!(entry.log_index, 2);
    }

    #[test]
    fn test_rpc_response_error() {
        let resp: RpcResponse<String> = serde_json::from_value(serde_json::json!({
            "jsonrpc": "2.0", "id": 1,
            "error": {"code": -32005, "message": "query returned more than 10000 results"}
        }))
        .unwrap();
        assert!(matches!(resp.into_result(), Err(RpcError::Rpc { code: -32005, .. })));
    }

    // Generic over any deserializable payload, the way `RpcClient::call` decodes.
    fn decode<T: DeserializeOwned>(value: serde_json::Value) -> RpcResponse<T> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_rpc_response_payload_without_default() {
        #[derive(Debug, Deserialize)]
        struct Head {
            number: String,
        }

        let resp: RpcResponse<Head> = decode(serde_json::json!({
            "jsonrpc": "2.0", "id": 1, "result": {"number": "0x64"}
        }));
        assert_eq!(resp.into_result().unwrap().number, "0x64");

        let missing: RpcResponse<Head> = decode(serde_json::json!({"jsonrpc": "2.0", "id": 2}));
        assert!(missing.result.is_none());
        assert!(matches!(missing.into_result(), Err(RpcError::Unexpected(_))));
    }

    #[test]
    fn test_raw_block_with_hashes() {
        let raw: RawBlock = serde_json::from_value(serde_json::json!({
            "number": "0x64",
            "timestamp": "0x65000000",
            "transactions": ["0xaa", {"hash": "0xbb", "nonce": "0x1"}]
        }))
        .unwrap();
        let block = raw.into_block().unwrap();
        assert_eq!(block.number, 100);
        assert_eq!(block.timestamp.timestamp(), 0x65000000);
        assert_eq!(block.transaction_hashes, vec!["0xaa", "0xbb"]);
    }
}
