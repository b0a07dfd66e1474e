use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::json;

use super::types::{format_quantity, format_word, RawBlock, RawLog, RpcRequest, RpcResponse};
use super::{ChainSource, LogFilter};
use crate::errors::RpcError;
use crate::models::{Block, LogEntry};

/// JSON-RPC client for a Polygon node. Every request carries the configured timeout.
#[derive(Debug, Clone)]
pub struct RpcClient {
    http: Client,
    url: String,
    next_id: Arc<AtomicU64>,
}

impl RpcClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, RpcError> {
        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            url: url.into(),
            next_id: Arc::new(AtomicU64::new(1)),
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T, RpcError> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        let resp = self.http.post(&self.url).json(&request).send().await?;

        let status = resp.status();
        if !status.is_success() {
            tracing::warn!(method, status = %status, "JSON-RPC endpoint returned non-2xx");
            return Err(RpcError::Status(status.as_u16()));
        }

        let body: RpcResponse<T> = resp.json().await?;
        body.into_result()
    }
}

impl ChainSource for RpcClient {
    async fn chain_id(&self) -> Result<u64, RpcError> {
        let hex: String = self.call("eth_chainId", json!([])).await?;
        super::types::parse_quantity(&hex)
    }

    async fn current_height(&self) -> Result<u64, RpcError> {
        let hex: String = self.call("eth_blockNumber", json!([])).await?;
        super::types::parse_quantity(&hex)
    }

    async fn get_logs(
        &self,
        from_block: u64,
        to_block: u64,
        filter: &LogFilter,
    ) -> Result<Vec<LogEntry>, RpcError> {
        let topic0: Vec<String> = filter.topic0.iter().map(format_word).collect();
        let params = json!([{
            "fromBlock": format_quantity(from_block),
            "toBlock": format_quantity(to_block),
            "address": filter.addresses,
            "topics": [topic0],
        }]);

        let raw: Vec<RawLog> = self.call("eth_getLogs", params).await?;

        let mut entries = Vec::with_capacity(raw.len());
        for log in raw {
            if log.removed {
                tracing::debug!(tx = ?log.transaction_hash, "Skipping removed (reorged) log");
                continue;
            }
            entries.push(log.into_entry()?);
        }
        entries.sort_by_key(|e| (e.block_number, e.log_index));

        Ok(entries)
    }

    async fn get_block(&self, number: u64, with_transactions: bool) -> Result<Block, RpcError> {
        let value: serde_json::Value = self
            .call(
                "eth_getBlockByNumber",
                json!([format_quantity(number), with_transactions]),
            )
            .await?;

        if value.is_null() {
            return Err(RpcError::Unavailable(format!("block {number} not yet available")));
        }

        let raw: RawBlock = serde_json::from_value(value)
            .map_err(|e| RpcError::Unexpected(format!("bad block payload: {e}")))?;
        raw.into_block()
    }
}
