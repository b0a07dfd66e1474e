pub mod rpc_client;
pub mod types;

pub use rpc_client::RpcClient;

use std::future::Future;

use crate::errors::RpcError;
use crate::models::{Block, LogEntry};

/// Address + topic0 filter for `get_logs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFilter {
    pub addresses: Vec<String>,
    pub topic0: Vec<[u8; 32]>,
}

/// The single source of truth for chain height and logs.
pub trait ChainSource {
    /// Connectivity probe used once at startup.
    fn chain_id(&self) -> impl Future<Output = Result<u64, RpcError>> + Send;

    fn current_height(&self) -> impl Future<Output = Result<u64, RpcError>> + Send;

    /// Logs in `[from_block, to_block]`, ordered by block then log index.
    fn get_logs(
        &self,
        from_block: u64,
        to_block: u64,
        filter: &LogFilter,
    ) -> impl Future<Output = Result<Vec<LogEntry>, RpcError>> + Send;

    fn get_block(
        &self,
        number: u64,
        with_transactions: bool,
    ) -> impl Future<Output = Result<Block, RpcError>> + Send;
}
