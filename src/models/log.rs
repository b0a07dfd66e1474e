use chrono::{DateTime, Utc};

/// A raw event log as returned by the chain data source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub address: String,
    pub topics: Vec<[u8; 32]>,
    pub data: Vec<u8>,
    pub tx_hash: String,
    pub block_number: u64,
    pub log_index: u64,
}

/// Block header fields the pipeline cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub number: u64,
    pub timestamp: DateTime<Utc>,
    pub transaction_hashes: Vec<String>,
}
