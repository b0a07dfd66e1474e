use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use polywatch::chain::{ChainSource, LogFilter};
use polywatch::errors::RpcError;
use polywatch::ingestion::{
    EventDecoder, Pipeline, PipelineConfig, PriceThresholdResolver, ORDER_FILLED_TOPIC,
};
use polywatch::intelligence::WalletRegistry;
use polywatch::models::{Address, Block, LogEntry, Side, SideSource, Trade, TxRef};
use polywatch::services::SignalSink;

pub const TAKER: [u8; 20] = [0xee; 20];
pub const TOKEN: u128 = 0x7581_b394_f5a4_dd19;

#[allow(dead_code)]
pub fn wallet(b: u8) -> Address {
    Address::from_bytes([b; 20])
}

// ---------------------------------------------------------------------------
// Recording sink
// ---------------------------------------------------------------------------

/// Collects every alert text for assertions.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    messages: Arc<Mutex<Vec<String>>>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    pub fn count_containing(&self, needle: &str) -> usize {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.contains(needle))
            .count()
    }
}

impl SignalSink for RecordingSink {
    async fn notify(&self, text: &str) {
        self.messages.lock().unwrap().push(text.to_string());
    }
}

// ---------------------------------------------------------------------------
// Fake chain source
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct ChainScript {
    height: u64,
    logs: Vec<LogEntry>,
    /// Number of upcoming `get_logs` calls that time out.
    log_failures: u32,
    unreachable: bool,
    log_calls: Vec<(u64, u64)>,
    block_calls: Vec<u64>,
}

/// In-memory chain whose height, logs and failures are scripted by the test.
#[derive(Debug, Clone, Default)]
pub struct FakeChain {
    script: Arc<Mutex<ChainScript>>,
}

#[allow(dead_code)]
impl FakeChain {
    pub fn at_height(height: u64) -> Self {
        let chain = Self::default();
        chain.set_height(height);
        chain
    }

    pub fn set_height(&self, height: u64) {
        self.script.lock().unwrap().height = height;
    }

    pub fn push_log(&self, log: LogEntry) {
        self.script.lock().unwrap().logs.push(log);
    }

    pub fn fail_next_get_logs(&self, times: u32) {
        self.script.lock().unwrap().log_failures = times;
    }

    pub fn set_unreachable(&self) {
        self.script.lock().unwrap().unreachable = true;
    }

    pub fn log_calls(&self) -> Vec<(u64, u64)> {
        self.script.lock().unwrap().log_calls.clone()
    }

    pub fn block_calls(&self) -> Vec<u64> {
        self.script.lock().unwrap().block_calls.clone()
    }
}

/// Block `n` is stamped `n` seconds after a fixed epoch.
#[allow(dead_code)]
pub fn block_time(number: u64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap_or_default()
        + Duration::seconds(number as i64)
}

impl ChainSource for FakeChain {
    async fn chain_id(&self) -> Result<u64, RpcError> {
        if self.script.lock().unwrap().unreachable {
            return Err(RpcError::Unavailable("connection refused".into()));
        }
        Ok(137)
    }

    async fn current_height(&self) -> Result<u64, RpcError> {
        let script = self.script.lock().unwrap();
        if script.unreachable {
            return Err(RpcError::Unavailable("connection refused".into()));
        }
        Ok(script.height)
    }

    async fn get_logs(
        &self,
        from_block: u64,
        to_block: u64,
        _filter: &LogFilter,
    ) -> Result<Vec<LogEntry>, RpcError> {
        let mut script = self.script.lock().unwrap();
        script.log_calls.push((from_block, to_block));
        if script.log_failures > 0 {
            script.log_failures -= 1;
            return Err(RpcError::Unavailable("eth_getLogs timed out".into()));
        }
        let mut logs: Vec<LogEntry> = script
            .logs
            .iter()
            .filter(|l| l.block_number >= from_block && l.block_number <= to_block)
            .cloned()
            .collect();
        logs.sort_by_key(|l| (l.block_number, l.log_index));
        Ok(logs)
    }

    async fn get_block(&self, number: u64, _with_transactions: bool) -> Result<Block, RpcError> {
        self.script.lock().unwrap().block_calls.push(number);
        Ok(Block {
            number,
            timestamp: block_time(number),
            transaction_hashes: Vec::new(),
        })
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

fn address_word(addr: &Address) -> [u8; 32] {
    let mut w = [0u8; 32];
    w[12..].copy_from_slice(addr.as_bytes());
    w
}

fn uint(v: u128) -> [u8; 32] {
    let mut w = [0u8; 32];
    w[16..].copy_from_slice(&v.to_be_bytes());
    w
}

/// OrderFilled log where `maker` pays `usdc` (whole dollars) for `tokens`
/// outcome tokens of `TOKEN`.
#[allow(dead_code)]
pub fn buy_log(maker: Address, usdc: u128, tokens: u128, block: u64, log_index: u64) -> LogEntry {
    fill_log(maker, 0, TOKEN, usdc * 1_000_000, tokens * 1_000_000, block, log_index)
}

#[allow(dead_code)]
pub fn fill_log(
    maker: Address,
    maker_asset: u128,
    taker_asset: u128,
    maker_amount: u128,
    taker_amount: u128,
    block: u64,
    log_index: u64,
) -> LogEntry {
    let mut data = Vec::with_capacity(160);
    data.extend_from_slice(&uint(maker_asset));
    data.extend_from_slice(&uint(taker_asset));
    data.extend_from_slice(&uint(maker_amount));
    data.extend_from_slice(&uint(taker_amount));
    data.extend_from_slice(&uint(0));
    LogEntry {
        address: polywatch::config::CTF_EXCHANGE.to_string(),
        topics: vec![
            ORDER_FILLED_TOPIC,
            [0xab; 32],
            address_word(&maker),
            address_word(&Address::from_bytes(TAKER)),
        ],
        data,
        tx_hash: format!("0x{:064x}", block * 1_000 + log_index),
        block_number: block,
        log_index,
    }
}

#[allow(dead_code)]
pub fn trade(
    wallet: Address,
    market: &str,
    side: Side,
    size: i64,
    observed_at: DateTime<Utc>,
    tx: &str,
) -> Trade {
    Trade {
        wallet,
        counterparty: None,
        market_id: market.into(),
        side,
        side_source: SideSource::TokenMap,
        size: Decimal::from(size),
        price: Some(Decimal::new(6, 1)),
        observed_at,
        tx_ref: TxRef {
            tx_hash: tx.into(),
            block_number: 1,
            log_index: 0,
        },
    }
}

/// Pipeline with default rules (3 wallets, $1000, 300s) watching `wallets`.
#[allow(dead_code)]
pub fn allow_list_pipeline(wallets: impl IntoIterator<Item = Address>) -> Pipeline {
    Pipeline::new(
        EventDecoder::new(Box::new(PriceThresholdResolver::default())),
        WalletRegistry::allow_list_only(wallets),
        PipelineConfig::default(),
    )
}
