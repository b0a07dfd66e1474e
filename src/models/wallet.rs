use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{Address, Side};

/// An open directional position inferred from a wallet's fills in one market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenPosition {
    pub side: Side,
    /// USDC committed.
    pub cost: Decimal,
    /// Cost-weighted entry price on `side`'s own leg.
    pub entry_price: Decimal,
}

/// Running statistics for one wallet. Loaded from `wallets.jsonl` with every
/// field optional so older snapshots keep loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletProfile {
    pub address: Address,
    #[serde(default)]
    pub trade_count: u64,
    #[serde(default)]
    pub total_volume: Decimal,
    #[serde(default)]
    pub avg_price: Decimal,
    #[serde(default)]
    pub priced_trades: u64,
    #[serde(default)]
    pub win_count: u64,
    #[serde(default)]
    pub loss_count: u64,
    #[serde(default)]
    pub realized_pnl: Decimal,
    /// Per-close returns (pnl / cost), most recent last.
    #[serde(default)]
    pub returns: Vec<Decimal>,
    #[serde(default)]
    pub open_positions: HashMap<String, OpenPosition>,
    #[serde(default)]
    pub last_trade_at: Option<DateTime<Utc>>,
    /// Derived; recomputed after every update and after load.
    #[serde(default)]
    pub(crate) score: Decimal,
}

impl WalletProfile {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            trade_count: 0,
            total_volume: Decimal::ZERO,
            avg_price: Decimal::ZERO,
            priced_trades: 0,
            win_count: 0,
            loss_count: 0,
            realized_pnl: Decimal::ZERO,
            returns: Vec::new(),
            open_positions: HashMap::new(),
            last_trade_at: None,
            score: Decimal::ZERO,
        }
    }

    pub fn score(&self) -> Decimal {
        self.score
    }

    pub fn closed_positions(&self) -> u64 {
        self.win_count + self.loss_count
    }
}
