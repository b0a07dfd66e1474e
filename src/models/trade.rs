use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Address, Side};

/// Where an on-chain fill came from. Unique per log, so it doubles as the dedup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxRef {
    pub tx_hash: String,
    pub block_number: u64,
    pub log_index: u64,
}

impl fmt::Display for TxRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}@{}", self.tx_hash, self.log_index, self.block_number)
    }
}

/// Which heuristic produced `Trade::side`. Direction is never ground truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SideSource {
    PriceThreshold,
    TokenParity,
    TokenMap,
    Unresolved,
}

impl fmt::Display for SideSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SideSource::PriceThreshold => "price_threshold",
            SideSource::TokenParity => "token_parity",
            SideSource::TokenMap => "token_map",
            SideSource::Unresolved => "unresolved",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Trade — core pipeline message
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Order maker.
    pub wallet: Address,
    /// Order taker, kept for audit only.
    pub counterparty: Option<Address>,
    /// Outcome token id as a decimal string.
    pub market_id: String,
    pub side: Side,
    pub side_source: SideSource,
    /// Settlement-asset (USDC) size after decimal scaling.
    pub size: Decimal,
    /// Implied probability in [0, 1], if derivable.
    pub price: Option<Decimal>,
    pub observed_at: DateTime<Utc>,
    pub tx_ref: TxRef,
}

impl Trade {
    /// Price expressed as the probability of YES, used to compare trades on
    /// opposite legs of the same market.
    pub fn yes_price(&self) -> Option<Decimal> {
        let price = self.price?;
        match self.side {
            Side::Yes => Some(price),
            Side::No => Some(Decimal::ONE - price),
            Side::Unknown => None,
        }
    }
}

impl fmt::Display for Trade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Trade: wallet={} market={} side={} size={} price={}",
            self.wallet.short(),
            &self.market_id[..12.min(self.market_id.len())],
            self.side,
            self.size,
            self.price.map(|p| p.to_string()).unwrap_or_else(|| "-".into()),
        )
    }
}
