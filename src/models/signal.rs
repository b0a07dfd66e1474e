use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Address, Side};

/// Aggregation key for a cluster window. `side` is `None` when windows are
/// keyed by market alone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClusterKey {
    pub market_id: String,
    pub side: Option<Side>,
}

impl ClusterKey {
    pub fn market(market_id: impl Into<String>) -> Self {
        Self {
            market_id: market_id.into(),
            side: None,
        }
    }

    pub fn market_side(market_id: impl Into<String>, side: Side) -> Self {
        Self {
            market_id: market_id.into(),
            side: Some(side),
        }
    }
}

impl fmt::Display for ClusterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.side {
            Some(side) => write!(f, "{}/{}", self.market_id, side),
            None => write!(f, "{}", self.market_id),
        }
    }
}

/// Confidence label for the 0–100 cluster score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Confidence {
    Weak,
    Moderate,
    Strong,
    VeryStrong,
}

impl Confidence {
    pub fn from_score(score: Decimal) -> Self {
        if score >= Decimal::from(80) {
            Confidence::VeryStrong
        } else if score >= Decimal::from(60) {
            Confidence::Strong
        } else if score >= Decimal::from(40) {
            Confidence::Moderate
        } else {
            Confidence::Weak
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Weak => "Weak",
            Confidence::Moderate => "Moderate",
            Confidence::Strong => "Strong",
            Confidence::VeryStrong => "Very Strong",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Emitted once per accumulation episode when a window crosses both thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSignal {
    pub key: ClusterKey,
    /// Distinct participating wallets, sorted.
    pub wallets: Vec<Address>,
    pub total_size: Decimal,
    pub trade_count: usize,
    /// Size-weighted average price over priced entries.
    pub avg_price: Option<Decimal>,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    /// 0–100.
    pub score: Decimal,
    pub confidence: Confidence,
}

impl ClusterSignal {
    pub fn distinct_wallets(&self) -> usize {
        self.wallets.len()
    }
}
